//! Set and string similarity measures used by the continuity signals.

use std::collections::HashSet;
use std::hash::Hash;

/// Jaccard similarity of two sets. Returns 0.0 if either set is empty.
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.union(b).count();

    intersection as f32 / union as f32
}

/// Levenshtein edit distance between two strings, counted in chars.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Two rolling rows of the DP matrix
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = if a_char == b_char { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

/// Case-insensitive similarity ratio in [0, 1]: `1 - distance / max_len`.
///
/// Two empty strings are identical and score 1.0.
pub fn string_ratio(a: &str, b: &str) -> f32 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let distance = levenshtein_distance(&a, &b);
    (1.0 - distance as f32 / max_len as f32).clamp(0.0, 1.0)
}

/// Best ratio over all pairs drawn from the two lists. 0.0 if either is empty.
pub fn best_pairwise_ratio(a: &[String], b: &[String]) -> f32 {
    a.iter()
        .flat_map(|x| b.iter().map(move |y| string_ratio(x, y)))
        .fold(0.0, f32::max)
}
