//! Event timestamps.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point in time attached to an event.
///
/// Upstream parsers do not always know the timezone (iCalendar "floating"
/// times, some mail headers), so a timestamp is either zoned or floating.
/// Only zoned timestamps can be compared across events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTime {
    Zoned(DateTime<FixedOffset>),
    Floating(NaiveDateTime),
}

impl EventTime {
    /// Normalize to UTC. Floating times have no defined instant and yield `None`.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            EventTime::Zoned(dt) => Some(dt.with_timezone(&Utc)),
            EventTime::Floating(_) => None,
        }
    }

    pub fn is_zoned(&self) -> bool {
        matches!(self, EventTime::Zoned(_))
    }

    /// Wall-clock value used for ordering when no instant is available.
    pub fn naive_local(&self) -> NaiveDateTime {
        match self {
            EventTime::Zoned(dt) => dt.naive_local(),
            EventTime::Floating(naive) => *naive,
        }
    }
}

impl From<DateTime<Utc>> for EventTime {
    fn from(dt: DateTime<Utc>) -> Self {
        EventTime::Zoned(dt.into())
    }
}

impl From<DateTime<FixedOffset>> for EventTime {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        EventTime::Zoned(dt)
    }
}

impl From<NaiveDateTime> for EventTime {
    fn from(naive: NaiveDateTime) -> Self {
        EventTime::Floating(naive)
    }
}

impl std::fmt::Display for EventTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventTime::Zoned(dt) => write!(f, "{}", dt.to_rfc3339()),
            EventTime::Floating(naive) => write!(f, "{} (floating)", naive),
        }
    }
}
