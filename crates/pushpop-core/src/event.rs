use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Kind of analytics fact recorded against a popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    View,
    Conversion,
    Visit,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::View => "view",
            EventType::Conversion => "conversion",
            EventType::Visit => "visit",
        }
    }

    /// The popup stats counter bumped when this event is ingested through
    /// `POST /events`. Conversions are counted by lead creation instead.
    pub fn stat_counter(&self) -> Option<StatCounter> {
        match self {
            EventType::View => Some(StatCounter::Views),
            EventType::Visit => Some(StatCounter::Visitors),
            EventType::Conversion => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(EventType::View),
            "conversion" => Ok(EventType::Conversion),
            "visit" => Ok(EventType::Visit),
            _ => Err(CoreError::validation("Invalid event type")),
        }
    }
}

/// Denormalized counters on a popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatCounter {
    Visitors,
    Views,
    Submissions,
}

impl StatCounter {
    /// Column name in the `popups` table.
    pub fn column(&self) -> &'static str {
        match self {
            StatCounter::Visitors => "stats_visitors",
            StatCounter::Views => "stats_views",
            StatCounter::Submissions => "stats_submissions",
        }
    }
}

/// A stored event. Append-only: never updated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub site_id: String,
    pub popup_id: String,
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_types() {
        assert_eq!("view".parse::<EventType>().ok(), Some(EventType::View));
        assert_eq!("visit".parse::<EventType>().ok(), Some(EventType::Visit));
        assert_eq!(
            "conversion".parse::<EventType>().ok(),
            Some(EventType::Conversion)
        );
    }

    #[test]
    fn rejects_unknown_type() {
        assert!("click".parse::<EventType>().is_err());
        assert!("View".parse::<EventType>().is_err());
    }

    #[test]
    fn conversion_has_no_event_counter() {
        assert_eq!(EventType::View.stat_counter(), Some(StatCounter::Views));
        assert_eq!(EventType::Visit.stat_counter(), Some(StatCounter::Visitors));
        assert_eq!(EventType::Conversion.stat_counter(), None);
    }
}
