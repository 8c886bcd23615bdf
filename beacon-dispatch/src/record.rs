use std::fmt;

use beacon_client::{EventKind, SendOutcome};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// One dispatched occurrence, as shown in the event history.
///
/// Records are created once a send resolves and never change afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    id: Uuid,
    level: EventKind,
    remote_id: Option<String>,
    status: u16,
    #[serde(serialize_with = "serialize_timestamp")]
    timestamp: DateTime<Utc>,
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl EventRecord {
    /// Creates a record for a resolved send, stamped with the current time.
    pub fn new(kind: EventKind, outcome: SendOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            level: kind,
            remote_id: outcome.remote_id,
            status: outcome.status,
            timestamp: Utc::now(),
        }
    }

    /// Returns the locally generated identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the kind of the event.
    pub fn level(&self) -> EventKind {
        self.level
    }

    /// Returns the identifier assigned by the monitoring service, if any.
    pub fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    /// Returns the normalized outcome code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns when the record was created.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Classifies the outcome code.
    pub fn status_class(&self) -> StatusClass {
        StatusClass::from_status(self.status)
    }
}

/// Coarse classification of an outcome code for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusClass {
    /// A `2xx` outcome.
    Success,
    /// An outcome of `400` or above.
    Failure,
    /// Anything else.
    Neutral,
}

impl StatusClass {
    /// Classifies a numeric outcome.
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => Self::Success,
            400.. => Self::Failure,
            _ => Self::Neutral,
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

#[cfg(test)]
mod tests {
    use beacon_client::Level;
    use insta::assert_json_snapshot;

    use super::*;

    #[test]
    fn test_record_shape() {
        let record = EventRecord::new(
            EventKind::Log(Level::Info),
            SendOutcome {
                remote_id: Some("a5f3c1d2".to_owned()),
                status: 200,
            },
        );

        assert_json_snapshot!(record, {
            ".id" => "[id]",
            ".timestamp" => "[timestamp]",
        }, @r###"
        {
          "id": "[id]",
          "level": "info",
          "remoteId": "a5f3c1d2",
          "status": 200,
          "timestamp": "[timestamp]"
        }
        "###);
    }

    #[test]
    fn test_timestamp_is_iso8601() {
        let record = EventRecord::new(
            EventKind::Exception,
            SendOutcome {
                remote_id: None,
                status: 500,
            },
        );

        let value = serde_json::to_value(&record).unwrap();
        let timestamp = value["timestamp"].as_str().unwrap();
        assert!(timestamp.ends_with('Z'));
        assert_eq!(
            DateTime::parse_from_rfc3339(timestamp).unwrap().timestamp(),
            record.timestamp().timestamp()
        );
        assert_eq!(value["remoteId"], serde_json::Value::Null);
    }

    #[test]
    fn test_status_class() {
        assert_eq!(StatusClass::from_status(200), StatusClass::Success);
        assert_eq!(StatusClass::from_status(202), StatusClass::Success);
        assert_eq!(StatusClass::from_status(429), StatusClass::Failure);
        assert_eq!(StatusClass::from_status(500), StatusClass::Failure);
        assert_eq!(StatusClass::from_status(304), StatusClass::Neutral);
    }
}
