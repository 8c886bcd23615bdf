use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Status reported when the service confirmed an item without errors.
pub const STATUS_OK: u16 = 200;

/// Status reported when an item was accepted but not confirmed.
pub const STATUS_ACCEPTED: u16 = 202;

/// Status reported when a transport failure carries no status of its own.
pub const STATUS_FAILED: u16 = 500;

/// Severity of a log event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Debug output.
    Debug,
    /// Informational message.
    Info,
    /// Something undesirable happened.
    Warning,
    /// An error occurred.
    Error,
    /// A critical failure.
    Critical,
}

impl Level {
    /// All levels from lowest to highest severity.
    pub const ALL: [Level; 5] = [
        Level::Debug,
        Level::Info,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    /// Returns the wire name of the level.
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Critical => "critical",
        }
    }

    /// Returns the capitalized name of the level, as used in demo messages.
    pub fn title(self) -> &'static str {
        match self {
            Level::Debug => "Debug",
            Level::Info => "Info",
            Level::Warning => "Warning",
            Level::Error => "Error",
            Level::Critical => "Critical",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error returned when parsing an unknown [`Level`].
#[derive(Clone, Debug, thiserror::Error)]
#[error("unknown level {0:?}, expected one of debug, info, warning, error, critical")]
pub struct ParseLevelError(String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| ParseLevelError(s.to_owned()))
    }
}

/// The category of a dispatched event: a log message at some level, or an exception.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A log message with the given severity.
    Log(Level),
    /// An exception, reported at error severity.
    Exception,
}

impl EventKind {
    /// Returns the name of the kind as shown in the event history.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Log(level) => level.as_str(),
            EventKind::Exception => "exception",
        }
    }

    /// Returns the severity the item is submitted with.
    pub fn level(self) -> Level {
        match self {
            EventKind::Log(level) => level,
            EventKind::Exception => Level::Error,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// An error-like value reported as an exception.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorPayload {
    /// The error class, for example `Error`.
    pub class: String,
    /// The error message.
    pub message: String,
}

impl ErrorPayload {
    /// Creates an error payload.
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
        }
    }
}

/// The content of a dispatched event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// A plain message.
    Message(String),
    /// An error-like value.
    Error(ErrorPayload),
}

impl Payload {
    /// Returns `true` if the payload has nothing to report.
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Message(message) => message.trim().is_empty(),
            Payload::Error(error) => error.class.trim().is_empty() && error.message.trim().is_empty(),
        }
    }
}

/// Identifies the reporting library.
#[derive(Clone, Debug, Serialize)]
struct Notifier {
    name: &'static str,
    version: &'static str,
}

impl Default for Notifier {
    fn default() -> Self {
        Self {
            name: "beacon",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct Exception {
    class: String,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum ItemBody {
    Message { body: String },
    Trace {
        exception: Exception,
        frames: Vec<serde_json::Value>,
    },
}

impl From<Payload> for ItemBody {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Message(body) => ItemBody::Message { body },
            Payload::Error(error) => ItemBody::Trace {
                exception: Exception {
                    class: error.class,
                    message: error.message,
                },
                frames: Vec::new(),
            },
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct ItemData {
    environment: String,
    level: Level,
    timestamp: i64,
    platform: &'static str,
    language: &'static str,
    code_version: String,
    uuid: Uuid,
    body: ItemBody,
    notifier: Notifier,
}

/// A single occurrence submitted to the item API.
#[derive(Clone, Debug, Serialize)]
pub struct Item {
    data: ItemData,
}

impl Item {
    /// Creates an item for the given event.
    pub fn new(
        kind: EventKind,
        payload: Payload,
        environment: impl Into<String>,
        code_version: impl Into<String>,
    ) -> Self {
        Self {
            data: ItemData {
                environment: environment.into(),
                level: kind.level(),
                timestamp: chrono::Utc::now().timestamp(),
                platform: "client",
                language: "rust",
                code_version: code_version.into(),
                uuid: Uuid::new_v4(),
                body: payload.into(),
                notifier: Notifier::default(),
            },
        }
    }

    /// Returns the locally generated identifier of the item.
    pub fn uuid(&self) -> Uuid {
        self.data.uuid
    }

    /// Returns the severity of the item.
    pub fn level(&self) -> Level {
        self.data.level
    }
}

/// The nested `result` object of an [`ItemResponse`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ItemResult {
    /// Identifier assigned to the accepted item.
    #[serde(default)]
    pub uuid: Option<String>,
}

/// A successful answer of the item API.
///
/// All fields are optional, since the service does not answer in a single shape. Use
/// [`item_ref`](Self::item_ref) and [`outcome`](Self::outcome) to interpret it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ItemResponse {
    /// Internal error counter, `0` when the service reported no errors.
    #[serde(default)]
    pub err: Option<i64>,
    /// Nested result object.
    #[serde(default)]
    pub result: Option<ItemResult>,
    /// Top-level identifier.
    #[serde(default)]
    pub uuid: Option<String>,
    /// Carried status.
    #[serde(default)]
    pub status: Option<u16>,
    /// Carried status, alternate spelling.
    #[serde(default, rename = "statusCode")]
    pub status_code: Option<u16>,
}

/// Location of the remote identifier within an [`ItemResponse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemRef<'a> {
    /// Found in the nested `result` object.
    Nested(&'a str),
    /// Found at the top level.
    TopLevel(&'a str),
    /// The response carries no identifier.
    Missing,
}

impl ItemRef<'_> {
    /// Returns the identifier, if any.
    pub fn remote_id(self) -> Option<String> {
        match self {
            ItemRef::Nested(id) | ItemRef::TopLevel(id) => Some(id.to_owned()),
            ItemRef::Missing => None,
        }
    }
}

impl ItemResponse {
    /// Creates a response confirming the item with the given identifier.
    pub fn confirmed(uuid: impl Into<String>) -> Self {
        Self {
            err: Some(0),
            result: Some(ItemResult {
                uuid: Some(uuid.into()),
            }),
            ..Default::default()
        }
    }

    /// Locates the remote identifier.
    ///
    /// The nested identifier takes precedence over the top-level one. Empty identifiers are
    /// treated as missing.
    pub fn item_ref(&self) -> ItemRef<'_> {
        let nested = self
            .result
            .as_ref()
            .and_then(|result| result.uuid.as_deref())
            .filter(|id| !id.is_empty());

        if let Some(id) = nested {
            return ItemRef::Nested(id);
        }

        match self.uuid.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => ItemRef::TopLevel(id),
            None => ItemRef::Missing,
        }
    }

    /// Derives the numeric outcome.
    ///
    /// A zero error counter maps to `200`. Otherwise the carried `status` or `statusCode` is used,
    /// and `202` if neither is present. A status of `0` counts as absent.
    pub fn outcome(&self) -> u16 {
        if self.err == Some(0) {
            return STATUS_OK;
        }

        self.status
            .filter(|s| *s != 0)
            .or(self.status_code.filter(|s| *s != 0))
            .unwrap_or(STATUS_ACCEPTED)
    }
}

/// The normalized result of a send operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    /// Identifier assigned by the service, if it accepted the item and returned one.
    pub remote_id: Option<String>,
    /// Numeric outcome approximating a transport status.
    pub status: u16,
}

impl SendOutcome {
    /// Normalizes a successful response.
    pub fn from_response(response: &ItemResponse) -> Self {
        Self {
            remote_id: response.item_ref().remote_id(),
            status: response.outcome(),
        }
    }

    /// Normalizes a transport failure carrying an optional status.
    pub fn from_failure(status: Option<u16>) -> Self {
        Self {
            remote_id: None,
            status: status.filter(|s| *s != 0).unwrap_or(STATUS_FAILED),
        }
    }

    /// Returns `true` if the status is in the success range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_json_snapshot;
    use similar_asserts::assert_eq;

    use super::*;

    fn response(json: &str) -> ItemResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_nested_id_preferred() {
        let response = response(r#"{"err": 0, "result": {"uuid": "nested"}, "uuid": "top"}"#);
        assert_eq!(response.item_ref(), ItemRef::Nested("nested"));
        assert_eq!(
            SendOutcome::from_response(&response),
            SendOutcome {
                remote_id: Some("nested".to_owned()),
                status: 200,
            }
        );
    }

    #[test]
    fn test_top_level_id_fallback() {
        let response = response(r#"{"result": {"id": null}, "uuid": "top"}"#);
        assert_eq!(response.item_ref(), ItemRef::TopLevel("top"));
    }

    #[test]
    fn test_empty_nested_id_falls_through() {
        let response = response(r#"{"result": {"uuid": ""}, "uuid": "top"}"#);
        assert_eq!(response.item_ref(), ItemRef::TopLevel("top"));
    }

    #[test]
    fn test_missing_id() {
        let response = response(r#"{"err": 1}"#);
        assert_eq!(response.item_ref(), ItemRef::Missing);
        assert_eq!(response.item_ref().remote_id(), None);
    }

    #[test]
    fn test_outcome_zero_errors() {
        assert_eq!(response(r#"{"err": 0}"#).outcome(), 200);
        // The error counter wins over carried statuses.
        assert_eq!(response(r#"{"err": 0, "status": 429}"#).outcome(), 200);
    }

    #[test]
    fn test_outcome_carried_status() {
        assert_eq!(response(r#"{"err": 1, "status": 403}"#).outcome(), 403);
        assert_eq!(response(r#"{"err": 1, "statusCode": 413}"#).outcome(), 413);
        assert_eq!(
            response(r#"{"status": 401, "statusCode": 413}"#).outcome(),
            401
        );
        assert_eq!(response(r#"{"status": 0, "statusCode": 413}"#).outcome(), 413);
    }

    #[test]
    fn test_outcome_unconfirmed() {
        assert_eq!(response(r#"{"err": 1}"#).outcome(), 202);
        assert_eq!(response("{}").outcome(), 202);
        assert_eq!(ItemResponse::default().outcome(), 202);
    }

    #[test]
    fn test_failure_outcome() {
        assert_eq!(
            SendOutcome::from_failure(Some(429)),
            SendOutcome {
                remote_id: None,
                status: 429,
            }
        );
        assert_eq!(SendOutcome::from_failure(None).status, 500);
        assert_eq!(SendOutcome::from_failure(Some(0)).status, 500);
        assert!(!SendOutcome::from_failure(Some(429)).is_success());
        assert!(SendOutcome::from_response(&response(r#"{"err": 1}"#)).is_success());
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("warning".parse::<Level>().unwrap(), Level::Warning);
        assert!("warn".parse::<Level>().is_err());
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(EventKind::Log(Level::Info).as_str(), "info");
        assert_eq!(EventKind::Exception.as_str(), "exception");
        assert_eq!(EventKind::Exception.level(), Level::Error);
        assert_eq!(
            serde_json::to_string(&EventKind::Exception).unwrap(),
            r#""exception""#
        );
    }

    #[test]
    fn test_payload_is_empty() {
        assert!(Payload::Message("  ".to_owned()).is_empty());
        assert!(!Payload::Message("hi".to_owned()).is_empty());
        assert!(!Payload::Error(ErrorPayload::new("Error", "")).is_empty());
    }

    #[test]
    fn test_item_serialization() {
        let item = Item::new(
            EventKind::Exception,
            Payload::Error(ErrorPayload::new("Error", "Test exception from demo app")),
            "development",
            "1.0.0",
        );

        assert_json_snapshot!(item, {
            ".data.timestamp" => "[timestamp]",
            ".data.uuid" => "[uuid]",
            ".data.notifier.version" => "[version]",
        }, @r###"
        {
          "data": {
            "environment": "development",
            "level": "error",
            "timestamp": "[timestamp]",
            "platform": "client",
            "language": "rust",
            "code_version": "1.0.0",
            "uuid": "[uuid]",
            "body": {
              "trace": {
                "exception": {
                  "class": "Error",
                  "message": "Test exception from demo app"
                },
                "frames": []
              }
            },
            "notifier": {
              "name": "beacon",
              "version": "[version]"
            }
          }
        }
        "###);
    }

    #[test]
    fn test_message_item_body() {
        let item = Item::new(
            EventKind::Log(Level::Info),
            Payload::Message("Info message from demo app".to_owned()),
            "staging",
            "1.0.0",
        );

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value["data"]["body"],
            serde_json::json!({"message": {"body": "Info message from demo app"}})
        );
        assert_eq!(value["data"]["level"], "info");
        assert_eq!(item.level(), Level::Info);
    }
}
