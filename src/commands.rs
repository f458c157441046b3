//! Command execution and JSON conversion.

use crate::terminal::TerminalPrompt;
use crate::Commands;
use chrono::DateTime;
use colored::Colorize;
use mazewire_client::{
    AuthPrompt, ClientError, Credentials, Dispatcher, Method, PromptConfig, RequestDescriptor,
};
use mazewire_wire::{MsgpackCodec, QueryEncoding, Value};
use std::collections::BTreeMap;

/// Key of a JSON object standing for a timestamp, e.g. `{"$time": 1700000000}`.
const TIME_KEY: &str = "$time";

/// Executes a command and returns the formatted output.
pub async fn execute(
    dispatcher: &Dispatcher,
    cmd: Commands,
) -> Result<String, Box<dyn std::error::Error>> {
    let (method, endpoint, data) = match cmd {
        Commands::Get { endpoint, data } => (Method::Get, endpoint, data),
        Commands::Post { endpoint, data } => (Method::Post, endpoint, data),
        Commands::Put { endpoint, data } => (Method::Put, endpoint, data),
        Commands::Patch { endpoint, data } => (Method::Patch, endpoint, data),
        Commands::Delete { endpoint, data } => (Method::Delete, endpoint, data),
        Commands::Login { user } => return login(dispatcher, user).await,
        Commands::Repl | Commands::Encode { .. } | Commands::Config => unreachable!(),
    };

    let mut request = RequestDescriptor::new(method, endpoint);
    if let Some(data) = data {
        request = request.with_payload(json_to_value(&parse_json_arg(&data)?)?);
    }

    let body = dispatcher.dispatch(&request).await?;
    Ok(format_value(&body))
}

/// Prints an error unless the dispatcher already showed it as a notification.
pub fn report(err: &(dyn std::error::Error + 'static)) {
    match err.downcast_ref::<ClientError>() {
        Some(ClientError::Encode(_)) | None => eprintln!("{}: {}", "Error".red(), err),
        Some(ClientError::AuthAbandoned) => eprintln!("{}", "Login cancelled".yellow()),
        Some(_) => {} // Already shown by the notifier
    }
}

async fn login(
    dispatcher: &Dispatcher,
    user: Option<String>,
) -> Result<String, Box<dyn std::error::Error>> {
    let credentials = match user {
        Some(user) => {
            let pass = TerminalPrompt::read_password(&user).await?;
            Credentials::new(user, pass)
        }
        None => TerminalPrompt
            .credentials(&PromptConfig::login(), None)
            .await
            .ok_or(ClientError::AuthAbandoned)?,
    };

    dispatcher.login(&credentials).await?;
    Ok(format!("{} as {}", "Logged in".green(), credentials.user.cyan()))
}

/// Encodes `input` as it would appear in a `?data=` query.
pub fn encode(
    encoding: QueryEncoding,
    input: &str,
    json: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    let bytes = if json {
        let payload = json_to_value(&parse_json_arg(input)?)?;
        MsgpackCodec::new().encode(&payload)?
    } else if let Some(path) = input.strip_prefix('@') {
        std::fs::read(path)?
    } else {
        input.as_bytes().to_vec()
    };
    Ok(encoding.encode(&bytes))
}

/// Parses a JSON argument, which may be inline JSON or @filename.
pub fn parse_json_arg(arg: &str) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    if let Some(path) = arg.strip_prefix('@') {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(arg)?)
    }
}

/// Converts JSON into a payload value.
///
/// Integers stay integers; `{"$time": <seconds>}` becomes a timestamp.
/// Strings are never reinterpreted.
pub fn json_to_value(json: &serde_json::Value) -> Result<Value, String> {
    Ok(match json {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt(u)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::Array(
            items
                .iter()
                .map(json_to_value)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        serde_json::Value::Object(fields) => {
            if let (1, Some(secs)) = (fields.len(), fields.get(TIME_KEY)) {
                let secs = secs
                    .as_i64()
                    .ok_or_else(|| format!("{} must be an integer number of seconds", TIME_KEY))?;
                let instant = DateTime::from_timestamp(secs, 0)
                    .ok_or_else(|| format!("{} out of range: {}", TIME_KEY, secs))?;
                return Ok(Value::Timestamp(instant));
            }
            let mut map = BTreeMap::new();
            for (k, v) in fields {
                map.insert(k.clone(), json_to_value(v)?);
            }
            Value::Map(map)
        }
    })
}

/// Renders a response body as pretty JSON.
pub fn format_value(value: &Value) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(s) => s,
        Err(_) => format!("{:?}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_json_to_value_scalars() {
        assert_eq!(json_to_value(&json!(null)).unwrap(), Value::Nil);
        assert_eq!(json_to_value(&json!(true)).unwrap(), Value::Bool(true));
        assert_eq!(json_to_value(&json!(-4)).unwrap(), Value::Int(-4));
        assert_eq!(
            json_to_value(&json!(u64::MAX)).unwrap(),
            Value::UInt(u64::MAX)
        );
        assert_eq!(json_to_value(&json!(1.5)).unwrap(), Value::Float(1.5));
    }

    #[test]
    fn test_time_objects_become_timestamps() {
        let value = json_to_value(&json!({
            "title": "2023-11-14T22:13:20Z",
            "published": {"$time": 1_700_000_000}
        }))
        .unwrap();

        assert_eq!(
            value.get("published").and_then(Value::as_timestamp),
            Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
        );
        // RFC 3339 strings stay strings.
        assert_eq!(
            value.get("title").and_then(Value::as_str),
            Some("2023-11-14T22:13:20Z")
        );
    }

    #[test]
    fn test_time_object_requires_integer() {
        assert!(json_to_value(&json!({"$time": "soon"})).is_err());
        // Extra keys make it an ordinary map.
        let value = json_to_value(&json!({"$time": 1, "x": 2})).unwrap();
        assert!(value.is_map());
    }

    #[test]
    fn test_format_value_renders_timestamps() {
        let value = Value::from_pairs([(
            "at",
            Value::from(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
        )]);
        let text = format_value(&value);
        assert!(text.contains("\"2023-11-14T22:13:20Z\""));
    }

    #[test]
    fn test_encode_command() {
        assert_eq!(encode(QueryEncoding::Hex, "hi", false).unwrap(), "6869");
        assert_eq!(encode(QueryEncoding::Base32, "foo", false).unwrap(), "MZXW6");
        // {"a":1} -> 81 a1 61 01
        assert_eq!(
            encode(QueryEncoding::Hex, r#"{"a":1}"#, true).unwrap(),
            "81a16101"
        );
    }

    #[test]
    fn test_parse_json_arg_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.json");
        std::fs::write(&path, r#"{"id": 3}"#).unwrap();

        let parsed = parse_json_arg(&format!("@{}", path.display())).unwrap();
        assert_eq!(parsed["id"], 3);
        assert!(parse_json_arg("{not json").is_err());
    }
}
