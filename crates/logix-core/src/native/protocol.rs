//! Line protocol spoken with a hosted service process
//!
//! Each line on the child's stdin is a [`Request`]. Each line on its stdout is
//! either a response (carries `id`) or a notification (carries `event`):
//!
//! ```text
//! -> {"id":3,"method":"controller.go_online","params":{"session":1}}
//! <- {"event":"status_changed","value":"Connecting","session":1}
//! <- {"id":3,"result":null}
//! ```

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ControllerEvent;

/// Command-line flag that puts the service executable in line-protocol mode
pub const STDIO_FLAG: &str = "--stdio";

#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

#[derive(Debug, Deserialize)]
pub struct Response {
    pub id: u64,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug)]
pub enum Incoming {
    Response(Response),
    Notification {
        session: Option<u64>,
        event: ControllerEvent,
    },
}

pub fn encode_request(request: &Request<'_>) -> Result<String> {
    let mut line = serde_json::to_string(request).context("Failed to encode request")?;
    line.push('\n');
    Ok(line)
}

pub fn parse_incoming(line: &str) -> Result<Incoming> {
    let mut value: Value = serde_json::from_str(line).context("Malformed service output")?;

    if value.get("id").is_some() {
        let response = serde_json::from_value(value).context("Malformed response")?;
        return Ok(Incoming::Response(response));
    }

    let object = value
        .as_object_mut()
        .ok_or_else(|| anyhow!("Service output is not an object"))?;
    let session = object.remove("session").and_then(|s| s.as_u64());
    let event = serde_json::from_value(value).context("Malformed notification")?;
    Ok(Incoming::Notification { session, event })
}
