use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{format_description::well_known, OffsetDateTime};

/// A listening TCP socket as reported by the host, one entry per owning pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListeningSocket {
    pub pid: u32,
    pub port: u16,
}

/// Name and command line of a running process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessInfo {
    pub name: String,
    pub args: Vec<String>,
}

/// A local port suspected of hosting the server, pending verification.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub pid: u32,
    pub port: u16,
    pub process_name: String,
    pub args: Vec<String>,
}

/// The fields of a status response worth showing to a person.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub description: String,
    pub players_online: Option<u64>,
    pub players_max: Option<u64>,
    pub version: Option<String>,
}

impl ServerStatus {
    /// Summarize a parsed status object. Callers have already checked that
    /// `description` and `players` are present.
    pub fn from_json(value: &Value) -> Self {
        let players = value.get("players");
        Self {
            description: value
                .get("description")
                .map(description_text)
                .unwrap_or_default(),
            players_online: players.and_then(|p| p.get("online")).and_then(Value::as_u64),
            players_max: players.and_then(|p| p.get("max")).and_then(Value::as_u64),
            version: value
                .get("version")
                .and_then(|v| v.get("name"))
                .and_then(Value::as_str)
                .map(str::to_owned),
        }
    }
}

/// Plain text of a description that may be a string or a chat component.
fn description_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(obj) => {
            let mut text = obj
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if let Some(Value::Array(extra)) = obj.get("extra") {
                for part in extra {
                    text.push_str(&description_text(part));
                }
            }
            text
        }
        other => other.to_string(),
    }
}

/// Outcome of probing a single port.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProbeReport {
    pub port: u16,
    pub verified: bool,
    pub status: Option<ServerStatus>,
    pub error: Option<String>,
    pub timestamp: String,
}

/// Outcome of one discovery pass.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct DiscoveryReport {
    pub candidates: Vec<Candidate>,
    pub port: Option<u16>,
    pub timestamp: String,
}

pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
