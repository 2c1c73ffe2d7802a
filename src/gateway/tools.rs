//! Tool registry and executor
//!
//! The registry is closed: [`ToolKind`] lists every tool, and adding one
//! means adding a variant plus its arm in [`execute`].

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use super::auth::AuthContext;
use crate::{Error, Result, timestamp};

/// Message echoed back when `echo` gets no `message` parameter
pub const DEFAULT_ECHO_MESSAGE: &str = "No message provided";

/// Every tool the executor knows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Echo a message back
    Echo,
    /// Report how the current request was authorized
    AuthInfo,
}

impl ToolKind {
    /// All tools, in registry order
    pub const ALL: [Self; 2] = [Self::Echo, Self::AuthInfo];

    /// Wire name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Echo => "echo",
            Self::AuthInfo => "auth_info",
        }
    }

    /// Look a tool up by wire name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Registry entry advertised on `GET /tools`
    #[must_use]
    pub fn descriptor(self) -> ToolDescriptor {
        let (description, parameters) = match self {
            Self::Echo => (
                "Echo back the provided message",
                BTreeMap::from([("message", ParameterSpec::string(true))]),
            ),
            Self::AuthInfo => (
                "Show information about the authorization method used",
                BTreeMap::new(),
            ),
        };
        ToolDescriptor {
            name: self.name(),
            description,
            parameters,
        }
    }
}

/// Schema entry for one tool parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSpec {
    /// JSON type name
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Whether callers are expected to supply it
    pub required: bool,
}

impl ParameterSpec {
    fn string(required: bool) -> Self {
        Self {
            kind: "string",
            required,
        }
    }
}

/// Public description of a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    /// Wire name
    pub name: &'static str,
    /// One-line description
    pub description: &'static str,
    /// Parameter name to schema
    pub parameters: BTreeMap<&'static str, ParameterSpec>,
}

/// The full registry, in order
#[must_use]
pub fn registry() -> Vec<ToolDescriptor> {
    ToolKind::ALL.into_iter().map(ToolKind::descriptor).collect()
}

/// A parsed `POST /execute` body
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    /// Requested tool name (not yet resolved against the registry)
    pub tool: String,
    /// Tool parameters
    pub parameters: Map<String, Value>,
}

impl ToolInvocation {
    /// Build an invocation from an already-parsed JSON body
    pub fn from_json(body: Value) -> Result<Self> {
        let Value::Object(mut body) = body else {
            return Err(Error::bad_request("Request body must be a JSON object"));
        };

        let tool = match body.remove("tool") {
            Some(Value::String(name)) => name,
            None | Some(Value::Null) => {
                return Err(Error::bad_request("Missing required field: tool"));
            }
            Some(_) => return Err(Error::bad_request("Field 'tool' must be a string")),
        };

        let parameters = match body.remove("parameters") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(parameters)) => parameters,
            Some(_) => return Err(Error::bad_request("Field 'parameters' must be an object")),
        };

        Ok(Self { tool, parameters })
    }
}

/// Successful tool output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    /// Tool that produced the result
    pub tool: &'static str,
    /// Tool-specific payload
    pub result: Value,
}

/// Run a tool for the in-flight request.
///
/// `auth` is the gate's view of the same request; no tool can reach the
/// credential set itself.
pub fn execute(invocation: &ToolInvocation, auth: &AuthContext) -> Result<ToolResult> {
    let Some(kind) = ToolKind::from_name(&invocation.tool) else {
        return Err(Error::bad_request(format!(
            "Unknown tool: {}",
            invocation.tool
        )));
    };

    debug!(tool = kind.name(), "Executing tool");
    let result = match kind {
        ToolKind::Echo => echo(&invocation.parameters)?,
        ToolKind::AuthInfo => auth_info(auth),
    };

    Ok(ToolResult {
        tool: kind.name(),
        result,
    })
}

fn echo(parameters: &Map<String, Value>) -> Result<Value> {
    let message = match parameters.get("message") {
        None | Some(Value::Null) => DEFAULT_ECHO_MESSAGE,
        Some(Value::String(message)) => message.as_str(),
        Some(_) => {
            return Err(Error::bad_request(
                "Invalid parameter 'message': expected a string",
            ));
        }
    };

    Ok(json!({
        "echoed_message": message,
        "timestamp": timestamp(),
    }))
}

fn auth_info(auth: &AuthContext) -> Value {
    json!({
        "authorization_method": auth.source.as_str(),
        "key_present": auth.key_present,
        "key_valid": auth.key_valid(),
        "timestamp": timestamp(),
    })
}
