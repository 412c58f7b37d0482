// JSON-RPC Request envelope

use crate::domain::ErrorObject;
use crate::JSONRPC_VERSION;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// A single JSON-RPC call.
///
/// `params` is opaque to the framework; handlers decode it with
/// [`Request::parse_params`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawRequest")]
pub struct Request {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    /// Decode `params` into a typed value, mapping failures to `INVALID_PARAMS`.
    pub fn parse_params<T: DeserializeOwned>(&self) -> Result<T, ErrorObject> {
        serde_json::from_value(self.params.clone())
            .map_err(ErrorObject::invalid_params)
    }
}

#[derive(Serialize)]
struct RequestRef<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a Value,
}

impl Serialize for Request {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RequestRef {
            jsonrpc: JSONRPC_VERSION,
            id: self.id,
            method: &self.method,
            params: &self.params,
        }
        .serialize(serializer)
    }
}

#[derive(Deserialize)]
struct RawRequest {
    jsonrpc: String,
    // Notifications (no id) are not supported: every request gets a response
    id: Option<u64>,
    method: String,
    #[serde(default)]
    params: Value,
}

impl TryFrom<RawRequest> for Request {
    type Error = String;

    fn try_from(raw: RawRequest) -> Result<Self, Self::Error> {
        if raw.jsonrpc != JSONRPC_VERSION {
            return Err(format!("unsupported jsonrpc version {:?}", raw.jsonrpc));
        }
        let id = raw.id.ok_or_else(|| "request id is required".to_string())?;
        if raw.method.is_empty() {
            return Err("method must not be empty".to_string());
        }
        Ok(Request {
            id,
            method: raw.method,
            params: raw.params,
        })
    }
}
