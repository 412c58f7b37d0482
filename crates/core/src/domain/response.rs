// JSON-RPC Response envelope

use crate::domain::ErrorObject;
use crate::JSONRPC_VERSION;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Payload travelling through the post-dispatch hooks and out on the wire.
pub type Outcome = std::result::Result<Value, ErrorObject>;

/// A JSON-RPC response. Exactly one of result / error, enforced by [`Outcome`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawResponse")]
pub struct Response {
    pub id: u64,
    pub outcome: Outcome,
}

impl Response {
    pub fn new(id: u64, outcome: Outcome) -> Self {
        Self { id, outcome }
    }

    pub fn success(id: u64, result: Value) -> Self {
        Self::new(id, Ok(result))
    }

    pub fn error(id: u64, error: ErrorObject) -> Self {
        Self::new(id, Err(error))
    }

    pub fn is_error(&self) -> bool {
        self.outcome.is_err()
    }
}

#[derive(Serialize)]
struct ResponseRef<'a> {
    jsonrpc: &'static str,
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ErrorObject>,
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (result, error) = match &self.outcome {
            Ok(value) => (Some(value), None),
            Err(err) => (None, Some(err)),
        };
        ResponseRef {
            jsonrpc: JSONRPC_VERSION,
            id: self.id,
            result,
            error,
        }
        .serialize(serializer)
    }
}

#[derive(Deserialize)]
struct RawResponse {
    jsonrpc: String,
    id: u64,
    // `"result": null` is a present result, so it must not collapse to None
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl TryFrom<RawResponse> for Response {
    type Error = String;

    fn try_from(raw: RawResponse) -> Result<Self, Self::Error> {
        if raw.jsonrpc != JSONRPC_VERSION {
            return Err(format!("unsupported jsonrpc version {:?}", raw.jsonrpc));
        }
        let outcome = match (raw.result, raw.error) {
            (Some(result), None) => Ok(result),
            (None, Some(error)) => Err(error),
            (Some(_), Some(_)) => return Err("response carries both result and error".into()),
            (None, None) => return Err("response carries neither result nor error".into()),
        };
        Ok(Response {
            id: raw.id,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_response_has_no_result_field() {
        let resp = Response::error(4, ErrorObject::application("nope"));
        let value = serde_json::to_value(&resp).unwrap();
        assert!(value.get("result").is_none());
        assert_eq!(value["error"]["message"], "nope");
        assert_eq!(value["id"], 4);
    }

    #[test]
    fn test_null_result_is_present() {
        let wire = r#"{"jsonrpc":"2.0","id":1,"result":null}"#;
        let resp: Response = serde_json::from_str(wire).unwrap();
        assert_eq!(resp.outcome, Ok(Value::Null));

        let text = serde_json::to_string(&resp).unwrap();
        assert_eq!(text, wire);
    }

    #[test]
    fn test_rejects_both_members() {
        let err = serde_json::from_value::<Response>(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": 1,
            "error": {"code": 1, "message": "x"}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("both result and error"));
    }

    #[test]
    fn test_rejects_neither_member() {
        let err = serde_json::from_value::<Response>(json!({"jsonrpc": "2.0", "id": 1}))
            .unwrap_err();
        assert!(err.to_string().contains("neither result nor error"));
    }

    #[test]
    fn test_null_error_with_result_is_accepted() {
        let resp: Response = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 9,
            "result": "ok",
            "error": null
        }))
        .unwrap();
        assert_eq!(resp.outcome, Ok(json!("ok")));
    }
}
