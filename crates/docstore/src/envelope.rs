//! JSON envelope codec.
//!
//! A message body is the plain JSON text of the payload with no framing. The
//! document id lives on the message, so a top-level `id` key is dropped on
//! the way in and on the way out.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Key reserved for the message id when a document is presented.
pub const ID_FIELD: &str = "id";

/// Serialise a payload to its structured form, without the id key.
pub fn to_payload<T: Serialize + ?Sized>(payload: &T) -> serde_json::Result<Value> {
    let mut value = serde_json::to_value(payload)?;
    strip_id(&mut value);
    Ok(value)
}

/// Render a payload as envelope text.
pub fn encode<T: Serialize + ?Sized>(payload: &T) -> serde_json::Result<String> {
    serde_json::to_string(&to_payload(payload)?)
}

/// Parse envelope text. `None` when the body is not JSON.
pub fn parse(body: &str) -> Option<Value> {
    let mut value: Value = serde_json::from_str(body).ok()?;
    strip_id(&mut value);
    Some(value)
}

/// Parse envelope text into `T`. `None` when the body is not JSON or does
/// not have the shape of `T`.
pub fn decode<T: DeserializeOwned>(body: &str) -> Option<T> {
    serde_json::from_value(parse(body)?).ok()
}

fn strip_id(value: &mut Value) {
    if let Value::Object(map) = value {
        map.remove(ID_FIELD);
    }
}
