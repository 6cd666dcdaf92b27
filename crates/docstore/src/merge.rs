//! Partial update policy.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("partial update must be a JSON object, got {kind}")]
    PatchNotObject { kind: &'static str },
}

/// Overwrite the top-level keys of `base` with those of `patch`.
///
/// Not recursive: a nested object in `patch` replaces the stored value
/// wholesale. A `base` that is not an object is treated as empty.
pub fn shallow_merge(base: Value, patch: Value) -> Result<Value, MergeError> {
    let Value::Object(patch) = patch else {
        return Err(MergeError::PatchNotObject {
            kind: kind_of(&patch),
        });
    };

    let mut merged = match base {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    merged.extend(patch);
    Ok(Value::Object(merged))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, serde_json::json};

    #[rstest]
    #[case(json!({"a": 1, "b": 2}), json!({"b": 3}), json!({"a": 1, "b": 3}))]
    #[case(json!({"a": 1}), json!({"c": true}), json!({"a": 1, "c": true}))]
    #[case(json!({"a": 1}), json!({}), json!({"a": 1}))]
    #[case(json!({"a": 1}), json!({"a": null}), json!({"a": null}))]
    #[case(json!({"u": {"x": 1, "y": 2}}), json!({"u": {"x": 9}}), json!({"u": {"x": 9}}))]
    #[case(json!({"tags": [1, 2, 3]}), json!({"tags": [4]}), json!({"tags": [4]}))]
    fn overwrites_top_level_keys(#[case] base: Value, #[case] patch: Value, #[case] expected: Value) {
        assert_eq!(shallow_merge(base, patch).unwrap(), expected);
    }

    #[test]
    fn non_object_base_is_treated_as_empty() {
        assert_eq!(
            shallow_merge(json!([1, 2]), json!({"a": 1})).unwrap(),
            json!({"a": 1})
        );
    }

    #[rstest]
    #[case(json!([1]), "array")]
    #[case(json!("x"), "string")]
    #[case(json!(null), "null")]
    fn rejects_non_object_patch(#[case] patch: Value, #[case] kind: &str) {
        let err = shallow_merge(json!({"a": 1}), patch).unwrap_err();
        assert!(matches!(err, MergeError::PatchNotObject { kind: k } if k == kind));
    }
}
