use serde::de::DeserializeOwned;
use serde_json::Value;

/// Distinguishes a PATCH field that was left out from one explicitly set to `null`.
#[derive(Debug, PartialEq)]
pub enum NullableValue<T> {
    Omitted,
    Null,
    Value(T),
}

impl<T> NullableValue<T> {
    /// `None` when omitted, `Some(None)` to clear the column, `Some(Some(v))` to set it.
    pub fn into_change(self) -> Option<Option<T>> {
        match self {
            NullableValue::Omitted => None,
            NullableValue::Null => Some(None),
            NullableValue::Value(value) => Some(Some(value)),
        }
    }
}

pub fn classify_nullable<T: DeserializeOwned>(
    body: &Value,
    field: &str,
) -> Result<NullableValue<T>, String> {
    match body.get(field) {
        None => Ok(NullableValue::Omitted),
        Some(Value::Null) => Ok(NullableValue::Null),
        Some(other) => serde_json::from_value(other.clone())
            .map(NullableValue::Value)
            .map_err(|err| format!("invalid value for {field}: {err}")),
    }
}

/// Like [`classify_nullable`] but rejects an explicit `null`.
pub fn required_if_present<T: DeserializeOwned>(
    body: &Value,
    field: &str,
) -> Result<Option<T>, String> {
    match classify_nullable(body, field)? {
        NullableValue::Omitted => Ok(None),
        NullableValue::Null => Err(format!("{field} cannot be null")),
        NullableValue::Value(value) => Ok(Some(value)),
    }
}
