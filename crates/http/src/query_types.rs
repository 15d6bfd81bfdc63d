//! Request/query types (Deserialize)

use serde::Deserialize;
use serde_json::Value;

/// Body of `POST /calls`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallBody {
    pub table_number: Option<String>,
    /// Any JSON value; anything but a known type name means `waiter`.
    #[serde(rename = "type")]
    pub call_type: Option<Value>,
    pub id: Option<String>,
}

impl CreateCallBody {
    pub fn call_type_name(&self) -> Option<String> {
        self.call_type.as_ref().and_then(Value::as_str).map(str::to_owned)
    }
}

/// Body of `POST /calls/resolve`. Exactly one target is used, in the order
/// `ids`, `id`, `tableNumber`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveBody {
    pub id: Option<String>,
    pub ids: Option<Vec<String>>,
    pub table_number: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActiveQuery {
    pub table: Option<String>,
}
