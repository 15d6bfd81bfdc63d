use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_CALL_ID_LEN, MAX_TABLE_NUMBER_LEN};
use crate::error::CoreError;

/// Canonical call identifier, identical on both transports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    /// Mint a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Validate a caller-supplied identifier.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidInput("call id must not be empty".to_owned()));
        }
        if trimmed.len() > MAX_CALL_ID_LEN {
            return Err(CoreError::InvalidInput(format!(
                "call id exceeds {MAX_CALL_ID_LEN} characters"
            )));
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for CallId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of the table a call originates from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableNumber(String);

impl TableNumber {
    /// Validate a table number coming from a diner request.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidInput("tableNumber is required".to_owned()));
        }
        if trimmed.chars().count() > MAX_TABLE_NUMBER_LEN {
            return Err(CoreError::InvalidInput(format!(
                "tableNumber exceeds {MAX_TABLE_NUMBER_LEN} characters"
            )));
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TableNumber {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// What the diner asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    #[default]
    Waiter,
    Bill,
}

impl CallType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Waiter => "waiter",
            Self::Bill => "bill",
        }
    }

    /// Missing or unrecognized values fall back to [`CallType::Waiter`].
    #[must_use]
    pub fn from_lenient(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().to_ascii_lowercase().parse().ok()).unwrap_or_default()
    }
}

impl FromStr for CallType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiter" => Ok(Self::Waiter),
            "bill" => Ok(Self::Bill),
            _ => Err(CoreError::InvalidInput(format!("unknown call type: {s}"))),
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a call. Variant order is the only legal direction of travel.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    #[default]
    Pending,
    Processing,
    Done,
}

impl CallStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Done => "done",
        }
    }

    /// Position in the lifecycle; used for forward-only comparisons in SQL.
    #[must_use]
    pub const fn rank(&self) -> i16 {
        match *self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Done => 2,
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(*self, Self::Done)
    }
}

impl FromStr for CallStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "done" => Ok(Self::Done),
            _ => Err(CoreError::InvalidInput(format!("unknown call status: {s}"))),
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A service request raised from a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub id: CallId,
    pub table_number: TableNumber,
    #[serde(rename = "type")]
    pub call_type: CallType,
    pub status: CallStatus,
    pub created_at: DateTime<Utc>,
}

impl Call {
    #[must_use]
    pub fn pending(
        id: CallId,
        table_number: TableNumber,
        call_type: CallType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self { id, table_number, call_type, status: CallStatus::Pending, created_at }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }

    #[must_use]
    pub fn with_status(mut self, status: CallStatus) -> Self {
        self.status = status;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_order_is_forward_only() {
        assert!(CallStatus::Pending < CallStatus::Processing);
        assert!(CallStatus::Processing < CallStatus::Done);
        assert_eq!(CallStatus::Done.rank(), 2);
        assert!(!CallStatus::Done.is_active());
    }

    #[test]
    fn call_type_falls_back_to_waiter() {
        assert_eq!(CallType::from_lenient(None), CallType::Waiter);
        assert_eq!(CallType::from_lenient(Some("dessert")), CallType::Waiter);
        assert_eq!(CallType::from_lenient(Some(" BILL ")), CallType::Bill);
    }

    #[test]
    fn table_number_is_trimmed_and_required() {
        assert_eq!(TableNumber::parse(" 12 ").unwrap().as_str(), "12");
        assert!(TableNumber::parse("   ").is_err());
        assert!(TableNumber::parse(&"9".repeat(MAX_TABLE_NUMBER_LEN + 1)).is_err());
    }

    #[test]
    fn call_serializes_with_wire_field_names() {
        let created =
            DateTime::parse_from_rfc3339("2026-03-01T19:30:00Z").unwrap().with_timezone(&Utc);
        let call = Call::pending("abc".into(), "5".into(), CallType::Bill, created);
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["tableNumber"], "5");
        assert_eq!(json["type"], "bill");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["createdAt"], "2026-03-01T19:30:00Z");
    }
}
