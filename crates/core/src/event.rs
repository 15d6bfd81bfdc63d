//! Wire events carried by the two transports.
//!
//! The broadcast channel carries [`BroadcastEvent`]s: fast, unordered and lossy.
//! The durable store's change feed carries [`ChangeEvent`]s with the full
//! current record. Consumers reconcile both through [`crate::CallBoard`].

use serde::{Deserialize, Serialize};

use crate::call::{Call, CallId, CallStatus};

/// Event published on the ephemeral broadcast channel.
///
/// Serialized as `{"event": "new-call", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum BroadcastEvent {
    NewCall(Call),
    #[serde(alias = "resolved")]
    StatusChanged(StatusChange),
}

impl BroadcastEvent {
    #[must_use]
    pub fn new_call(call: &Call) -> Self {
        Self::NewCall(call.clone())
    }

    #[must_use]
    pub fn status_changed(id: CallId, status: CallStatus) -> Self {
        Self::StatusChanged(StatusChange { id, status: Some(status) })
    }

    /// Wire name of the event, as used by relays that route on it.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match *self {
            Self::NewCall(_) => "new-call",
            Self::StatusChanged(_) => "status-changed",
        }
    }

    #[must_use]
    pub fn call_id(&self) -> &CallId {
        match self {
            Self::NewCall(call) => &call.id,
            Self::StatusChanged(change) => &change.id,
        }
    }
}

/// Payload of a `status-changed` (or legacy `resolved`) event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: CallId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CallStatus>,
}

impl StatusChange {
    /// A bare `{id}` payload means the call was resolved.
    #[must_use]
    pub fn status(&self) -> CallStatus {
        self.status.unwrap_or(CallStatus::Done)
    }
}

/// Kind of transition observed on the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Appear,
    Update,
    Disappear,
}

/// Change-feed entry carrying the full current record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub transition: Transition,
    pub call: Call,
}

impl ChangeEvent {
    #[must_use]
    pub const fn new(transition: Transition, call: Call) -> Self {
        Self { transition, call }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::CallType;
    use chrono::Utc;

    #[test]
    fn new_call_wire_shape() {
        let call = Call::pending("c-1".into(), "12".into(), CallType::Waiter, Utc::now());
        let json = serde_json::to_value(BroadcastEvent::new_call(&call)).unwrap();
        assert_eq!(json["event"], "new-call");
        assert_eq!(json["data"]["id"], "c-1");
        assert_eq!(json["data"]["tableNumber"], "12");
        assert_eq!(json["data"]["status"], "pending");
    }

    #[test]
    fn bare_resolved_payload_means_done() {
        let event: BroadcastEvent =
            serde_json::from_str(r#"{"event":"resolved","data":{"id":"c-9"}}"#).unwrap();
        match event {
            BroadcastEvent::StatusChanged(change) => {
                assert_eq!(change.id.as_str(), "c-9");
                assert_eq!(change.status(), CallStatus::Done);
            },
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn status_changed_keeps_explicit_status() {
        let event = BroadcastEvent::status_changed("c-2".into(), CallStatus::Processing);
        let text = serde_json::to_string(&event).unwrap();
        assert!(text.contains(r#""event":"status-changed""#));
        let back: BroadcastEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn change_event_transition_names() {
        let call = Call::pending("c-3".into(), "4".into(), CallType::Bill, Utc::now());
        let json = serde_json::to_value(ChangeEvent::new(Transition::Disappear, call)).unwrap();
        assert_eq!(json["transition"], "disappear");
        assert_eq!(json["call"]["type"], "bill");
    }
}
