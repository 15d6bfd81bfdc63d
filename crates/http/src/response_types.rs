//! Response types (Serialize)

use serde::Serialize;
use tablecall_core::{Call, CallId, TableSummary};

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CreateCallResponse {
    pub success: bool,
    pub id: CallId,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub success: bool,
    pub resolved: usize,
}

#[derive(Debug, Serialize)]
pub struct ActiveCallsResponse {
    pub success: bool,
    pub calls: Vec<Call>,
    pub tables: Vec<TableSummary>,
}
