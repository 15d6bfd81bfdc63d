use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use tablecall_core::{CallBoard, CallId, TableNumber};
use tablecall_service::{CallRequest, parse_target_status};

use crate::AppState;
use crate::api_error::ApiError;
use crate::query_types::{ActiveQuery, CreateCallBody, ResolveBody};
use crate::response_types::{ActiveCallsResponse, CreateCallResponse, ResolveResponse};

pub async fn create_call(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateCallBody>, JsonRejection>,
) -> Result<Json<CreateCallResponse>, ApiError> {
    let Json(body) = body?;
    let request = CallRequest {
        call_type: body.call_type_name(),
        table_number: body.table_number.unwrap_or_default(),
        id: body.id,
    };
    let call = state.ingest.create_call(request).await?;
    Ok(Json(CreateCallResponse { success: true, id: call.id }))
}

pub async fn resolve_calls(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ResolveBody>, JsonRejection>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let Json(body) = body?;
    let status = parse_target_status(body.status.as_deref())?;

    let outcome = match (body.ids, body.id, body.table_number) {
        (Some(ids), _, _) if !ids.is_empty() => {
            let ids = ids
                .iter()
                .map(|raw| CallId::parse(raw))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            state.resolution.resolve_ids(&ids, status).await?
        },
        (_, Some(id), _) => {
            let id = CallId::parse(&id).map_err(|e| ApiError::BadRequest(e.to_string()))?;
            state.resolution.resolve_one(&id, status).await?
        },
        (_, _, Some(table)) => {
            let table =
                TableNumber::parse(&table).map_err(|e| ApiError::BadRequest(e.to_string()))?;
            state.resolution.resolve_table(&table, status).await?
        },
        _ => {
            return Err(ApiError::BadRequest("id, ids or tableNumber is required".to_owned()));
        },
    };
    Ok(Json(ResolveResponse { success: true, resolved: outcome.resolved() }))
}

/// Non-`done` snapshot, the reconciliation pull for remote views.
pub async fn active_calls(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActiveQuery>,
) -> Result<Json<ActiveCallsResponse>, ApiError> {
    let calls = match query.table.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(table) => {
            let table =
                TableNumber::parse(table).map_err(|e| ApiError::BadRequest(e.to_string()))?;
            state.store.active_calls_for_table(&table).await?
        },
        None => state.store.active_calls().await?,
    };
    let mut board = CallBoard::new();
    board.load_baseline(calls.iter().cloned());
    Ok(Json(ActiveCallsResponse { success: true, calls, tables: board.tables() }))
}
