//! Diner-side tracker for one table.
//!
//! Answers "does my table have an active call, and how far along is it", and
//! submits new requests with a speculative local entry that is rolled back if
//! the gateway fails outright.

use std::sync::Arc;

use chrono::Utc;
use tablecall_core::{Call, CallBoard, CallId, CallStatus, CallType, TableNumber};
use tablecall_service::{CallRequest, ServiceError};
use tokio::sync::watch;

use crate::actions::{CallSubmitter, ViewSources};
use crate::runtime::{BoardChange, BoardRuntime, active_of_type};

/// Most advanced state over the table's active calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DinerCallState {
    Idle,
    Pending,
    Processing,
}

impl DinerCallState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Processing => "processing",
        }
    }

    fn from_board(board: &CallBoard, table: &TableNumber) -> Self {
        match board.table(table).map(|summary| summary.status) {
            None | Some(CallStatus::Done) => Self::Idle,
            Some(CallStatus::Pending) => Self::Pending,
            Some(CallStatus::Processing) => Self::Processing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A new call was sent.
    Created(Call),
    /// A call of this type is already outstanding; nothing was sent.
    AlreadyNoted(Call),
}

pub struct DinerTracker {
    table: TableNumber,
    runtime: BoardRuntime,
    submitter: Arc<dyn CallSubmitter>,
}

impl DinerTracker {
    pub async fn mount(
        sources: ViewSources,
        table: TableNumber,
        submitter: Arc<dyn CallSubmitter>,
    ) -> Self {
        let runtime = BoardRuntime::mount(sources, CallBoard::scoped(table.clone())).await;
        tracing::info!(table = %table, "diner tracker mounted");
        Self { table, runtime, submitter }
    }

    #[must_use]
    pub fn table_number(&self) -> &TableNumber {
        &self.table
    }

    #[must_use]
    pub fn state(&self) -> DinerCallState {
        self.runtime.with_board(|board| DinerCallState::from_board(board, &self.table))
    }

    /// The outstanding call of `call_type`, if any.
    #[must_use]
    pub fn active_call(&self, call_type: CallType) -> Option<Call> {
        self.runtime.with_board(|board| active_of_type(board, call_type))
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BoardChange> {
        self.runtime.subscribe()
    }

    /// Ask for service.
    pub async fn request(&self, call_type: CallType) -> Result<RequestOutcome, ServiceError> {
        let id = CallId::generate();
        let speculative = Call::pending(id.clone(), self.table.clone(), call_type, Utc::now());
        if let Some(existing) = self.runtime.speculate(speculative).await {
            tracing::debug!(
                table = %self.table,
                id = %existing.id,
                call_type = %call_type,
                "already noted"
            );
            return Ok(RequestOutcome::AlreadyNoted(existing));
        }

        let request = CallRequest::new(self.table.as_str(), call_type).with_id(&id);
        match self.submitter.submit_call(request).await {
            Ok(call) => {
                self.runtime.settle(id).await;
                Ok(RequestOutcome::Created(call))
            },
            Err(e) => {
                let rolled_back = self.runtime.forget(id.clone()).await;
                tracing::warn!(
                    table = %self.table,
                    id = %id,
                    rolled_back,
                    error = %e,
                    "call request failed"
                );
                Err(e)
            },
        }
    }

    pub async fn unmount(self) {
        self.runtime.unmount().await;
        tracing::debug!(table = %self.table, "diner tracker unmounted");
    }
}
