//! Staff aggregation view: every table with active calls.

use std::sync::Arc;

use tablecall_core::{CallBoard, CallStatus, TableNumber, TableSummary};
use tablecall_service::ServiceError;
use tokio::sync::watch;

use crate::actions::{CallResolver, ViewSources};
use crate::runtime::{BoardChange, BoardRuntime};

pub struct StaffView {
    runtime: BoardRuntime,
    resolver: Arc<dyn CallResolver>,
}

impl StaffView {
    pub async fn mount(sources: ViewSources, resolver: Arc<dyn CallResolver>) -> Self {
        let runtime = BoardRuntime::mount(sources, CallBoard::new()).await;
        tracing::info!(active = runtime.with_board(CallBoard::active_count), "staff view mounted");
        Self { runtime, resolver }
    }

    /// Tables with active calls, most recent first.
    #[must_use]
    pub fn tables(&self) -> Vec<TableSummary> {
        self.runtime.with_board(CallBoard::tables)
    }

    #[must_use]
    pub fn table(&self, table: &TableNumber) -> Option<TableSummary> {
        self.runtime.with_board(|board| board.table(table))
    }

    /// Number of active calls for `table`; zero once all are resolved.
    #[must_use]
    pub fn active_count(&self, table: &TableNumber) -> usize {
        self.table(table).map_or(0, |summary| summary.count)
    }

    #[must_use]
    pub fn current(&self) -> BoardChange {
        self.runtime.current()
    }

    /// Receiver notified on every change to the board.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BoardChange> {
        self.runtime.subscribe()
    }

    /// Resolve every active call attributed to `table` in one action.
    ///
    /// The board itself is updated by the resulting transport events.
    pub async fn resolve_table(
        &self,
        table: &TableNumber,
        status: CallStatus,
    ) -> Result<usize, ServiceError> {
        let ids = self.runtime.with_board(|board| board.ids_for_table(table));
        if ids.is_empty() {
            return Ok(0);
        }
        tracing::info!(table = %table, count = ids.len(), status = %status, "resolving table");
        self.resolver.resolve_calls(&ids, status).await
    }

    /// Tear down both subscriptions and the poll timer.
    pub async fn unmount(self) {
        self.runtime.unmount().await;
        tracing::debug!("staff view unmounted");
    }
}
