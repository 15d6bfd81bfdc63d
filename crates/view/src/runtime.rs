//! The per-view event loop.
//!
//! One task owns the board and selects over the broadcast subscription, the
//! change feed, the reconciliation ticker, local commands and shutdown. Every
//! input goes through the board's merge, so no locking is needed.

use std::collections::HashSet;
use std::sync::Arc;

use tablecall_core::{Call, CallBoard, CallId, CallType, MergeOutcome};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::actions::ViewSources;

const COMMAND_BUFFER: usize = 16;

/// Published after every step that changed the board.
#[derive(Debug, Clone, Default)]
pub struct BoardChange {
    /// Increments on each change; 0 is the state right after mount.
    pub revision: u64,
    pub board: Arc<CallBoard>,
    /// Calls that became active in this step.
    pub arrived: Vec<Call>,
}

pub(crate) enum Command {
    /// Insert a local pending entry unless the table already has an active
    /// call of the same type, which is returned instead.
    Speculate { call: Call, ack: oneshot::Sender<Option<Call>> },
    /// The submission behind a speculative entry finished.
    Settle { id: CallId },
    /// Drop a speculative entry.
    Forget { id: CallId, ack: oneshot::Sender<bool> },
}

pub(crate) struct BoardRuntime {
    state: watch::Receiver<BoardChange>,
    commands: mpsc::Sender<Command>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

struct EventLoop {
    board: CallBoard,
    revision: u64,
    state: watch::Sender<BoardChange>,
    sources: ViewSources,
}

impl BoardRuntime {
    /// Subscribe to both transports, load the baseline, then start the loop.
    ///
    /// Subscribing first means nothing written during the baseline fetch is
    /// missed. A failed baseline leaves the board empty until the first
    /// reconciliation.
    pub(crate) async fn mount(sources: ViewSources, mut board: CallBoard) -> Self {
        let subscription = sources.channel.subscribe();
        let feed = sources.store.subscribe_changes();

        match fetch_snapshot(&sources, &board).await {
            Ok(calls) => {
                let loaded = board.load_baseline(calls);
                tracing::debug!(loaded, scope = ?board.scope(), "view baseline loaded");
            },
            Err(e) => {
                tracing::warn!(error = %e, "view baseline fetch failed, waiting for polling");
            },
        }

        let (state_tx, state_rx) = watch::channel(BoardChange {
            revision: 0,
            board: Arc::new(board.clone()),
            arrived: Vec::new(),
        });
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let event_loop = EventLoop { board, revision: 0, state: state_tx, sources };
        let task = tokio::spawn(event_loop.run(subscription, feed, command_rx, shutdown_rx));

        Self {
            state: state_rx,
            commands: command_tx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    pub(crate) fn current(&self) -> BoardChange {
        self.state.borrow().clone()
    }

    pub(crate) fn with_board<R>(&self, f: impl FnOnce(&CallBoard) -> R) -> R {
        f(&self.state.borrow().board)
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<BoardChange> {
        self.state.clone()
    }

    pub(crate) async fn speculate(&self, call: Call) -> Option<Call> {
        let (ack, rx) = oneshot::channel();
        if self.commands.send(Command::Speculate { call, ack }).await.is_err() {
            tracing::warn!("view loop stopped, speculative entry not recorded");
            return None;
        }
        rx.await.ok().flatten()
    }

    pub(crate) async fn settle(&self, id: CallId) {
        if self.commands.send(Command::Settle { id }).await.is_err() {
            tracing::debug!("view loop stopped before settle");
        }
    }

    pub(crate) async fn forget(&self, id: CallId) -> bool {
        let (ack, rx) = oneshot::channel();
        if self.commands.send(Command::Forget { id, ack }).await.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Stop the loop and wait for it to release both subscriptions.
    pub(crate) async fn unmount(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            drop(shutdown.send(()));
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "view loop ended abnormally");
            }
        }
    }
}

impl Drop for BoardRuntime {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn fetch_snapshot(
    sources: &ViewSources,
    board: &CallBoard,
) -> Result<Vec<Call>, tablecall_storage::StorageError> {
    match board.scope() {
        Some(table) => sources.store.active_calls_for_table(table).await,
        None => sources.store.active_calls().await,
    }
}

impl EventLoop {
    async fn run(
        mut self,
        mut subscription: tablecall_channel::Subscription,
        mut feed: tablecall_storage::ChangeFeed,
        mut commands: mpsc::Receiver<Command>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let period = self.sources.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut broadcast_open = true;
        let mut feed_open = true;
        let mut commands_open = true;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                event = subscription.recv(), if broadcast_open => match event {
                    Some(event) => {
                        let outcome = self.board.apply_broadcast(&event);
                        tracing::trace!(
                            id = %event.call_id(),
                            event = event.name(),
                            ?outcome,
                            "broadcast merged"
                        );
                        let arrived = self.arrival(outcome, event.call_id());
                        self.publish_if(outcome.changed(), arrived);
                    },
                    None => {
                        tracing::warn!("broadcast subscription closed, relying on change feed");
                        broadcast_open = false;
                    },
                },
                change = feed.recv(), if feed_open => match change {
                    Some(change) => {
                        let outcome = self.board.apply_change(&change);
                        tracing::trace!(
                            id = %change.call.id,
                            transition = ?change.transition,
                            ?outcome,
                            "change merged"
                        );
                        let arrived = self.arrival(outcome, &change.call.id);
                        self.publish_if(outcome.changed(), arrived);
                    },
                    None => {
                        tracing::warn!("change feed closed, relying on broadcast and polling");
                        feed_open = false;
                    },
                },
                _ = ticker.tick() => self.reconcile().await,
                command = commands.recv(), if commands_open => match command {
                    Some(command) => self.handle(command),
                    None => commands_open = false,
                },
            }
        }
        tracing::debug!(scope = ?self.board.scope(), "view loop stopped");
    }

    fn arrival(&self, outcome: MergeOutcome, id: &CallId) -> Vec<Call> {
        if outcome == MergeOutcome::Inserted {
            self.board.get(id).cloned().into_iter().collect()
        } else {
            Vec::new()
        }
    }

    async fn reconcile(&mut self) {
        let snapshot = match fetch_snapshot(&self.sources, &self.board).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "reconciliation fetch failed");
                return;
            },
        };
        let known: HashSet<CallId> = snapshot
            .iter()
            .filter(|c| self.board.get(&c.id).is_some())
            .map(|c| c.id.clone())
            .collect();
        let report = self.board.reconcile(&snapshot);
        if report.changed() {
            tracing::info!(
                inserted = report.inserted,
                advanced = report.advanced,
                removed = report.removed,
                "reconciliation repaired view"
            );
        }
        let arrived: Vec<Call> = snapshot
            .iter()
            .filter(|c| !known.contains(&c.id))
            .filter_map(|c| self.board.get(&c.id).cloned())
            .collect();
        self.publish_if(report.changed(), arrived);
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Speculate { call, ack } => {
                let existing = self.outstanding(&call);
                if existing.is_none() {
                    let id = call.id.clone();
                    let outcome = self.board.merge_provisional(call);
                    let arrived = self.arrival(outcome, &id);
                    self.publish_if(outcome.changed(), arrived);
                }
                drop(ack.send(existing));
            },
            Command::Settle { id } => self.board.settle(&id),
            Command::Forget { id, ack } => {
                let removed = self.board.forget(&id);
                self.publish_if(removed, Vec::new());
                drop(ack.send(removed));
            },
        }
    }

    fn outstanding(&self, call: &Call) -> Option<Call> {
        let same_type = |c: &&Call| c.call_type == call.call_type;
        self.board
            .calls_for_table(&call.table_number)
            .into_iter()
            .find(same_type)
            .cloned()
    }

    fn publish_if(&mut self, changed: bool, arrived: Vec<Call>) {
        if !changed {
            return;
        }
        self.revision += 1;
        self.state.send_replace(BoardChange {
            revision: self.revision,
            board: Arc::new(self.board.clone()),
            arrived,
        });
    }
}

/// Newest active call of `call_type` on the board's scoped table.
pub(crate) fn active_of_type(board: &CallBoard, call_type: CallType) -> Option<Call> {
    let table = board.scope()?;
    board.calls_for_table(table).into_iter().find(|c| c.call_type == call_type).cloned()
}
