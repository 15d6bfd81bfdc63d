//! Monotonic merge of call records arriving from unordered transports.
//!
//! A [`CallBoard`] is the materialized "which tables have active calls" picture
//! held by a client view. Every input (baseline fetch, broadcast event,
//! change-feed event, reconciliation snapshot) goes through the same rules:
//!
//! - records are keyed by [`CallId`]; a second sighting of an id is a merge,
//!   never a new entry
//! - status only moves forward; an earlier status is discarded
//! - `done` ids are kept as tombstones so late duplicates cannot revive them
//!
//! The board does no I/O and can be fed in any interleaving.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::call::{Call, CallId, CallStatus, TableNumber};
use crate::event::{BroadcastEvent, ChangeEvent, Transition};

/// What a single merge step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A previously unknown active call was added.
    Inserted,
    /// A known call moved forward but is still active.
    Advanced,
    /// A known call reached `done` and left the active set.
    Retired,
    /// Duplicate signal for state already held.
    Unchanged,
    /// Out-of-order signal older than the held state.
    Stale,
    /// Not relevant to this board (unknown id, other table).
    Ignored,
}

impl MergeOutcome {
    #[must_use]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Inserted | Self::Advanced | Self::Retired)
    }
}

/// Counts produced by [`CallBoard::reconcile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub inserted: usize,
    pub advanced: usize,
    pub removed: usize,
}

impl ReconcileReport {
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.inserted > 0 || self.advanced > 0 || self.removed > 0
    }
}

/// Per-table grouping shown on a staff display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub table_number: TableNumber,
    /// Active call with the greatest `createdAt` (ties broken by id).
    pub latest: Call,
    /// Number of active calls for the table.
    pub count: usize,
    /// Most advanced status among the table's active calls.
    pub status: CallStatus,
}

/// Materialized active-call state for one client view.
#[derive(Debug, Clone, Default)]
pub struct CallBoard {
    active: HashMap<CallId, Call>,
    /// Tombstones of `done` calls. The flag records whether the tombstone has
    /// already survived one reconciliation round.
    retired: HashMap<CallId, bool>,
    /// Locally created entries the durable store may not know yet. The flag
    /// records whether their submission finished.
    provisional: HashMap<CallId, bool>,
    scope: Option<TableNumber>,
}

/// Stable display order: newest first, then by id.
fn newest_first(a: &Call, b: &Call) -> Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
}

impl CallBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A board that only tracks calls for `table`.
    #[must_use]
    pub fn scoped(table: TableNumber) -> Self {
        Self { scope: Some(table), ..Self::default() }
    }

    #[must_use]
    pub const fn scope(&self) -> Option<&TableNumber> {
        self.scope.as_ref()
    }

    fn in_scope(&self, table: &TableNumber) -> bool {
        self.scope.as_ref().is_none_or(|scope| scope == table)
    }

    fn retire(&mut self, id: CallId) {
        self.provisional.remove(&id);
        self.retired.entry(id).or_insert(false);
    }

    /// Insert a locally created call that reconciliation must not drop
    /// while its submission is still running.
    pub fn merge_provisional(&mut self, call: Call) -> MergeOutcome {
        let id = call.id.clone();
        let outcome = self.merge_record(call);
        if outcome == MergeOutcome::Inserted {
            self.provisional.insert(id, false);
        }
        outcome
    }

    /// The submission of a provisional entry finished. It is protected for
    /// one more reconciliation round, then treated like any other entry.
    pub fn settle(&mut self, id: &CallId) {
        if let Some(submitted) = self.provisional.get_mut(id) {
            *submitted = true;
        }
    }

    #[must_use]
    pub fn is_provisional(&self, id: &CallId) -> bool {
        self.provisional.contains_key(id)
    }

    /// Merge a full record regardless of which transport delivered it.
    pub fn merge_record(&mut self, call: Call) -> MergeOutcome {
        if !self.in_scope(&call.table_number) {
            return MergeOutcome::Ignored;
        }
        if self.retired.contains_key(&call.id) {
            return if call.status.is_active() {
                MergeOutcome::Stale
            } else {
                MergeOutcome::Unchanged
            };
        }
        if !call.status.is_active() {
            let was_active = self.active.remove(&call.id).is_some();
            self.retire(call.id);
            return if was_active { MergeOutcome::Retired } else { MergeOutcome::Unchanged };
        }
        match self.active.get_mut(&call.id) {
            None => {
                self.active.insert(call.id.clone(), call);
                MergeOutcome::Inserted
            },
            Some(held) => match call.status.cmp(&held.status) {
                Ordering::Greater => {
                    held.status = call.status;
                    MergeOutcome::Advanced
                },
                Ordering::Equal => MergeOutcome::Unchanged,
                Ordering::Less => MergeOutcome::Stale,
            },
        }
    }

    /// Apply a status transition known only by id.
    pub fn advance(&mut self, id: &CallId, status: CallStatus) -> MergeOutcome {
        if self.retired.contains_key(id) {
            return if status.is_active() { MergeOutcome::Stale } else { MergeOutcome::Unchanged };
        }
        let Some(held) = self.active.get_mut(id) else {
            // Resolved before we ever saw it: remember so a late `new-call` stays dead.
            if !status.is_active() {
                self.retire(id.clone());
            }
            return MergeOutcome::Ignored;
        };
        match status.cmp(&held.status) {
            Ordering::Less => MergeOutcome::Stale,
            Ordering::Equal => MergeOutcome::Unchanged,
            Ordering::Greater if status.is_active() => {
                held.status = status;
                MergeOutcome::Advanced
            },
            Ordering::Greater => {
                self.active.remove(id);
                self.retire(id.clone());
                MergeOutcome::Retired
            },
        }
    }

    /// Apply an event from the broadcast channel.
    pub fn apply_broadcast(&mut self, event: &BroadcastEvent) -> MergeOutcome {
        match event {
            BroadcastEvent::NewCall(call) => {
                if self.active.contains_key(&call.id) || self.retired.contains_key(&call.id) {
                    return MergeOutcome::Unchanged;
                }
                self.merge_record(call.clone().with_status(CallStatus::Pending))
            },
            BroadcastEvent::StatusChanged(change) => self.advance(&change.id, change.status()),
        }
    }

    /// Apply an event from the durable store's change feed.
    pub fn apply_change(&mut self, event: &ChangeEvent) -> MergeOutcome {
        match event.transition {
            Transition::Appear | Transition::Update => {
                self.provisional.remove(&event.call.id);
                self.merge_record(event.call.clone())
            },
            Transition::Disappear => {
                if !self.in_scope(&event.call.table_number) {
                    return MergeOutcome::Ignored;
                }
                let was_active = self.active.remove(&event.call.id).is_some();
                self.retire(event.call.id.clone());
                if was_active { MergeOutcome::Retired } else { MergeOutcome::Unchanged }
            },
        }
    }

    /// Seed the board from the initial non-`done` snapshot.
    pub fn load_baseline(&mut self, calls: impl IntoIterator<Item = Call>) -> usize {
        calls.into_iter().map(|call| self.merge_record(call)).filter(|o| o.changed()).count()
    }

    /// Reconcile against a fresh non-`done` snapshot from the durable store.
    ///
    /// Locally active ids missing from the snapshot are dropped unless still
    /// provisional; snapshot ids missing locally are inserted. Tombstones older
    /// than one round are swept.
    pub fn reconcile(&mut self, snapshot: &[Call]) -> ReconcileReport {
        self.retired.retain(|_, swept| !*swept);
        self.retired.values_mut().for_each(|swept| *swept = true);

        let live: HashSet<&CallId> = snapshot
            .iter()
            .filter(|call| self.in_scope(&call.table_number) && call.status.is_active())
            .map(|call| &call.id)
            .collect();
        let before = self.active.len();
        self.active.retain(|id, _| live.contains(id) || self.provisional.contains_key(id));
        self.provisional.retain(|id, submitted| !live.contains(id) && !*submitted);
        let mut report =
            ReconcileReport { removed: before - self.active.len(), ..Default::default() };

        for call in snapshot {
            match self.merge_record(call.clone()) {
                MergeOutcome::Inserted => report.inserted += 1,
                MergeOutcome::Advanced => report.advanced += 1,
                MergeOutcome::Retired => report.removed += 1,
                _ => {},
            }
        }
        report
    }

    /// Drop a record without leaving a tombstone (used to roll back a
    /// speculative entry whose creation failed).
    pub fn forget(&mut self, id: &CallId) -> bool {
        self.provisional.remove(id);
        self.active.remove(id).is_some()
    }

    #[must_use]
    pub fn get(&self, id: &CallId) -> Option<&Call> {
        self.active.get(id)
    }

    #[must_use]
    pub fn is_retired(&self, id: &CallId) -> bool {
        self.retired.contains_key(id)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Active calls for `table`, newest first.
    #[must_use]
    pub fn calls_for_table(&self, table: &TableNumber) -> Vec<&Call> {
        let mut calls: Vec<&Call> =
            self.active.values().filter(|c| &c.table_number == table).collect();
        calls.sort_by(|a, b| newest_first(a, b));
        calls
    }

    /// Ids currently attributed to `table`; resolving a table resolves all of them.
    #[must_use]
    pub fn ids_for_table(&self, table: &TableNumber) -> Vec<CallId> {
        self.calls_for_table(table).into_iter().map(|c| c.id.clone()).collect()
    }

    #[must_use]
    pub fn table(&self, table: &TableNumber) -> Option<TableSummary> {
        let calls = self.calls_for_table(table);
        let latest = (*calls.first()?).clone();
        let status = calls.iter().map(|c| c.status).max().unwrap_or_default();
        Some(TableSummary { table_number: table.clone(), latest, count: calls.len(), status })
    }

    /// All tables with active calls, most recent activity first.
    #[must_use]
    pub fn tables(&self) -> Vec<TableSummary> {
        let mut groups: HashMap<&TableNumber, TableSummary> = HashMap::new();
        for call in self.active.values() {
            groups
                .entry(&call.table_number)
                .and_modify(|group| {
                    group.count += 1;
                    group.status = group.status.max(call.status);
                    if newest_first(call, &group.latest) == Ordering::Less {
                        group.latest = call.clone();
                    }
                })
                .or_insert_with(|| TableSummary {
                    table_number: call.table_number.clone(),
                    latest: call.clone(),
                    count: 1,
                    status: call.status,
                });
        }
        let mut tables: Vec<TableSummary> = groups.into_values().collect();
        tables.sort_by(|a, b| newest_first(&a.latest, &b.latest));
        tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::CallType;
    use crate::event::StatusChange;
    use chrono::{DateTime, Duration, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_767_000_000 + secs, 0).unwrap()
    }

    fn call(id: &str, table: &str, secs: i64) -> Call {
        Call::pending(id.into(), table.into(), CallType::Waiter, at(secs))
    }

    #[test]
    fn duplicate_new_call_is_idempotent() {
        let mut board = CallBoard::new();
        let event = BroadcastEvent::new_call(&call("A", "5", 0));
        assert_eq!(board.apply_broadcast(&event), MergeOutcome::Inserted);
        assert_eq!(board.apply_broadcast(&event), MergeOutcome::Unchanged);
        assert_eq!(board.active_count(), 1);
    }

    #[test]
    fn late_pending_after_done_is_discarded() {
        let mut board = CallBoard::new();
        board.apply_broadcast(&BroadcastEvent::new_call(&call("A", "5", 0)));
        let done = BroadcastEvent::status_changed("A".into(), CallStatus::Done);
        assert_eq!(board.apply_broadcast(&done), MergeOutcome::Retired);
        let late = BroadcastEvent::status_changed("A".into(), CallStatus::Pending);
        assert_eq!(board.apply_broadcast(&late), MergeOutcome::Stale);
        assert!(board.get(&"A".into()).is_none());
        assert!(board.is_retired(&"A".into()));
    }

    #[test]
    fn late_new_call_does_not_revive_resolved_call() {
        let mut board = CallBoard::new();
        let resolved = BroadcastEvent::StatusChanged(StatusChange { id: "A".into(), status: None });
        assert_eq!(board.apply_broadcast(&resolved), MergeOutcome::Ignored);
        assert_eq!(
            board.apply_broadcast(&BroadcastEvent::new_call(&call("A", "5", 0))),
            MergeOutcome::Unchanged
        );
        assert!(board.is_empty());
    }

    #[test]
    fn processing_then_stale_pending_keeps_processing() {
        let mut board = CallBoard::new();
        board.merge_record(call("A", "5", 0));
        assert_eq!(board.advance(&"A".into(), CallStatus::Processing), MergeOutcome::Advanced);
        let stale = ChangeEvent::new(Transition::Update, call("A", "5", 0));
        assert_eq!(board.apply_change(&stale), MergeOutcome::Stale);
        assert_eq!(board.get(&"A".into()).unwrap().status, CallStatus::Processing);
    }

    #[test]
    fn grouping_reports_count_and_latest() {
        let mut board = CallBoard::new();
        board.merge_record(call("A", "5", 0));
        board.merge_record(call("B", "5", 30));
        board.merge_record(call("C", "7", 10));

        let five = board.table(&"5".into()).unwrap();
        assert_eq!(five.count, 2);
        assert_eq!(five.latest.id.as_str(), "B");

        let order: Vec<String> =
            board.tables().iter().map(|t| t.table_number.to_string()).collect();
        assert_eq!(order, vec!["5", "7"]);
    }

    #[test]
    fn identical_created_at_breaks_ties_by_id() {
        let mut board = CallBoard::new();
        board.merge_record(call("b-2", "3", 0));
        board.merge_record(call("b-1", "3", 0));
        for _ in 0..5 {
            assert_eq!(board.table(&"3".into()).unwrap().latest.id.as_str(), "b-2");
            assert_eq!(board.tables()[0].latest.id.as_str(), "b-2");
        }
    }

    #[test]
    fn resolving_every_id_of_a_table_empties_it() {
        let mut board = CallBoard::new();
        board.merge_record(call("A", "5", 0));
        board.merge_record(call("B", "5", 1));
        let ids = board.ids_for_table(&"5".into());
        assert_eq!(ids.len(), 2);
        for id in &ids {
            board.advance(id, CallStatus::Done);
        }
        assert!(board.table(&"5".into()).is_none());
        assert!(board.tables().is_empty());
    }

    #[test]
    fn change_feed_then_broadcast_is_represented_once() {
        let mut board = CallBoard::new();
        let record = call("A", "9", 0);
        board.apply_change(&ChangeEvent::new(Transition::Appear, record.clone()));
        assert_eq!(
            board.apply_broadcast(&BroadcastEvent::new_call(&record)),
            MergeOutcome::Unchanged
        );
        assert_eq!(board.table(&"9".into()).unwrap().count, 1);
    }

    #[test]
    fn disappear_retires_call() {
        let mut board = CallBoard::new();
        let record = call("A", "9", 0);
        board.merge_record(record.clone());
        let outcome = board.apply_change(&ChangeEvent::new(Transition::Disappear, record.clone()));
        assert_eq!(outcome, MergeOutcome::Retired);
        let revived = ChangeEvent::new(Transition::Appear, record);
        assert_eq!(board.apply_change(&revived), MergeOutcome::Stale);
    }

    #[test]
    fn reconcile_inserts_missing_and_drops_vanished() {
        let mut board = CallBoard::new();
        board.merge_record(call("gone", "1", 0));
        board.merge_record(call("kept", "2", 0));
        let snapshot = vec![call("kept", "2", 0), call("missed", "3", 5)];

        let report = board.reconcile(&snapshot);
        assert_eq!(report, ReconcileReport { inserted: 1, advanced: 0, removed: 1 });
        assert!(board.get(&"gone".into()).is_none());
        assert!(board.get(&"missed".into()).is_some());
    }

    #[test]
    fn reconcile_never_moves_status_backwards() {
        let mut board = CallBoard::new();
        board.merge_record(call("A", "1", 0).with_status(CallStatus::Processing));
        let report = board.reconcile(&[call("A", "1", 0)]);
        assert!(!report.changed());
        assert_eq!(board.get(&"A".into()).unwrap().status, CallStatus::Processing);
    }

    #[test]
    fn tombstones_survive_one_round_then_sweep() {
        let mut board = CallBoard::new();
        board.merge_record(call("A", "1", 0));
        board.advance(&"A".into(), CallStatus::Done);

        // Durable write of `done` still in flight: snapshot lists it as pending.
        board.reconcile(&[call("A", "1", 0)]);
        assert!(board.get(&"A".into()).is_none());
        assert!(board.is_retired(&"A".into()));

        board.reconcile(&[]);
        assert!(!board.is_retired(&"A".into()));
    }

    #[test]
    fn scoped_board_ignores_other_tables() {
        let mut board = CallBoard::scoped("4".into());
        assert_eq!(board.merge_record(call("X", "8", 0)), MergeOutcome::Ignored);
        assert_eq!(board.merge_record(call("Y", "4", 0)), MergeOutcome::Inserted);
        let report = board.reconcile(&[call("X", "8", 0), call("Y", "4", 0)]);
        assert!(!report.changed());
        assert_eq!(board.active_count(), 1);
    }

    #[test]
    fn forget_leaves_no_tombstone() {
        let mut board = CallBoard::new();
        board.merge_record(call("tentative", "2", 0));
        assert!(board.forget(&"tentative".into()));
        assert!(!board.is_retired(&"tentative".into()));
        assert_eq!(board.merge_record(call("tentative", "2", 0)), MergeOutcome::Inserted);
    }

    #[test]
    fn provisional_entry_survives_reconcile_until_settled() {
        let mut board = CallBoard::scoped("2".into());
        board.merge_provisional(call("tentative", "2", 0));

        board.reconcile(&[]);
        assert!(board.get(&"tentative".into()).is_some());

        board.settle(&"tentative".into());
        board.reconcile(&[]);
        assert!(board.get(&"tentative".into()).is_some());
        assert!(!board.is_provisional(&"tentative".into()));

        board.reconcile(&[]);
        assert!(board.get(&"tentative".into()).is_none());
    }

    #[test]
    fn snapshot_confirms_provisional_entry() {
        let mut board = CallBoard::new();
        board.merge_provisional(call("tentative", "2", 0));
        board.reconcile(&[call("tentative", "2", 0)]);
        assert!(!board.is_provisional(&"tentative".into()));
        assert!(board.get(&"tentative".into()).is_some());
    }

    #[test]
    fn resolving_provisional_entry_clears_it() {
        let mut board = CallBoard::new();
        board.merge_provisional(call("tentative", "2", 0));
        board.advance(&"tentative".into(), CallStatus::Done);
        assert!(!board.is_provisional(&"tentative".into()));
        assert!(board.is_retired(&"tentative".into()));
    }

    #[test]
    fn table_status_is_most_advanced() {
        let mut board = CallBoard::new();
        board.merge_record(call("A", "6", 0));
        board.merge_record(call("B", "6", 0).with_status(CallStatus::Processing));
        let later = Call { created_at: at(0) + Duration::seconds(1), ..call("C", "6", 0) };
        board.merge_record(later);
        let summary = board.table(&"6".into()).unwrap();
        assert_eq!(summary.status, CallStatus::Processing);
        assert_eq!(summary.latest.id.as_str(), "C");
    }
}
