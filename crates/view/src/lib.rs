//! Client-resident views for tablecall
//!
//! A view owns one [`tablecall_core::CallBoard`] and one event loop that
//! merges the broadcast channel, the durable change feed and a periodic
//! reconciliation pull. [`StaffView`] shows every table; [`DinerTracker`]
//! follows a single table and lets the diner ask for service.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]

mod actions;
mod diner;
mod runtime;
mod staff;

pub use actions::{CallResolver, CallSubmitter, ViewSources};
pub use diner::{DinerCallState, DinerTracker, RequestOutcome};
pub use runtime::BoardChange;
pub use staff::StaffView;
