//! Service layer for tablecall
//!
//! The two gateways that write calls: ingest (diner requests) and resolution
//! (staff actions). Both propagate every change over the broadcast channel and
//! the durable store, and fail only when both transports failed.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]

pub mod error;
mod in_flight;
mod ingest_service;
mod resolution_service;
#[cfg(test)]
mod tests;

pub use error::ServiceError;
pub use in_flight::InFlightWrites;
pub use ingest_service::{CallRequest, IngestService};
pub use resolution_service::{ResolutionService, ResolveOutcome, parse_target_status};
