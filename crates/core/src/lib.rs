//! Core types for tablecall
//!
//! Domain types, wire events and the monotonic call merge shared by every
//! other crate. Nothing here performs I/O.

mod badge;
mod board;
mod call;
mod config;
mod constants;
mod env_config;
mod error;
mod event;

pub use badge::*;
pub use board::*;
pub use call::*;
pub use config::*;
pub use constants::*;
pub use env_config::*;
pub use error::*;
pub use event::*;
