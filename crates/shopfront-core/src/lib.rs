//! # Shopfront Core
//!
//! Core types, identifiers, and error definitions for Shopfront.
//! Every other crate in the workspace builds on the abstractions here.

pub mod error;
pub mod id;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use id::*;
pub use result::*;
pub use telemetry::{init_tracing, LogFormat, LoggingConfig};
