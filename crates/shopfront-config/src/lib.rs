//! # Shopfront Config
//!
//! Configuration management for Shopfront.
//! Layered loading from files and environment variables, validated once at
//! process start.

mod app_config;
mod loader;
mod validation;

pub use app_config::*;
pub use loader::*;
pub use validation::*;
