//! Core types, configuration, and errors for Ferry.
//!
//! This crate provides the building blocks shared by the envelope models,
//! the protocol-adaptation layer, and the runtime dispatcher: the process
//! configuration, the single error type, and the small discriminant enums
//! (payload version, API type, runtime mode) that every layer agrees on.

pub mod config;
mod error;
mod types;

pub use config::FerryConfig;
pub use error::{FerryError, FerryResult};
pub use types::{ApiType, PayloadVersion, RuntimeMode};
