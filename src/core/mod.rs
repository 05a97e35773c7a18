//! Core types for the permission broker
//!
//! This module provides the fundamental types used throughout the crate:
//! - `ActionRequest` / `ActionPayload` - actions proposed by the agent loop
//! - `ActionOutcome` / `ExecutionResult` - what the agent loop gets back
//! - `BrokerError` - error taxonomy

pub mod error;
pub mod outcome;
pub mod request;

pub use error::{BrokerError, BrokerResult};
pub use outcome::{ActionOutcome, DenyReason, ExecutionResult};
pub use request::{ActionPayload, ActionRequest, MatchStyle, ToolCategory};
