//! Defines data structures for the application.
//!
//! Includes structs for:
//! - Collecting raw prompt answers (`ProvisionRequest`).
//! - The validated provisioning parameters (`ProvisionConfig`).
//! - Input normalization rules (band size, destination, affirmative answers).

mod provision;

pub use provision::*;
