//! Test harness for garment customizer sessions.
//!
//! Drives a real `CustomizerSession` through the JSON message path and checks
//! the scene after every step.
//!
//! # Key Components
//!
//! - [`SessionDriver`]: Fluent API for scripting storefront interactions
//! - [`report`]: Structured text description of the session's scene
//! - [`helpers`]: Garment and logo fixtures, error type
//! - [`assertions`]: Assertion helpers with diagnostics

pub mod assertions;
pub mod helpers;
pub mod report;
pub mod workflow;

pub use helpers::HarnessError;
pub use report::SessionReport;
pub use workflow::SessionDriver;
