//! Signbatch Core Library
//!
//! Shared functionality for Signbatch components:
//! - Signing request/outcome data model and fail-fast validation
//! - PFX password handling with redaction
//! - Configuration resolution and hierarchy
//! - Folder scanning for signable binaries
//! - Common error types

pub mod batch;
pub mod config;
pub mod error;
pub mod scan;
pub mod secret;
pub mod tracing_init;

pub use batch::{
    BatchSummary, DigestAlgorithm, SigningOutcome, SigningRequest, ValidationError,
};
pub use config::Config;
pub use error::{Error, Result};
pub use secret::PfxPassword;
