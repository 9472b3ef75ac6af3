//! Pension engine library crate.
//!
//! This crate computes the figures a social-security contribution
//! history yields: unique contributed weeks, the capped weighted wage
//! average over the last 250 weeks and the conservation-of-rights
//! window.  External applications may call [`engine::analyze`]
//! directly or embed the API via [`api::build_router`].

pub mod models;
pub mod error;
pub mod caps;
pub mod config;
pub mod normalizer;
pub mod overlap;
pub mod weeks;
pub mod average;
pub mod conservation;
pub mod engine;
pub mod api;

pub use config::EngineConfig;
pub use engine::{analyze, analyze_batch};
pub use error::{CalcError, ConfigError};
