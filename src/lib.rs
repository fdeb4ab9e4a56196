pub mod cmd;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod infra;
pub mod logging;
pub mod services;
pub mod workflow;

pub use domain::derivation::{classify_urgency, derive, lookup_rule};
pub use domain::{CategoryRule, DerivationEngine, DerivationResult, UrgencyLevel};
pub use error::{AppError, AppResult};
