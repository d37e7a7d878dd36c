// repo-health library.
// Audits an organization's GitHub repositories against a fixed policy and fixes what fails.

pub mod cache;
pub mod config;
pub mod directory;
pub mod error;
pub mod github;
pub mod health;
pub mod report;

pub use error::{HealthError, Result};
