// Repository health checks.
// Records, the check battery, policy tables, fetching, remediation and the audit driver.

pub mod audit;
pub mod check;
pub mod evaluate;
pub mod fetch;
pub mod policy;
pub mod record;
pub mod remediate;

#[cfg(test)]
mod testing;

pub use audit::{Action, AuditReport, Request, Scope, run_audit};
pub use check::{CheckKey, ProtectionRule, Reason, TrackedBranch, Verdict};
pub use evaluate::EvalContext;
pub use fetch::Fetcher;
pub use policy::{RepoKind, RequiredTeam};
pub use record::RepoRecord;
