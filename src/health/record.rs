// Repository record.
// Raw fetched state and computed verdicts for one repository.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::github::{Branch, BranchProtection, Permissions, Repository};

use super::check::{CheckKey, TrackedBranch, Verdict};
use super::policy::{RepoKind, RequiredTeam};

/// Release history known for a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub has_release: bool,
    pub last_release: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct RepoRecord {
    pub name: String,
    kind: RepoKind,
    /// Full repository metadata.
    pub repo: Option<Repository>,
    pub branches: Option<Vec<Branch>>,
    /// Protection per branch. A missing entry means the fetch failed;
    /// `None` means the branch is not protected.
    pub protection: BTreeMap<TrackedBranch, Option<BranchProtection>>,
    /// Public HTML page, for the social preview check.
    pub webpage: Option<String>,
    pub teams: BTreeMap<RequiredTeam, Permissions>,
    /// Pipelines only; filled from the pipeline directory.
    pub release: Option<ReleaseInfo>,
    pub verdicts: BTreeMap<CheckKey, Verdict>,
}

impl RepoRecord {
    pub fn new(name: impl Into<String>, kind: RepoKind) -> Self {
        Self {
            name: name.into(),
            kind,
            repo: None,
            branches: None,
            protection: BTreeMap::new(),
            webpage: None,
            teams: BTreeMap::new(),
            release: None,
            verdicts: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> RepoKind {
        self.kind
    }

    pub fn is_archived(&self) -> bool {
        self.repo.as_ref().is_some_and(|r| r.archived)
    }

    /// Verdict for a key; `Unknown` until evaluated.
    pub fn verdict(&self, key: CheckKey) -> Verdict {
        self.verdicts.get(&key).cloned().unwrap_or_default()
    }

    /// `master`, or `dev` for a pipeline that has never been released.
    pub fn expected_default_branch(&self) -> &'static str {
        match (&self.kind, &self.release) {
            (RepoKind::Pipeline, Some(release)) if !release.has_release => {
                TrackedBranch::Dev.as_str()
            }
            _ => TrackedBranch::Master.as_str(),
        }
    }

    pub fn expected_homepage(&self) -> String {
        self.kind.homepage(&self.name)
    }

    /// Whether a branch exists (case-insensitive); `None` if the list was not fetched.
    pub fn has_branch(&self, name: &str) -> Option<bool> {
        self.branches
            .as_ref()
            .map(|branches| branches.iter().any(|b| b.name.eq_ignore_ascii_case(name)))
    }

    /// Topics currently set, empty if unknown.
    pub fn topics(&self) -> &[String] {
        self.repo
            .as_ref()
            .and_then(|r| r.topics.as_deref())
            .unwrap_or(&[])
    }
}
