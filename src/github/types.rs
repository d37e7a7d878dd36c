// GitHub API request and response types.
// Only the fields the audit reads or writes are modelled; the rest are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GitHub repository metadata.
/// Settings fields are optional because team listings return a reduced shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub archived: bool,
    pub has_wiki: Option<bool>,
    pub has_issues: Option<bool>,
    pub allow_merge_commit: Option<bool>,
    pub allow_rebase_merge: Option<bool>,
    pub allow_squash_merge: Option<bool>,
    pub default_branch: Option<String>,
    pub topics: Option<Vec<String>>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    /// Present on team repository listings: the team's access level.
    pub permissions: Option<Permissions>,
}

/// Permission flags a team or user holds on a repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub push: bool,
    #[serde(default)]
    pub pull: bool,
}

/// Entry in a repository's branch list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    #[serde(default)]
    pub protected: bool,
}

/// Branch protection document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchProtection {
    pub required_status_checks: Option<RequiredStatusChecks>,
    pub required_pull_request_reviews: Option<RequiredReviews>,
    pub enforce_admins: Option<EnforceAdmins>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredStatusChecks {
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub contexts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredReviews {
    #[serde(default)]
    pub dismiss_stale_reviews: bool,
    #[serde(default)]
    pub require_code_owner_reviews: bool,
    #[serde(default)]
    pub required_approving_review_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforceAdmins {
    pub enabled: bool,
}

/// Organization team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: u64,
    pub slug: String,
    #[serde(default)]
    pub name: String,
}

/// Published release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Topic list, as returned by and sent to the topics endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topics {
    pub names: Vec<String>,
}

/// Repository settings patch. Only populated fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepoSettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_wiki: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_issues: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_merge_commit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_rebase_merge: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_squash_merge: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

impl RepoSettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Team access level written to a team's repository mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamPermission {
    Pull,
    Push,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TeamPermissionUpdate {
    pub permission: TeamPermission,
}

/// Full protection document written by the protection endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectionUpdate {
    pub enforce_admins: bool,
    pub required_status_checks: RequiredStatusChecks,
    pub required_pull_request_reviews: RequiredReviews,
    /// Always null: no push restrictions.
    pub restrictions: Option<()>,
}
