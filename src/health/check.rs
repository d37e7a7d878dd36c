// Check keys and verdicts.
// Every compliance check is an enumerated key; results are four-state verdicts.

use std::fmt;

/// Branches whose existence or protection is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrackedBranch {
    Master,
    Dev,
    Template,
}

impl TrackedBranch {
    /// Display order in the report.
    pub const ALL: [TrackedBranch; 3] = [
        TrackedBranch::Master,
        TrackedBranch::Dev,
        TrackedBranch::Template,
    ];

    /// Lower-case branch name as used in API paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedBranch::Master => "master",
            TrackedBranch::Dev => "dev",
            TrackedBranch::Template => "template",
        }
    }

    /// How the branch is spelled in column headings.
    pub fn label(&self) -> &'static str {
        match self {
            TrackedBranch::Template => "TEMPLATE",
            other => other.as_str(),
        }
    }

    /// Approving reviews a protected branch must require.
    pub fn required_reviews(&self) -> u32 {
        match self {
            TrackedBranch::Master => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for TrackedBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The six sub-checks applied to each protected branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtectionRule {
    StrictUpdates,
    RequiredCi,
    StaleReviews,
    CodeOwnerReviews,
    ReviewCount,
    EnforceAdmins,
}

impl ProtectionRule {
    pub const ALL: [ProtectionRule; 6] = [
        ProtectionRule::StrictUpdates,
        ProtectionRule::RequiredCi,
        ProtectionRule::StaleReviews,
        ProtectionRule::CodeOwnerReviews,
        ProtectionRule::ReviewCount,
        ProtectionRule::EnforceAdmins,
    ];
}

/// Identifies one check against one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CheckKey {
    HasRelease,
    ReleasedAfterTools,
    Wikis,
    Issues,
    MergeCommits,
    RebaseMerge,
    SquashMerge,
    DefaultBranch,
    Topics,
    Description,
    Homepage,
    SocialPreview,
    TeamAll,
    TeamCore,
    BranchExists(TrackedBranch),
    Protection(TrackedBranch, ProtectionRule),
}

impl CheckKey {
    /// Repository-level checks shared by every kind, in column order.
    pub const BASE: [CheckKey; 12] = [
        CheckKey::Wikis,
        CheckKey::Issues,
        CheckKey::MergeCommits,
        CheckKey::RebaseMerge,
        CheckKey::SquashMerge,
        CheckKey::DefaultBranch,
        CheckKey::Topics,
        CheckKey::Description,
        CheckKey::Homepage,
        CheckKey::SocialPreview,
        CheckKey::TeamAll,
        CheckKey::TeamCore,
    ];

    /// Short column heading.
    pub fn name(&self) -> String {
        match self {
            CheckKey::HasRelease => "Released".into(),
            CheckKey::ReleasedAfterTools => "Released after tools".into(),
            CheckKey::Wikis => "Wikis".into(),
            CheckKey::Issues => "Issues".into(),
            CheckKey::MergeCommits => "Merge commits".into(),
            CheckKey::RebaseMerge => "Rebase merging".into(),
            CheckKey::SquashMerge => "Squash merges".into(),
            CheckKey::DefaultBranch => "Default branch".into(),
            CheckKey::Topics => "Keywords".into(),
            CheckKey::Description => "Description".into(),
            CheckKey::Homepage => "Repo URL".into(),
            CheckKey::SocialPreview => "Social preview".into(),
            CheckKey::TeamAll => "Team all".into(),
            CheckKey::TeamCore => "Team core".into(),
            CheckKey::BranchExists(branch) => format!("{}: exists", branch.label()),
            CheckKey::Protection(branch, rule) => {
                let rule = match rule {
                    ProtectionRule::StrictUpdates => "strict updates".to_string(),
                    ProtectionRule::RequiredCi => "required CI".to_string(),
                    ProtectionRule::StaleReviews => "stale reviews".to_string(),
                    ProtectionRule::CodeOwnerReviews => "code owner reviews".to_string(),
                    ProtectionRule::ReviewCount => match branch.required_reviews() {
                        1 => "1 review".to_string(),
                        n => format!("{} reviews", n),
                    },
                    ProtectionRule::EnforceAdmins => "enforce admins".to_string(),
                };
                format!("{}: {}", branch.label(), rule)
            }
        }
    }

    /// What the check requires, shown as a tooltip.
    pub fn description(&self) -> String {
        match self {
            CheckKey::HasRelease => "Has at least one release".into(),
            CheckKey::ReleasedAfterTools => {
                "Last release is after latest tools release (so up to date with template)".into()
            }
            CheckKey::Wikis => "Disable wikis".into(),
            CheckKey::Issues => "Enable issues".into(),
            CheckKey::MergeCommits => "Allow merge commits".into(),
            CheckKey::RebaseMerge => "Allow rebase merging".into(),
            CheckKey::SquashMerge => "Do not allow squash merges".into(),
            CheckKey::DefaultBranch => {
                "default branch master (released) or dev (no releases)".into()
            }
            CheckKey::Topics => "Minimum keywords set".into(),
            CheckKey::Description => "Description must be set".into(),
            CheckKey::Homepage => "URL should point to the nf-co.re website".into(),
            CheckKey::SocialPreview => "Repo should have a social preview image set".into(),
            CheckKey::TeamAll => "Write access for nf-core/all".into(),
            CheckKey::TeamCore => "Admin access for nf-core/core".into(),
            CheckKey::BranchExists(branch) => {
                format!("{} branch: branch must exist", branch.label())
            }
            CheckKey::Protection(branch, rule) => {
                let rule = match rule {
                    ProtectionRule::StrictUpdates => {
                        "do not require branch to be up to date before merging".to_string()
                    }
                    ProtectionRule::RequiredCi => "minimum set of CI tests must pass".to_string(),
                    ProtectionRule::StaleReviews => {
                        "reviews not marked stale after new commits".to_string()
                    }
                    ProtectionRule::CodeOwnerReviews => {
                        "code owner reviews not required".to_string()
                    }
                    ProtectionRule::ReviewCount => match branch.required_reviews() {
                        1 => "1 review required".to_string(),
                        n => format!("{} reviews required", n),
                    },
                    ProtectionRule::EnforceAdmins => {
                        "do not enforce rules for admins".to_string()
                    }
                };
                format!("{} branch: {}", branch.label(), rule)
            }
        }
    }

    /// Path under the repository's web URL where the setting can be changed.
    pub fn settings_path(&self) -> &'static str {
        match self {
            CheckKey::HasRelease | CheckKey::ReleasedAfterTools => "/releases",
            CheckKey::Wikis
            | CheckKey::Issues
            | CheckKey::MergeCommits
            | CheckKey::RebaseMerge
            | CheckKey::SquashMerge
            | CheckKey::SocialPreview => "/settings",
            CheckKey::DefaultBranch | CheckKey::Protection(..) => "/settings/branches",
            CheckKey::Topics | CheckKey::Description | CheckKey::Homepage => "",
            CheckKey::TeamAll | CheckKey::TeamCore => "/settings/collaboration",
            CheckKey::BranchExists(_) => "/branches",
        }
    }

    /// Column group heading, for checks that share a spanning header.
    pub fn group(&self) -> Option<String> {
        match self {
            CheckKey::TeamAll | CheckKey::TeamCore => Some("Team access".into()),
            CheckKey::BranchExists(_) => Some("Branches exist".into()),
            CheckKey::Protection(branch, _) => Some(format!("Branch protection: {}", branch)),
            _ => None,
        }
    }
}

/// Why a check does not apply to a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// The protected branch does not exist.
    BranchMissing(TrackedBranch),
    /// The pipeline has never been released.
    NoRelease,
    /// The branch that should be default does not exist.
    DefaultBranchMissing(String),
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::BranchMissing(branch) => write!(f, "{} branch does not exist", branch),
            Reason::NoRelease => f.write_str("no release yet"),
            Reason::DefaultBranchMissing(branch) => {
                write!(f, "expected default branch {} does not exist", branch)
            }
        }
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Verdict {
    Pass,
    Fail,
    NotApplicable(Reason),
    /// No data was fetched for this check.
    #[default]
    Unknown,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Verdict::Fail)
    }

    /// Short tag used in terminal output.
    pub fn symbol(&self) -> &'static str {
        match self {
            Verdict::Pass => "ok",
            Verdict::Fail => "FAIL",
            Verdict::NotApplicable(_) => "n/a",
            Verdict::Unknown => "?",
        }
    }
}

impl From<bool> for Verdict {
    fn from(pass: bool) -> Self {
        if pass { Verdict::Pass } else { Verdict::Fail }
    }
}

impl From<Option<bool>> for Verdict {
    fn from(pass: Option<bool>) -> Self {
        pass.map(Verdict::from).unwrap_or(Verdict::Unknown)
    }
}
