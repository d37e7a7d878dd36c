// Organization policy tables.
// Kind-specific rule sets, required teams and CI contexts, selected by lookup.

use crate::github::{Permissions, TeamPermission};

use super::check::{CheckKey, ProtectionRule, TrackedBranch};

/// Status check contexts every protected branch must require.
pub const REQUIRED_CONTEXTS: [&str; 4] = ["Markdown", "YAML", "nf-core", "Run workflow tests"];

/// Legacy contexts that must no longer be required.
pub const DENIED_CONTEXTS: [&str; 2] = ["continuous-integration/travis-ci", "test"];

/// Host prefix of images GitHub generates for uploaded social previews.
pub const SOCIAL_PREVIEW_PREFIX: &str = "https://repository-images.githubusercontent.com";

const WEBSITE: &str = "https://nf-co.re";

/// Repository that publishes the tooling every pipeline is compared against.
pub const TOOLS_REPO: &str = "tools";

/// Whether a repository is a pipeline or a core tool. Fixed at record creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoKind {
    Pipeline,
    CoreTool,
}

/// Rules that differ between kinds.
#[derive(Debug)]
pub struct KindProfile {
    pub tracked_branches: &'static [TrackedBranch],
    /// In the order fixes are applied.
    pub protected_branches: &'static [TrackedBranch],
    pub required_topics: &'static [&'static str],
    pub release_checks: bool,
}

static PIPELINE: KindProfile = KindProfile {
    tracked_branches: &[
        TrackedBranch::Template,
        TrackedBranch::Dev,
        TrackedBranch::Master,
    ],
    protected_branches: &[TrackedBranch::Dev, TrackedBranch::Master],
    required_topics: &["nf-core", "nextflow", "workflow", "pipeline"],
    release_checks: true,
};

static CORE_TOOL: KindProfile = KindProfile {
    tracked_branches: &[TrackedBranch::Master],
    protected_branches: &[],
    required_topics: &["nf-core"],
    release_checks: false,
};

impl RepoKind {
    pub fn profile(self) -> &'static KindProfile {
        match self {
            RepoKind::Pipeline => &PIPELINE,
            RepoKind::CoreTool => &CORE_TOOL,
        }
    }

    /// Canonical homepage for a repository of this kind.
    pub fn homepage(self, name: &str) -> String {
        match self {
            RepoKind::Pipeline => format!("{}/{}", WEBSITE, name),
            RepoKind::CoreTool => WEBSITE.to_string(),
        }
    }

    /// Every check that applies to this kind, in report column order.
    pub fn check_keys(self) -> Vec<CheckKey> {
        let profile = self.profile();
        let mut keys = Vec::new();

        if profile.release_checks {
            keys.push(CheckKey::HasRelease);
            keys.push(CheckKey::ReleasedAfterTools);
        }
        keys.extend(CheckKey::BASE);
        keys.extend(
            TrackedBranch::ALL
                .into_iter()
                .filter(|b| profile.tracked_branches.contains(b))
                .map(CheckKey::BranchExists),
        );
        for branch in TrackedBranch::ALL
            .into_iter()
            .filter(|b| profile.protected_branches.contains(b))
        {
            keys.extend(
                ProtectionRule::ALL
                    .into_iter()
                    .map(|rule| CheckKey::Protection(branch, rule)),
            );
        }

        keys
    }
}

/// Organization teams that must hold a given level of access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequiredTeam {
    All,
    Core,
}

impl RequiredTeam {
    pub const ALL: [RequiredTeam; 2] = [RequiredTeam::All, RequiredTeam::Core];

    pub fn slug(&self) -> &'static str {
        match self {
            RequiredTeam::All => "all",
            RequiredTeam::Core => "core",
        }
    }

    pub fn permission(&self) -> TeamPermission {
        match self {
            RequiredTeam::All => TeamPermission::Push,
            RequiredTeam::Core => TeamPermission::Admin,
        }
    }

    /// Whether the recorded flags satisfy the required level.
    pub fn is_satisfied_by(&self, permissions: &Permissions) -> bool {
        match self.permission() {
            TeamPermission::Admin => permissions.admin,
            TeamPermission::Push => permissions.push,
            TeamPermission::Pull => permissions.pull,
        }
    }

    pub fn check_key(&self) -> CheckKey {
        match self {
            RequiredTeam::All => CheckKey::TeamAll,
            RequiredTeam::Core => CheckKey::TeamCore,
        }
    }
}
