// Test fixtures and an in-memory OrgApi.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{HealthError, Result};
use crate::github::{
    Branch, BranchProtection, EnforceAdmins, OrgApi, Permissions, ProtectionUpdate, Release,
    RepoSettingsPatch, Repository, RequiredReviews, RequiredStatusChecks, Team, TeamPermission,
    Topics,
};

use super::check::TrackedBranch;
use super::evaluate::EvalContext;
use super::policy::{REQUIRED_CONTEXTS, RepoKind, RequiredTeam};
use super::record::{ReleaseInfo, RepoRecord};

pub const UPLOADED_PREVIEW: &str = r#"<html><head><meta name="twitter:image:src" content="https://repository-images.githubusercontent.com/42/preview" /></head></html>"#;

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn date(year: i32, month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).unwrap()
}

/// Context with a tools release in January 2020.
pub fn ctx() -> EvalContext {
    EvalContext {
        tools_last_release: Some(date(2020, 1)),
        ..Default::default()
    }
}

pub fn branch(name: &str) -> Branch {
    Branch {
        name: name.into(),
        protected: true,
    }
}

pub fn good_protection(branch: TrackedBranch) -> BranchProtection {
    BranchProtection {
        required_status_checks: Some(RequiredStatusChecks {
            strict: false,
            contexts: strings(&REQUIRED_CONTEXTS),
        }),
        required_pull_request_reviews: Some(RequiredReviews {
            dismiss_stale_reviews: false,
            require_code_owner_reviews: false,
            required_approving_review_count: branch.required_reviews(),
        }),
        enforce_admins: Some(EnforceAdmins { enabled: false }),
    }
}

pub fn compliant_repo(record: &RepoRecord) -> Repository {
    let topics: &[&str] = record.kind().profile().required_topics;
    Repository {
        name: record.name.clone(),
        archived: false,
        has_wiki: Some(false),
        has_issues: Some(true),
        allow_merge_commit: Some(true),
        allow_rebase_merge: Some(true),
        allow_squash_merge: Some(false),
        default_branch: Some(record.expected_default_branch().to_string()),
        topics: Some(strings(topics)),
        description: Some("A repository".into()),
        homepage: Some(record.expected_homepage()),
        permissions: None,
    }
}

fn full_access() -> [(RequiredTeam, Permissions); 2] {
    [
        (
            RequiredTeam::All,
            Permissions {
                admin: false,
                push: true,
                pull: true,
            },
        ),
        (
            RequiredTeam::Core,
            Permissions {
                admin: true,
                push: true,
                pull: true,
            },
        ),
    ]
}

/// Released pipeline with every check passing against `ctx()`.
pub fn compliant_pipeline(name: &str) -> RepoRecord {
    let mut record = RepoRecord::new(name, RepoKind::Pipeline);
    record.release = Some(ReleaseInfo {
        has_release: true,
        last_release: Some(date(2020, 6)),
    });
    record.repo = Some(compliant_repo(&record));
    record.branches = Some(vec![branch("master"), branch("dev"), branch("TEMPLATE")]);
    for b in [TrackedBranch::Dev, TrackedBranch::Master] {
        record.protection.insert(b, Some(good_protection(b)));
    }
    record.webpage = Some(UPLOADED_PREVIEW.into());
    record.teams.extend(full_access());
    record
}

/// Core tool with every check passing.
pub fn compliant_core_tool(name: &str) -> RepoRecord {
    let mut record = RepoRecord::new(name, RepoKind::CoreTool);
    record.repo = Some(compliant_repo(&record));
    record.branches = Some(vec![branch("master")]);
    record.webpage = Some(UPLOADED_PREVIEW.into());
    record.teams.extend(full_access());
    record
}

/// In-memory organization that applies writes the way GitHub does.
#[derive(Debug, Default)]
pub struct FakeApi {
    pub repos: BTreeMap<String, Repository>,
    pub branches: BTreeMap<String, Vec<Branch>>,
    pub protection: BTreeMap<(String, String), BranchProtection>,
    pub releases: BTreeMap<String, Release>,
    pub webpages: BTreeMap<String, String>,
    pub teams: BTreeMap<String, Team>,
    pub team_repos: BTreeMap<u64, Vec<Repository>>,
    /// Every call as "METHOD target", in order.
    pub calls: Vec<String>,
    /// Reject all writes with HTTP 422.
    pub reject_writes: bool,
}

impl FakeApi {
    pub fn new() -> Self {
        let mut api = Self::default();
        for (id, team) in [(1, RequiredTeam::All), (2, RequiredTeam::Core)] {
            api.teams.insert(
                team.slug().into(),
                Team {
                    id,
                    slug: team.slug().into(),
                    name: team.slug().into(),
                },
            );
            api.team_repos.insert(id, Vec::new());
        }
        api
    }

    /// Seed the server side from a record's raw state.
    pub fn add_record(&mut self, record: &RepoRecord) {
        let name = record.name.clone();
        if let Some(repo) = &record.repo {
            self.repos.insert(name.clone(), repo.clone());
        }
        if let Some(branches) = &record.branches {
            self.branches.insert(name.clone(), branches.clone());
        }
        for (branch, protection) in &record.protection {
            if let Some(protection) = protection {
                self.protection
                    .insert((name.clone(), branch.as_str().into()), protection.clone());
            }
        }
        if let Some(page) = &record.webpage {
            self.webpages.insert(name.clone(), page.clone());
        }
        for (team, permissions) in &record.teams {
            let id = self.teams[team.slug()].id;
            let mut listed = record.repo.clone().unwrap_or_default();
            listed.name = name.clone();
            listed.permissions = Some(*permissions);
            self.team_repos.entry(id).or_default().push(listed);
        }
    }

    pub fn writes(&self) -> Vec<&String> {
        self.calls
            .iter()
            .filter(|c| c.starts_with("PUT") || c.starts_with("PATCH"))
            .collect()
    }

    fn record(&mut self, call: String) -> Result<()> {
        let is_write = !call.starts_with("GET");
        self.calls.push(call.clone());
        if is_write && self.reject_writes {
            return Err(HealthError::Write {
                method: call.split(' ').next().unwrap_or_default().to_string(),
                url: call,
                status: 422,
                payload: "{}".into(),
            });
        }
        Ok(())
    }
}

fn not_found(what: &str) -> HealthError {
    HealthError::NotFound(what.to_string())
}

impl OrgApi for FakeApi {
    fn org(&self) -> &str {
        "nf-core"
    }

    async fn get_repo(&mut self, repo: &str) -> Result<Repository> {
        self.record(format!("GET repo {repo}"))?;
        self.repos.get(repo).cloned().ok_or_else(|| not_found(repo))
    }

    async fn get_branches(&mut self, repo: &str) -> Result<Vec<Branch>> {
        self.record(format!("GET branches {repo}"))?;
        self.branches.get(repo).cloned().ok_or_else(|| not_found(repo))
    }

    async fn get_branch_protection(
        &mut self,
        repo: &str,
        branch: &str,
    ) -> Result<BranchProtection> {
        self.record(format!("GET protection {repo}/{branch}"))?;
        self.protection
            .get(&(repo.to_string(), branch.to_string()))
            .cloned()
            .ok_or_else(|| not_found(branch))
    }

    async fn get_latest_release(&mut self, repo: &str) -> Result<Release> {
        self.record(format!("GET release {repo}"))?;
        self.releases.get(repo).cloned().ok_or_else(|| not_found(repo))
    }

    async fn get_webpage(&mut self, repo: &str) -> Result<String> {
        self.record(format!("GET webpage {repo}"))?;
        self.webpages.get(repo).cloned().ok_or_else(|| not_found(repo))
    }

    async fn get_team(&mut self, slug: &str) -> Result<Team> {
        self.record(format!("GET team {slug}"))?;
        self.teams.get(slug).cloned().ok_or_else(|| not_found(slug))
    }

    async fn get_team_repos(&mut self, team_id: u64) -> Result<Vec<Repository>> {
        self.record(format!("GET team_repos {team_id}"))?;
        self.team_repos
            .get(&team_id)
            .cloned()
            .ok_or_else(|| not_found("team"))
    }

    async fn update_repo(
        &mut self,
        repo: &str,
        patch: &RepoSettingsPatch,
    ) -> Result<Option<Repository>> {
        self.record(format!("PATCH repo {repo}"))?;
        let current = self.repos.get_mut(repo).ok_or_else(|| not_found(repo))?;
        if let Some(v) = patch.has_wiki {
            current.has_wiki = Some(v);
        }
        if let Some(v) = patch.has_issues {
            current.has_issues = Some(v);
        }
        if let Some(v) = patch.allow_merge_commit {
            current.allow_merge_commit = Some(v);
        }
        if let Some(v) = patch.allow_rebase_merge {
            current.allow_rebase_merge = Some(v);
        }
        if let Some(v) = patch.allow_squash_merge {
            current.allow_squash_merge = Some(v);
        }
        if let Some(v) = &patch.default_branch {
            current.default_branch = Some(v.clone());
        }
        if let Some(v) = &patch.homepage {
            current.homepage = Some(v.clone());
        }
        Ok(Some(current.clone()))
    }

    async fn replace_topics(&mut self, repo: &str, topics: &Topics) -> Result<Option<Topics>> {
        self.record(format!("PUT topics {repo}"))?;
        let current = self.repos.get_mut(repo).ok_or_else(|| not_found(repo))?;
        current.topics = Some(topics.names.clone());
        Ok(Some(topics.clone()))
    }

    async fn set_team_permission(
        &mut self,
        team_id: u64,
        repo: &str,
        permission: TeamPermission,
    ) -> Result<()> {
        self.record(format!("PUT team {team_id} {repo}"))?;
        let permissions = Permissions {
            admin: permission == TeamPermission::Admin,
            push: permission != TeamPermission::Pull,
            pull: true,
        };
        let listed = self.team_repos.entry(team_id).or_default();
        match listed.iter_mut().find(|r| r.name == repo) {
            Some(entry) => entry.permissions = Some(permissions),
            None => listed.push(Repository {
                name: repo.to_string(),
                permissions: Some(permissions),
                ..Default::default()
            }),
        }
        Ok(())
    }

    async fn update_branch_protection(
        &mut self,
        repo: &str,
        branch: &str,
        update: &ProtectionUpdate,
    ) -> Result<Option<BranchProtection>> {
        self.record(format!("PUT protection {repo}/{branch}"))?;
        let stored = BranchProtection {
            required_status_checks: Some(update.required_status_checks.clone()),
            required_pull_request_reviews: Some(update.required_pull_request_reviews.clone()),
            enforce_admins: Some(EnforceAdmins {
                enabled: update.enforce_admins,
            }),
        };
        self.protection
            .insert((repo.to_string(), branch.to_string()), stored.clone());
        Ok(Some(stored))
    }
}
