// Audit driver.
// Builds the record set from teams and the pipeline directory, then fetches, evaluates and fixes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::directory::PipelineDirectory;
use crate::error::HealthError;
use crate::github::{OrgApi, Repository};

use super::evaluate::EvalContext;
use super::fetch::Fetcher;
use super::policy::{RepoKind, RequiredTeam, TOOLS_REPO};
use super::record::{ReleaseInfo, RepoRecord};
use super::remediate::{TeamIds, remediate};

/// What to do besides reading the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Action {
    #[default]
    None,
    /// Bypass the cache for the scope.
    Refresh,
    /// Apply fixes to the scope.
    Fix,
}

/// Which repositories an action applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    All,
    Repo(String),
}

impl Scope {
    pub fn includes(&self, name: &str) -> bool {
        match self {
            Scope::All => true,
            Scope::Repo(repo) => repo == name,
        }
    }
}

impl FromStr for Scope {
    type Err = HealthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(HealthError::Config("empty repository scope".into())),
            "all" => Ok(Scope::All),
            name => Ok(Scope::Repo(name.to_string())),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str("all"),
            Scope::Repo(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Request {
    pub action: Action,
    pub scope: Scope,
}

impl Request {
    pub fn refreshes(&self, name: &str) -> bool {
        self.action == Action::Refresh && self.scope.includes(name)
    }

    pub fn fixes(&self, name: &str) -> bool {
        self.action == Action::Fix && self.scope.includes(name)
    }

    /// Org-wide team data is refreshed on any refresh, whatever the scope.
    pub fn refreshes_org_data(&self) -> bool {
        self.action == Action::Refresh
    }
}

/// Everything the report needs.
#[derive(Debug, Default)]
pub struct AuditReport {
    pub org: String,
    /// Sorted by name.
    pub pipelines: Vec<RepoRecord>,
    /// Sorted by name.
    pub core_tools: Vec<RepoRecord>,
    /// Failed fixes, shown to the operator.
    pub errors: Vec<String>,
    /// Number of successful fix writes.
    pub writes: usize,
}

impl AuditReport {
    pub fn records(&self) -> impl Iterator<Item = &RepoRecord> {
        self.pipelines.iter().chain(&self.core_tools)
    }
}

/// Per-run state shared by the phases.
struct Audit<'a, A: OrgApi> {
    fetcher: Fetcher<'a, A>,
    directory: &'a PipelineDirectory,
    request: &'a Request,
    team_ids: TeamIds,
    records: BTreeMap<String, RepoRecord>,
    updated_teams: BTreeSet<RequiredTeam>,
    /// Teams whose listing failed to load in this run.
    missing_teams: BTreeSet<RequiredTeam>,
    errors: Vec<String>,
    writes: usize,
}

/// Run one full audit pass.
pub async fn run_audit<A: OrgApi>(
    api: &mut A,
    cache: &CacheStore,
    directory: &PipelineDirectory,
    request: &Request,
) -> AuditReport {
    let org = api.org().to_string();
    info!(%org, action = ?request.action, scope = %request.scope, "starting audit");

    let mut audit = Audit {
        fetcher: Fetcher::new(api, cache),
        directory,
        request,
        team_ids: TeamIds::new(),
        records: BTreeMap::new(),
        updated_teams: BTreeSet::new(),
        missing_teams: BTreeSet::new(),
        errors: Vec::new(),
        writes: 0,
    };

    for team in RequiredTeam::ALL {
        audit.load_team(team, request.refreshes_org_data()).await;
    }
    audit.add_directory_pipelines();

    let mut ctx = EvalContext {
        missing_teams: audit.missing_teams.clone(),
        ..Default::default()
    };
    audit.process(RepoKind::CoreTool, &ctx).await;
    ctx.tools_last_release = audit.tools_last_release().await;
    audit.process(RepoKind::Pipeline, &ctx).await;

    audit.reload_updated_teams(&mut ctx).await;
    audit.into_report(org)
}

impl<A: OrgApi> Audit<'_, A> {
    /// Load a team and its repository listing, creating records for listed repositories.
    /// A team that fails to load is marked missing so its access checks stay unknown.
    async fn load_team(&mut self, team: RequiredTeam, refresh: bool) -> Option<Vec<Repository>> {
        let Some(found) = self.fetcher.team(team.slug(), refresh).await else {
            self.errors.push(format!("could not load team {}", team.slug()));
            self.missing_teams.insert(team);
            return None;
        };
        self.team_ids.insert(team, found.id);

        let Some(listed) = self.fetcher.team_repos(&found, refresh).await else {
            self.errors.push(format!("could not load repositories of team {}", team.slug()));
            self.missing_teams.insert(team);
            return None;
        };
        self.missing_teams.remove(&team);
        for repo in listed.iter().filter(|r| !r.archived) {
            let kind = if self.directory.is_pipeline(&repo.name) {
                RepoKind::Pipeline
            } else {
                RepoKind::CoreTool
            };
            let record = self
                .records
                .entry(repo.name.clone())
                .or_insert_with(|| RepoRecord::new(repo.name.clone(), kind));
            if let Some(permissions) = repo.permissions {
                record.teams.insert(team, permissions);
            }
        }
        Some(listed)
    }

    /// Every maintained pipeline gets a record, with release data from the directory.
    /// Pipelines archived in the directory are dropped even if a team still lists them.
    fn add_directory_pipelines(&mut self) {
        for entry in self.directory.pipelines.iter().filter(|p| p.archived) {
            if self.records.remove(&entry.name).is_some() {
                info!(repo = %entry.name, "skipping pipeline archived in directory");
            }
        }
        for entry in self.directory.active() {
            let record = self
                .records
                .entry(entry.name.clone())
                .or_insert_with(|| RepoRecord::new(entry.name.clone(), RepoKind::Pipeline));
            record.release = Some(ReleaseInfo {
                has_release: !entry.releases.is_empty(),
                last_release: entry.last_release(),
            });
        }
    }

    /// Fetch, evaluate and optionally fix every record of one kind. Archived repositories are dropped.
    async fn process(&mut self, kind: RepoKind, ctx: &EvalContext) {
        let names: Vec<String> = self
            .records
            .values()
            .filter(|r| r.kind() == kind)
            .map(|r| r.name.clone())
            .collect();

        for name in names {
            let Some(mut record) = self.records.remove(&name) else {
                continue;
            };
            let refresh = self.request.refreshes(&name);
            self.fetcher.load_record(&mut record, refresh).await;
            if record.is_archived() {
                info!(repo = %name, "skipping archived repository");
                continue;
            }
            record.evaluate(ctx);

            if self.request.fixes(&name) {
                let outcome = remediate(&mut record, &mut self.fetcher, &self.team_ids, ctx).await;
                self.writes += outcome.writes;
                self.updated_teams.extend(outcome.updated_teams);
                self.errors.extend(outcome.errors);
            }
            self.records.insert(name, record);
        }
    }

    async fn tools_last_release(&mut self) -> Option<DateTime<Utc>> {
        let refresh = self.request.refreshes(TOOLS_REPO);
        let release = self.fetcher.latest_release(TOOLS_REPO, refresh).await;
        if release.is_none() {
            warn!("no tools release found; release recency checks will be unknown");
        }
        release.and_then(|r| r.published_at)
    }

    /// Re-read listings of teams whose access changed and re-evaluate everything.
    async fn reload_updated_teams(&mut self, ctx: &mut EvalContext) {
        if self.updated_teams.is_empty() {
            return;
        }
        let known: BTreeSet<String> = self.records.keys().cloned().collect();
        let teams = std::mem::take(&mut self.updated_teams);
        for team in teams {
            info!(team = team.slug(), "reloading team repositories");
            let Some(listed) = self.load_team(team, true).await else {
                continue;
            };
            let mut granted = BTreeMap::new();
            for repo in listed.iter().filter(|r| !r.archived) {
                if let Some(permissions) = repo.permissions {
                    granted.insert(repo.name.as_str(), permissions);
                }
            }
            // Records created by the reload for unseen repositories were never fetched.
            self.records.retain(|name, _| known.contains(name));
            for record in self.records.values_mut() {
                match granted.get(record.name.as_str()) {
                    Some(permissions) => record.teams.insert(team, *permissions),
                    None => record.teams.remove(&team),
                };
            }
        }
        ctx.missing_teams = self.missing_teams.clone();
        for record in self.records.values_mut() {
            record.evaluate(ctx);
        }
    }

    fn into_report(self, org: String) -> AuditReport {
        let (pipelines, core_tools): (Vec<_>, Vec<_>) = self
            .records
            .into_values()
            .partition(|r| r.kind() == RepoKind::Pipeline);
        AuditReport {
            org,
            pipelines,
            core_tools,
            errors: self.errors,
            writes: self.writes,
        }
    }
}
