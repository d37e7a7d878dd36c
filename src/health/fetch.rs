// Cache-backed data loading.
// Reads each resource from the cache unless a refresh is requested, otherwise from the API.

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheStore};
use crate::github::{Branch, BranchProtection, OrgApi, Release, Repository, Team};

use super::record::RepoRecord;

/// Couples the API with the cache. Fetch failures degrade to `None` and are logged.
pub struct Fetcher<'a, A: OrgApi> {
    pub api: &'a mut A,
    cache: &'a CacheStore,
}

impl<'a, A: OrgApi> Fetcher<'a, A> {
    pub fn new(api: &'a mut A, cache: &'a CacheStore) -> Self {
        Self { api, cache }
    }

    /// Cached JSON for `key`, unless refreshing. Unreadable entries count as absent.
    fn cached<T: DeserializeOwned>(&self, key: &CacheKey, refresh: bool) -> Option<T> {
        if refresh {
            return None;
        }
        match self.cache.read_json::<T>(key) {
            Ok(cached) => cached.map(|c| c.data),
            Err(e) => {
                warn!(?key, error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    /// Overwrite a cache entry. Failures only cost a refetch next time.
    pub fn store<T: Serialize>(&self, key: &CacheKey, data: &T) {
        if let Err(e) = self.cache.write_json(key, data) {
            warn!(?key, error = %e, "failed to write cache");
        }
    }

    /// Load everything the evaluator needs for one record.
    pub async fn load_record(&mut self, record: &mut RepoRecord, refresh: bool) {
        info!(repo = %record.name, refresh, "loading repository data");

        record.repo = self.repository(&record.name, refresh).await;
        record.branches = self.branches(&record.name, refresh).await;

        record.protection.clear();
        for &branch in record.kind().profile().protected_branches {
            let fetched = self.protection(&record.name, branch.as_str(), refresh).await;
            if let Some(protection) = fetched {
                record.protection.insert(branch, protection);
            }
        }

        record.webpage = self.webpage(&record.name, refresh).await;
    }

    pub async fn repository(&mut self, name: &str, refresh: bool) -> Option<Repository> {
        let key = CacheKey::Repo(name.to_string());
        if let Some(repo) = self.cached(&key, refresh) {
            return Some(repo);
        }
        match self.api.get_repo(name).await {
            Ok(repo) => {
                self.store(&key, &repo);
                Some(repo)
            }
            Err(e) => {
                warn!(repo = name, error = %e, "failed to fetch repository");
                None
            }
        }
    }

    pub async fn branches(&mut self, name: &str, refresh: bool) -> Option<Vec<Branch>> {
        let key = CacheKey::Branches(name.to_string());
        if let Some(branches) = self.cached(&key, refresh) {
            return Some(branches);
        }
        match self.api.get_branches(name).await {
            Ok(branches) => {
                self.store(&key, &branches);
                Some(branches)
            }
            Err(e) => {
                warn!(repo = name, error = %e, "failed to fetch branches");
                None
            }
        }
    }

    /// `Some(None)` when the branch is unprotected or absent, `None` when the fetch failed.
    pub async fn protection(
        &mut self,
        name: &str,
        branch: &str,
        refresh: bool,
    ) -> Option<Option<BranchProtection>> {
        let key = CacheKey::Protection {
            repo: name.to_string(),
            branch: branch.to_string(),
        };
        if let Some(protection) = self.cached(&key, refresh) {
            return Some(protection);
        }
        match self.api.get_branch_protection(name, branch).await {
            Ok(protection) => {
                let protection = Some(protection);
                self.store(&key, &protection);
                Some(protection)
            }
            Err(e) if e.is_not_found() => {
                debug!(repo = name, branch, "branch not protected");
                self.store(&key, &None::<BranchProtection>);
                Some(None)
            }
            Err(e) => {
                warn!(repo = name, branch, error = %e, "failed to fetch branch protection");
                None
            }
        }
    }

    pub async fn webpage(&mut self, name: &str, refresh: bool) -> Option<String> {
        let key = CacheKey::Webpage(name.to_string());
        if !refresh {
            match self.cache.read_text(&key) {
                Ok(Some(page)) => return Some(page),
                Ok(None) => {}
                Err(e) => warn!(?key, error = %e, "ignoring unreadable cache entry"),
            }
        }
        match self.api.get_webpage(name).await {
            Ok(page) => {
                if let Err(e) = self.cache.write_text(&key, &page) {
                    warn!(?key, error = %e, "failed to write cache");
                }
                Some(page)
            }
            Err(e) => {
                warn!(repo = name, error = %e, "failed to fetch web page");
                None
            }
        }
    }

    pub async fn latest_release(&mut self, name: &str, refresh: bool) -> Option<Release> {
        let key = CacheKey::Release(name.to_string());
        if let Some(release) = self.cached(&key, refresh) {
            return Some(release);
        }
        match self.api.get_latest_release(name).await {
            Ok(release) => {
                self.store(&key, &release);
                Some(release)
            }
            Err(e) => {
                warn!(repo = name, error = %e, "failed to fetch latest release");
                None
            }
        }
    }

    pub async fn team(&mut self, slug: &str, refresh: bool) -> Option<Team> {
        let key = CacheKey::Team(slug.to_string());
        if let Some(team) = self.cached(&key, refresh) {
            return Some(team);
        }
        match self.api.get_team(slug).await {
            Ok(team) => {
                self.store(&key, &team);
                Some(team)
            }
            Err(e) => {
                warn!(team = slug, error = %e, "failed to fetch team");
                None
            }
        }
    }

    /// All pages of the team's repository listing.
    pub async fn team_repos(&mut self, team: &Team, refresh: bool) -> Option<Vec<Repository>> {
        let key = CacheKey::TeamRepos(team.slug.clone());
        if let Some(repos) = self.cached(&key, refresh) {
            return Some(repos);
        }
        match self.api.get_team_repos(team.id).await {
            Ok(repos) => {
                info!(team = %team.slug, count = repos.len(), "fetched team repositories");
                self.store(&key, &repos);
                Some(repos)
            }
            Err(e) => {
                warn!(team = %team.slug, error = %e, "failed to fetch team repositories");
                None
            }
        }
    }
}
