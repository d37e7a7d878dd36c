// Organization-scoped API surface used by the audit.
// GitHubClient implements it over HTTP; tests substitute an in-memory fake.

#![allow(async_fn_in_trait)]

use crate::error::Result;

use super::types::{
    Branch, BranchProtection, ProtectionUpdate, Release, RepoSettingsPatch, Repository, Team,
    TeamPermission, Topics,
};

/// Reads and writes against one organization's repositories and teams.
pub trait OrgApi {
    /// Organization login, used to build settings links.
    fn org(&self) -> &str;

    async fn get_repo(&mut self, repo: &str) -> Result<Repository>;

    async fn get_branches(&mut self, repo: &str) -> Result<Vec<Branch>>;

    /// Fails with `NotFound` when the branch has no protection.
    async fn get_branch_protection(&mut self, repo: &str, branch: &str)
    -> Result<BranchProtection>;

    async fn get_latest_release(&mut self, repo: &str) -> Result<Release>;

    /// Public HTML page of the repository.
    async fn get_webpage(&mut self, repo: &str) -> Result<String>;

    async fn get_team(&mut self, slug: &str) -> Result<Team>;

    /// Every repository the team can access, across all pages.
    async fn get_team_repos(&mut self, team_id: u64) -> Result<Vec<Repository>>;

    async fn update_repo(
        &mut self,
        repo: &str,
        patch: &RepoSettingsPatch,
    ) -> Result<Option<Repository>>;

    async fn replace_topics(&mut self, repo: &str, topics: &Topics) -> Result<Option<Topics>>;

    async fn set_team_permission(
        &mut self,
        team_id: u64,
        repo: &str,
        permission: TeamPermission,
    ) -> Result<()>;

    async fn update_branch_protection(
        &mut self,
        repo: &str,
        branch: &str,
        update: &ProtectionUpdate,
    ) -> Result<Option<BranchProtection>>;
}
