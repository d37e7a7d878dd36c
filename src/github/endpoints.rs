// GitHub API endpoint functions.
// Typed methods for the repository, branch, team and release endpoints the audit uses.

use reqwest::Method;

use crate::error::Result;

use super::api::OrgApi;
use super::client::GitHubClient;
use super::types::{
    Branch, BranchProtection, ProtectionUpdate, Release, RepoSettingsPatch, Repository, Team,
    TeamPermission, TeamPermissionUpdate, Topics,
};

impl OrgApi for GitHubClient {
    fn org(&self) -> &str {
        GitHubClient::org(self)
    }

    async fn get_repo(&mut self, repo: &str) -> Result<Repository> {
        self.get_json(&format!("/repos/{}/{}", self.org(), repo)).await
    }

    async fn get_branches(&mut self, repo: &str) -> Result<Vec<Branch>> {
        self.get_paginated(&format!("/repos/{}/{}/branches", self.org(), repo)).await
    }

    async fn get_branch_protection(
        &mut self,
        repo: &str,
        branch: &str,
    ) -> Result<BranchProtection> {
        self.get_json(&format!(
            "/repos/{}/{}/branches/{}/protection",
            self.org(),
            repo,
            branch
        ))
        .await
    }

    async fn get_latest_release(&mut self, repo: &str) -> Result<Release> {
        self.get_json(&format!("/repos/{}/{}/releases/latest", self.org(), repo)).await
    }

    async fn get_webpage(&mut self, repo: &str) -> Result<String> {
        self.get_text(&format!("/{}/{}", self.org(), repo)).await
    }

    async fn get_team(&mut self, slug: &str) -> Result<Team> {
        self.get_json(&format!("/orgs/{}/teams/{}", self.org(), slug)).await
    }

    async fn get_team_repos(&mut self, team_id: u64) -> Result<Vec<Repository>> {
        self.get_paginated(&format!("/teams/{}/repos", team_id)).await
    }

    async fn update_repo(
        &mut self,
        repo: &str,
        patch: &RepoSettingsPatch,
    ) -> Result<Option<Repository>> {
        self.send_json(
            Method::PATCH,
            &format!("/repos/{}/{}", self.org(), repo),
            patch,
        )
        .await
    }

    async fn replace_topics(&mut self, repo: &str, topics: &Topics) -> Result<Option<Topics>> {
        self.send_json(
            Method::PUT,
            &format!("/repos/{}/{}/topics", self.org(), repo),
            topics,
        )
        .await
    }

    async fn set_team_permission(
        &mut self,
        team_id: u64,
        repo: &str,
        permission: TeamPermission,
    ) -> Result<()> {
        let _: Option<serde_json::Value> = self
            .send_json(
                Method::PUT,
                &format!("/teams/{}/repos/{}/{}", team_id, self.org(), repo),
                &TeamPermissionUpdate { permission },
            )
            .await?;
        Ok(())
    }

    async fn update_branch_protection(
        &mut self,
        repo: &str,
        branch: &str,
        update: &ProtectionUpdate,
    ) -> Result<Option<BranchProtection>> {
        self.send_json(
            Method::PUT,
            &format!(
                "/repos/{}/{}/branches/{}/protection",
                self.org(),
                repo,
                branch
            ),
            update,
        )
        .await
    }
}
