// Cache path utilities.
// Maps cache keys onto files under the cache root, grouped by repository and team.

use std::path::{Path, PathBuf};

/// Identifies one cached document: resource kind, owner name and optional qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Full repository metadata.
    Repo(String),
    /// Latest release of a repository.
    Release(String),
    /// Branch list of a repository.
    Branches(String),
    /// Protection document of one branch.
    Protection { repo: String, branch: String },
    /// Raw HTML of the repository's public page.
    Webpage(String),
    /// Organization team (used for its id).
    Team(String),
    /// Repositories a team has access to, with permissions.
    TeamRepos(String),
}

impl CacheKey {
    /// Path of this entry relative to the cache root.
    pub fn relative_path(&self) -> PathBuf {
        match self {
            CacheKey::Repo(repo) => repo_dir(repo).join("repo.json"),
            CacheKey::Release(repo) => repo_dir(repo).join("release.json"),
            CacheKey::Branches(repo) => repo_dir(repo).join("branches.json"),
            CacheKey::Protection { repo, branch } => {
                repo_dir(repo).join(format!("protection_{}.json", sanitize_name(branch)))
            }
            CacheKey::Webpage(repo) => repo_dir(repo).join("webpage.html"),
            CacheKey::Team(team) => team_dir(team).join("team.json"),
            CacheKey::TeamRepos(team) => team_dir(team).join("repos.json"),
        }
    }

    /// Absolute path of this entry under `root`.
    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(self.relative_path())
    }
}

fn repo_dir(repo: &str) -> PathBuf {
    Path::new("repos").join(sanitize_name(repo))
}

fn team_dir(team: &str) -> PathBuf {
    Path::new("teams").join(sanitize_name(team))
}

/// Sanitize a name for use in filesystem paths.
/// Replaces problematic characters with underscores.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}
