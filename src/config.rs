// Configuration loading.
// Reads credentials and paths from a TOML file, with environment overrides.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::error::{HealthError, Result};

pub const DEFAULT_ORG: &str = "nf-core";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_WEB_BASE: &str = "https://github.com";

/// Raw contents of `config.toml`. Every key is optional on disk.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    github_username: Option<String>,
    github_access_token: Option<String>,
    org: Option<String>,
    cache_dir: Option<PathBuf>,
    pipelines_file: Option<PathBuf>,
    api_base: Option<String>,
    web_base: Option<String>,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub token: String,
    /// Organization whose repositories are audited.
    pub org: String,
    /// Root directory for cached API responses.
    pub cache_dir: PathBuf,
    /// Path to the pipeline directory (`pipelines.json`).
    pub pipelines_file: PathBuf,
    pub api_base: String,
    pub web_base: String,
}

/// Default location of the config file (~/.config/repo-health/config.toml on Linux).
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "repo-health").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Default cache root (~/.cache/repo-health on Linux).
pub fn default_cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "repo-health").map(|dirs| dirs.cache_dir().to_path_buf())
}

impl Config {
    /// Load from an explicit path, or the default location if `path` is None.
    /// A missing default file is fine as long as the environment supplies credentials.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => read_config_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => read_config_file(&path)?,
                _ => ConfigFile::default(),
            },
        };

        Self::resolve(
            file,
            std::env::var("GITHUB_USERNAME").ok(),
            std::env::var("GITHUB_TOKEN").ok(),
        )
    }

    fn resolve(
        file: ConfigFile,
        env_username: Option<String>,
        env_token: Option<String>,
    ) -> Result<Self> {
        let username = non_blank(env_username)
            .or(non_blank(file.github_username))
            .ok_or(HealthError::MissingCredentials)?;
        let token = non_blank(env_token)
            .or(non_blank(file.github_access_token))
            .ok_or(HealthError::MissingCredentials)?;

        let cache_dir = match file.cache_dir {
            Some(dir) => dir,
            None => default_cache_dir()
                .ok_or_else(|| HealthError::Config("cannot determine cache directory".into()))?,
        };

        Ok(Self {
            username,
            token,
            org: file.org.unwrap_or_else(|| DEFAULT_ORG.to_string()),
            cache_dir,
            pipelines_file: file
                .pipelines_file
                .unwrap_or_else(|| PathBuf::from("pipelines.json")),
            api_base: file
                .api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            web_base: file
                .web_base
                .unwrap_or_else(|| DEFAULT_WEB_BASE.to_string()),
        })
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let contents = fs::read_to_string(path)
        .map_err(|e| HealthError::Config(format!("{}: {}", path.display(), e)))?;
    Ok(toml::from_str(&contents)?)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ConfigFile {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_resolve_from_file() {
        let file = parse(
            r#"
            github_username = "octocat"
            github_access_token = "secret"
            cache_dir = "/tmp/health"
            "#,
        );
        let config = Config::resolve(file, None, None).unwrap();
        assert_eq!(config.username, "octocat");
        assert_eq!(config.token, "secret");
        assert_eq!(config.org, "nf-core");
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/health"));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = parse(
            r#"
            github_username = "octocat"
            github_access_token = "secret"
            cache_dir = "/tmp/health"
            "#,
        );
        let config =
            Config::resolve(file, Some("bot".into()), Some("env-token".into())).unwrap();
        assert_eq!(config.username, "bot");
        assert_eq!(config.token, "env-token");
    }

    #[test]
    fn test_missing_credentials() {
        let file = parse(r#"cache_dir = "/tmp/health""#);
        let err = Config::resolve(file, None, Some("   ".into())).unwrap_err();
        assert!(matches!(err, HealthError::MissingCredentials));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "github_username = \"u\"\ngithub_access_token = \"t\"\norg = \"acme\"\ncache_dir = \"c\"\n",
        )
        .unwrap();

        let file = read_config_file(&path).unwrap();
        let config = Config::resolve(file, None, None).unwrap();
        assert_eq!(config.org, "acme");
    }
}
