// Pipeline directory loading.
// Reads the organization's pipeline list, which decides which repositories are pipelines.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Deserialize)]
struct DirectoryFile {
    remote_workflows: Vec<PipelineEntry>,
}

/// One pipeline as listed in the directory.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineEntry {
    pub name: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub releases: Vec<ReleaseEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseEntry {
    pub published_at: Option<DateTime<Utc>>,
}

impl PipelineEntry {
    /// Publication date of the most recent release (releases are listed oldest first).
    pub fn last_release(&self) -> Option<DateTime<Utc>> {
        self.releases.last().and_then(|r| r.published_at)
    }
}

/// The set of known pipelines.
#[derive(Debug, Clone, Default)]
pub struct PipelineDirectory {
    pub pipelines: Vec<PipelineEntry>,
}

impl PipelineDirectory {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(json: &str) -> Result<Self> {
        let file: DirectoryFile = serde_json::from_str(json)?;
        Ok(Self {
            pipelines: file.remote_workflows,
        })
    }

    pub fn get(&self, name: &str) -> Option<&PipelineEntry> {
        self.pipelines.iter().find(|p| p.name == name)
    }

    pub fn is_pipeline(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Pipelines that are still maintained.
    pub fn active(&self) -> impl Iterator<Item = &PipelineEntry> {
        self.pipelines.iter().filter(|p| !p.archived)
    }
}
