// GitHub API module.
// Provides the client, the organization API trait and wire types.

pub mod api;
pub mod client;
pub mod endpoints;
pub mod types;

pub use api::OrgApi;
pub use client::GitHubClient;
pub use types::*;
