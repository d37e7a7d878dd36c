// GitHub API HTTP client.
// Handles authentication, preview media types, pagination and response status checks.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::{
    Client, Method, RequestBuilder, Response, StatusCode,
    header::{ACCEPT, HeaderMap, HeaderValue, LINK, USER_AGENT},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{HealthError, Result};

/// Topics and protected-branch review settings still sit behind preview media types.
const PREVIEW_ACCEPT: &str =
    "application/vnd.github.mercy-preview+json, application/vnd.github.luke-cage-preview+json";

static NEXT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([^>]+)>;\s*rel="next""#).expect("valid next-link pattern")
});

/// GitHub API client using HTTP Basic credentials.
pub struct GitHubClient {
    client: Client,
    org: String,
    username: String,
    token: String,
    api_base: String,
    web_base: String,
}

impl GitHubClient {
    /// Create a new client for the configured organization and hosts.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("repo-health"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(HealthError::Api)?;

        Ok(Self {
            client,
            org: config.org.clone(),
            username: config.username.clone(),
            token: config.token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            web_base: config.web_base.trim_end_matches('/').to_string(),
        })
    }

    /// Organization all repository endpoints are scoped to.
    pub fn org(&self) -> &str {
        &self.org
    }

    /// Absolute URL for an API path such as `/repos/nf-core/tools`.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Absolute URL for a public web page path.
    pub fn web_url(&self, path: &str) -> String {
        format!("{}{}", self.web_base, path)
    }

    fn api_request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.token))
            .header(ACCEPT, PREVIEW_ACCEPT)
    }

    /// GET an API path and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.api_url(path);
        debug!(%url, "GET");
        let response = self
            .api_request(Method::GET, &url)
            .send()
            .await
            .map_err(HealthError::Api)?;
        let response = check_response(response).await?;
        Ok(response.json().await?)
    }

    /// GET a list endpoint, following `rel="next"` links until exhausted.
    pub async fn get_paginated<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        collect_pages(self.api_url(path), |url| async move {
            debug!(%url, "GET page");
            let response = self
                .api_request(Method::GET, &url)
                .send()
                .await
                .map_err(HealthError::Api)?;
            let response = check_response(response).await?;
            let next = next_link(response.headers());
            let page = response.json::<Vec<T>>().await?;
            Ok::<_, HealthError>((page, next))
        })
        .await
    }

    /// GET a public web page as raw text (no API credentials).
    pub async fn get_text(&self, path: &str) -> Result<String> {
        let url = self.web_url(path);
        debug!(%url, "GET page");
        let response = self.client.get(&url).send().await.map_err(HealthError::Api)?;
        let response = check_response(response).await?;
        Ok(response.text().await?)
    }

    /// Send a JSON body with PATCH or PUT.
    /// Returns `None` for 204 No Content, the decoded body for 200.
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<Option<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.api_url(path);
        info!(%method, %url, "writing");
        let response = self
            .api_request(method.clone(), &url)
            .json(body)
            .send()
            .await
            .map_err(HealthError::Api)?;

        match WriteReply::from(response.status()) {
            WriteReply::Empty => Ok(None),
            WriteReply::Body => Ok(Some(response.json().await?)),
            WriteReply::Rejected(status) => Err(HealthError::Write {
                method: method.to_string(),
                url,
                status,
                payload: serde_json::to_string(body)?,
            }),
        }
    }
}

/// How a PATCH or PUT response is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteReply {
    /// 204: success without data.
    Empty,
    /// 200: success with the updated resource.
    Body,
    Rejected(u16),
}

impl From<StatusCode> for WriteReply {
    fn from(status: StatusCode) -> Self {
        match status {
            StatusCode::NO_CONTENT => WriteReply::Empty,
            StatusCode::OK => WriteReply::Body,
            other => WriteReply::Rejected(other.as_u16()),
        }
    }
}

/// Fetch pages starting at `first` until a page has no next link, concatenating items.
/// The first failing page aborts the listing.
async fn collect_pages<T, F, Fut>(first: String, mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Option<String>)>>,
{
    let mut url = Some(first);
    let mut items = Vec::new();

    while let Some(current) = url.take() {
        let (mut page, next) = fetch_page(current).await?;
        items.append(&mut page);
        url = next;
    }

    Ok(items)
}

/// Check response status and convert errors.
async fn check_response(response: Response) -> Result<Response> {
    match response.status() {
        StatusCode::OK => Ok(response),
        StatusCode::UNAUTHORIZED => Err(HealthError::Unauthorized),
        StatusCode::NOT_FOUND => Err(HealthError::NotFound(response.url().to_string())),
        status => {
            let url = response.url().to_string();
            Err(HealthError::Http {
                status: status.as_u16(),
                url,
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

/// Extract the `rel="next"` target from a `Link` header, if any.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| NEXT_LINK.captures(value))
        .map(|caps| caps[1].to_string())
}
