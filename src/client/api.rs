//! Core HTTP client for GitHub API

use std::{future::Future, sync::Arc, time::Duration};

use compact_str::format_compact;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use url::Url;

use super::{
    config::ClientConfig,
    error::{ClientError, Result},
    request::{ApiRequest, Sleeper, TokioSleeper},
};
use crate::domain::{
    AuthenticatedUser, Issue, IssueDto, ListOptions, PullRequest, PullRequestDto, RateLimitInfo,
    RateLimitResponse, Repository, RepositoryDto, UserDto,
};

const REPO_AFFILIATION: &str = "owner,collaborator,organization_member";

/// GitHub REST client
///
/// Cheap to clone; clones share the transport and the read-only configuration,
/// so one instance can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct GithubClient {
    pub(super) http: Client,
    pub(super) config: Arc<ClientConfig>,
    pub(super) sleeper: Arc<dyn Sleeper>,
}

impl GithubClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.request.timeout)
            .build()
            .map_err(|e| ClientError::config("http", format_compact!("cannot build HTTP client: {e}")))?;

        debug!(base_url = %config.base_url, max_retries = config.retry.max_retries, "GitHub client created");

        Ok(Self { http, config: Arc::new(config), sleeper: Arc::new(TokioSleeper) })
    }

    /// Construct from `GITHUB_TOKEN`/`GITHUB_PAT` and the optional tuning variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Replace the timer used between attempts
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Fetch the authenticated user, validating the credential
    #[instrument(skip(self))]
    pub async fn test_connection(&self) -> Result<AuthenticatedUser> {
        let url = self.endpoint("/user", &[])?;
        let response = self.execute(&ApiRequest::get(url)).await?;
        let user = AuthenticatedUser::try_from(response.decode::<UserDto>("/user")?)?;
        info!(login = %user.login, "Authenticated against GitHub");
        Ok(user)
    }

    /// Read the core quota without waiting out an exhausted window
    #[instrument(skip(self))]
    pub async fn get_rate_limit_info(&self) -> Result<RateLimitInfo> {
        let url = self.endpoint("/rate_limit", &[])?;
        let request = ApiRequest::get(url).without_rate_limit_wait();
        let response = self.execute(&request).await?;
        let payload: RateLimitResponse = response.decode("/rate_limit")?;
        let info = RateLimitInfo::try_from(payload.resources.core)?;
        debug!(limit = info.limit, remaining = info.remaining, reset_at = %info.reset_at, "Fetched rate limit");
        Ok(info)
    }

    /// Repositories of `owner` the credential can push to
    ///
    /// Lists through `/user/repos` so private repositories are included, then
    /// keeps those owned by `owner` with push or admin permission.
    #[instrument(skip(self))]
    pub async fn list_repositories(&self, owner: &str) -> Result<Vec<Repository>> {
        check_path_segment(owner, "owner")?;

        let per_page = self.config.request.per_page.to_string();
        let url = self.endpoint(
            "/user/repos",
            &[
                ("affiliation", REPO_AFFILIATION),
                ("sort", "updated"),
                ("per_page", per_page.as_str()),
            ],
        )?;

        let repos: Vec<RepositoryDto> = self.paginate(url).await?;
        let total = repos.len();
        let writable = repos
            .into_iter()
            .filter(|repo| repo.is_owned_by(owner) && repo.is_writable())
            .map(Repository::try_from)
            .collect::<Result<Vec<_>>>()?;

        debug!(total, writable = writable.len(), "Listed repositories");
        Ok(writable)
    }

    /// Issues of `owner/repo` in the requested state, pull requests excluded
    #[instrument(skip(self))]
    pub async fn get_issues(
        &self,
        owner: &str,
        repo: &str,
        options: &ListOptions,
    ) -> Result<Vec<Issue>> {
        check_path_segment(owner, "owner")?;
        check_path_segment(repo, "repo")?;

        let per_page = self.config.request.per_page.to_string();
        let url = self.endpoint(
            &format_compact!("/repos/{owner}/{repo}/issues"),
            &[("state", options.state.as_str()), ("per_page", per_page.as_str())],
        )?;

        let entries: Vec<IssueDto> = self.paginate(url).await?;
        let issues = entries
            .into_iter()
            .filter(|entry| !entry.is_pull_request())
            .map(Issue::try_from)
            .collect::<Result<Vec<_>>>()?;

        debug!(count = issues.len(), "Listed issues");
        Ok(issues)
    }

    /// Pull requests of `owner/repo` in the requested state
    #[instrument(skip(self))]
    pub async fn get_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        options: &ListOptions,
    ) -> Result<Vec<PullRequest>> {
        check_path_segment(owner, "owner")?;
        check_path_segment(repo, "repo")?;

        let per_page = self.config.request.per_page.to_string();
        let url = self.endpoint(
            &format_compact!("/repos/{owner}/{repo}/pulls"),
            &[("state", options.state.as_str()), ("per_page", per_page.as_str())],
        )?;

        let entries: Vec<PullRequestDto> = self.paginate(url).await?;
        let pulls = entries
            .into_iter()
            .map(PullRequest::try_from)
            .collect::<Result<Vec<_>>>()?;

        debug!(count = pulls.len(), "Listed pull requests");
        Ok(pulls)
    }

    /// Send an arbitrary request through the same retry and classification path
    #[instrument(skip(self, body))]
    pub async fn request_json<T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path, query)?;
        let mut request = ApiRequest::new(method, url);
        if let Some(body) = body {
            request = request.with_json_body(body)?;
        }
        self.execute(&request).await?.decode(path)
    }

    /// Build an absolute URL under the configured base URL
    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let raw = format_compact!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let mut url = Url::parse(&raw).map_err(|e| {
            ClientError::config("base_url", format_compact!("cannot build URL for {path}: {e}"))
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}

/// Run `operation`, including all of its retries, within `budget`
///
/// Expiry surfaces as [`ClientError::Timeout`], never as retry exhaustion.
pub async fn with_deadline<F, T>(budget: Duration, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(budget, operation)
        .await
        .map_err(|_| ClientError::Timeout { budget })?
}

/// Reject owner/repo names that would change the request path
fn check_path_segment(value: &str, field: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ClientError::validation(format_compact!("{field} must not be empty")));
    }
    for ch in ['/', '?', '#', '%', '\0', ' ', '\n', '\t'] {
        if value.contains(ch) {
            return Err(ClientError::validation(format_compact!(
                "{field} contains invalid character {ch:?}"
            )));
        }
    }
    Ok(())
}
