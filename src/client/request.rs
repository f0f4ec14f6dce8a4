//! Request execution with retry, linear backoff and rate-limit waits

use std::{fmt, future::Future, pin::Pin, time::Duration};

use chrono::Utc;
use compact_str::{CompactString, ToCompactString};
use reqwest::{
    Method, StatusCode,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, USER_AGENT},
};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, error, instrument, trace, warn};
use url::Url;

use super::{
    api::GithubClient,
    error::{ClientError, Result},
    pagination,
    rate_limit::RateLimitHeaders,
};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Suspends the current task between attempts
///
/// Production code uses [`TokioSleeper`]; tests swap in a recorder to observe
/// the wait sequence without real delays.
pub trait Sleeper: Send + Sync + fmt::Debug {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// One logical request, re-sent unchanged on every attempt
#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<Vec<u8>>,
    /// Sleep through a rate-limit window instead of failing
    pub wait_on_rate_limit: bool,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, body: None, wait_on_rate_limit: true }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_json_body(mut self, body: &serde_json::Value) -> Result<Self> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ClientError::validation(format!("cannot encode request body: {e}")))?;
        self.body = Some(bytes);
        Ok(self)
    }

    pub fn without_rate_limit_wait(mut self) -> Self {
        self.wait_on_rate_limit = false;
        self
    }
}

/// What is left of a successful response
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub body: String,
    pub next_page: Option<Url>,
}

impl RawResponse {
    /// Deserialize the body, rejecting payloads that do not fit `T`
    pub fn decode<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            debug!(endpoint, error = %e, "Response body did not match expected shape");
            ClientError::malformed_payload(endpoint, &e)
        })
    }
}

/// Classified result of one attempt
#[derive(Debug)]
pub(crate) enum Outcome {
    Success(RawResponse),
    /// Worth another attempt; `wait` overrides the linear backoff
    Retry {
        error: ClientError,
        wait: Option<Duration>,
    },
    Fail(ClientError),
}

/// GitHub API error response format
#[derive(Debug, Deserialize)]
struct GithubApiError {
    message: CompactString,
}

impl GithubClient {
    /// Run `request` until it succeeds, fails terminally, or exhausts the retry ceiling
    ///
    /// Attempt `n` that ends retryable is re-sent only while `n <= max_retries`,
    /// so at most `max_retries + 1` attempts reach the server.
    #[instrument(level = "debug", skip(self, request), fields(method = %request.method, path = request.url.path()))]
    pub(crate) async fn execute(&self, request: &ApiRequest) -> Result<RawResponse> {
        let retry = &self.config.retry;
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);

            let (error, wait) = match self.attempt(request).await {
                Outcome::Success(response) => {
                    if attempt > 1 {
                        debug!(attempt, "Request succeeded after retrying");
                    }
                    return Ok(response);
                },
                Outcome::Fail(error) => return Err(error),
                Outcome::Retry { error, wait } => {
                    debug_assert!(error.is_retryable(), "non-retryable error classified as retry");
                    (error, wait)
                },
            };

            if attempt > retry.max_retries {
                error!(attempts = attempt, error = %error, "Retries exhausted");
                return Err(ClientError::RetryExhausted { attempts: attempt, source: Box::new(error) });
            }

            let delay = wait.unwrap_or_else(|| retry.backoff_delay(attempt));
            warn!(
                attempt,
                max_retries = retry.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "Retrying request"
            );
            self.sleeper.sleep(delay).await;
        }
    }

    async fn attempt(&self, request: &ApiRequest) -> Outcome {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.config.token))
            .header(USER_AGENT, self.config.user_agent.as_str())
            .header(ACCEPT, GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION);

        if let Some(body) = &request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body.clone());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                return Outcome::Fail(ClientError::config("request", e.to_compact_string()));
            },
            Err(e) => return Outcome::Retry { error: ClientError::from_transport(&e), wait: None },
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Outcome::Retry { error: ClientError::from_transport(&e), wait: None },
        };

        classify(
            status,
            &headers,
            body,
            request.url.path(),
            request.wait_on_rate_limit,
            self.config.retry.max_rate_limit_wait,
        )
    }
}

/// Map one HTTP response onto success, retry or terminal failure
pub(crate) fn classify(
    status: StatusCode,
    headers: &HeaderMap,
    body: String,
    endpoint: &str,
    wait_on_rate_limit: bool,
    max_rate_limit_wait: Duration,
) -> Outcome {
    let rate_limit = RateLimitHeaders::from_headers(headers);
    trace!(
        status = status.as_u16(),
        limit = ?rate_limit.limit,
        remaining = ?rate_limit.remaining,
        "Received response"
    );

    if status.is_success() {
        let next_page = pagination::next_page_url(headers);
        return Outcome::Success(RawResponse { body, next_page });
    }

    if rate_limit.signals_rate_limit(status) {
        let error = ClientError::RateLimited { reset_at: rate_limit.reset_at };
        if !wait_on_rate_limit {
            return Outcome::Fail(error);
        }
        let wait = rate_limit.wait(Utc::now(), max_rate_limit_wait);
        return Outcome::Retry { error, wait };
    }

    let message = api_message(status, &body);
    match status.as_u16() {
        401 => Outcome::Fail(ClientError::authentication(message)),
        404 => Outcome::Fail(ClientError::not_found(endpoint)),
        422 => Outcome::Fail(ClientError::validation(message)),
        code if status.is_server_error() => {
            Outcome::Retry { error: ClientError::transient(Some(code), message), wait: None }
        },
        code => Outcome::Fail(ClientError::Client { status: code, message }),
    }
}

/// GitHub's `message` field when present, else the raw body or the reason phrase
fn api_message(status: StatusCode, body: &str) -> CompactString {
    if let Ok(api_error) = serde_json::from_str::<GithubApiError>(body) {
        return api_error.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status.canonical_reason().unwrap_or("unknown error").into()
    } else {
        trimmed.chars().take(200).collect()
    }
}
