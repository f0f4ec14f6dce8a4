//! GitHub client modules
//!
//! The client is split into focused components: request execution with
//! retries, rate-limit handling, pagination, configuration and errors.

pub mod api;
pub mod config;
pub mod error;
mod pagination;
mod rate_limit;
pub mod request;

// Re-export main types for convenience
pub use api::{GithubClient, with_deadline};
pub use config::{ClientConfig, RequestConfig, RetryConfig};
pub use error::{ClientError, Result};
pub use request::{Sleeper, TokioSleeper};
