//! GitHub REST client with transparent pagination, rate-limit recovery and a
//! bounded linear retry policy.
//!
//! [`client::GithubClient`] is the entry point. The remaining modules are the
//! thin layers around it: the configuration file, client initialisation for
//! integrations, and logging setup for the `gh-client` binary.

pub mod client;
pub mod config;
pub mod domain;
pub mod id;
pub mod integration;
pub mod logging;
pub mod result;
