//! Client initialisation for integrations that can run without GitHub

use tracing::{info, instrument, warn};

use crate::{
    client::{ClientError, GithubClient},
    config::AppConfig,
    domain::AuthenticatedUser,
};

/// Build a client and confirm the credential against `/user`
///
/// Uses the configured token when there is one, otherwise constructs purely
/// from the process environment.
#[instrument(skip(config))]
pub async fn connect(config: &AppConfig) -> Result<(GithubClient, AuthenticatedUser), ClientError> {
    let client = if config.github.token.is_some() {
        GithubClient::new(config.client_config()?)?
    } else {
        GithubClient::from_env()?
    };

    let user = client.test_connection().await?;
    Ok((client, user))
}

/// Like [`connect`], but logs a failure and reports "no client" instead
pub async fn initialize_client(config: &AppConfig) -> Option<GithubClient> {
    match connect(config).await {
        Ok((client, user)) => {
            info!(login = %user.login, "GitHub client initialized");
            Some(client)
        },
        Err(e) => {
            warn!(error = %e, "Failed to initialize GitHub client");
            None
        },
    }
}
