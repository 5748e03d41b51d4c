//! reqwest client construction from [`surge_config::HttpConfig`]

use crate::errors::HttpError;
use surge_config::HttpConfig;
use tracing::debug;

/// Build the shared connection pool. One client serves every worker.
pub fn build_client(config: &HttpConfig) -> Result<reqwest::Client, HttpError> {
    debug!(
        "Creating HTTP client with {}ms timeout guard",
        config.timeout.as_millis()
    );

    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent)
        .danger_accept_invalid_certs(!config.verify_ssl)
        .pool_max_idle_per_host(config.connection_pool.max_idle_per_host)
        .pool_idle_timeout(config.connection_pool.idle_timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_builds() {
        assert!(build_client(&HttpConfig::default()).is_ok());
    }
}
