use std::path::Path;

use warden_core::config::WardenConfig;
use warden_directory::{Credential, DirectorySession};

pub mod group;
pub mod policy;
pub mod reset_password;
pub mod test_connection;
pub mod unlock;
pub mod user;

/// Load configuration and establish the bound session every command
/// starts from.
pub(crate) async fn open_session(
    config_path: &str,
    username: &str,
    password: &str,
) -> anyhow::Result<(WardenConfig, DirectorySession)> {
    let config = WardenConfig::load(Path::new(config_path))?;
    config.validate()?;
    tracing::info!("loaded configuration from {config_path}");

    let credential = Credential::new(
        &config.directory.domain,
        username,
        password,
        config.directory.use_tls,
        config.directory.port,
    );
    let session = DirectorySession::connect(credential, &config.directory).await?;
    Ok((config, session))
}

pub(crate) fn fmt_date(date: Option<chrono::DateTime<chrono::Utc>>) -> String {
    match date {
        Some(d) => d.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "-".to_string(),
    }
}
