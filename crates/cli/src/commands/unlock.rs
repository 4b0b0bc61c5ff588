use super::open_session;

/// Run the `unlock` command.
pub async fn run(
    config_path: &str,
    username: &str,
    password: &str,
    user_id: &str,
) -> anyhow::Result<()> {
    let (_config, mut session) = open_session(config_path, username, password).await?;
    let result = session.unlock(user_id).await;
    session.disconnect().await;

    if result? {
        println!("Account '{user_id}' unlocked.");
    } else {
        println!("Account '{user_id}' was not locked; nothing to do.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn requires_config_file() {
        let result = run("/nonexistent/warden.toml", "admin", "s3cret", "jdoe").await;
        assert!(result.is_err());
    }
}
