use super::open_session;

/// Run the `test-connection` command: bind, report, disconnect.
pub async fn run(config_path: &str, username: &str, password: &str) -> anyhow::Result<()> {
    let (config, mut session) = match open_session(config_path, username, password).await {
        Ok(pair) => pair,
        Err(e) => {
            println!("Connection failed: {e}");
            return Err(e);
        }
    };

    println!("Connection successful!");
    println!("  Instance:   {}", config.console.instance_name);
    println!("  Domain:     {}", config.directory.domain);
    println!("  Server:     {}", session.server_name());
    println!("  Base DN:    {}", session.base_dn());
    println!(
        "  Transport:  {}",
        if config.directory.use_tls {
            "LDAPS"
        } else {
            "LDAP (password changes unavailable)"
        }
    );

    session.disconnect().await;
    Ok(())
}
