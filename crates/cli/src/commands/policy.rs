use super::open_session;

/// Run the `policy` command: print the effective domain password policy.
pub async fn run(config_path: &str, username: &str, password: &str) -> anyhow::Result<()> {
    let (_config, mut session) = open_session(config_path, username, password).await?;
    let result = session.policy().await;
    session.disconnect().await;

    let policy = result?;
    println!("Password policy for {}:", policy.domain_name);
    println!("  Retrieved from:     {}", policy.domain_controller);
    println!("  Retrieved at:       {}", policy.retrieved_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if !policy.is_valid() {
        println!("  (policy could not be read; values below are defaults)");
    }
    println!("  Max password age:   {}", days_label(policy.max_password_age_days));
    println!("  Min password age:   {}", days_label(policy.min_password_age_days));
    println!("  Min length:         {} characters", policy.min_password_length);
    println!("  History:            {} remembered", policy.password_history_length);
    println!(
        "  Complexity:         {}",
        if policy.complexity_required {
            "required"
        } else {
            "not required"
        }
    );
    if policy.lockout_threshold == 0 {
        println!("  Lockout:            disabled");
    } else {
        println!(
            "  Lockout:            after {} bad attempts within {} min, for {} min",
            policy.lockout_threshold,
            policy.lockout_observation_window_minutes,
            policy.lockout_duration_minutes
        );
    }
    Ok(())
}

fn days_label(days: i64) -> String {
    if days == 0 {
        "unlimited".to_string()
    } else {
        format!("{days} days")
    }
}
