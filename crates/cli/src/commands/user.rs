use warden_directory::PasswordState;

use super::{fmt_date, open_session};

/// Run the `user show` command: print the full resolved account state, or
/// the raw attribute projection with `--raw`.
pub async fn show(
    config_path: &str,
    username: &str,
    password: &str,
    user_id: &str,
    raw: bool,
) -> anyhow::Result<()> {
    let (_config, mut session) = open_session(config_path, username, password).await?;
    if raw {
        let result = session.find_user(user_id).await;
        session.disconnect().await;
        return show_raw(user_id, result?);
    }
    let snapshot = session.account(user_id).await;
    session.disconnect().await;

    let Some(account) = snapshot? else {
        println!("No account named '{user_id}'.");
        return Ok(());
    };

    println!("Account: {}", account.user_id);
    println!("  Display name:    {}", account.display_name);
    println!("  DN:              {}", account.distinguished_name);
    println!(
        "  Mail:            {}",
        account.email.as_deref().unwrap_or("-")
    );
    println!(
        "  Status:          {}{}",
        if account.enabled { "enabled" } else { "disabled" },
        if account.locked { ", LOCKED OUT" } else { "" }
    );
    if let Some(locked_at) = account.lockout_time {
        println!("  Locked since:    {}", fmt_date(Some(locked_at)));
    }
    println!(
        "  Control flags:   {}",
        warden_directory::uac::describe(account.user_account_control)
    );
    if warden_directory::uac::smartcard_required(account.user_account_control) {
        println!("  Smartcard:       required for interactive logon");
    }
    println!("  Bad passwords:   {}", account.bad_password_count);
    println!("  Logon count:     {}", account.logon_count);
    println!();
    println!("  Password state:  {}", state_label(account.password_state));
    println!(
        "  Last set:        {}",
        fmt_date(account.password_last_set)
    );
    println!(
        "  Expires:         {}",
        fmt_date(account.password_expiry_date)
    );
    println!(
        "  Changeable from: {}",
        fmt_date(account.password_can_change_date)
    );
    if account.password_expired {
        println!("  *** password has expired ***");
    }
    if account.must_change_at_next_logon {
        println!("  *** must change password at next logon ***");
    }
    println!(
        "  Account expires: {}",
        fmt_date(account.account_expires)
    );

    if !account.group_memberships.is_empty() {
        println!();
        println!("  Groups ({}):", account.group_memberships.len());
        for group in &account.group_memberships {
            println!("    {group}");
        }
    }

    Ok(())
}

/// Run the `user search` command.
pub async fn search(
    config_path: &str,
    username: &str,
    password: &str,
    term: &str,
) -> anyhow::Result<()> {
    let (config, mut session) = open_session(config_path, username, password).await?;
    let result = session.find_users(term, config.console.search_limit).await;
    session.disconnect().await;

    let users = result?;
    if users.is_empty() {
        println!("No accounts match '{term}'.");
        return Ok(());
    }

    println!("{} account(s):", users.len());
    for user in &users {
        println!(
            "  {:<20} {:<30} {}{}",
            user.account_name,
            user.display_name,
            user.email.as_deref().unwrap_or("-"),
            if user.enabled { "" } else { "  [disabled]" }
        );
    }
    if users.len() == config.console.search_limit {
        println!("Results capped at {}; narrow the term to see more.", users.len());
    }
    Ok(())
}

fn show_raw(
    user_id: &str,
    raw: Option<warden_directory::session::RawAccount>,
) -> anyhow::Result<()> {
    let Some(account) = raw else {
        println!("No account named '{user_id}'.");
        return Ok(());
    };
    println!("{}", account.dn());
    for (name, value) in warden_directory::codec::raw_attribute_map(&account.entry) {
        println!("  {name}: {value}");
    }
    Ok(())
}

fn state_label(state: PasswordState) -> &'static str {
    match state {
        PasswordState::NeverExpires => "never expires (account flag)",
        PasswordState::MustChangeAtNextLogon => "must change at next logon",
        PasswordState::NeverExpiresBySentinel => "never expires (pwdLastSet sentinel)",
        PasswordState::ComputedExpiry => "expires (directory-computed)",
        PasswordState::PolicyDerivedExpiry => "expires (derived from domain policy)",
        PasswordState::Unknown => "unknown",
    }
}
