use warden_directory::MemberKind;

use super::open_session;

/// Run the `group members` command.
pub async fn members(
    config_path: &str,
    username: &str,
    password: &str,
    group: &str,
) -> anyhow::Result<()> {
    let (_config, mut session) = open_session(config_path, username, password).await?;
    let result = session.find_group_members(group).await;
    session.disconnect().await;

    let members = result?;
    if members.is_empty() {
        println!("Group '{group}' has no members or does not exist.");
        return Ok(());
    }

    println!("{} member(s) of '{group}':", members.len());
    for member in &members {
        let kind = match member.kind {
            MemberKind::User => "user",
            MemberKind::Group => "group",
            MemberKind::Other => "other",
        };
        let status = match member.enabled {
            Some(true) => "",
            Some(false) => "  [disabled]",
            None => "",
        };
        println!(
            "  {:<7} {:<20} {}{}",
            kind, member.account_name, member.display_name, status
        );
    }
    Ok(())
}
