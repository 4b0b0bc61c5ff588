use warden_core::passwords;
use warden_directory::ChangeOutcome;

use super::open_session;

// Floor for generated passwords even when the domain minimum is lower.
const GENERATED_LENGTH_FLOOR: usize = 16;

/// Run the `reset-password` command.
///
/// When no password is supplied one is generated against the domain policy
/// and printed once; it is never logged.
pub async fn run(
    config_path: &str,
    username: &str,
    password: &str,
    user_id: &str,
    new_password: Option<&str>,
    force_change: bool,
) -> anyhow::Result<()> {
    let (_config, mut session) = open_session(config_path, username, password).await?;
    let result = reset(&mut session, user_id, new_password, force_change).await;
    session.disconnect().await;

    let (outcome, generated) = result?;
    println!("Account '{user_id}': {outcome}.");
    if let Some(candidate) = generated {
        println!("Generated password: {candidate}");
        println!("Record it now; it is not stored anywhere.");
    }
    if force_change {
        println!("The user must change the password at next logon.");
    }
    Ok(())
}

async fn reset(
    session: &mut warden_directory::DirectorySession,
    user_id: &str,
    new_password: Option<&str>,
    force_change: bool,
) -> anyhow::Result<(ChangeOutcome, Option<String>)> {
    let policy = session.policy().await?;
    let min_length = policy.min_password_length as usize;

    let (candidate, generated) = match new_password {
        Some(supplied) => {
            if !passwords::meets_requirements(supplied, min_length, policy.complexity_required) {
                anyhow::bail!(
                    "supplied password does not meet the domain policy \
                     (min length {min_length}, complexity {})",
                    if policy.complexity_required {
                        "required"
                    } else {
                        "not required"
                    }
                );
            }
            (supplied.to_string(), None)
        }
        None => {
            let length = min_length.max(GENERATED_LENGTH_FLOOR);
            let candidate = passwords::generate_candidate(length);
            (candidate.clone(), Some(candidate))
        }
    };

    let outcome = session
        .change_password(user_id, &candidate, force_change)
        .await?;
    Ok((outcome, generated))
}
