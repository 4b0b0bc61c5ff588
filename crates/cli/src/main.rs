use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "warden", about = "Directory account state and policy console", version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "warden.toml")]
    config: String,

    /// Account to bind as (sAMAccountName, UPN, or DOMAIN\\user)
    #[arg(short, long)]
    username: String,

    /// Bind password; prefer the environment variable over the flag
    #[arg(long, env = "WARDEN_PASSWORD", hide_env_values = true)]
    password: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Bind to the directory and report the responding server
    TestConnection,
    /// Inspect user accounts
    #[command(subcommand)]
    User(UserCommands),
    /// Inspect groups
    #[command(subcommand)]
    Group(GroupCommands),
    /// Show the effective domain password policy
    Policy,
    /// Clear an account lockout
    Unlock {
        /// Account name of the user to unlock
        user_id: String,
    },
    /// Set a new password on an account
    ResetPassword {
        /// Account name of the user
        user_id: String,
        /// New password; omit to generate one
        #[arg(long)]
        new_password: Option<String>,
        /// Require the user to change the password at next logon
        #[arg(long)]
        force_change: bool,
    },
}

#[derive(clap::Subcommand)]
enum UserCommands {
    /// Show the full resolved state of one account
    Show {
        /// Account name (sAMAccountName)
        user_id: String,
        /// Dump the raw directory attributes instead of the resolved state
        #[arg(long)]
        raw: bool,
    },
    /// Search accounts by name or mail substring
    Search {
        /// Search term
        term: String,
    },
}

#[derive(clap::Subcommand)]
enum GroupCommands {
    /// List the direct members of a group
    Members {
        /// Group name (CN or account name)
        group: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::TestConnection => {
            commands::test_connection::run(&cli.config, &cli.username, &cli.password).await?;
        }
        Commands::User(UserCommands::Show { user_id, raw }) => {
            commands::user::show(&cli.config, &cli.username, &cli.password, &user_id, raw).await?;
        }
        Commands::User(UserCommands::Search { term }) => {
            commands::user::search(&cli.config, &cli.username, &cli.password, &term).await?;
        }
        Commands::Group(GroupCommands::Members { group }) => {
            commands::group::members(&cli.config, &cli.username, &cli.password, &group).await?;
        }
        Commands::Policy => {
            commands::policy::run(&cli.config, &cli.username, &cli.password).await?;
        }
        Commands::Unlock { user_id } => {
            commands::unlock::run(&cli.config, &cli.username, &cli.password, &user_id).await?;
        }
        Commands::ResetPassword {
            user_id,
            new_password,
            force_change,
        } => {
            commands::reset_password::run(
                &cli.config,
                &cli.username,
                &cli.password,
                &user_id,
                new_password.as_deref(),
                force_change,
            )
            .await?;
        }
    }

    Ok(())
}
