//! signer-auth - Sign in to the authorization service with an external signer.

mod commands;

use std::path::PathBuf;

use auth_config_and_utils::{init_logging, Config, Paths};
use clap::{Parser, Subcommand};

/// signer-auth command-line interface.
#[derive(Parser)]
#[command(name = "signer-auth")]
#[command(about = "Signer-backed sign-in and session management")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, session, and logs. Defaults to ~/.signer-auth
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sign-in handshake
    SignIn,
    /// Clear the stored session
    SignOut,
    /// Print a bearer token, signing in again if the session is stale
    Token,
    /// Print the session profile, signing in again if the session is stale
    Profile,
    /// Print the stored session state without contacting the service
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;

    paths.ensure_dirs()?;
    init_logging(
        cli.log_level.as_deref().unwrap_or(&config.log_level),
        Some(&paths.log_file()),
    );

    let output = match cli.command {
        Commands::SignIn => commands::sign_in(&config, &paths).await?,
        Commands::SignOut => commands::sign_out(&config, &paths)?,
        Commands::Token => commands::token(&config, &paths).await?,
        Commands::Profile => commands::profile(&config, &paths).await?,
        Commands::Status => commands::status(&paths)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
