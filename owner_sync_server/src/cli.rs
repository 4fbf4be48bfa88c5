use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "owner-sync",
    version,
    about = "Keeps HubSpot contact owners in line with their latest deal"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the scheduler and the liveness listener (default if no subcommand given).
    Serve {
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "PORT", default_value = "3000")]
        port: u16,
    },

    /// Run a single reconciliation and exit.
    RunOnce {
        /// Log decisions without updating any contact (overrides DRY_RUN).
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the effective configuration (credential redacted).
    Config,
}

impl Commands {
    /// `serve` with host/port taken from the environment or defaults.
    pub fn default_serve() -> Self {
        let host = std::env::var("HOST")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(3000);
        Self::Serve { host, port }
    }
}
