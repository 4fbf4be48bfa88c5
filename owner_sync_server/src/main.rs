use clap::Parser;
use owner_sync_core::{HubSpotClient, OwnerSync, SyncConfig, SyncJob, SyncScheduler};
use owner_sync_server::cli::{Cli, Commands};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    owner_sync_core::o11y::init_global_from_env()?;
    let cli = Cli::parse();
    let cfg = SyncConfig::from_env()?;

    match cli.command.unwrap_or_else(Commands::default_serve) {
        Commands::Serve { host, port } => {
            let addr: SocketAddr = format!("{host}:{port}").parse()?;
            if cfg.api_key.is_empty() {
                tracing::warn!("API_KEY is not set; every HubSpot call will be rejected");
            }

            let client = Arc::new(HubSpotClient::from_config(&cfg)?);
            let job = Arc::new(OwnerSync::new(client, &cfg));

            // A bad schedule only disables syncing; the listener still starts.
            let _scheduler = match SyncScheduler::new(&cfg.schedule, job) {
                Ok(scheduler) => Some(Arc::new(scheduler).start()),
                Err(e) => {
                    tracing::error!(error = %e, "error scheduling sync job");
                    None
                }
            };

            owner_sync_server::server::serve(addr).await?;
        }
        Commands::RunOnce { dry_run } => {
            let client = Arc::new(HubSpotClient::from_config(&cfg)?);
            let job = OwnerSync::new(client, &cfg).with_dry_run(dry_run || cfg.dry_run);
            let report = job.run().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Config => {
            let mut out = cfg.redacted();
            if let (Commands::Serve { host, port }, Some(obj)) =
                (Commands::default_serve(), out.as_object_mut())
            {
                obj.insert("HOST".to_string(), host.into());
                obj.insert("PORT".to_string(), port.into());
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}
