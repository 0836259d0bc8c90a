use activesync_backend_core::StateKey;
use activesync_state_local::config::{Command, Config};
use activesync_state_local::{inspect, FileStateStore};
use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    let state_dir = config.effective_state_dir();
    debug!("State directory: {}", state_dir.display());

    let store = FileStateStore::new(&state_dir);

    match config.command {
        Command::List { device: None } => {
            for device in store.list_devices().await? {
                println!("{}", device);
            }
        }
        Command::List {
            device: Some(device),
        } => {
            for summary in inspect::summarize(&store, &device).await? {
                println!("{}", summary);
            }
        }
        Command::Show {
            device,
            folder,
            class,
        } => {
            let key = StateKey::new(device, folder, class);
            let rendered = inspect::show(&store, &key)
                .await?
                .with_context(|| format!("No state stored for {}", key))?;
            println!("{}", rendered);
        }
        Command::Reset {
            device,
            folder,
            class,
        } => {
            let only = match (folder, class) {
                (Some(folder), Some(class)) => Some(StateKey::new(device.clone(), folder, class)),
                _ => None,
            };
            let removed = inspect::reset(&store, &device, only).await?;
            info!("Removed {} folder state(s) for device {}", removed, device);
        }
    }

    Ok(())
}
