use std::path::PathBuf;

use activesync_backend_core::CollectionClass;
use clap::{Parser, Subcommand};

/// Configuration for the activesync-state tool.
#[derive(Parser, Debug, Clone)]
#[command(name = "activesync-state")]
#[command(about = "Inspect and reset persisted ActiveSync folder state")]
pub struct Config {
    /// Directory holding folder state files
    #[arg(long, env = "ACTIVESYNC_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List devices, or the folder states of one device
    List {
        #[arg(long)]
        device: Option<String>,
    },

    /// Print one folder state as JSON
    Show {
        #[arg(long)]
        device: String,

        #[arg(long)]
        folder: String,

        #[arg(long, default_value = "Email")]
        class: CollectionClass,
    },

    /// Drop folder state so the device resyncs from scratch
    Reset {
        #[arg(long)]
        device: String,

        /// Only this folder; every folder of the device when omitted
        #[arg(long, requires = "class")]
        folder: Option<String>,

        #[arg(long, requires = "folder")]
        class: Option<CollectionClass>,
    },
}

impl Config {
    /// Get the effective state directory.
    pub fn effective_state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("activesync")
                .join("state")
        })
    }
}
