use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "gossipview", version, about = "Terminal dashboard for gossip cluster status")]
pub struct Cli {
    /// Dashboard host serving /config and the gossip proxy
    #[arg(long, env = "GOSSIPVIEW_UI_URL", default_value = "http://localhost:8080")]
    pub ui_url: String,

    /// Settings file location
    #[arg(long, env = "GOSSIPVIEW_SETTINGS")]
    pub settings_file: Option<PathBuf>,

    /// Log file location
    #[arg(long, env = "GOSSIPVIEW_LOG")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch once and print the card list instead of opening the dashboard
    Snapshot {
        /// Print an HTML fragment instead of plain text
        #[arg(long)]
        html: bool,
    },
}

impl Cli {
    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(default_log_path)
    }
}

/// `$XDG_STATE_HOME/gossipview/gossipview.log`, else under
/// `$HOME/.local/state`, else the working directory.
pub fn default_log_path() -> PathBuf {
    let state_dir = std::env::var_os("XDG_STATE_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .filter(|v| !v.is_empty())
                .map(|home| PathBuf::from(home).join(".local").join("state"))
        });
    match state_dir {
        Some(dir) => dir.join("gossipview").join("gossipview.log"),
        None => PathBuf::from("gossipview.log"),
    }
}
