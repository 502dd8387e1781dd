use std::path::PathBuf;

use clap::Parser;

use tracklink_core::ServerSettings;
use tracklink_types::Protocol;

/// OSC remote control server.
#[derive(Parser, Debug)]
#[command(name = "tracklink", version, about)]
pub struct Args {
    /// Config file to merge over the built-in defaults
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub bind: Option<String>,

    /// Listen on TCP (length-prefixed OSC) instead of UDP
    #[arg(long)]
    pub tcp: bool,

    /// Log at debug level
    #[arg(long, short)]
    pub verbose: bool,

    /// Print the registered actions as JSON and exit
    #[arg(long)]
    pub list_actions: bool,
}

impl Args {
    /// Command-line flags take precedence over the config file.
    pub fn apply(&self, mut settings: ServerSettings) -> ServerSettings {
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(bind) = &self.bind {
            settings.bind = bind.clone();
        }
        if self.tcp {
            settings.protocol = Protocol::Tcp;
        }
        settings
    }
}
