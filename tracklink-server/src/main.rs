mod cli;

use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use tracklink_core::introspect::describe_all_json;
use tracklink_core::{register_builtin, Config, Dispatcher, MemoryHost, RegistryBuilder};
use tracklink_net::{Decoder, OscServer};

use cli::Args;

const IDLE_WAIT: Duration = Duration::from_millis(50);

fn init_logging(verbose: bool) {
    use simplelog::{LevelFilter, WriteLogger};

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tracklink")
        .join("tracklink.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("tracklink: cannot create {}: {}", log_path.display(), e);
            return;
        }
    };

    if WriteLogger::init(log_level, simplelog::Config::default(), log_file).is_err() {
        eprintln!("tracklink: logger already initialised");
        return;
    }

    log::info!("tracklink starting (log level: {:?})", log_level);
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::load(),
    };
    let server_settings = args.apply(config.server.clone());

    let mut builder = RegistryBuilder::new();
    register_builtin(&mut builder, &config.dispatch).context("registering built-in actions")?;
    let dispatcher = Dispatcher::new(Arc::new(builder.build()))
        .with_rejection_log(config.dispatch.log_rejections);

    if args.list_actions {
        println!("{}", describe_all_json(dispatcher.registry())?);
        return Ok(());
    }

    let server = OscServer::bind(
        server_settings.protocol,
        server_settings.address(),
        Decoder::new(server_settings.address_prefix.clone()),
    )
    .with_context(|| format!("binding {}", server_settings.address()))?;

    eprintln!(
        "tracklink listening on {}://{} ({} actions, prefix {})",
        server.protocol(),
        server.local_addr(),
        dispatcher.registry().len(),
        server_settings.address_prefix,
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })
    .context("installing signal handler")?;

    let mut host = MemoryHost::new();
    while !shutdown.load(Ordering::Relaxed) {
        let Some(first) = server.recv_timeout(IDLE_WAIT) else {
            continue;
        };
        dispatcher.dispatch_message(&mut host, &first);
        let rest = server.poll_messages();
        dispatcher.dispatch_all(&mut host, &rest);
    }

    log::info!("tracklink shutting down");
    Ok(())
}
