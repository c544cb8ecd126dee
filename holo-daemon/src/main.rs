//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

mod config;

use std::path::Path;

use clap::{App, Arg};
use config::{Config, LoggingFileRotation, LoggingFmtStyle};
use holo_bgpvpn::PluginSender;
use holo_bgpvpn::api::Request;
use holo_bgpvpn::driver::{DriverRegistry, ServiceProvider};
use holo_bgpvpn::error::{Result, Status};
use holo_bgpvpn::manager::AssociationManager;
use holo_bgpvpn::plugin::{Plugin, Response};
use holo_bgpvpn::registry::StaticRegistry;
use holo_bgpvpn::store::Store;
use pickledb::{PickleDb, PickleDbDumpPolicy, SerializationMethod};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::{mpsc, oneshot};
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::Layer;
use tracing_subscriber::prelude::*;

// Outcome of a request, printed as a JSON line.
#[derive(Debug, Serialize)]
struct Reply {
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<Response>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn init_tracing(config: &config::Logging) {
    // Enable logging to journald.
    let journald = config.journald.enabled.then(|| {
        tracing_journald::layer().expect("couldn't connect to journald")
    });

    // Enable logging to a file.
    let file = config.file.enabled.then(|| {
        let file_appender = match config.file.rotation {
            LoggingFileRotation::Never => {
                rolling::never(&config.file.dir, &config.file.name)
            }
            LoggingFileRotation::Hourly => {
                rolling::hourly(&config.file.dir, &config.file.name)
            }
            LoggingFileRotation::Daily => {
                rolling::daily(&config.file.dir, &config.file.name)
            }
        };

        let log_level_filter = LevelFilter::from_level(tracing::Level::TRACE);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(false)
            .with_thread_ids(config.file.fmt.show_thread_id)
            .with_file(config.file.fmt.show_source)
            .with_line_number(config.file.fmt.show_source)
            .with_ansi(config.file.fmt.colors);
        let layer = match config.file.fmt.style {
            LoggingFmtStyle::Compact => layer.compact().boxed(),
            LoggingFmtStyle::Full => layer.boxed(),
            LoggingFmtStyle::Json => layer.json().boxed(),
            LoggingFmtStyle::Pretty => layer.pretty().boxed(),
        };
        layer.with_filter(log_level_filter)
    });

    // Enable logging to stderr. Stdout carries the request replies.
    let stdout = config.stdout.enabled.then(|| {
        let log_level_filter = LevelFilter::from_level(tracing::Level::TRACE);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(config.stdout.fmt.show_thread_id)
            .with_file(config.stdout.fmt.show_source)
            .with_line_number(config.stdout.fmt.show_source)
            .with_ansi(config.stdout.fmt.colors);
        let layer = match config.stdout.fmt.style {
            LoggingFmtStyle::Compact => layer.compact().boxed(),
            LoggingFmtStyle::Full => layer.boxed(),
            LoggingFmtStyle::Json => layer.json().boxed(),
            LoggingFmtStyle::Pretty => layer.pretty().boxed(),
        };
        layer.with_filter(log_level_filter)
    });

    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive("holo=debug".parse().unwrap())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(env_filter)
        .with(journald)
        .with(file)
        .with(stdout)
        .init();
}

fn init_db<P: AsRef<Path>>(
    path: P,
) -> std::result::Result<PickleDb, pickledb::error::Error> {
    let dump_policy = PickleDbDumpPolicy::AutoDump;
    let serialization_method = SerializationMethod::Bin;
    match path.as_ref().exists() {
        true => PickleDb::load(path, dump_policy, serialization_method),
        false => Ok(PickleDb::new(path, dump_policy, serialization_method)),
    }
}

fn init_plugin(config: &Config, db: PickleDb) -> Result<Plugin> {
    // Load the drivers of the configured service providers.
    let providers = config
        .service_providers
        .iter()
        .map(|provider| provider.parse::<ServiceProvider>())
        .collect::<Result<Vec<_>>>()?;
    let drivers = DriverRegistry::load(&providers, &config.event_recorder)?;
    info!(?drivers, "loaded drivers");

    let resources =
        StaticRegistry::new(config.networks.clone(), config.routers.clone());
    let store = Store::with_db(db);
    let manager =
        AssociationManager::new(store, Box::new(resources), drivers);
    Ok(Plugin::new(manager))
}

fn signal_listener() -> mpsc::Receiver<()> {
    let (signal_tx, signal_rx) = mpsc::channel(1);

    tokio::task::spawn(async move {
        let mut sigint = signal(SignalKind::interrupt()).unwrap();
        let mut sigterm = signal(SignalKind::terminate()).unwrap();

        tokio::select! {
            _ = sigint.recv() => {
                info!("received SIGINT");
                let _ = signal_tx.send(()).await;
            },
            _ = sigterm.recv() => {
                info!("received SIGTERM");
                let _ = signal_tx.send(()).await;
            }
        }
    });

    signal_rx
}

// Reads requests as JSON lines and prints one reply line per request, until
// the input is exhausted or a termination signal is received.
async fn serve<R>(
    reader: R,
    plugin_tx: PluginSender,
    mut signal_rx: mpsc::Receiver<()>,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = signal_rx.recv() => break,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                error!(%error, "failed to read request");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<Request>(&line) {
            Ok(request) => process_request(&plugin_tx, request).await,
            Err(error) => {
                warn!(%error, "failed to decode request");
                Reply {
                    status: Status::BadRequest.code(),
                    response: None,
                    error: Some(error.to_string()),
                }
            }
        };
        match serde_json::to_string(&reply) {
            Ok(reply) => println!("{reply}"),
            Err(error) => error!(%error, "failed to encode reply"),
        }
    }
}

async fn process_request(plugin_tx: &PluginSender, request: Request) -> Reply {
    let (responder_tx, responder_rx) = oneshot::channel();
    let request = Request {
        responder: Some(responder_tx),
        ..request
    };

    let result = match plugin_tx.send(request).await {
        Ok(()) => responder_rx.await.ok(),
        Err(_) => None,
    };
    match result {
        Some(Ok(response)) => Reply {
            status: response.status().code(),
            response: Some(response),
            error: None,
        },
        Some(Err(error)) => Reply {
            status: error.status().code(),
            response: None,
            error: Some(error.to_string()),
        },
        None => Reply {
            status: Status::InternalError.code(),
            response: None,
            error: Some("plugin task is gone".to_owned()),
        },
    }
}

fn build_version() -> String {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    match rustc_tools_util::get_version_info!().commit_hash {
        Some(hash) => format!("{VERSION} ({hash})"),
        None => VERSION.to_owned(),
    }
}

// ===== main =====

fn main() {
    // Parse command-line parameters.
    let matches = App::new("Holo BGPVPN daemon")
        .version(build_version().as_str())
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("file")
                .help("Specify an alternative configuration file."),
        )
        .arg(
            Arg::with_name("replay")
                .long("replay")
                .value_name("file")
                .help("Process the requests stored in a JSON lines file."),
        )
        .get_matches();

    // Read configuration file.
    let config_file = matches.value_of("config");
    let config = Config::load(config_file);

    // Initialize tracing.
    init_tracing(&config.logging);

    // Initialize non-volatile storage.
    let db = init_db(&config.database_path)
        .expect("failed to initialize non-volatile storage");

    // Initialize the BGPVPN plugin.
    let plugin = match init_plugin(&config, db) {
        Ok(plugin) => plugin,
        Err(error) => {
            error!(%error, "failed to initialize plugin");
            eprintln!("failed to initialize plugin: {error}");
            std::process::exit(1);
        }
    };

    // We're ready to go!
    info!("starting up");

    // Main loop.
    let replay = matches.value_of("replay");
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create async runtime")
        .block_on(async {
            // Spawn signal listener.
            let signal_rx = signal_listener();

            // Spawn the plugin task.
            let plugin_tx = holo_bgpvpn::start(plugin);

            // Serve requests from the replay file or from stdin.
            match replay {
                Some(path) => match tokio::fs::File::open(path).await {
                    Ok(file) => {
                        serve(BufReader::new(file), plugin_tx, signal_rx)
                            .await
                    }
                    Err(error) => {
                        error!(%path, %error, "failed to open replay file");
                    }
                },
                None => {
                    let stdin = BufReader::new(tokio::io::stdin());
                    serve(stdin, plugin_tx, signal_rx).await;
                }
            }
        });

    info!("exiting");
}
