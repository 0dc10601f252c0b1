mod app;
mod config;
mod export;
mod protocol;
mod results;
mod serial;
mod session;
mod ui;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, APP_ID};

#[derive(Parser, Debug)]
#[command(version, about = "Live speed readout and leaderboard for a serial speed sensor")]
struct Args {
    /// Serial port the sensor is attached to
    #[arg(short, long)]
    port: Option<String>,

    #[arg(short, long)]
    baud: Option<u32>,

    /// Milliseconds between reading requests while measuring
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: Option<u64>,

    /// Config file to read instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Default destination offered by the export prompt
    #[arg(short, long)]
    export: Option<PathBuf>,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(port) = self.port {
            config.port_name = port;
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }
        if let Some(interval) = self.interval_ms {
            config.request_interval_ms = interval;
        }
        if let Some(export) = self.export {
            config.export_path = export;
        }
    }
}

fn init_logging(log_dir: &Path) -> WorkerGuard {
    let (writer, guard) = match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(APP_ID)
        .filename_suffix("log")
        .build(log_dir)
    {
        Ok(appender) => tracing_appender::non_blocking(appender),
        Err(e) => {
            eprintln!("logging disabled: {e}");
            tracing_appender::non_blocking(std::io::sink())
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();
    guard
}

fn main() -> Result<()> {
    let args = Args::parse();
    let loaded = Config::load_from(args.config.as_deref());
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    args.apply(&mut config);

    let _guard = init_logging(&config.log_dir);
    if let Err(e) = loaded {
        tracing::warn!("Failed to load config, using defaults: {}", e);
    }
    tracing::info!(port = %config.port_name, baud = config.baud_rate, "starting doppler");

    app::run(&config)
}
