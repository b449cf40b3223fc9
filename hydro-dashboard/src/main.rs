use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use crossbeam_channel::unbounded;
use feed_abstraction::MemoryFeed;
use hydro_dashboard::config::Config;
use hydro_dashboard::dashboard::{Dashboard, DashboardSettings};
use hydro_dashboard::event_loop::{create_event_loop, handle_message, Dispatcher};
use hydro_dashboard::mqtt::{mqtt_create, BridgedFeed, Topics};
use hydro_dashboard::view::{ConsoleChart, ConsoleView};
use log::*;
use rumqttc::QoS;
use software_defined_hydroponics::export::csv::export_snapshot;
use software_defined_hydroponics::state::feed::Query;
use software_defined_hydroponics::state::traits::RealtimeFeed;
use software_defined_hydroponics::utils::time::{SystemClock, TimeFormat};

/// Hydroponic rig dashboard and nutrient pump controller
#[derive(Parser)]
#[command(name = "hydro-dashboard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the broker and run the dashboard
    Run {
        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Export monitoring history from a JSON feed export to CSV
    Export {
        /// JSON export of the feed tree
        #[arg(long, value_name = "FILE")]
        snapshot: PathBuf,

        /// Directory to write the CSV file to (defaults to the configured one)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(&path),
        None => Ok(Config::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { config } => run(load_config(config)?),
        Commands::Export {
            snapshot,
            out_dir,
            config,
        } => export(load_config(config)?, snapshot, out_dir),
    }
}

fn run(config: Config) -> Result<()> {
    let local = match &config.seed {
        Some(path) => MemoryFeed::load(path)
            .with_context(|| format!("Failed to seed feed from {}", path.display()))?,
        None => MemoryFeed::new(),
    };

    let topics = Topics::new(&config.mqtt.topic_prefix, &config.feed);
    let (client, connection) = mqtt_create(&config.mqtt);
    let feed = BridgedFeed::new(local.clone(), client.clone(), topics.clone());

    let (command_tx, command_rx) = unbounded();
    let handler_topics = topics.clone();
    let _mqtt = create_event_loop(
        client.clone(),
        connection,
        topics.clone(),
        move |topic, payload| {
            handle_message(topic, payload, &local, &handler_topics, &command_tx);
        },
    )
    .context("Failed to start MQTT thread")?;

    let mut dashboard = Dashboard::new(
        feed.clone(),
        DashboardSettings::from(&config),
        ConsoleView::default(),
        SystemClock,
        ConsoleChart::new,
    );

    let responses = topics.responses.clone();
    let mut dispatcher =
        Dispatcher::subscribe(&dashboard, &feed, command_rx, config.export.out_dir.clone())
            .context("Failed to subscribe to the feed")?
            .on_response(move |response| {
                if let Err(e) = client.try_publish(
                    responses.as_str(),
                    QoS::AtLeastOnce,
                    false,
                    response.as_bytes().to_vec(),
                ) {
                    error!("Failed to publish to {}: {}", responses, e);
                }
            });

    info!(
        "Dashboard running against mqtt://{}:{} under \"{}\"",
        config.mqtt.host, config.mqtt.port, config.mqtt.topic_prefix
    );
    dispatcher.run(&mut dashboard);
    Ok(())
}

fn export(config: Config, snapshot: PathBuf, out_dir: Option<PathBuf>) -> Result<()> {
    let feed = MemoryFeed::load(&snapshot)
        .with_context(|| format!("Failed to load {}", snapshot.display()))?;
    let records = feed.once(Query::path(config.feed.monitoring.clone()))?;

    let format = TimeFormat::new(config.display.utc_offset_minutes);
    let dir = out_dir.unwrap_or(config.export.out_dir);
    let path = export_snapshot(&records, &format, &dir, Utc::now())?;

    println!("{}", path.display());
    Ok(())
}
