use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use f1stream::codec::encode_samples;
use f1stream::transports::{MemoryBroker, MqttConnector};
use f1stream::{Bridge, BridgeConfig, Connection, Montage, SampleSink, topics};

#[derive(Parser, Debug)]
#[command(
    name = "f1stream",
    version,
    about = "Stream F1 amplifier EEG telemetry as an evenly time-stamped sample stream",
    long_about = "Connects to the amplifier's MQTT broker, requests sampling with the selected \
                  montage and republishes the samples. Press Ctrl-C to stop sampling and exit."
)]
struct Cli {
    /// Montage ID (0: 23-channel 10-20, 1: Fp2 + heart rate)
    #[arg(short, long)]
    montage: Option<u32>,

    /// Output stream name
    #[arg(short = 'n', long = "name")]
    stream_name: Option<String>,

    /// Output stream type
    #[arg(short = 't', long = "type")]
    stream_type: Option<String>,

    /// Broker host
    #[arg(long, env = "F1STREAM_HOST")]
    host: Option<String>,

    /// Broker port
    #[arg(long)]
    port: Option<u16>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Run against a simulated amplifier instead of the broker
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn resolve_config(&self) -> anyhow::Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => BridgeConfig::default(),
        };

        if let Some(montage) = self.montage {
            config.montage = montage;
        }
        if let Some(name) = &self.stream_name {
            config.stream_name = name.clone();
        }
        if let Some(stream_type) = &self.stream_type {
            config.stream_type = stream_type.clone();
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("f1stream={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(feature = "lsl")]
fn open_sink(config: &BridgeConfig, montage: &Montage) -> anyhow::Result<Box<dyn SampleSink>> {
    let sink = f1stream::LslSink::new(&config.stream_name, &config.stream_type, &config.source_id, montage)
        .context("creating LSL outlet")?;
    Ok(Box::new(sink))
}

#[cfg(not(feature = "lsl"))]
fn open_sink(config: &BridgeConfig, montage: &Montage) -> anyhow::Result<Box<dyn SampleSink>> {
    tracing::warn!(
        stream = %config.stream_name,
        channels = montage.stream_width(),
        "Built without the lsl feature; samples are only traced"
    );
    Ok(Box::new(f1stream::TracingSink::new()))
}

/// Feed the loopback broker like an amplifier would: device info once,
/// then a block of samples every 40 ms until cancelled.
fn simulate_amplifier(broker: MemoryBroker, montage: &'static Montage, cancel: CancellationToken) {
    const BLOCK: u32 = 20;
    let period = Duration::from_secs_f64(f64::from(BLOCK) / montage.sampling_rate);
    let channels = montage.channel_count();

    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        broker.inject(topics::DEVICE_INFO, r#"{"scale_to_uV": 0.5364}"#);
        broker.inject(topics::BATTERY_VOLTAGE, "3.9");
        broker.inject(topics::BATTERY_CHARGE, "87");

        let mut position = 0u32;
        while !cancel.is_cancelled() {
            let rows: Vec<Vec<i32>> = (position..position + BLOCK)
                .map(|p| (0..channels).map(|c| ((p as i32 + c as i32 * 7) % 200) - 100).collect())
                .collect();
            if !broker.inject(topics::DATA_SAMPLES, encode_samples(position, &rows)) {
                break;
            }
            position += BLOCK;
            std::thread::sleep(period);
        }
    });
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.resolve_config()?;
    let montage = config.montage()?;
    info!(montage = montage.id, channels = montage.channel_count(), "Using montage {}", montage.name);

    let sink = open_sink(&config, montage)?;
    let shutdown = CancellationToken::new();

    let mut connection = if cli.dry_run {
        let broker = MemoryBroker::new();
        simulate_amplifier(broker.clone(), montage, shutdown.clone());
        Connection::new(broker.connector())
    } else {
        Connection::new(MqttConnector::new(config.mqtt_settings()))
    };
    connection.connect(&config.host).with_context(|| format!("connecting to {}", config.host))?;

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted");
            }
            shutdown.cancel();
        });
    }

    let mut bridge = Bridge::new(montage, sink).with_timing(config.timing());
    bridge.run(&mut connection, shutdown).await.context("bridge stopped")?;

    let stats = bridge.stats();
    info!(
        samples = stats.samples_emitted,
        runs = stats.runs_processed,
        skipped = stats.records_skipped,
        mismatches = stats.channel_mismatches,
        "Done"
    );
    Ok(())
}
