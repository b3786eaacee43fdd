//! w1therm - DS18B20 1-Wire temperature polling binary
//!
//! A standalone binary for discovering, reading, and continuously polling
//! DS18B20-class 1-Wire temperature sensors with calibration and filtering.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use futures_util::StreamExt;
use std::time::Duration;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use w1therm::{
    load_driver_modules, RunFlag, SensorConfig, SensorPoller, TemperatureReading,
    TemperatureUnit, TracingNotifier, W1Bus, DEFAULT_NOTIFY_TIMEOUT_MS,
    DEFAULT_UPDATE_INTERVAL_MS,
};

#[derive(Parser)]
#[command(name = "w1therm")]
#[command(about = "Calibrated DS18B20 1-Wire temperature polling")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Polls DS18B20 sensors over the kernel 1-Wire sysfs \
interface with calibration, filtering, and exponential smoothing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 1-Wire sysfs directory (override for testing)
    #[arg(long, default_value = w1therm::device::DEFAULT_BUS_ROOT)]
    bus_root: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List temperature sensors found on the bus
    List,

    /// Take a single raw reading from one sensor and exit
    Read(ReadArgs),

    /// Poll one sensor continuously until interrupted
    Run(RunArgs),
}

#[derive(Args)]
struct ReadArgs {
    /// Sensor address (e.g. 28-000005e2fdc3)
    address: String,

    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

#[derive(Args)]
struct RunArgs {
    /// Sensor address (e.g. 28-000005e2fdc3)
    address: String,

    /// Calibration bias (added after the polynomial terms)
    #[arg(long, default_value_t = 0.0)]
    bias: f64,

    /// Linear calibration coefficient
    #[arg(long, default_value_t = 1.0)]
    linear: f64,

    /// Quadratic calibration coefficient
    #[arg(long, default_value_t = 0.0)]
    quadratic: f64,

    /// Exponential moving average weight, >0 and <=1 (1 disables smoothing)
    #[arg(long, default_value_t = 1.0)]
    alpha: f64,

    /// ADC precision in bits (9-12)
    #[arg(long, default_value_t = 12)]
    precision: u8,

    /// Polling interval in milliseconds (minimum 1000)
    #[arg(short, long, default_value_t = DEFAULT_UPDATE_INTERVAL_MS)]
    interval: u64,

    /// Low plausibility filter threshold
    #[arg(long)]
    low: Option<f64>,

    /// High plausibility filter threshold
    #[arg(long)]
    high: Option<f64>,

    /// Filtered-value notification duration in ms (0 disables)
    #[arg(long, default_value_t = DEFAULT_NOTIFY_TIMEOUT_MS)]
    filtered_timeout: u64,

    /// Overrun notification duration in ms (0 disables)
    #[arg(long, default_value_t = DEFAULT_NOTIFY_TIMEOUT_MS)]
    overrun_timeout: u64,

    /// Display unit: C or F
    #[arg(long, default_value = "C")]
    unit: TemperatureUnit,

    /// Skip loading the w1-gpio/w1-therm kernel modules
    #[arg(long)]
    no_modprobe: bool,

    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match &cli.command {
        Commands::List => list_command(&cli),
        Commands::Read(args) => read_command(&cli, args),
        Commands::Run(args) => run_command(&cli, args).await,
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn list_command(cli: &Cli) -> anyhow::Result<()> {
    let bus = W1Bus::with_root(&cli.bus_root);
    let sensors = bus.discover_sensors();

    if sensors.is_empty() {
        println!("No 1-Wire temperature sensors found under {}", cli.bus_root);
        println!("(are the w1-gpio and w1-therm modules loaded?)");
    } else {
        for address in sensors {
            println!("{}", address);
        }
    }

    Ok(())
}

fn read_command(cli: &Cli, args: &ReadArgs) -> anyhow::Result<()> {
    let bus = W1Bus::with_root(&cli.bus_root);
    let probe = bus.probe(&args.address);

    let reading = probe
        .read_temperature()
        .with_context(|| format!("could not read sensor {}", args.address))?;

    match (args.format.as_str(), reading) {
        ("json", value) => {
            println!(
                "{}",
                serde_json::json!({ "address": args.address, "celsius": value })
            );
        }
        ("pretty", Some(celsius)) => {
            println!("{}: {:.3}°C (raw)", args.address, celsius);
        }
        ("pretty", None) => {
            println!(
                "{}: not ready (conversion in progress or CRC failure)",
                args.address
            );
        }
        (other, _) => {
            anyhow::bail!("unsupported format: {}. Use 'json' or 'pretty'", other);
        }
    }

    Ok(())
}

async fn run_command(cli: &Cli, args: &RunArgs) -> anyhow::Result<()> {
    if !args.no_modprobe {
        load_driver_modules();
    }

    let mut config = SensorConfig::new(&args.address)
        .with_calibration(args.quadratic, args.linear, args.bias)
        .with_alpha(args.alpha)
        .with_precision(args.precision)
        .with_update_interval(Duration::from_millis(args.interval))
        .with_notify_timeouts(
            Duration::from_millis(args.filtered_timeout),
            Duration::from_millis(args.overrun_timeout),
        )
        .with_unit(args.unit);
    if let (Some(low), Some(high)) = (args.low, args.high) {
        config = config.with_filters(low, high);
    }

    let bus = W1Bus::with_root(&cli.bus_root);
    let probe = bus.probe(&args.address);
    let flag = RunFlag::new();

    // Ctrl-C requests a cooperative stop; the iteration in flight finishes.
    let stop_flag = flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after the current iteration");
            stop_flag.stop();
        }
    });

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let json = args.format == "json";
    let printer = tokio::spawn(async move {
        let mut readings = UnboundedReceiverStream::new(rx);
        while let Some(reading) = readings.next().await {
            print_reading(&reading, json);
        }
    });

    info!(
        "polling {} every {}ms (precision {} bit, unit {})",
        args.address,
        args.interval,
        args.precision,
        config.unit.symbol()
    );

    let mut poller = SensorPoller::new(config, probe, tx, TracingNotifier);
    let result = poller.run(&flag).await;
    drop(poller);
    printer.await.ok();

    result.with_context(|| format!("polling of {} failed", args.address))
}

fn print_reading(reading: &TemperatureReading, json: bool) {
    if json {
        match serde_json::to_string(reading) {
            Ok(line) => println!("{}", line),
            Err(err) => tracing::error!("could not serialize reading: {}", err),
        }
    } else {
        let stamp = chrono::DateTime::from_timestamp_millis(reading.timestamp as i64)
            .unwrap_or_default()
            .format("%Y-%m-%d %H:%M:%S");
        println!("[{}] {}", stamp, reading);
    }
}
