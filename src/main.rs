use anyhow::{bail, Context};
use clap::Parser;
use cmdmetrics::collectors::{Collector, SystemRunner};
use cmdmetrics::config::Config;
use cmdmetrics::drivers::{self, megacli};
use cmdmetrics::error::ConfigError;
use cmdmetrics::record::{Record, Tags};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Command-line arguments
#[derive(Parser)]
#[command(
    name = "cmdmetrics",
    about = "Extract typed metric records from RAID, packet-filter and pika tool output",
    long_about = "Runs MegaCli, iptables and redis-cli against the configured targets, parses \
                  their human-oriented output into tagged, typed records and prints them as \
                  JSON lines. With --driver and --input a previously captured output file is \
                  parsed instead."
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", help = "Configuration file path (TOML format)")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose logging output (sets RUST_LOG=debug)")]
    verbose: bool,

    /// Run a single collection cycle even if an interval is configured
    #[arg(long)]
    once: bool,

    /// Driver used to replay a captured output file
    #[arg(long, value_name = "NAME", requires = "input")]
    driver: Option<String>,

    /// Captured output file to parse with --driver
    #[arg(long, value_name = "FILE", requires = "driver")]
    input: Option<PathBuf>,

    /// Table the replayed iptables listing came from
    #[arg(long, default_value = "filter")]
    table: String,

    /// Chain the replayed iptables listing came from
    #[arg(long, default_value = "INPUT")]
    chain: String,
}

impl Cli {
    /// Validate the CLI arguments
    fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.driver {
            if !drivers::DRIVER_NAMES.contains(&name.as_str()) {
                return Err(format!(
                    "Unknown driver {}, expected one of: {}",
                    name,
                    drivers::DRIVER_NAMES.join(", ")
                ));
            }
        }
        if let Some(config_path) = &self.config {
            if config_path.exists() && !config_path.is_file() {
                return Err(format!(
                    "Configuration path is not a file: {}",
                    config_path.display()
                ));
            }
        }
        Ok(())
    }
}

/// Load configuration from file or use defaults
///
/// A missing or unreadable file falls back to defaults with a warning; an
/// invalid file is an error.
fn load_config(config_path: Option<&Path>) -> Result<Config, ConfigError> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            match Config::from_file(path) {
                Ok(config) => Ok(config),
                Err(ConfigError::ReadError(e)) => {
                    warn!("Configuration file not readable ({}), using defaults", e);
                    Ok(Config::default())
                }
                Err(e) => Err(e),
            }
        }
        None => {
            info!("Using default configuration");
            Ok(Config::default())
        }
    }
}

fn print_record(record: &Record) {
    match serde_json::to_string(record) {
        Ok(line) => println!("{}", line),
        Err(e) => error!("Failed to serialize record {}: {}", record.measurement, e),
    }
}

/// Parse a captured file with one driver and print the records
fn replay(cli: &Cli, name: &str, input: &Path) -> anyhow::Result<()> {
    let Some(driver) = drivers::by_name(name, &cli.table, &cli.chain) else {
        bail!("unknown driver {}", name);
    };
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("reading captured output {}", input.display()))?;

    let output = driver
        .parse(&text, &Tags::new())
        .with_context(|| format!("parsing {} with {}", input.display(), driver.name()))?;
    for field_error in &output.field_errors {
        warn!("{}", field_error);
    }
    for record in &output.records {
        print_record(record);
    }
    info!("{} records, {} dropped fields", output.records.len(), output.field_errors.len());
    Ok(())
}

/// Log the installed MegaCli version before the first cycle
fn probe_megacli(runner: &SystemRunner, config: &Config) {
    let Some(megacli) = &config.megacli else {
        return;
    };
    let (program, args) = if megacli.use_sudo {
        ("sudo", vec!["-n".to_string(), megacli.path.clone(), "-v".to_string()])
    } else {
        (megacli.path.as_str(), vec!["-v".to_string()])
    };
    match runner.run_combined(program, &args, Duration::from_secs(config.timeout_seconds)) {
        Ok(output) => {
            megacli::check_tool_version(&output);
        }
        Err(e) => error!("MegaCli version probe failed: {}", e),
    }
}

/// Forward records from the collector to stdout
fn spawn_printer(receiver: Receiver<Record>) -> JoinHandle<()> {
    thread::spawn(move || {
        for record in receiver {
            print_record(&record);
        }
        debug!("Record printer finished");
    })
}

fn run(config: Config, once: bool) -> anyhow::Result<()> {
    let targets = config.targets().context("building collection targets")?;
    if targets.is_empty() {
        warn!("No sources configured, nothing to collect");
        return Ok(());
    }

    let runner = SystemRunner::new();
    probe_megacli(&runner, &config);

    let running = Arc::new(Mutex::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            info!("Received interrupt signal (SIGINT), shutting down gracefully...");
            *running.lock().unwrap() = false;
        })
        .context("setting SIGINT handler")?;
    }

    let (sender, receiver) = mpsc::channel();
    let printer = spawn_printer(receiver);
    let collector = Collector::new(runner, config.concurrent).with_timestamps(config.timestamp);
    let interval = if once { None } else { config.interval() };

    loop {
        let report = collector.collect_once(&targets, &sender);
        for e in &report.errors {
            warn!("{}", e);
        }

        let Some(interval) = interval else {
            break;
        };

        // Sleep in short intervals to allow responsive shutdown
        let sleep_interval = Duration::from_millis(500);
        let mut remaining = interval;
        while remaining > Duration::ZERO && *running.lock().unwrap() {
            let sleep_time = remaining.min(sleep_interval);
            thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
        if !*running.lock().unwrap() {
            break;
        }
    }

    drop(sender);
    if printer.join().is_err() {
        error!("Record printer thread panicked");
    }
    info!("Collection stopped");
    Ok(())
}

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let result = match (&cli.driver, &cli.input) {
        (Some(name), Some(input)) => replay(&cli, name, input),
        _ => load_config(cli.config.as_deref())
            .context("loading configuration")
            .and_then(|config| run(config, cli.once)),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
