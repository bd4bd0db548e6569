//! CLI for the flightcache telemetry cache.
//!
//! Provides commands for ingesting samples, inspecting a telemetry log, and
//! running a synthetic flight through the cache.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use flightcache::codec::{format_line, parse_line};
use flightcache::config::DEFAULT_STORE_PATH;
use flightcache::{
    CacheConfig, FlightCache, FlightSummary, LogRecord, PersistMode, WriteBehindConfig,
};
use tracing_subscriber::EnvFilter;

/// flightcache — Bounded flight telemetry cache with durable eviction.
#[derive(Parser)]
#[command(name = "flightcache", version, about)]
struct Cli {
    /// Telemetry log that receives evicted records.
    #[arg(long, global = true, default_value = DEFAULT_STORE_PATH)]
    store: PathBuf,

    /// Number of records held in memory.
    #[arg(long, global = true, default_value = "20")]
    capacity: usize,

    /// JSON cache configuration; overrides --store and --capacity.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Persist evicted records from a background writer thread.
    #[arg(long, global = true)]
    write_behind: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Feed log-format sample lines through the cache.
    Ingest {
        /// File of sample lines, or "-" for stdin.
        input: PathBuf,

        /// Leave cached records in memory instead of saving them on exit.
        #[arg(long)]
        no_save: bool,

        /// Output format for the final summary.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// Reload the store and summarize the newest records.
    Stats {
        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// Reload the store and print its newest records, oldest first.
    Tail {
        /// Number of records to print.
        #[arg(short = 'n', long, default_value = "10", allow_negative_numbers = true)]
        count: i64,

        /// Print a JSON array instead of log lines.
        #[arg(long)]
        json: bool,
    },

    /// Fly a synthetic ascent through the cache.
    Simulate {
        /// Number of samples, taken every 100 ms.
        #[arg(long, default_value = "200")]
        samples: u32,

        /// Output format for the final summary.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },
}

/// Output format for summaries.
#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Comma-separated values.
    Csv,
    /// JSON object.
    Json,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = cache_config(&cli).and_then(|config| match cli.command {
        Commands::Ingest {
            input,
            no_save,
            format,
        } => cmd_ingest(config, &input, !no_save, &format),
        Commands::Stats { format } => cmd_stats(config, &format),
        Commands::Tail { count, json } => cmd_tail(config, count, json),
        Commands::Simulate { samples, format } => cmd_simulate(config, samples, &format),
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Builds the cache configuration from the global options.
fn cache_config(cli: &Cli) -> Result<CacheConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => CacheConfig::load(path)?,
        None => CacheConfig::new(&cli.store).with_capacity(cli.capacity),
    };

    if cli.write_behind && config.persist_mode == PersistMode::Direct {
        config = config.with_persist_mode(PersistMode::WriteBehind(WriteBehindConfig::default()));
    }

    Ok(config)
}

/// Implements `flightcache ingest <input>`.
fn cmd_ingest(
    config: CacheConfig,
    input: &Path,
    save: bool,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cache = FlightCache::open(config)?;

    let counts = if input == Path::new("-") {
        ingest_lines(std::io::stdin().lock(), &mut cache)?
    } else {
        let file = std::fs::File::open(input)
            .map_err(|e| format!("cannot open '{}': {e}", input.display()))?;
        ingest_lines(BufReader::new(file), &mut cache)?
    };
    if save {
        cache.save_all()?;
    }

    eprintln!(
        "ingested {} sample(s), skipped {} malformed line(s)",
        counts.ingested, counts.skipped
    );
    print_summary(&cache.summary(), format)?;

    cache.shutdown()?;
    Ok(())
}

/// Implements `flightcache stats`.
fn cmd_stats(config: CacheConfig, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let mut cache = FlightCache::open(config)?;
    let report = cache.load_all()?;
    if report.skipped() > 0 {
        eprintln!(
            "skipped {} malformed line(s) in '{}'",
            report.skipped(),
            cache.path().display()
        );
    }

    print_summary(&cache.summary(), format)?;
    cache.shutdown()?;
    Ok(())
}

/// Implements `flightcache tail`.
fn cmd_tail(config: CacheConfig, count: i64, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut cache = FlightCache::open(config)?;
    cache.load_all()?;

    // Non-positive counts print nothing.
    let count = usize::try_from(count).unwrap_or(0);
    let mut records = cache.last_n_readings(count);
    records.reverse();

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for record in &records {
            println!("{}", format_line(record));
        }
    }

    cache.shutdown()?;
    Ok(())
}

/// Implements `flightcache simulate`.
fn cmd_simulate(
    config: CacheConfig,
    samples: u32,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cache = FlightCache::open(config)?;
    for record in synthetic_ascent(samples) {
        cache.add_data_point(record)?;
    }
    cache.save_all()?;

    print_summary(&cache.summary(), format)?;
    cache.shutdown()?;
    Ok(())
}

/// Lines consumed by [`ingest_lines`].
struct IngestCounts {
    ingested: usize,
    skipped: usize,
}

/// Feeds log-format lines into the cache as they are read, skipping blank
/// and malformed ones.
fn ingest_lines<R: BufRead>(
    reader: R,
    cache: &mut FlightCache,
) -> Result<IngestCounts, Box<dyn std::error::Error>> {
    let mut counts = IngestCounts {
        ingested: 0,
        skipped: 0,
    };

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Ok(record) => {
                cache.add_data_point(record)?;
                counts.ingested += 1;
            }
            Err(e) => {
                tracing::warn!("skipping input line {}: {e}", index + 1);
                counts.skipped += 1;
            }
        }
    }

    Ok(counts)
}

/// Constant-thrust vertical ascent from Cape Canaveral, drifting east.
fn synthetic_ascent(samples: u32) -> impl Iterator<Item = LogRecord> {
    const THRUST_ACCEL: f64 = 30.0;
    const PAD_LATITUDE: f64 = 28.5721;
    const PAD_LONGITUDE: f64 = -80.6480;
    const SEA_LEVEL_HPA: f64 = 1013.25;

    (0..samples).map(|i| {
        let t = f64::from(i) * 0.1;
        let velocity = THRUST_ACCEL * t;
        let altitude = 0.5 * THRUST_ACCEL * t * t;
        LogRecord {
            timestamp: t,
            latitude: PAD_LATITUDE,
            longitude: PAD_LONGITUDE + altitude * 1e-6,
            altitude,
            bearing: 90.0,
            velocity,
            acceleration: THRUST_ACCEL,
            temperature: (15.0 - 0.0065 * altitude).max(-56.5),
            pressure: SEA_LEVEL_HPA * (1.0 - 2.255_77e-5 * altitude.min(11_000.0)).powf(5.255_88),
        }
    })
}

/// Prints a summary as a CSV header and row, or as JSON.
fn print_summary(
    summary: &FlightSummary,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Csv => {
            let timestamp = |t: Option<f64>| t.map(|t| format!("{t:.6}")).unwrap_or_default();
            println!(
                "count,first_timestamp,last_timestamp,average_velocity,max_altitude,total_distance,legs"
            );
            println!(
                "{},{},{},{:.6},{:.6},{:.6},{}",
                summary.count,
                timestamp(summary.first_timestamp),
                timestamp(summary.last_timestamp),
                summary.average_velocity,
                summary.max_altitude,
                summary.total_distance,
                summary.legs
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn test_ingest_lines_streams_into_cache() {
        let temp_dir = tempdir().unwrap();
        let config = CacheConfig::new(temp_dir.path().join("in.txt")).with_capacity(2);
        let mut cache = FlightCache::open(config).unwrap();

        let input: String = [1.0, 2.0, 3.0]
            .iter()
            .map(|&t| {
                format_line(&LogRecord {
                    timestamp: t,
                    ..LogRecord::default()
                })
            })
            .collect::<Vec<_>>()
            .join("\nnot a sample\n\n")
            + "\r\n";

        let counts = ingest_lines(Cursor::new(input), &mut cache).unwrap();
        assert_eq!(counts.ingested, 3);
        assert_eq!(counts.skipped, 2);

        // t=1 was evicted while the input was still being read.
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.latest_data().map(|r| r.timestamp), Some(3.0));
        let stored = std::fs::read_to_string(cache.path()).unwrap();
        assert_eq!(stored.lines().count(), 1);
    }

    #[test]
    fn test_synthetic_ascent_is_well_formed() {
        let records: Vec<LogRecord> = synthetic_ascent(300).collect();
        assert_eq!(records.len(), 300);
        assert!(records.iter().all(|r| r.first_non_finite().is_none()));
        assert!(records.windows(2).all(|w| w[1].altitude >= w[0].altitude));
        assert!(records.windows(2).all(|w| w[1].pressure <= w[0].pressure));
    }

    #[test]
    fn test_cli_options() {
        let cli = Cli::try_parse_from(["flightcache", "tail", "-n", "-3", "--capacity", "5"]).unwrap();
        assert_eq!(cli.capacity, 5);
        assert_eq!(cli.store, PathBuf::from(DEFAULT_STORE_PATH));
        assert!(matches!(cli.command, Commands::Tail { count: -3, json: false }));

        let config = cache_config(&cli).unwrap();
        assert_eq!(config.capacity, 5);
        assert_eq!(config.persist_mode, PersistMode::Direct);
    }

    #[test]
    fn test_write_behind_flag() {
        let cli = Cli::try_parse_from(["flightcache", "--write-behind", "stats"]).unwrap();
        let config = cache_config(&cli).unwrap();
        assert_eq!(
            config.persist_mode,
            PersistMode::WriteBehind(WriteBehindConfig::default())
        );
    }

    #[test]
    fn test_config_file_overrides_flags() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("cache.json");
        std::fs::write(&path, r#"{ "capacity": 7, "store_path": "flight.txt" }"#).unwrap();

        let cli = Cli::try_parse_from([
            "flightcache",
            "--capacity",
            "3",
            "--config",
            path.to_str().unwrap(),
            "stats",
        ])
        .unwrap();
        let config = cache_config(&cli).unwrap();
        assert_eq!(config.capacity, 7);
        assert_eq!(config.store_path, PathBuf::from("flight.txt"));
    }

    #[test]
    fn test_simulate_then_tail_round_trip() {
        let temp_dir = tempdir().unwrap();
        let config = CacheConfig::new(temp_dir.path().join("sim.txt")).with_capacity(10);

        cmd_simulate(config.clone(), 25, &OutputFormat::Json).unwrap();

        // 15 evicted plus 10 saved.
        let mut cache = FlightCache::open(config).unwrap();
        let report = cache.load_all().unwrap();
        assert_eq!(report.parsed, 25);
        assert_eq!(report.retained, 10);
        assert!((cache.latest_data().unwrap().timestamp - 2.4).abs() < 1e-6);
    }
}
