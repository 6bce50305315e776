//! CLI for the harvestdb farm-monitoring storage engine.
//!
//! Provides commands for provisioning tenants, recording and querying data,
//! generating summaries, and benchmarking harvestdb databases.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use harvestdb::query::unix_now;
use harvestdb::summary::AGGREGATED_SENSORS;
use harvestdb::{
    Aggregation, EntryKey, FarmDetails, LogEntry, SensorEntry, SensorType, Store, StoreConfig,
    TenantKey, TimeRange, TypeFilter, User,
};
use tracing::debug;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// harvestdb — Embedded multi-tenant storage for farm monitoring data.
#[derive(Parser)]
#[command(name = "harvestdb", version, about)]
struct Cli {
    /// Path to the database file.
    #[arg(long, global = true, default_value = "data/main.db")]
    db: PathBuf,

    /// JSON store configuration file. Takes precedence over --db.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Display database file information and, for a tenant, namespace usage.
    Info {
        /// Tenant key to inspect.
        tenant: Option<String>,
    },

    /// Register a user and create the tenant named by their key.
    Register {
        /// Login email.
        email: String,

        /// Display name.
        name: String,

        /// Tenant key owned by the user.
        key: String,

        /// Contact phone number.
        #[arg(long, default_value = "")]
        phone: String,

        /// Password hash produced by the authentication layer.
        #[arg(long, default_value = "")]
        password_hash: String,
    },

    /// Create a tenant namespace.
    CreateTenant {
        /// Tenant key.
        tenant: String,
    },

    /// Record a sensor reading.
    PutSensor {
        /// Tenant key.
        tenant: String,

        /// Sensor type (temperature, humidity, ph, ec, waterlevel).
        sensor_type: SensorType,

        /// Measured value.
        value: f64,

        /// Reading time in unix seconds (default: now).
        #[arg(long)]
        time: Option<i64>,

        /// Entry key (default: generated).
        #[arg(long)]
        key: Option<String>,
    },

    /// Record a control-loop event.
    PutLog {
        /// Tenant key.
        tenant: String,

        /// Event description.
        message: String,

        /// Event category.
        #[arg(long, default_value = "")]
        kind: String,

        /// Mark the event as failed.
        #[arg(long)]
        failed: bool,

        /// Event time in unix seconds (default: now).
        #[arg(long)]
        time: Option<i64>,
    },

    /// Set a tenant's farm details.
    SetFarm {
        /// Tenant key.
        tenant: String,

        /// Crop being grown.
        crop: String,

        /// Planting time, unix seconds.
        planted_on: i64,

        /// Expected harvest time, unix seconds.
        harvest_on: i64,

        /// Fertilizer N-P-K ratio.
        #[arg(long, default_value = "")]
        npk: String,

        /// Days from planting to maturity.
        #[arg(long, default_value = "0")]
        maturity_time: i64,
    },

    /// Show a tenant's farm details.
    Farm {
        /// Tenant key.
        tenant: String,
    },

    /// Query sensor readings.
    Sensors {
        /// Tenant key.
        tenant: String,

        /// Only readings of this sensor type.
        #[arg(long)]
        sensor_type: Option<SensorType>,

        #[command(flatten)]
        range: RangeArgs,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// Query control-loop events.
    Logs {
        /// Tenant key.
        tenant: String,

        /// Only events whose payload contains this tag.
        #[arg(long)]
        tag: Option<String>,

        #[command(flatten)]
        range: RangeArgs,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// Generate and store a weekly summary of the growth window.
    Summarize {
        /// Tenant key.
        tenant: String,

        /// Per-week reduction (average, min, max, last, sum, count).
        #[arg(long, default_value = "average", value_parser = parse_aggregation)]
        aggregation: Aggregation,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// List stored summaries.
    Summaries {
        /// Tenant key.
        tenant: String,

        /// Per-week reduction (average, min, max, last, sum, count).
        #[arg(long, default_value = "average", value_parser = parse_aggregation)]
        aggregation: Aggregation,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// Look up a user by email.
    User {
        /// Login email.
        email: String,
    },

    /// Run a write and scan microbenchmark against a scratch database.
    Bench {
        /// Number of readings to write.
        #[arg(long, default_value = "10000")]
        points: u64,

        /// Number of tenants to spread the readings over.
        #[arg(long, default_value = "4")]
        tenants: u32,
    },
}

/// Time range selection shared by query commands. With neither option the
/// query covers all time.
#[derive(Args)]
struct RangeArgs {
    /// Hours either side of now (0 = all time).
    #[arg(long, conflicts_with = "range")]
    span: Option<i64>,

    /// Look-back window ending now (e.g., "1h", "30m", "7d").
    #[arg(long)]
    range: Option<String>,
}

impl RangeArgs {
    fn resolve(&self) -> Result<TimeRange, Box<dyn std::error::Error>> {
        if let Some(range) = &self.range {
            let secs = parse_duration(range)?;
            let now = unix_now();
            return Ok(TimeRange::new(now.saturating_sub(secs), now));
        }
        Ok(self.span.map_or_else(TimeRange::all, TimeRange::from_span))
    }
}

/// Output format for query results.
#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Comma-separated values.
    Csv,
    /// Pretty-printed JSON.
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult {
    if let Commands::Bench { points, tenants } = cli.command {
        return cmd_bench(points, tenants);
    }

    let config = match &cli.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::new(&cli.db),
    };
    let store = Store::open(config)?;
    debug!(path = %store.path().display(), "database ready");

    match cli.command {
        Commands::Info { tenant } => cmd_info(&store, tenant.as_deref()),
        Commands::Register {
            email,
            name,
            key,
            phone,
            password_hash,
        } => {
            let user = store.register(&User {
                email,
                name,
                phone,
                password_hash,
                key,
                created_at: unix_now(),
            })?;
            println!("Registered {} (tenant {})", user.email, TenantKey::parse(&user.key)?);
            Ok(())
        }
        Commands::CreateTenant { tenant } => {
            store.create_tenant_bucket(&tenant)?;
            println!("Created tenant {}", TenantKey::parse(&tenant)?);
            Ok(())
        }
        Commands::PutSensor {
            tenant,
            sensor_type,
            value,
            time,
            key,
        } => {
            let key = key.map_or_else(EntryKey::generate, EntryKey::from);
            store.put_sensor_entry(&tenant, &key, &SensorEntry {
                time: time.unwrap_or_else(unix_now),
                sensor_type,
                value,
            })?;
            println!("{key}");
            Ok(())
        }
        Commands::PutLog {
            tenant,
            message,
            kind,
            failed,
            time,
        } => {
            let key = EntryKey::generate();
            store.put_log_entry(&tenant, &key, &LogEntry {
                time: time.unwrap_or_else(unix_now),
                success: !failed,
                message,
                kind,
            })?;
            println!("{key}");
            Ok(())
        }
        Commands::SetFarm {
            tenant,
            crop,
            planted_on,
            harvest_on,
            npk,
            maturity_time,
        } => {
            store.put_farm_details(&tenant, &FarmDetails {
                crop_type: crop,
                planted_on,
                harvest_on,
                npk,
                maturity_time,
                configured: true,
            })?;
            println!("Farm details saved");
            Ok(())
        }
        Commands::Farm { tenant } => {
            match store.farm_details(&tenant)? {
                Some(details) => println!("{}", serde_json::to_string_pretty(&details)?),
                None => println!("Farm details not configured"),
            }
            Ok(())
        }
        Commands::Sensors {
            tenant,
            sensor_type,
            range,
            format,
        } => cmd_sensors(&store, &tenant, sensor_type, &range, &format),
        Commands::Logs {
            tenant,
            tag,
            range,
            format,
        } => cmd_logs(&store, &tenant, tag.as_deref(), &range, &format),
        Commands::Summarize {
            tenant,
            aggregation,
            format,
        } => {
            let summary = store.generate_summary(&tenant)?;
            print_summaries(&[summary], aggregation, &format)
        }
        Commands::Summaries {
            tenant,
            aggregation,
            format,
        } => {
            let summaries = store.list_summaries(&tenant)?;
            print_summaries(summaries.records(), aggregation, &format)
        }
        Commands::User { email } => {
            let user = store.user(&email)?;
            let output = serde_json::json!({
                "email": user.email,
                "name": user.name,
                "phone": user.phone,
                "key": user.key,
                "createdAt": user.created_at,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Commands::Bench { .. } => Ok(()),
    }
}

/// Implements `harvestdb info [tenant]`.
fn cmd_info(store: &Store, tenant: Option<&str>) -> CliResult {
    let size = std::fs::metadata(store.path())?.len();
    println!("Database: {}", store.path().display());
    println!("Disk usage: {} ({size} bytes)", format_bytes(size));

    let Some(tenant) = tenant else {
        return Ok(());
    };

    let key = TenantKey::parse(tenant)?;
    println!();
    if !store.tenant_exists(tenant)? {
        println!("Tenant {key}: not found");
        return Ok(());
    }

    let meta = store.tenant_meta(tenant)?;
    let stats = store.namespace_stats(tenant)?;
    println!("Tenant {key}: {} namespaces", stats.len());
    println!("  Created: {}", meta.created_at);
    for (sub, count) in &stats {
        println!("  {sub}: {count} entries");
    }

    match store.farm_details(tenant)? {
        Some(details) => println!(
            "  Crop: {} (planted {}, harvest {})",
            details.crop_type, details.planted_on, details.harvest_on
        ),
        None => println!("  Farm details: not configured"),
    }

    Ok(())
}

/// Implements `harvestdb sensors <tenant>`.
fn cmd_sensors(
    store: &Store,
    tenant: &str,
    sensor_type: Option<SensorType>,
    range: &RangeArgs,
    format: &OutputFormat,
) -> CliResult {
    let time_range = range.resolve()?;
    let result = store.scan_sensor_entries(tenant, time_range, &TypeFilter::from(sensor_type))?;

    match format {
        OutputFormat::Csv => {
            println!(
                "# tenant={tenant}, examined={}, matched={}, skipped={}",
                result.examined(),
                result.len(),
                result.skipped().len()
            );
            println!("time,sensor_type,value");
            for entry in result.records() {
                println!("{},{},{}", entry.time, entry.sensor_type, entry.value);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "tenant": tenant,
                "start": time_range.start,
                "end": time_range.end,
                "count": result.len(),
                "skipped": result.skipped().len(),
                "data": result.records(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Implements `harvestdb logs <tenant>`.
fn cmd_logs(
    store: &Store,
    tenant: &str,
    tag: Option<&str>,
    range: &RangeArgs,
    format: &OutputFormat,
) -> CliResult {
    let time_range = range.resolve()?;
    let filter = tag.map_or_else(TypeFilter::all, TypeFilter::tag);
    let result = store.scan_log_entries(tenant, time_range, &filter)?;

    match format {
        OutputFormat::Csv => {
            println!(
                "# tenant={tenant}, examined={}, matched={}, skipped={}",
                result.examined(),
                result.len(),
                result.skipped().len()
            );
            println!("time,success,type,message");
            for entry in result.records() {
                println!(
                    "{},{},{},\"{}\"",
                    entry.time,
                    entry.success,
                    entry.kind,
                    entry.message.replace('"', "\"\"")
                );
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "tenant": tenant,
                "start": time_range.start,
                "end": time_range.end,
                "count": result.len(),
                "skipped": result.skipped().len(),
                "data": result.records(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Prints summaries, one row per week with each aggregated sensor reduced
/// by `aggregation`.
fn print_summaries(
    summaries: &[harvestdb::Summary],
    aggregation: Aggregation,
    format: &OutputFormat,
) -> CliResult {
    match format {
        OutputFormat::Csv => {
            let sensors: Vec<&str> = AGGREGATED_SENSORS.iter().map(|s| s.as_str()).collect();
            println!("# aggregation={}", aggregation.as_str());
            println!("id,generated_at,week_start,week_end,{}", sensors.join(","));
            for summary in summaries {
                for week in &summary.data {
                    let values: Vec<String> = AGGREGATED_SENSORS
                        .iter()
                        .map(|sensor| {
                            week.aggregate(*sensor, aggregation)
                                .map(|v| v.to_string())
                                .unwrap_or_default()
                        })
                        .collect();
                    println!(
                        "{},{},{},{},{}",
                        summary.id,
                        summary.generated_at,
                        week.week_of.start,
                        week.week_of.end,
                        values.join(",")
                    );
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summaries)?);
        }
    }

    Ok(())
}

/// Implements `harvestdb bench`.
#[allow(clippy::cast_precision_loss)] // Benchmark stats are fine with f64 precision
fn cmd_bench(points: u64, tenant_count: u32) -> CliResult {
    if tenant_count == 0 {
        return Err("--tenants must be at least 1".into());
    }

    println!("harvestdb write/scan benchmark");
    println!("  Points: {points}");
    println!("  Tenants: {tenant_count}");
    println!();

    let db_path = std::env::temp_dir().join("harvestdb_bench.db");
    remove_scratch(&db_path);

    let store = Store::open(StoreConfig::new(&db_path))?;
    let tenants: Vec<String> = (0..tenant_count).map(|i| format!("BENCH{i}")).collect();
    let points_per_tenant = points / u64::from(tenant_count);

    println!("Writing {points} readings across {tenant_count} tenants...");

    let base_time = 1_700_000_000i64;
    let start = Instant::now();

    for i in 0..points_per_tenant {
        let time = base_time.saturating_add(i64::try_from(i)?.saturating_mul(60));
        for (t, tenant) in tenants.iter().enumerate() {
            store.put_sensor_entry(tenant, &EntryKey::generate(), &SensorEntry {
                time,
                sensor_type: SensorType::ALL[t % SensorType::ALL.len()],
                value: i as f64,
            })?;
        }
    }

    let write_elapsed = start.elapsed();
    let total_writes = points_per_tenant * u64::from(tenant_count);
    let us_per_write = write_elapsed.as_micros() as f64 / total_writes.max(1) as f64;
    let writes_per_sec = total_writes as f64 / write_elapsed.as_secs_f64();

    let start = Instant::now();
    let mut scanned = 0usize;
    for tenant in &tenants {
        scanned += store
            .scan_sensor_entries(tenant, TimeRange::all(), &TypeFilter::all())?
            .len();
    }
    let scan_elapsed = start.elapsed();
    let scans_per_sec = scanned as f64 / scan_elapsed.as_secs_f64();

    println!();
    println!("Results:");
    println!("  Total writes: {total_writes}");
    println!("  Write elapsed: {write_elapsed:.3?}");
    println!("  Avg latency: {us_per_write:.1} us/write");
    println!("  Write throughput: {writes_per_sec:.0} writes/sec");
    println!("  Scanned records: {scanned}");
    println!("  Scan elapsed: {scan_elapsed:.3?}");
    println!("  Scan throughput: {scans_per_sec:.0} records/sec");
    println!();

    drop(store);
    remove_scratch(&db_path);

    Ok(())
}

/// Removes a scratch database file, ignoring a missing file.
fn remove_scratch(path: &Path) {
    if let Err(e) = std::fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        eprintln!("warning: could not remove {}: {e}", path.display());
    }
}

/// Parses a per-week reduction name.
fn parse_aggregation(s: &str) -> Result<Aggregation, String> {
    let lowered = s.trim().to_ascii_lowercase();
    Aggregation::ALL
        .into_iter()
        .find(|a| a.as_str() == lowered)
        .ok_or_else(|| format!("unknown aggregation '{s}'"))
}

/// Parses a human-readable duration string (e.g., "1h", "30m", "7d") to seconds.
fn parse_duration(s: &str) -> Result<i64, Box<dyn std::error::Error>> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Empty duration string".into());
    }

    let Some((unit_start, _)) = s.char_indices().last() else {
        return Err("Empty duration string".into());
    };
    let (num_str, unit) = s.split_at(unit_start);
    let num: i64 = num_str.parse()?;

    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        _ => return Err(format!("Unknown duration unit: '{unit}'. Use s, m, h, or d.").into()),
    };

    num.checked_mul(multiplier)
        .filter(|secs| *secs >= 0)
        .ok_or_else(|| format!("Duration out of range: '{s}'").into())
}

/// Formats a byte count as a human-readable string.
#[allow(clippy::cast_precision_loss)] // Byte counts are display-only
fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}
