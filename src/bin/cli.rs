use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tamperscan::checks::CheckRegistry;
use tamperscan::config::{Config, DEFAULT_CONFIG_FILE};
use tamperscan::error::ScanError;
use tamperscan::output::OutputFormat;
use tamperscan::probe::SystemProbe;
use tamperscan::ScanOptions;

#[derive(Parser)]
#[command(
    name = "tamperscan",
    about = "Heuristic scanner for signs of host compromise",
    version,
    author
)]
struct Cli {
    /// Show debug logging on stderr
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every enabled check against this machine (default)
    Scan(ScanArgs),

    /// List the built-in checks
    ListChecks {
        /// Output format (table, json)
        #[arg(long, short = 'f', default_value = "table")]
        format: String,
    },

    /// Generate a starter .tamperscan.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Config file path
    #[arg(long, short = 'c', env = "TAMPERSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Output format (console, json)
    #[arg(long, short = 'f', default_value = "console")]
    format: String,

    /// Write output to file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Worker threads
    #[arg(long, short = 'j')]
    jobs: Option<usize>,

    /// Seconds before a hung probe is killed
    #[arg(long)]
    timeout: Option<u64>,

    /// Exit with status 1 when the verdict is SUSPICIOUS
    #[arg(long)]
    strict: bool,

    /// Skip checks matching this glob (repeatable)
    #[arg(long, value_name = "GLOB")]
    skip: Vec<String>,

    /// Run only checks matching this glob (repeatable)
    #[arg(long, value_name = "GLOB")]
    only: Vec<String>,
}

impl Default for ScanArgs {
    fn default() -> Self {
        Self {
            config: std::env::var_os("TAMPERSCAN_CONFIG").map(PathBuf::from),
            format: "console".into(),
            output: None,
            jobs: None,
            timeout: None,
            strict: false,
            skip: Vec::new(),
            only: Vec::new(),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "tamperscan=debug"
    } else if cli.quiet {
        "tamperscan=error"
    } else {
        "tamperscan=warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let result = match cli.command.unwrap_or_else(|| Commands::Scan(ScanArgs::default())) {
        Commands::Scan(args) => cmd_scan(args),
        Commands::ListChecks { format } => cmd_list_checks(format),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn cmd_scan(args: ScanArgs) -> Result<i32, ScanError> {
    let format = OutputFormat::from_str_lenient(&args.format).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", args.format);
        OutputFormat::Console
    });

    let options = ScanOptions {
        config_path: args.config,
        jobs: args.jobs,
        probe_timeout: args.timeout.map(Duration::from_secs),
        strict: args.strict,
        skip: args.skip,
        only: args.only,
    };

    let config = tamperscan::load_config(&options)?;
    let probe = Arc::new(SystemProbe::new(config.probe_timeout()));
    let report = tamperscan::scan_with(&config, probe)?;
    let rendered = tamperscan::render_report(&report, format)?;

    match args.output {
        Some(out) => std::fs::write(&out, &rendered)
            .map_err(|e| ScanError::Output(format!("{}: {}", out.display(), e)))?,
        None => print!("{}", rendered),
    }

    Ok(config.policy.exit_code(&report))
}

fn cmd_list_checks(format_str: String) -> Result<i32, ScanError> {
    let registry = CheckRegistry::builtin()?;

    match format_str.as_str() {
        "json" => {
            let checks: Vec<_> = registry.entries().map(|(c, _)| c.metadata()).collect();
            println!("{}", serde_json::to_string_pretty(&checks)?);
        }
        _ => {
            println!("{:<22} {:<8} {:<9} DESCRIPTION", "NAME", "STATUS", "PLATFORM");
            println!("{}", "-".repeat(80));
            for (check, enabled) in registry.entries() {
                let platforms = check.platforms();
                println!(
                    "{:<22} {:<8} {:<9} {}",
                    check.name(),
                    if enabled { "enabled" } else { "skipped" },
                    if platforms.is_empty() {
                        "any".to_string()
                    } else {
                        platforms.join(",")
                    },
                    check.description(),
                );
            }
        }
    }

    Ok(0)
}

fn cmd_init(force: bool) -> Result<i32, ScanError> {
    let path = PathBuf::from(DEFAULT_CONFIG_FILE);

    if path.exists() && !force {
        eprintln!("{DEFAULT_CONFIG_FILE} already exists. Use --force to overwrite.");
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created {DEFAULT_CONFIG_FILE}");

    Ok(0)
}
