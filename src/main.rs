use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wikifilter_rs::{
    should_exclude_page, DebugLogsCategories, FilterOptions, Listener, PageFilter, PageOutcome,
    PerfTracingListener, RuleSet,
};

#[derive(Parser, Debug)]
#[command(name = "wikifilter")]
#[command(about = "Apply page, element and text filters to rendered wiki HTML")]
#[command(version)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace with stage timings)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Filter file to load instead of the built-in filters.yaml
    #[arg(long, global = true, env = "WIKIFILTER_FILTERS", value_name = "FILE")]
    filters: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the filter file and print what it contains
    Validate {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report whether each title would be excluded
    Check {
        #[arg(required = true)]
        titles: Vec<String>,
    },

    /// Filter one rendered page and write the result to stdout
    Filter {
        /// Title of the page, checked against EXCLUDE_PAGES
        #[arg(long, default_value = "")]
        title: String,

        /// Keep trailing whitespace in the output
        #[arg(long)]
        keep_trailing_whitespace: bool,

        /// HTML file to read (defaults to stdin)
        input: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_rules(path: Option<&PathBuf>) -> Result<RuleSet> {
    let rules = match path {
        Some(path) => RuleSet::from_path(path)
            .with_context(|| format!("loading filters from {}", path.display()))?,
        None => RuleSet::builtin().context("loading built-in filters")?,
    };
    info!(summary = %rules.summary(), "filters loaded");
    Ok(rules)
}

fn run(cli: Cli) -> Result<()> {
    let rules = load_rules(cli.filters.as_ref())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Validate { json } => {
            let summary = rules.summary();
            if json {
                serde_json::to_writer_pretty(&mut out, &summary)?;
                writeln!(out)?;
            } else {
                writeln!(out, "{summary}")?;
            }
        }
        Commands::Check { titles } => {
            for title in titles {
                let verdict = if should_exclude_page(&title, &rules) {
                    "exclude"
                } else {
                    "keep"
                };
                writeln!(out, "{verdict}\t{title}")?;
            }
        }
        Commands::Filter {
            title,
            keep_trailing_whitespace,
            input,
        } => {
            let html = match input {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    io::stdin().read_to_string(&mut buf).context("reading stdin")?;
                    buf
                }
            };

            let mut options = FilterOptions {
                trim_trailing_whitespace: !keep_trailing_whitespace,
                ..FilterOptions::default()
            };
            if cli.verbose >= 2 {
                options.debug_categories = DebugLogsCategories::ALL;
            }
            if cli.verbose >= 3 {
                options
                    .perf_listeners
                    .push(Listener::new(Arc::new(PerfTracingListener)));
            }

            let filter = PageFilter::new(Arc::new(rules), options);
            match filter.filter_page(&title, &html) {
                PageOutcome::Excluded { title } => {
                    info!(title = %title, "page is excluded, nothing written")
                }
                PageOutcome::Filtered { content, .. } => writeln!(out, "{content}")?,
            }
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        error!("command failed: {err:#}");
        std::process::exit(1);
    }
}
