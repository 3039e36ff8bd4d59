//! Command-line interface for the fastfind search system.
//!
//! The CLI is a thin shell over [`ff_engine::IndexService`]: it parses
//! arguments, loads configuration, sets up tracing, and prints results.
//! Everything interesting happens in the core crates.
//!
//! # Usage
//!
//! ```bash
//! ffind search "quarterly report" --mode fuzzy --max-results 20
//! ffind index --drives /home,/data
//! ffind watch
//! ffind stats
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::BufRead;
use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ff_core::{Config, SearchMode, SearchQuery};
use ff_engine::IndexService;

/// Fast local filesystem search.
#[derive(Debug, Parser)]
#[command(name = "ffind", version, about, max_term_width = 100)]
struct Cli {
    /// Path to a configuration file (JSON).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<Utf8PathBuf>,

    /// Verbose logging (debug level).
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Errors only.
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Index the configured roots and run one query.
    Search {
        /// The query text.
        query: String,

        /// How the query is interpreted.
        #[arg(long, value_enum)]
        mode: Option<Mode>,

        /// Cap on returned results.
        #[arg(long, value_name = "N")]
        max_results: Option<usize>,

        /// Restrict the crawl and the results to these roots.
        #[arg(long, value_delimiter = ',', value_name = "PATHS")]
        drives: Vec<Utf8PathBuf>,
    },

    /// Build the index for the configured roots.
    Index {
        /// Override the configured roots.
        #[arg(long, value_delimiter = ',', value_name = "PATHS")]
        drives: Vec<Utf8PathBuf>,
    },

    /// Discard and rebuild the index from scratch.
    Rebuild,

    /// Index, then keep the index live until stopped.
    Watch {
        /// Stay in the foreground without reading stdin.
        #[arg(long)]
        daemon: bool,

        /// Index once and exit without watching.
        #[arg(long)]
        no_watch: bool,
    },

    /// Print index, cache, and watcher statistics.
    Stats,

    /// Print the effective configuration as JSON.
    Config,
}

/// CLI-facing search mode names.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Exact,
    Fuzzy,
    Wildcard,
    Regex,
}

impl From<Mode> for SearchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Exact => Self::Exact,
            Mode::Fuzzy => Self::Fuzzy,
            Mode::Wildcard => Self::Wildcard,
            Mode::Regex => Self::Regex,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            // Help and version requests are not failures.
            if error.use_stderr() {
                eprintln!("{error}");
                return ExitCode::FAILURE;
            }
            let _ = error.print();
            return ExitCode::SUCCESS;
        }
    };

    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("ffind: {message}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), String> {
    let mut config = load_config(cli.config.as_deref())?;
    let quiet = cli.quiet;

    match cli.command {
        Command::Search {
            query,
            mode,
            max_results,
            drives,
        } => {
            if !drives.is_empty() {
                config.indexing.include_drives = drives;
            }
            let mut search = SearchQuery::new(query);
            search.mode = mode.map_or(config.search.default_mode, Into::into);
            search.max_results = max_results
                .unwrap_or(config.search.max_results)
                .max(1);
            search.fuzzy_threshold = config.search.fuzzy_threshold;

            let service = build_service(config)?;
            index_quietly(&service)?;

            let results = service.search(&search).map_err(|e| e.to_string())?;
            print_results(&results);
            service.shutdown();
            Ok(())
        }

        Command::Index { drives } => {
            if !drives.is_empty() {
                config.indexing.include_drives = drives;
            }
            let mut service = build_service(config)?;
            if !quiet {
                attach_progress(&mut service);
            }
            let outcome = service.build_index().map_err(|e| e.to_string())?;
            println!(
                "indexed {} files and {} directories in {:.1?} ({} errors, {} skipped)",
                outcome.stats.files,
                outcome.stats.dirs,
                outcome.elapsed,
                outcome.stats.errors,
                outcome.stats.skipped,
            );
            service.shutdown();
            Ok(())
        }

        Command::Rebuild => {
            let mut service = build_service(config)?;
            if !quiet {
                attach_progress(&mut service);
            }
            let outcome = service.rebuild_index().map_err(|e| e.to_string())?;
            println!(
                "rebuilt index: {} files, {} directories in {:.1?}",
                outcome.stats.files, outcome.stats.dirs, outcome.elapsed,
            );
            service.shutdown();
            Ok(())
        }

        Command::Watch { daemon, no_watch } => {
            let service = build_service(config)?;
            index_quietly(&service)?;
            if no_watch {
                service.shutdown();
                return Ok(());
            }

            service.start_watching().map_err(|e| e.to_string())?;
            info!("watching for changes");
            if daemon {
                // Foreground daemon: sleep until the process is killed.
                loop {
                    std::thread::sleep(std::time::Duration::from_secs(60));
                }
            }

            println!("watching; press Enter to stop");
            let stdin = std::io::stdin();
            let _ = stdin.lock().lines().next();
            service.stop_watching();
            service.shutdown();
            Ok(())
        }

        Command::Stats => {
            let service = build_service(config)?;
            let stats = service.statistics();
            println!("files indexed:      {}", stats.index.total_files);
            println!("directories:        {}", stats.index.total_dirs);
            println!("total size:         {} bytes", stats.index.total_size);
            println!("drives:             {}", stats.index.indexed_drives);
            println!("index memory:       {} bytes", stats.index_memory_bytes);
            println!("searches:           {}", stats.engine.searches);
            println!("result cache hits:  {}", stats.engine.cache_hits);
            println!(
                "cache entries:      {} (hit ratio {:.2})",
                stats.cache.entries,
                stats.cache.results.hit_ratio(),
            );
            println!("store batches:      {} written, {} failed",
                stats.store_batches_written, stats.store_batches_failed);
            if let Some(watch) = stats.watcher {
                println!(
                    "watcher events:     {} applied, {} filtered, {} errors",
                    watch.events_processed, watch.events_filtered, watch.errors_encountered,
                );
            }
            service.shutdown();
            Ok(())
        }

        Command::Config => {
            let json = serde_json::to_string_pretty(&config)
                .map_err(|e| format!("cannot render configuration: {e}"))?;
            println!("{json}");
            Ok(())
        }
    }
}

fn load_config(path: Option<&camino::Utf8Path>) -> Result<Config, String> {
    match path {
        Some(path) => Config::load(path).map_err(|e| e.to_string()),
        None => Ok(Config::default()),
    }
}

fn build_service(config: Config) -> Result<IndexService, String> {
    IndexService::new(config).map_err(|e| e.to_string())
}

fn index_quietly(service: &IndexService) -> Result<(), String> {
    let outcome = service.build_index().map_err(|e| e.to_string())?;
    info!(
        files = outcome.stats.files,
        dirs = outcome.stats.dirs,
        "index ready"
    );
    Ok(())
}

fn print_results(results: &ff_core::SearchResults) {
    if results.is_empty() {
        println!("no matches");
        return;
    }
    for hit in &results.results {
        println!("{:6.3}  {}", hit.score, hit.record.full_path);
    }
    println!(
        "{} of {} matches in {:.1?}",
        results.len(),
        results.total_matches,
        results.elapsed,
    );
}

/// Installs the progress printer used by long crawls.
fn attach_progress(service: &mut IndexService) {
    service.set_progress_callback(Arc::new(|count, path| {
        eprint!("\rindexed {count} entries  {path}        ");
    }));
    service.set_completion_callback(Arc::new(|success, message| {
        if success {
            eprintln!("\n{message}");
        } else {
            eprintln!("\nindexing did not complete: {message}");
        }
    }));
}
