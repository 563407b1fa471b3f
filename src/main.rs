use clap::{Parser, Subcommand};
use derivcache::cache::{CacheSettings, DerivativeCache};
use derivcache::imaging::{Background, RustCodec};
use derivcache::types::Operation;
use derivcache::{config, logging, output, process};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "derivcache")]
#[command(about = "Deterministic on-disk cache of image derivatives")]
#[command(long_about = "\
Deterministic on-disk cache of image derivatives

Each command derives one image from a source under the public root and
prints the derivative's path, relative to the same root. The path depends
only on the source, the operation and its arguments, so asking twice
returns the same file without doing the work again.

Layout:

  public/
  ├── avatars/ana.jpg                      # source (SRC = avatars/ana.jpg)
  └── cache/images/                        # cache_dir
      ├── 3fa2/9c1e0b7a51d2e4f0.jpg        # derivative, sharded by key prefix
      └── 07bd/1b2c3d4e5f607182.jpg

The output format follows the source extension (jpg, png, gif, tif, webp).
A missing source or a failed derivation prints a message on stderr and
exits with status 1.

Run 'derivcache gen-config' to generate a documented derivcache.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Public root; overrides `public_root` from the config file
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log cache hits and misses
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scale into a LENGTH×LENGTH box, keeping proportions
    Square { source: String, length: u32 },
    /// Scale into a box, keeping proportions; omit a side to leave it free
    Resize {
        source: String,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
    },
    /// Scale into WIDTH×HEIGHT and pad to exactly that size
    Fit {
        source: String,
        width: u32,
        height: u32,
        /// Padding color: #rgb, #rrggbb, #rrggbbaa or "transparent"
        #[arg(long)]
        background: Option<Background>,
    },
    /// Scale into LENGTH×LENGTH and pad to exactly that size
    FitSquare {
        source: String,
        length: u32,
        /// Padding color: #rgb, #rrggbb, #rrggbbaa or "transparent"
        #[arg(long)]
        background: Option<Background>,
    },
    /// Crop the square of side 2×HALF centered at (X, Y), scale to LENGTH
    CropSquare {
        source: String,
        length: u32,
        #[arg(allow_negative_numbers = true)]
        x: i64,
        #[arg(allow_negative_numbers = true)]
        y: i64,
        half: u32,
    },
    /// Crop to at most RATIO (width / height), then shrink to at most WIDTH
    FitAspect {
        source: String,
        width: u32,
        ratio: f64,
    },
    /// Derive every request in a JSON file, in parallel
    Warm { requests: PathBuf },
    /// Print a stock derivcache.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Square { source, length } => {
            run_derive(&cli, source, Operation::Square { length: *length })?;
        }
        Command::Resize {
            source,
            width,
            height,
        } => {
            let operation = Operation::Resize {
                width: *width,
                height: *height,
            };
            run_derive(&cli, source, operation)?;
        }
        Command::Fit {
            source,
            width,
            height,
            background,
        } => {
            let operation = Operation::Fit {
                width: *width,
                height: *height,
                background: *background,
            };
            run_derive(&cli, source, operation)?;
        }
        Command::FitSquare {
            source,
            length,
            background,
        } => {
            let operation = Operation::FitToSquare {
                length: *length,
                background: *background,
            };
            run_derive(&cli, source, operation)?;
        }
        Command::CropSquare {
            source,
            length,
            x,
            y,
            half,
        } => {
            let operation = Operation::CropToFitSquare {
                length: *length,
                x: *x,
                y: *y,
                half_length: *half,
            };
            run_derive(&cli, source, operation)?;
        }
        Command::FitAspect {
            source,
            width,
            ratio,
        } => {
            let operation = Operation::FitAspectRatio {
                width: *width,
                ratio: *ratio,
            };
            run_derive(&cli, source, operation)?;
        }
        Command::Warm { requests } => run_warm(&cli, requests)?,
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load config, start logging and build the cache for a deriving command.
fn open_cache(
    cli: &Cli,
) -> Result<(config::CacheConfig, DerivativeCache<RustCodec>), Box<dyn std::error::Error>> {
    let config = config::load_config(&cli.config)?;
    logging::init_from_config(&config.logging, cli.verbose, cli.json_logs);
    let mut settings = CacheSettings::from_config(&config)?;
    if let Some(root) = &cli.root {
        settings.public_root = root.clone();
    }
    Ok((config, DerivativeCache::new(RustCodec::new(), settings)))
}

fn run_derive(
    cli: &Cli,
    source: &str,
    operation: Operation,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_, cache) = open_cache(cli)?;
    let derivation = operation.apply(&cache, source);
    match derivation.path() {
        Some(path) => println!("{}", path),
        None => {
            if let Some(message) = output::format_unavailable(source, derivation.status()) {
                eprintln!("{}", message);
            }
            std::process::exit(1);
        }
    }
    Ok(())
}

fn run_warm(cli: &Cli, requests_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (config, cache) = open_cache(cli)?;
    let requests = process::load_requests(requests_path)?;
    init_thread_pool(&config.processing);

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_warm_event(&event);
        }
    });
    let report = process::warm(&cache, &requests, Some(tx));
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    output::print_warm_summary(&report.stats);

    if !report.stats.all_available() {
        std::process::exit(1);
    }
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
