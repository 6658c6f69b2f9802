//! # WAO Stager - Main Entry Point
//!
//! Punto di ingresso della CLI.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del logging con `tracing` (console + `data/log.txt`)
//! - Caricamento e validazione della configurazione
//! - Dispatch dei sottocomandi verso il `Director`
//!
//! ## Flusso di `run`:
//! 1. Importa la cartella di input (immagini in `original`, il resto in `ignored`)
//! 2. Staging in `optimized` e ottimizzazione con il tool esterno
//! 3. Staging in `geotagged` e scrittura delle coordinate GPS
//! 4. Se tutti gli asset sono pronti, crea lo zip e lo consegna nei Download
//!
//! ## Esempio di utilizzo:
//! ```bash
//! wao-stager --root /srv/wao run ./uploads --width 1280 --quality 85 --address "Orange, CA"
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use wao_stager::geotag::resolve_address;
use wao_stager::json_output::JsonMessage;
use wao_stager::progress::ProgressManager;
use wao_stager::tool_resolver::ToolPathResolver;
use wao_stager::{
    BatchReport, Config, Coordinates, Director, ExifListing, FileManager, NominatimGeocoder, OptimizeOptions,
    Skeleton, Stage, DEFAULT_ALTITUDE,
};

#[derive(Parser)]
#[command(name = "wao-stager")]
#[command(about = "Stage images for the web: import, optimize, geotag and package")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding WAOassets/ and _exports/ (overrides the config file)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Output JSON events for programmatic use
    #[arg(long, global = true)]
    json: bool,

    /// Show progress bars
    #[arg(long, global = true)]
    progress: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a folder and take every image through optimize, geotag and package
    Run(RunArgs),
    /// Print the EXIF tags of image files
    Exif {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Resolve an address to coordinates
    Geocode { address: String },
    /// Empty every stage directory
    Reset,
    /// Check that the external optimizer can be found
    Tools,
}

#[derive(Args)]
struct RunArgs {
    /// Folder with the files to import
    input_dir: PathBuf,

    /// Maximum width (0 = default limit)
    #[arg(long, default_value_t = 0)]
    width: u32,

    /// Maximum height (0 = default limit)
    #[arg(long, default_value_t = 0)]
    height: u32,

    /// JPEG quality 1-100 (0 = default)
    #[arg(short, long, default_value_t = 0)]
    quality: u8,

    /// Palette size for opaque PNGs (0 = default)
    #[arg(long, default_value_t = 0)]
    colors: u16,

    /// Latitude for the GPS block
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude for the GPS block
    #[arg(long = "long", id = "lon", requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Address to geocode instead of explicit coordinates
    #[arg(long, conflicts_with = "lat")]
    address: Option<String>,

    /// Altitude in meters
    #[arg(long, default_value_t = DEFAULT_ALTITUDE, allow_hyphen_values = true)]
    altitude: f64,

    /// Package even when some assets are not ready
    #[arg(long)]
    force: bool,

    /// Keep the archive in _exports/ without copying it to the download folder
    #[arg(long)]
    no_deliver: bool,
}

/// Appends each log event to a file, reopening it every time so the file
/// can be removed by a reset while the process is running
struct AppendLog(PathBuf);

impl<'a> MakeWriter<'a> for AppendLog {
    type Writer = Box<dyn Write>;

    fn make_writer(&'a self) -> Self::Writer {
        match OpenOptions::new().create(true).append(true).open(&self.0) {
            Ok(file) => Box::new(file),
            Err(_) => Box::new(io::sink()),
        }
    }
}

fn init_logging(verbose: bool, log_file: PathBuf) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(AppendLog(log_file)),
        )
        .init();
}

async fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .await
            .with_context(|| format!("Cannot load config {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    config.json_output = cli.json;
    config.show_progress = cli.progress;

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let json = cli.json;

    let result = run(cli).await;

    if let Err(ref e) = result {
        if json {
            JsonMessage::error(e.to_string(), e.chain().nth(1).map(|cause| cause.to_string())).emit();
        }
    }

    result
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli).await?;

    // il log file vive dentro lo skeleton: va creato prima del subscriber
    let skeleton = Skeleton::new(&config.root);
    skeleton.build().await?;
    let log_file = skeleton.create_log_file().await?;
    init_logging(cli.verbose, log_file);

    match cli.command {
        Command::Run(args) => run_pipeline(config, args).await,
        Command::Exif { files } => print_exif(&files, config.json_output),
        Command::Geocode { address } => {
            let coords = geocode(&config, &address).await?;
            report_coordinates(&address, coords, config.json_output);
            Ok(())
        }
        Command::Reset => {
            let mut director = Director::new(config).await?;
            let report = director.reset().await?;
            for (path, reason) in &report.failed {
                warn!("Could not remove {}: {}", path.display(), reason);
            }
            info!("Removed {} entries", report.removed);
            Ok(())
        }
        Command::Tools => {
            let resolver = ToolPathResolver::new();
            print!("{}", resolver.get_tools_report(&[config.optimizer_tool.as_str()]));
            resolver
                .check_tool_with_instructions(&config.optimizer_tool)
                .map_err(|message| anyhow::anyhow!(message))?;
            Ok(())
        }
    }
}

async fn geocode(config: &Config, address: &str) -> Result<Coordinates> {
    let spinner = ProgressManager::spinner(&format!("Geocoding {}", address), config.show_progress && !config.json_output);
    let geocoder = NominatimGeocoder::from_config(config)?;
    let resolved = resolve_address(&geocoder, address).await;
    spinner.finish_and_clear();

    resolved?.ok_or_else(|| anyhow::anyhow!("No coordinates found for '{}'", address))
}

fn report_coordinates(address: &str, coords: Coordinates, json: bool) {
    if json {
        JsonMessage::Geocoded {
            address: address.to_string(),
            latitude: coords.latitude,
            longitude: coords.longitude,
        }
        .emit();
    } else {
        println!("{} -> {}", address, coords);
    }
}

fn print_exif(files: &[PathBuf], json: bool) -> Result<()> {
    for path in files {
        let listing = ExifListing::read(path)?;
        if json {
            println!("{}", serde_json::json!({ "file": listing.file_name, "tags": listing.entries }));
        } else {
            print!("{}", listing);
        }
    }
    Ok(())
}

fn report_batch(stage: &str, report: &BatchReport, json: bool) {
    if json {
        JsonMessage::batch_complete(stage, report).emit();
    } else {
        println!("{:<9} {}", stage, report.format_summary());
        for failure in &report.failed {
            println!("  #{}: {}", failure.id, failure.error);
        }
    }
}

async fn run_pipeline(config: Config, args: RunArgs) -> Result<()> {
    if !args.input_dir.is_dir() {
        return Err(anyhow::anyhow!("Input directory does not exist: {}", args.input_dir.display()));
    }

    let json = config.json_output;

    let coords = match (args.lat, args.lon, &args.address) {
        (Some(lat), Some(lon), _) => Coordinates::new(lat, lon)?,
        (_, _, Some(address)) => {
            let coords = geocode(&config, address).await?;
            report_coordinates(address, coords, json);
            coords
        }
        _ => Coordinates::from_limits(&config.limits),
    };

    let options = OptimizeOptions::resolve(args.width, args.height, args.quality, args.colors, &config.limits);
    let download_dir = config.resolved_download_dir();
    let mut director = Director::new(config).await?;

    // 1. Import
    let imported = director.import_dir(&args.input_dir).await?;
    if json {
        for id in &imported.accepted {
            if let Some(asset) = director.asset_by_id(*id) {
                JsonMessage::imported(asset).emit();
            }
        }
        for asset in director.invalid() {
            JsonMessage::rejected(asset).emit();
        }
    }
    for (name, error) in &imported.failed {
        warn!("Skipped {}: {}", name, error);
    }

    if director.uploaded().is_empty() {
        warn!("No images found in {}", args.input_dir.display());
        return Ok(());
    }

    // 2. Optimize
    let staged = director.stage(&[], Stage::Optimized).await;
    report_batch("stage", &staged, json);
    let optimized = director.optimize_batch(&[], &options).await;
    report_batch("optimize", &optimized, json);

    // 3. Geotag
    let staged = director.stage(&[], Stage::Geotagged).await;
    report_batch("stage", &staged, json);
    let tagged = director.geotag_batch(&[], coords, args.altitude).await;
    report_batch("geotag", &tagged, json);

    // 4. Package
    if !director.is_ready() && !args.force {
        if json {
            JsonMessage::summary(director.summaries()).emit();
        }
        return Err(anyhow::anyhow!(
            "Some assets are not optimized and geotagged; rerun with --force to package anyway"
        ));
    }

    let archive = director.package().await?;
    let delivered_to = if args.no_deliver {
        None
    } else {
        Some(director.deliver(&archive, &download_dir).await?)
    };

    if json {
        let size = FileManager::size_bytes(&archive).await?;
        JsonMessage::Packaged {
            archive: archive.clone(),
            delivered_to: delivered_to.clone(),
            size,
        }
        .emit();
        JsonMessage::summary(director.summaries()).emit();
    } else {
        for summary in director.summaries() {
            println!(
                "#{:<3} {:<40} optimized={} geotagged={}",
                summary.id, summary.filename, summary.is_optimized, summary.is_geotagged
            );
        }
        println!("Archive: {}", archive.display());
        if let Some(path) = &delivered_to {
            println!("Delivered to: {}", path.display());
        }
    }

    Ok(())
}
