//! cardscan CLI: locate a trading card in a photo and identify it against a catalog.

use anyhow::{Context, bail};
use cardscan_core::diagnostics::Diagnostics;
use cardscan_cv::utils::ImageUtils;
use cardscan_cv::{Catalog, CardDetector, CardHasher, CardMatcher, DetectorConfig, PipelineConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod report;

#[derive(Parser)]
#[command(name = "cardscan")]
#[command(about = "Detect a trading card in a photo and match it against a hashed catalog")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect, rectify and identify the card in an image.
    Identify(IdentifyArgs),

    /// Print the fingerprint of a card image.
    Fingerprint(FingerprintArgs),

    /// Print catalog coverage statistics.
    Catalog {
        /// Path to the catalog JSON.
        #[arg(long)]
        catalog: PathBuf,
    },

    /// Print or write the default pipeline configuration.
    Config {
        /// Write the configuration here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    Default,
    Permissive,
    Strict,
}

#[derive(Debug, Clone, Args)]
struct PipelineArgs {
    /// Pipeline configuration JSON; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Detector preset, applied before the config file is considered.
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,

    /// Display canvas height; the rectified card is 80% of it.
    #[arg(long)]
    target_height: Option<u32>,
}

impl PipelineArgs {
    fn resolve(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        match self.preset {
            Some(PresetArg::Default) => config.detector = DetectorConfig::default(),
            Some(PresetArg::Permissive) => config.detector = DetectorConfig::permissive(),
            Some(PresetArg::Strict) => config.detector = DetectorConfig::strict(),
            None => {}
        }
        if let Some(h) = self.target_height {
            config.target_height = h;
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Args)]
struct IdentifyArgs {
    /// Photo containing one card.
    #[arg(long)]
    image: PathBuf,

    /// Path to the catalog JSON.
    #[arg(long)]
    catalog: PathBuf,

    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Distance at which confidence reaches zero.
    #[arg(long)]
    threshold: Option<f64>,

    /// Write the annotated frame here.
    #[arg(long)]
    debug_image: Option<PathBuf>,

    /// Write the rectified card here.
    #[arg(long)]
    card_image: Option<PathBuf>,

    /// Print the match as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Args)]
struct FingerprintArgs {
    /// Card image; already cropped unless --detect is given.
    #[arg(long)]
    image: PathBuf,

    /// Locate and rectify the card before hashing.
    #[arg(long)]
    detect: bool,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

/// Forwards pipeline diagnostics to the log
struct LogSink;

impl Diagnostics for LogSink {
    fn note(&mut self, message: &str) {
        tracing::info!("{}", message);
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Identify(args) => run_identify(&args),
        Commands::Fingerprint(args) => run_fingerprint(&args),
        Commands::Catalog { catalog } => run_catalog(&catalog),
        Commands::Config { out } => run_config(out.as_deref()),
    }
}

fn run_identify(args: &IdentifyArgs) -> anyhow::Result<()> {
    let mut config = args.pipeline.resolve()?;
    if let Some(t) = args.threshold {
        config.matcher.policy.threshold = t;
    }
    config.validate()?;

    tracing::info!("Loading image: {}", args.image.display());
    let photo = image::open(&args.image)
        .with_context(|| format!("Failed to open image {}", args.image.display()))?
        .to_rgb8();
    tracing::info!("Image size: {}x{}", photo.width(), photo.height());

    let detector = CardDetector::new(config.detector.clone())?;
    let detection = detector.detect_from_rgb_image(&photo, config.target_height, &mut LogSink)?;

    if let Some(path) = &args.debug_image {
        ImageUtils::save_image(&detection.debug_image, path)?;
        tracing::info!("Debug image written to {}", path.display());
    }

    let Some(card) = detection.card else {
        println!("No card found");
        return Ok(());
    };

    if let Some(path) = &args.card_image {
        ImageUtils::save_image(&card.image, path)?;
        tracing::info!("Card image written to {}", path.display());
    }

    let matcher = CardMatcher::load(&args.catalog, config.matcher.clone())?;
    let found = matcher.find_match(&card.image, &mut LogSink)?;

    if args.json {
        println!("{}", report::render_json(found.as_ref())?);
    } else {
        match &found {
            Some(m) => print!("{}", report::TextReport(m)),
            None => println!("Card not recognized"),
        }
    }
    Ok(())
}

fn run_fingerprint(args: &FingerprintArgs) -> anyhow::Result<()> {
    let config = args.pipeline.resolve()?;
    config.validate()?;

    let photo = image::open(&args.image)
        .with_context(|| format!("Failed to open image {}", args.image.display()))?;
    let frame = ImageUtils::dynamic_to_mat(&photo)?;

    let card = if args.detect {
        let detector = CardDetector::new(config.detector.clone())?;
        match detector.detect(&frame, config.target_height, &mut LogSink)?.card {
            Some(card) => card.image,
            None => bail!("No card found in {}", args.image.display()),
        }
    } else {
        frame
    };

    let hasher = CardHasher::new(config.matcher.scheme.clone())?;
    println!("{}", hasher.fingerprint(&card)?);
    Ok(())
}

fn run_catalog(path: &std::path::Path) -> anyhow::Result<()> {
    let catalog = Catalog::from_path(path)?;
    let info = catalog.set_info();
    if let Some(name) = &info.name {
        println!("Set: {}", name);
    }
    println!("{}", catalog.stats());
    Ok(())
}

fn run_config(out: Option<&std::path::Path>) -> anyhow::Result<()> {
    let config = PipelineConfig::default();
    match out {
        Some(path) => {
            config.to_json_file(path)?;
            tracing::info!("Configuration written to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&config)?),
    }
    Ok(())
}
