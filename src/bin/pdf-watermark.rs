//! PDF Watermark CLI tool
//!
//! A command-line tool for stamping text watermarks onto PDF pages.

use clap::{Args, Parser, Subcommand, ValueEnum};
use glob::glob;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdf_watermark::layout::PositionType;
use pdf_watermark::pdf::{extract_metadata, watermark_pdf, WatermarkLayer, WatermarkSpec};

/// PDF Watermark - Stamp text onto every page of a PDF
#[derive(Parser)]
#[command(name = "pdf-watermark")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Red diagonal DRAFT across the middle of every page
    pdf-watermark apply input.pdf -o draft.pdf --text DRAFT --color \"#FF0000\" --rotation 45

    # Faint footer mark beneath the page content
    pdf-watermark apply input.pdf -o out.pdf --text \"Internal\" --position bottom-center --layer under --opacity 0.2

    # Two marks at fixed coordinates
    pdf-watermark apply input.pdf -o out.pdf --text X --position custom --x 100 --x 200 --y 300

    # Watermark a batch of files using a request file
    pdf-watermark batch \"reports/*.pdf\" --out-dir stamped --spec request.json")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watermark a single PDF
    Apply {
        /// Input PDF file
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        watermark: WatermarkArgs,
    },

    /// Watermark several PDFs into a directory
    Batch {
        /// Input PDF files. Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Directory receiving `<name>-watermarked.pdf` files
        #[arg(long)]
        out_dir: PathBuf,

        #[command(flatten)]
        watermark: WatermarkArgs,
    },

    /// Show page information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LayerArg {
    Under,
    Over,
}

impl From<LayerArg> for WatermarkLayer {
    fn from(layer: LayerArg) -> Self {
        match layer {
            LayerArg::Under => WatermarkLayer::UnderContent,
            LayerArg::Over => WatermarkLayer::OverContent,
        }
    }
}

/// Watermark options; flags override values from `--spec`
#[derive(Args)]
struct WatermarkArgs {
    /// JSON watermark request to start from
    #[arg(long)]
    spec: Option<PathBuf>,

    /// Watermark text
    #[arg(long)]
    text: Option<String>,

    /// Font size in points
    #[arg(long)]
    font_size: Option<f64>,

    /// Draw beneath or above the page content
    #[arg(long, value_enum)]
    layer: Option<LayerArg>,

    /// Fill opacity from 0.0 to 1.0
    #[arg(long)]
    opacity: Option<f64>,

    /// Counter-clockwise rotation in degrees
    #[arg(long, allow_hyphen_values = true)]
    rotation: Option<f64>,

    /// Color as #RRGGBB, #AARRGGBB or a name like "red"
    #[arg(long)]
    color: Option<String>,

    /// top-left, top-center, top-right, center-left, center, center-right,
    /// bottom-left, bottom-center, bottom-right or custom
    #[arg(long)]
    position: Option<PositionType>,

    /// X coordinate for custom placement (repeatable)
    #[arg(long = "x", allow_hyphen_values = true)]
    xs: Vec<f64>,

    /// Y coordinate for custom placement (repeatable)
    #[arg(long = "y", allow_hyphen_values = true)]
    ys: Vec<f64>,
}

impl WatermarkArgs {
    fn to_spec(&self) -> anyhow::Result<WatermarkSpec> {
        let mut spec = match &self.spec {
            Some(path) => WatermarkSpec::from_json(&std::fs::read_to_string(path)?)?,
            None => WatermarkSpec::default(),
        };

        if let Some(text) = &self.text {
            spec.text = text.clone();
        }
        if let Some(font_size) = self.font_size {
            spec.font_size = font_size;
        }
        if let Some(layer) = self.layer {
            spec.layer = layer.into();
        }
        if let Some(opacity) = self.opacity {
            spec.opacity = opacity;
        }
        if let Some(rotation) = self.rotation {
            spec.rotation_angle = rotation;
        }
        if let Some(color) = &self.color {
            spec.color = color.clone();
        }
        if let Some(position) = self.position {
            spec.position = position;
        }
        if !self.xs.is_empty() || !self.ys.is_empty() {
            spec.custom_x = self.xs.clone();
            spec.custom_y = self.ys.clone();
        }

        if spec.text.is_empty() {
            anyhow::bail!("no watermark text given (use --text or a --spec file)");
        }
        spec.validate()?;

        Ok(spec)
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_watermark=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Apply { input, output, watermark } => cmd_apply(&input, &output, &watermark),
        Commands::Batch { inputs, out_dir, watermark } => cmd_batch(inputs, &out_dir, &watermark),
        Commands::Info { input } => cmd_info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = false;
            for entry in glob(&pattern)? {
                match entry {
                    Ok(path) => {
                        paths.push(path);
                        matched = true;
                    }
                    Err(e) => tracing::warn!(pattern = %pattern, error = %e, "glob error"),
                }
            }
            if !matched {
                anyhow::bail!("No files matched pattern: {}", pattern);
            }
        } else {
            // No glob characters, treat as literal path
            paths.push(PathBuf::from(pattern));
        }
    }

    // Sort paths for consistent ordering
    paths.sort();
    paths.dedup();

    Ok(paths)
}

/// Watermark one PDF
fn cmd_apply(input: &Path, output: &Path, args: &WatermarkArgs) -> anyhow::Result<()> {
    let spec = args.to_spec()?;

    watermark_pdf(input, output, &spec)?;
    eprintln!("Output: {}", output.display());

    Ok(())
}

/// Watermark every matched PDF into `out_dir`
fn cmd_batch(inputs: Vec<String>, out_dir: &Path, args: &WatermarkArgs) -> anyhow::Result<()> {
    let spec = args.to_spec()?;
    let inputs = expand_globs(inputs)?;

    std::fs::create_dir_all(out_dir)?;
    eprintln!("Watermarking {} PDF files...", inputs.len());

    for input in &inputs {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let output = out_dir.join(format!("{}-watermarked.pdf", stem));

        watermark_pdf(input, &output, &spec)?;
        eprintln!("  {} -> {}", input.display(), output.display());
    }

    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: &Path) -> anyhow::Result<()> {
    let metadata = extract_metadata(input)?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);

    for page in &metadata.pages {
        let size = page.effective_size();
        println!(
            "  Page {}: {:.1} x {:.1} pt, rotated {}",
            page.number, size.width, size.height, page.rotation
        );
    }

    Ok(())
}
