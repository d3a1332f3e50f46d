use carousel_export::export::{ExportHooks, export, render_slide};
use carousel_export::imaging::{crop_to_ratio, decode};
use carousel_export::ratio::{ApiProvider, Dimensions, export_dimensions};
use carousel_export::render::{Frame, FontLoader, load_painter, resolve_font_files};
use carousel_export::slides::Carousel;
use carousel_export::{config, output};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "carousel")]
#[command(about = "Render article carousels into JPEG slides and bundle them as a zip")]
#[command(long_about = "\
Render article carousels into JPEG slides and bundle them as a zip

A deck is a JSON file of slides. The first line of a slide's text is its
title, the rest its description. Inline markup:

  **bold**         bold run
  ++highlight++    run in the highlight colour

Backgrounds are colour tokens (#000000), image data URIs
(data:image/jpeg;base64,...), or \"loading\" while an image is generated.
Slide 1 and the last slide carry images; interior slides alternate dark
and light.

Export writes slide-1.jpeg ... slide-N.jpeg into one zip, sized for the
effective aspect ratio of the configured provider.

Logging goes to stderr and is controlled with RUST_LOG (e.g. RUST_LOG=debug).

Run 'carousel gen-config' to generate a documented carousel.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILE, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that draw text.
#[derive(clap::Args, Clone)]
struct FontArgs {
    /// Directory with the font files (overrides export.font_dir)
    #[arg(long)]
    font_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Render every slide of a deck and write the zip archive
    Export {
        /// Deck JSON file
        deck: PathBuf,
        /// Archive path (defaults to export.archive_name)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        fonts: FontArgs,
    },
    /// Render a single slide at preview size
    Preview {
        /// Deck JSON file
        deck: PathBuf,
        /// 1-based slide id
        #[arg(long, default_value_t = 1)]
        slide: u32,
        /// Image path; the format follows the extension
        #[arg(short, long, default_value = "preview.png")]
        output: PathBuf,
        #[command(flatten)]
        fonts: FontArgs,
    },
    /// Center-crop an image to an aspect ratio
    Crop {
        /// Source image (JPEG, PNG or WebP)
        input: PathBuf,
        /// Target ratio, e.g. 4:5
        #[arg(long, default_value = "4:5")]
        ratio: String,
        /// Output JPEG path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Show how a ratio resolves for a provider
    Ratio {
        /// Requested ratio (defaults to generation.aspect_ratio)
        ratio: Option<String>,
        /// Provider (defaults to generation.api_provider)
        #[arg(long, value_enum)]
        provider: Option<ApiProvider>,
    },
    /// Validate config and deck without rendering
    Check {
        /// Deck JSON file
        deck: PathBuf,
    },
    /// Print a stock carousel.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Export {
            deck,
            output: archive,
            fonts,
        } => {
            let cfg = config::load_config(&cli.config)?;
            let carousel = Carousel::load(&deck, &cfg.visual.colors)?;
            let font_dir = fonts.font_dir.unwrap_or_else(|| cfg.export.font_dir.clone());
            let files = resolve_font_files(&font_dir, cfg.visual.typography.primary_family())?;
            let mut loader = FontLoader::spawn(files);
            let mut selection: Option<u32> = None;

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_export_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let hooks = ExportHooks::new(&mut loader, &mut selection).with_progress(tx);
            let result = export(
                carousel.slides(),
                &cfg.visual,
                cfg.generation.effective_ratio(),
                &cfg.export.options(),
                hooks,
            );
            // The sender went away with the hooks, so the printer drains and exits.
            if printer.join().is_err() {
                tracing::warn!("progress printer panicked");
            }
            let outcome = result?;

            let archive_path = archive.unwrap_or_else(|| PathBuf::from(&cfg.export.archive_name));
            std::fs::write(&archive_path, &outcome.archive)?;
            output::print_export_summary(&outcome, &archive_path);
        }
        Command::Preview {
            deck,
            slide,
            output: image_path,
            fonts,
        } => {
            let cfg = config::load_config(&cli.config)?;
            let carousel = Carousel::load(&deck, &cfg.visual.colors)?;
            let target = carousel
                .get(slide)
                .ok_or_else(|| format!("deck has no slide {slide} (1-{})", carousel.len()))?;
            let font_dir = fonts.font_dir.unwrap_or_else(|| cfg.export.font_dir.clone());
            let painter = load_painter(&resolve_font_files(&font_dir, cfg.visual.typography.primary_family())?)?;

            let preview_width = cfg.export.preview_width.round().max(1.0) as u32;
            let dims = export_dimensions(cfg.generation.effective_ratio(), preview_width);
            let frame = Frame::new(dims, cfg.export.preview_width);
            let image = render_slide(target, &cfg.visual, frame, &painter)?;
            image.save(&image_path)?;
            let size = std::fs::metadata(&image_path)?.len() as usize;
            println!("{}", output::format_file_written(&image_path, dims, size));
        }
        Command::Crop { input, ratio, output: out } => {
            let source = std::fs::read(&input)?;
            let cropped = crop_to_ratio(&source, &ratio)?;
            std::fs::write(&out, &cropped)?;
            println!(
                "{}",
                output::format_image_written(&input, image_dims(&source)?, &out, image_dims(&cropped)?, cropped.len())
            );
        }
        Command::Ratio { ratio, provider } => {
            let cfg = config::load_config(&cli.config)?;
            let requested = ratio.unwrap_or_else(|| cfg.generation.aspect_ratio.clone());
            let provider = provider.unwrap_or(cfg.generation.api_provider);
            output::print_ratio_report(&requested, provider, cfg.export.base_width);
        }
        Command::Check { deck } => {
            println!("==> Checking {}", display_config(&cli.config));
            let cfg = config::load_config(&cli.config)?;
            let carousel = Carousel::load(&deck, &cfg.visual.colors)?;
            output::print_check_output(&carousel, &cfg);
            println!("==> Deck is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn image_dims(bytes: &[u8]) -> Result<Dimensions, Box<dyn std::error::Error>> {
    let img = decode(bytes)?;
    Ok(Dimensions {
        width: img.width(),
        height: img.height(),
    })
}

fn display_config(path: &Path) -> String {
    if path.is_file() {
        path.display().to_string()
    } else {
        format!("{} (not found, using defaults)", path.display())
    }
}
