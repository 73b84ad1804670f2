use bottle_swap::{
    config::DEFAULT_HISTORY_FILE,
    logger::{self, LogLevel, LoggerConfig},
    BottleSwapStudio, CancellationToken, GeminiBackend, GenerationMode, HistoryManager,
    ImagePayload, StudioConfig,
};
use clap::{Parser, Subcommand};
use std::{
    fs,
    path::{Path, PathBuf},
};

const MAX_PROMPT_CHARS: usize = 2_000;

#[derive(Parser)]
#[command(name = "bottle-swap", about = "Composite a product bottle into a reference scene")]
struct Cli {
    /// Log at debug level with file locations.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file for generation history (overrides HISTORY_PATH).
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate composites from a packshot.
    Generate {
        /// Clean product photo of the bottle.
        #[arg(long)]
        packshot: PathBuf,

        /// Reference scene containing the bottle to replace.
        #[arg(long, conflicts_with = "style", required_unless_present = "style")]
        scene: Option<PathBuf>,

        /// Style reference; repeat for several. Switches to style-only mode.
        #[arg(long)]
        style: Vec<PathBuf>,

        /// Extra instructions for the model.
        #[arg(long, default_value = "")]
        prompt: String,

        #[arg(long, value_enum, default_value_t = GenerationMode::Simple)]
        mode: GenerationMode,

        /// Number of composites (overrides OUTPUT_COUNT).
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        count: Option<u64>,

        #[arg(long, default_value = "output")]
        out: PathBuf,
    },
    /// Inspect or prune generation history.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// List the models this tool can talk to.
    Models,
}

#[derive(Subcommand)]
enum HistoryAction {
    List,
    Delete { id: String },
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    let cli = Cli::parse();

    let logger_config = if cli.verbose {
        LoggerConfig::development()
    } else {
        let level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|value| LogLevel::parse(&value))
            .unwrap_or(LogLevel::Info);
        LoggerConfig::default().with_level(level)
    };
    logger::init_with_config(logger_config)?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::debug!("No .env file found, using process environment");
    }

    let mut config = StudioConfig::from_env();
    if let Some(path) = cli.history {
        config = config.with_history_path(path);
    } else if config.history_path.is_none() {
        // The CLI persists history so `history` subcommands see earlier runs.
        config = config.with_history_path(DEFAULT_HISTORY_FILE);
    }
    let history = HistoryManager::from_config(&config);

    match cli.command {
        Command::Generate {
            packshot,
            scene,
            style,
            prompt,
            mode,
            count,
            out,
        } => {
            if let Some(count) = count {
                config = config.with_output_count(usize::try_from(count)?);
            }
            if prompt.chars().count() > MAX_PROMPT_CHARS {
                return Err(format!("Prompt is limited to {} characters", MAX_PROMPT_CHARS).into());
            }
            logger::log_config_info(&config);

            let packshot = ImagePayload::from_path(&packshot)?;
            let style_only = !style.is_empty();
            let references = if style_only {
                style
                    .iter()
                    .map(ImagePayload::from_path)
                    .collect::<Result<Vec<_>, _>>()?
            } else {
                scene
                    .iter()
                    .map(ImagePayload::from_path)
                    .collect::<Result<Vec<_>, _>>()?
            };

            let studio = BottleSwapStudio::new(&config)?.with_history(history);
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("⚠️  Interrupted, cancelling generation");
                    on_interrupt.cancel();
                }
            });

            let output = match mode {
                GenerationMode::Simple => {
                    studio
                        .run_simple(packshot, references, &prompt, style_only, &cancel)
                        .await
                }
                GenerationMode::Complex => {
                    studio
                        .run_complex(packshot, references, &prompt, style_only, &cancel)
                        .await
                }
            };

            let output = match output {
                Ok(output) => output,
                Err(e) => {
                    log::error!("❌ {}", e);
                    return Err(e.into());
                }
            };

            fs::create_dir_all(&out)?;
            save_images(&out, "angle", &output.angles)?;
            save_images(&out, "bottle-swap", &output.images)?;
            log::info!(
                "🎉 {} composites written to {}",
                output.images.len(),
                out.display()
            );
        }
        Command::History { action } => match action {
            HistoryAction::List => {
                for entry in history.list().await? {
                    println!(
                        "{}\t{}\t{}\t{} images\t{}",
                        entry.id,
                        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        entry.mode,
                        entry.images.len(),
                        entry.prompt.as_deref().unwrap_or("-")
                    );
                }
            }
            HistoryAction::Delete { id } => {
                if history.delete(&id).await? {
                    log::info!("🗑️  Deleted {}", id);
                } else {
                    log::warn!("No history entry {}", id);
                }
            }
            HistoryAction::Clear => {
                history.clear().await?;
                log::info!("🗑️  History cleared");
            }
        },
        Command::Models => {
            for model in GeminiBackend::supported_models() {
                println!("{}\t{} ({})", model.id, model.name, model.provider);
            }
        }
    }

    Ok(())
}

fn save_images(dir: &Path, base_name: &str, images: &[ImagePayload]) -> std::io::Result<()> {
    for (index, image) in images.iter().enumerate() {
        let path = dir.join(format!("{}-{}.png", base_name, index + 1));
        fs::write(&path, image.data())?;
        log::info!("💾 Saved {}", path.display());
    }
    Ok(())
}
