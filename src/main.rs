use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use listing_content_generator::ai::GenerationTransport;
use listing_content_generator::app::App;
use listing_content_generator::config::Config;
use listing_content_generator::diagnostics;
use listing_content_generator::models::ListingInput;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "listing-content-generator")]
#[command(about = "Generate property video scripts and social posts with Gemini")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze listing material and write a video script and social post.
    Generate {
        /// Listing article, page text or URL text.
        #[arg(long)]
        text: Option<String>,
        /// Read the listing text from a file.
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
        /// Analyze a flyer or listing image.
        #[arg(long, value_name = "PATH")]
        image: Option<PathBuf>,
        /// Contact handle for the social post (overrides CONTACT_HANDLE).
        #[arg(long)]
        contact: Option<String>,
        /// Write the JSON result here instead of stdout.
        #[arg(long, short, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// List catalog models that support generateContent.
    Models,
    /// Send a short test prompt to one model.
    Probe {
        #[arg(value_name = "MODEL")]
        model: String,
    },
}

fn listing_input(
    text: Option<String>,
    file: Option<&Path>,
    image: Option<&Path>,
) -> Result<ListingInput> {
    match (text, file, image) {
        (Some(text), None, None) => Ok(ListingInput::Text(text)),
        (None, Some(path), None) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(ListingInput::Text(text))
        }
        (None, None, Some(path)) => {
            let bytes =
                std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(ListingInput::Image {
                bytes,
                mime_type: None,
            })
        }
        (None, None, None) => bail!("Provide one of --text, --file or --image"),
        _ => bail!("Use only one of --text, --file or --image"),
    }
}

async fn run(args: CliArgs, config: Config) -> Result<()> {
    let app = App::from_config(&config);
    let ctx = app.new_context();

    let token = ctx.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling");
            token.cancel();
        }
    });

    match args.command {
        Command::Generate {
            text,
            file,
            image,
            contact,
            output,
        } => {
            let input = listing_input(text, file.as_deref(), image.as_deref())?;
            let contact = contact.or_else(|| config.contact_handle.clone());

            let assets = match app.run(&ctx, &input, contact.as_deref()).await {
                Ok(assets) => assets,
                Err(e) => {
                    error!("Generation failed: {}", e);
                    bail!(e.user_message());
                }
            };

            let json = serde_json::to_string_pretty(&assets)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Saved result to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Command::Models => {
            info!("Using API key {}", config.api_key.hint());
            let transport: &dyn GenerationTransport = app.executor().transport().as_ref();
            let models = ctx
                .run(diagnostics::generation_models(transport))
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            for model in models {
                println!(
                    "{:<40} {:<32} in={} out={}",
                    model.id(),
                    model.display_name,
                    model
                        .input_token_limit
                        .map_or_else(|| "-".to_string(), |n| n.to_string()),
                    model
                        .output_token_limit
                        .map_or_else(|| "-".to_string(), |n| n.to_string()),
                );
            }
        }
        Command::Probe { model } => {
            let report = diagnostics::probe(app.executor(), &ctx, &model).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_ok() {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "listing_content_generator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(args, config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
