//! Youtubot CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use youtubot::cli::{commands, Cli, Commands};
use youtubot::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("youtubot={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;
    std::fs::create_dir_all(settings.sessions_dir())?;

    // Execute command
    match &cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings).await?;
        }

        Commands::Ingest { url, name, source } => {
            commands::run_ingest(url, name, source, settings).await?;
        }

        Commands::Ask {
            question,
            session,
            answer_lang,
            speak,
        } => {
            commands::run_ask(question, session, answer_lang.as_deref(), speak.as_deref(), settings).await?;
        }

        Commands::Chat {
            session,
            url,
            source,
            save,
            answer_lang,
            speak_dir,
        } => {
            let options = commands::ChatOptions {
                session: session.clone(),
                url: url.clone(),
                source: source.clone(),
                save: save.clone(),
                answer_lang: answer_lang.clone(),
                speak_dir: speak_dir.clone(),
            };
            commands::run_chat(options, settings).await?;
        }

        Commands::Sessions { action } => {
            commands::run_sessions(action, &settings)?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, *port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path.as_ref())?;
        }
    }

    Ok(())
}
