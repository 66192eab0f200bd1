//! Scanspeak application binary - composition root.
//!
//! 1. Parse the command line and load configuration from TOML
//! 2. Initialize tracing (RUST_LOG, else --log-level, else the config value)
//! 3. Run the requested subcommand. `listen` wires a file-replay media
//!    backend and the HTTP transcriber into the acquisition engine.

mod cli;
mod console;
mod file_source;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use scanspeak_audio::{pick_supported_encoding, supported_encodings};
use scanspeak_core::{EventBus, ScanSpeakConfig};
use scanspeak_language::{classify, display_label};
use scanspeak_transcribe::HttpTranscriber;
use scanspeak_voice::{AcquisitionEngine, AcquisitionOutcome};

use cli::{CliArgs, Command};
use console::ConsoleCallbacks;
use file_source::FileMediaBackend;

type AppResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> AppResult {
    let args = CliArgs::parse();
    let config_path = args.resolve_config_path();
    let config = ScanSpeakConfig::load_or_default(&config_path);
    let log_level = args.resolve_log_level(&config.general.log_level);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Scanspeak v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!(path = %config_path.display(), "Configuration path resolved");

    match args.command {
        Command::Classify { text } => {
            let text = text.join(" ");
            let tag = classify(&text);
            println!("{}\t{}", tag, display_label(tag));
            Ok(())
        }
        Command::Encodings { supported } => {
            print_encodings(&config, &supported);
            Ok(())
        }
        Command::Listen {
            file,
            mime,
            endpoint,
            chunk_bytes,
        } => listen(config, &file, mime.as_deref(), endpoint, chunk_bytes).await,
        Command::InitConfig { force } => init_config(&config_path, force),
    }
}

fn print_encodings(config: &ScanSpeakConfig, supported: &[String]) {
    let candidates = config.recording.encodings.as_slice();
    if supported.is_empty() {
        for (i, encoding) in candidates.iter().enumerate() {
            println!("{}. {}", i + 1, encoding);
        }
        return;
    }

    let query = |encoding: &str| Some(supported.iter().any(|s| s.eq_ignore_ascii_case(encoding)));
    let usable = supported_encodings(candidates, query);
    for encoding in candidates {
        let mark = if usable.contains(encoding) { "*" } else { " " };
        println!("{} {}", mark, encoding);
    }

    let picked = pick_supported_encoding(candidates, query);
    if picked.is_empty() {
        println!("negotiated: (recorder default)");
    } else {
        println!("negotiated: {}", picked);
    }
}

async fn listen(
    mut config: ScanSpeakConfig,
    file: &Path,
    mime: Option<&str>,
    endpoint: Option<String>,
    chunk_bytes: usize,
) -> AppResult {
    if let Some(endpoint) = endpoint {
        config.transcription.endpoint = endpoint;
    }

    let media = FileMediaBackend::open(file, mime)?.with_chunk_bytes(chunk_bytes);
    tracing::info!(
        file = %file.display(),
        mime = media.mime_type(),
        endpoint = %config.transcription.endpoint,
        "Listening from file"
    );
    let media = Arc::new(media);
    let transcriber = Arc::new(HttpTranscriber::from_config(&config.transcription)?);
    let callbacks = Arc::new(ConsoleCallbacks::new());

    let events = EventBus::new(64);
    let mut rx = events.subscribe();
    let event_log = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            tracing::debug!(
                event = event.event_name(),
                session = %event.session_id(),
                "Voice event"
            );
        }
    });

    let engine = Arc::new(
        AcquisitionEngine::new(config, media, transcriber, callbacks.clone())
            .with_event_bus(events),
    );

    // First Ctrl-C ends the recording, a second one cancels transcription.
    let stopper = Arc::clone(&engine);
    let interrupts = tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            stopper.stop();
        }
    });

    let outcome = engine.start().await;
    interrupts.abort();

    if let Some(reply) = callbacks.take_manual_reply() {
        reply.await?;
    }
    drop(engine);
    event_log.abort();

    match outcome? {
        AcquisitionOutcome::Transcribed(_) | AcquisitionOutcome::ManualInputRequired => Ok(()),
        AcquisitionOutcome::Cancelled => {
            tracing::info!("Acquisition cancelled");
            Ok(())
        }
        AcquisitionOutcome::Failed(message) => Err(message.into()),
    }
}

fn init_config(path: &Path, force: bool) -> AppResult {
    if path.exists() && !force {
        return Err(format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        )
        .into());
    }
    ScanSpeakConfig::default().save(path)?;
    println!("{}", path.display());
    Ok(())
}
