//! The `roamer` command: a travel assistant chat in the terminal.

#[macro_use]
extern crate tracing;

mod command;
mod config;
mod terminal;

use std::io::Write as _;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use owo_colors::OwoColorize;
use roamer::core::{CachingResolver, IngestOutcome, Presenter, StaticResolver};
use roamer::geocoding::NominatimResolver;
use roamer::{Assistant, AssistantBuilder};
use roamer_gemini_model::GeminiProvider;
use tokio::fs;
use tokio::io::{self, AsyncBufReadExt};

use crate::command::{Command, HELP};
use crate::config::{Args, Config};
use crate::terminal::TerminalPresenter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // A missing .env file is fine, the environment may have everything.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::try_from(Args::parse()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            return ExitCode::FAILURE;
        }
    };

    let mut assistant = match build_assistant(&config) {
        Ok(assistant) => assistant,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            return ExitCode::FAILURE;
        }
    };
    let presenter = TerminalPresenter::new(config.map_output.clone());

    for path in &config.documents {
        upload(&mut assistant, path).await;
    }
    println!("{}", "🌍 Where would you like to go? (/help for commands)".bold());

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line().await else {
            break;
        };
        match Command::parse(&line) {
            Command::Chat(message) => {
                assistant.send_message(&message, &presenter).await;
            }
            Command::Upload(path) => upload(&mut assistant, &path).await,
            Command::History => {
                presenter.print_history(assistant.session().snapshot())
            }
            Command::Reset => {
                assistant.reset();
                presenter.clear();
                presenter.render_map(None);
                println!("✅ Chat reset.");
            }
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Empty => {}
            Command::Unknown(line) => {
                presenter.render_error(&format!("unknown command: {line}"));
                println!("{HELP}");
            }
        }
    }

    ExitCode::SUCCESS
}

fn build_assistant(config: &Config) -> Result<Assistant, String> {
    let provider = GeminiProvider::new(config.gemini.clone())
        .map_err(|err| format!("failed to set up the model: {err}"))?;
    let builder = AssistantBuilder::with_model_provider(provider)
        .with_exchange_timeout(config.timeout)
        .with_default_zoom(config.default_zoom);

    let builder = match &config.geocoder_url {
        Some(url) => {
            let resolver = NominatimResolver::builder()
                .with_base_url(url.as_str())
                .build()
                .map_err(|err| format!("failed to set up the geocoder: {err}"))?;
            builder.with_resolver(CachingResolver::new(resolver))
        }
        None => builder.with_resolver(StaticResolver::with_well_known_places()),
    };
    Ok(builder.build())
}

async fn upload(assistant: &mut Assistant, path: &Path) {
    let identity = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("⚠️  cannot read {}: {err}", path.display());
            return;
        }
    };
    match assistant.upload_document(&identity, &bytes) {
        IngestOutcome::Added => println!("✅ {identity} uploaded!"),
        IngestOutcome::AlreadyPresent => {
            println!("{}", format!("{identity} is already uploaded.").dimmed())
        }
        IngestOutcome::Empty => {
            eprintln!("⚠️  {identity} has no text that can be read.")
        }
        IngestOutcome::Failed(err) => eprintln!("⚠️  {identity}: {err}"),
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
