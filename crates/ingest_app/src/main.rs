mod chat;
mod cli;
mod config;
mod controller;
mod effects;
mod render;
mod session;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use ingest_core::SessionStatus;
use ingest_engine::EngineHandle;
use ingest_logging::{ingest_info, LogDestination};
use log::LevelFilter;

use crate::chat::ChatSession;
use crate::cli::{Cli, Command};
use crate::controller::UploadController;
use crate::effects::EffectRunner;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = config::load(&cli.global)?;
    init_logging(config.log_file.clone(), cli.global.verbose);
    ingest_info!("ingest {} starting", env!("CARGO_PKG_VERSION"));
    if let Some(source) = &config.source {
        ingest_info!("loaded config from {:?}", source);
    }

    match cli.command {
        Command::Upload { file, export } => {
            let engine = EngineHandle::new(config.upload);
            let runner = EffectRunner::new(engine, export.clone());
            let mut controller = UploadController::new(runner, io::stdout());
            match controller.run_upload(file, export.is_some())? {
                SessionStatus::Failed => Ok(ExitCode::FAILURE),
                _ => Ok(ExitCode::SUCCESS),
            }
        }
        Command::Chat { message } => {
            ChatSession::open(&config.api, &config.session_file)?.send(&message.join(" "))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::History => {
            ChatSession::open(&config.api, &config.session_file)?.history()?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Reset => {
            ChatSession::open(&config.api, &config.session_file)?.reset()?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Questions => {
            ChatSession::open(&config.api, &config.session_file)?.questions()?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Description => {
            ChatSession::open(&config.api, &config.session_file)?.description()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(log_file: Option<std::path::PathBuf>, verbose: bool) {
    let (destination, level) = match (log_file, verbose) {
        (Some(path), true) => (LogDestination::Both(path), LevelFilter::Debug),
        (Some(path), false) => (LogDestination::File(path), LevelFilter::Info),
        (None, true) => (LogDestination::Terminal, LevelFilter::Debug),
        (None, false) => (LogDestination::Terminal, LevelFilter::Warn),
    };
    ingest_logging::initialize(destination, level);
}
