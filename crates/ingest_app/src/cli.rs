use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "ingest",
    version,
    about = "Upload documents and follow their extraction pipeline"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Server base URL (default http://localhost:3000)
    #[arg(long, global = true, env = "INGEST_BASE_URL")]
    pub base_url: Option<String>,

    /// RON config file (default ./ingest.ron when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long, global = true, env = "INGEST_LOG")]
    pub log_file: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a document and stream the pipeline's activity log
    Upload {
        file: PathBuf,

        /// Save the full activity log as JSON once the upload ends
        #[arg(long, value_name = "PATH")]
        export: Option<PathBuf>,
    },
    /// Ask a question about the knowledge graph
    Chat {
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Show the conversation so far
    History,
    /// Start a new conversation
    Reset,
    /// List suggested questions
    Questions,
    /// Describe the knowledge graph
    Description,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_accepts_export_path() {
        let cli = Cli::try_parse_from(["ingest", "upload", "lease.pdf", "--export", "out.json"])
            .unwrap();
        match cli.command {
            Command::Upload { file, export } => {
                assert_eq!(file, PathBuf::from("lease.pdf"));
                assert_eq!(export, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn chat_joins_words_and_globals_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "ingest",
            "chat",
            "who",
            "pays?",
            "--base-url",
            "http://host:8080",
        ])
        .unwrap();
        assert_eq!(cli.global.base_url.as_deref(), Some("http://host:8080"));
        match cli.command {
            Command::Chat { message } => assert_eq!(message.join(" "), "who pays?"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn chat_requires_a_message() {
        assert!(Cli::try_parse_from(["ingest", "chat"]).is_err());
    }
}
