use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use playground_client::ClientConfig;

#[derive(Parser, Debug)]
#[command(
    name = "playground",
    about = "Run code bundles against the playground compile backend"
)]
pub struct Args {
    /// Backend base url, overrides PLAYGROUND_API_URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Ask the compile backend for debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a bundle and stream its console output
    Run {
        /// Bundle JSON file; the built-in example is used when omitted
        file: Option<PathBuf>,

        /// Run the stored bundle with this id instead of a file
        #[arg(long, conflicts_with = "file")]
        id: Option<String>,

        /// Prefix console lines with the time they were produced
        #[arg(long)]
        timestamps: bool,
    },

    /// Print a stored bundle
    Load { id: String },

    /// Store a bundle file and print its id
    Save { file: PathBuf },
}

impl Args {
    /// Environment configuration with command-line overrides applied.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.api_url {
            Some(url) => ClientConfig::new(url)?,
            None => ClientConfig::from_env()?,
        };
        if self.debug {
            config.debug = true;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_id() {
        let args = Args::parse_from(["playground", "run", "--id", "_abc", "-vv"]);
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Run { file, id, timestamps } => {
                assert!(file.is_none());
                assert_eq!(id.as_deref(), Some("_abc"));
                assert!(!timestamps);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_run_file_conflicts_with_id() {
        let result = Args::try_parse_from(["playground", "run", "b.json", "--id", "_abc"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_api_url_override() {
        let args = Args::parse_from([
            "playground",
            "--api-url",
            "http://localhost:8181",
            "--debug",
            "load",
            "_abc",
        ]);
        let config = args.client_config().unwrap();
        assert_eq!(
            config.compile_url().as_str(),
            "http://localhost:8181/compile?debug=1"
        );
    }
}
