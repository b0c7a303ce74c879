// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FlexView.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "flexview")]
#[command(author, version, about = "FlexView household energy dashboard")]
#[command(
    long_about = "Aggregates meter and battery publications into the figures of a household \
    energy dashboard.\n\
    \nExamples:\n  \
    flexview run --input capture.jsonl       # Replay a captured feed\n  \
    tail -f live.jsonl | flexview           # Follow a live feed on stdin\n  \
    flexview history --meter <uuid> --input capture.jsonl > power.tsv"
)]
pub struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Aggregate the feed and publish dashboard snapshots (default)
    Run {
        /// Feed file, or "-" for stdin (overrides feed.input)
        #[arg(long)]
        input: Option<String>,

        /// Write every snapshot as a JSON line to stdout
        #[arg(long)]
        json: bool,
    },

    /// Render average power of one meter as TSV from its energy counters
    History {
        /// Meter id
        #[arg(long)]
        meter: String,

        /// Feed file, or "-" for stdin (overrides feed.input)
        #[arg(long)]
        input: Option<String>,

        /// Keep one counter sample per bucket of this many seconds
        #[arg(long, default_value_t = 60)]
        bucket_secs: i64,
    },
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run {
            input: None,
            json: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_is_default() {
        let cli = Cli::parse_from(["flexview"]);
        assert_eq!(
            cli.command(),
            Commands::Run {
                input: None,
                json: false
            }
        );
    }

    #[test]
    fn test_history_args() {
        let cli = Cli::parse_from([
            "flexview",
            "history",
            "--meter",
            "m1",
            "--input",
            "feed.jsonl",
            "-c",
            "conf.toml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("conf.toml")));
        assert_eq!(
            cli.command(),
            Commands::History {
                meter: "m1".to_string(),
                input: Some("feed.jsonl".to_string()),
                bucket_secs: 60,
            }
        );
    }
}
