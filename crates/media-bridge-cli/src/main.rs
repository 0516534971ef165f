//! mediactl — replay media-bridge traces without a native host.
//!
//! Commands:
//!   mediactl replay <trace.jsonl|->   Replay a JSON-lines trace
//!   mediactl actions                  List bridge action names
//!
//! Environment: MEDIA_BRIDGE_SERVICE, MEDIA_BRIDGE_RETENTION, RUST_LOG.

mod replay;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::process::ExitCode;

use media_bridge_core::{MediaAction, MediaConfig};

use crate::replay::{Replay, ReplayError};

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        return ExitCode::from(2);
    }

    let config = match MediaConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    match args[0].as_str() {
        "replay" => cmd_replay(config, &args[1..]),
        "actions" => cmd_actions(),
        other => {
            eprintln!("unknown command: {}", other);
            print_usage();
            ExitCode::from(2)
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_replay(config: MediaConfig, args: &[String]) -> ExitCode {
    if args.is_empty() {
        eprintln!("usage: mediactl replay <trace.jsonl|->");
        return ExitCode::from(2);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match replay_path(config, &args[0], &mut out) {
        Ok(count) => {
            log::info!("media: replayed {} records", count);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("replay failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_actions() -> ExitCode {
    for action in MediaAction::ALL {
        println!("{}", action);
    }
    ExitCode::SUCCESS
}

/// Replay the trace at `path` (`-` reads stdin).
fn replay_path(
    config: MediaConfig,
    path: &str,
    out: &mut impl Write,
) -> Result<usize, ReplayError> {
    let input: Box<dyn BufRead> = if path == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(path)?))
    };
    Replay::new(config).run(input, out)
}

fn print_usage() {
    eprintln!("mediactl — media-bridge trace replay");
    eprintln!();
    eprintln!("  mediactl replay <trace.jsonl|->   Replay a JSON-lines trace");
    eprintln!("  mediactl actions                  List bridge action names");
}
