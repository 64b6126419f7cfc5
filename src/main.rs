//! wikiagent command-line entry point.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use wikiagent::cli::{AgentRunFailed, Cli, execute};
use wikiagent::logging::{LogOptions, init_logging};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let options = if cli.verbose {
        LogOptions::verbose()
    } else {
        LogOptions::default()
    };
    if let Err(e) = init_logging(options) {
        let _ = writeln!(std::io::stderr(), "warning: {e}");
    }

    match execute(&cli) {
        Ok(output) => {
            let _ = std::io::stdout().write_all(output.as_bytes());
            ExitCode::SUCCESS
        }
        Err(e) => {
            if let Some(failed) = e.downcast_ref::<AgentRunFailed>() {
                let _ = std::io::stdout().write_all(failed.rendered.as_bytes());
            } else {
                let _ = writeln!(std::io::stderr(), "Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}
