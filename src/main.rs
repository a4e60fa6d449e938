//! CLI entry point: parses arguments and dispatches to the daemon event
//! loop or to a one-shot command. All application logic lives in the
//! library crate.

use std::process::ExitCode;

#[macro_use]
extern crate abraxas;

use abraxas::args::{self, CliAction};
use abraxas::commands;
use abraxas::common::constants::{EXIT_FAILURE, EXIT_SUCCESS};
use abraxas::event_loop::EventLoop;
use abraxas::paths::Paths;

fn main() -> ExitCode {
    let raw_args: Vec<String> = std::env::args().skip(1).collect();

    let action = match args::parse(&raw_args) {
        Ok(action) => action,
        Err(e) => {
            eprintln!("abraxasd: {e}");
            eprintln!();
            eprint!("{}", args::usage());
            return ExitCode::from(EXIT_FAILURE as u8);
        }
    };

    if action == CliAction::Help {
        commands::help::run();
        return ExitCode::from(EXIT_SUCCESS as u8);
    }

    if action == CliAction::Daemon {
        return match EventLoop::start() {
            Ok(()) => ExitCode::from(EXIT_SUCCESS as u8),
            Err(e) => {
                eprintln!("abraxasd: {e}");
                ExitCode::from(EXIT_FAILURE as u8)
            }
        };
    }

    let paths = match Paths::resolve() {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("abraxasd: {e}");
            return ExitCode::from(EXIT_FAILURE as u8);
        }
    };

    let result = match action {
        CliAction::Status => commands::status::run(&paths),
        CliAction::Set { temp, minutes } => commands::set::run(&paths, temp, minutes),
        CliAction::Resume => commands::resume::run(&paths),
        CliAction::SetLocation(loc) => commands::set_location::run(&paths, &loc),
        CliAction::Refresh => commands::refresh::run(&paths),
        CliAction::Reset => commands::reset::run(&paths),
        CliAction::Daemon | CliAction::Help => unreachable!("handled above"),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS as u8),
        Err(e) => {
            eprintln!("abraxasd: {e:#}");
            ExitCode::from(EXIT_FAILURE as u8)
        }
    }
}
