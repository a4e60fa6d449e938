//! Command-line argument parsing.
//!
//! Spec §6: a single executable, only long options, no subcommand crate —
//! the surface is small enough that a hand-rolled parser (in the spirit of
//! the teacher's own `args.rs`) is simpler than pulling in `clap`.

use crate::common::constants::{TEMP_MAX, TEMP_MIN};

#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// No flags, or `--daemon`: run the daemon in the foreground.
    Daemon,
    Status,
    Set { temp: u32, minutes: Option<u32> },
    Resume,
    SetLocation(String),
    Refresh,
    Reset,
    Help,
}

#[derive(Debug, PartialEq)]
pub struct ArgError(pub String);

impl std::fmt::Display for ArgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn parse(args: &[String]) -> Result<CliAction, ArgError> {
    let Some(first) = args.first() else {
        return Ok(CliAction::Daemon);
    };

    match first.as_str() {
        "--daemon" => Ok(CliAction::Daemon),
        "--status" => Ok(CliAction::Status),
        "--resume" => Ok(CliAction::Resume),
        "--refresh" => Ok(CliAction::Refresh),
        "--reset" => Ok(CliAction::Reset),
        "--help" => Ok(CliAction::Help),
        "--set" => parse_set(&args[1..]),
        "--set-location" => {
            let loc = args
                .get(1)
                .ok_or_else(|| ArgError("--set-location requires an argument".into()))?;
            Ok(CliAction::SetLocation(loc.clone()))
        }
        other => Err(ArgError(format!("unrecognized option '{other}'"))),
    }
}

fn parse_set(rest: &[String]) -> Result<CliAction, ArgError> {
    let temp_str = rest
        .first()
        .ok_or_else(|| ArgError("--set requires a TEMP argument".into()))?;
    let temp: u32 = temp_str
        .parse()
        .map_err(|_| ArgError(format!("'{temp_str}' is not a valid temperature")))?;
    if !(TEMP_MIN..=TEMP_MAX).contains(&temp) {
        return Err(ArgError(format!(
            "temperature must be between {TEMP_MIN} and {TEMP_MAX} K"
        )));
    }

    let minutes = match rest.get(1) {
        None => None,
        Some(m) => Some(
            m.parse::<u32>()
                .map_err(|_| ArgError(format!("'{m}' is not a valid minute count")))?,
        ),
    };

    Ok(CliAction::Set { temp, minutes })
}

pub fn usage() -> &'static str {
    "abraxasd: solar-position color temperature daemon\n\
     \n\
     Usage: abraxasd [OPTION]\n\
     \n\
     With no option, or --daemon, run the daemon in the foreground.\n\
     \n\
     Options:\n\
     \x20 --status                   print current state\n\
     \x20 --set TEMP [MINUTES]       set a manual override (TEMP: 1000-25000 K, MINUTES default 3)\n\
     \x20 --resume                   clear a manual override and resume solar mode\n\
     \x20 --set-location LOC         set location as \"lat,lon\" or a 5-digit ZIP code\n\
     \x20 --refresh                  force a synchronous weather refresh\n\
     \x20 --reset                    restore the display's saved gamma ramps and exit\n\
     \x20 --help                     show this help\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_args_means_daemon() {
        assert_eq!(parse(&[]).unwrap(), CliAction::Daemon);
    }

    #[test]
    fn explicit_daemon_flag() {
        assert_eq!(parse(&args(&["--daemon"])).unwrap(), CliAction::Daemon);
    }

    #[test]
    fn set_with_default_duration() {
        assert_eq!(
            parse(&args(&["--set", "3500"])).unwrap(),
            CliAction::Set { temp: 3500, minutes: None }
        );
    }

    #[test]
    fn set_with_explicit_duration() {
        assert_eq!(
            parse(&args(&["--set", "3500", "0"])).unwrap(),
            CliAction::Set { temp: 3500, minutes: Some(0) }
        );
    }

    #[test]
    fn set_rejects_out_of_range_temp() {
        assert!(parse(&args(&["--set", "999"])).is_err());
        assert!(parse(&args(&["--set", "25001"])).is_err());
    }

    #[test]
    fn set_location_requires_argument() {
        assert!(parse(&args(&["--set-location"])).is_err());
        assert_eq!(
            parse(&args(&["--set-location", "41.88,-87.63"])).unwrap(),
            CliAction::SetLocation("41.88,-87.63".into())
        );
    }

    #[test]
    fn unknown_flag_is_an_error() {
        assert!(parse(&args(&["--bogus"])).is_err());
    }
}
