//! Common types and utilities shared across commands

use clap::Parser;
use std::ffi::OsString;

/// Global CLI options available to all commands
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    #[arg(short, long, global = true, help = "Decrease verbosity")]
    pub quiet: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity (-v for debug, -vv for trace)")]
    pub verbose: u8,

    #[arg(long, global = true, help = "Do not write a log file for this run")]
    pub no_log_file: bool,
}

impl GlobalOpts {
    /// Get the effective verbosity level
    /// - 0: quiet/warn only
    /// - 1: debug (-v)
    /// - 2: trace (-vv)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

/// Notice printed when `compile` is inserted for an old-style invocation
pub const LEGACY_NOTICE: &str =
    "Enabling legacy behavior, please use `compile` command in the future.";

fn is_global_flag(arg: &str) -> bool {
    match arg {
        "--quiet" | "--verbose" | "--no-log-file" => true,
        _ => {
            arg.len() > 1
                && arg.starts_with('-')
                && !arg.starts_with("--")
                && arg[1..].chars().all(|c| c == 'v' || c == 'q')
        }
    }
}

/// Insert `compile` when the first argument after the global flags is
/// neither a command nor a flag
///
/// Returns the arguments and whether the insertion happened.
pub fn with_legacy_compile(mut args: Vec<OsString>, commands: &[&str]) -> (Vec<OsString>, bool) {
    let Some(position) = args
        .iter()
        .skip(1)
        .position(|a| !a.to_str().is_some_and(is_global_flag))
        .map(|p| p + 1)
    else {
        return (args, false);
    };
    let Some(first) = args[position].to_str() else {
        return (args, false);
    };
    if first.starts_with('-') || commands.contains(&first) {
        return (args, false);
    }
    args.insert(position, OsString::from("compile"));
    (args, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMANDS: &[&str] = &["compile", "check", "inspect", "config", "help"];

    fn args(items: &[&str]) -> Vec<OsString> {
        items.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_verbosity_level() {
        let opts = GlobalOpts {
            quiet: true,
            verbose: 2,
            no_log_file: false,
        };
        assert_eq!(opts.verbosity_level(), 0);
        let opts = GlobalOpts {
            verbose: 2,
            ..Default::default()
        };
        assert_eq!(opts.verbosity_level(), 2);
    }

    #[test]
    fn test_legacy_compile_inserted() {
        let (result, inserted) =
            with_legacy_compile(args(&["curator", "a.root", "--dataset", "d"]), COMMANDS);
        assert!(inserted);
        assert_eq!(result, args(&["curator", "compile", "a.root", "--dataset", "d"]));
    }

    #[test]
    fn test_legacy_compile_after_global_flags() {
        let (result, inserted) =
            with_legacy_compile(args(&["curator", "-vv", "--no-log-file", "a.root"]), COMMANDS);
        assert!(inserted);
        assert_eq!(
            result,
            args(&["curator", "-vv", "--no-log-file", "compile", "a.root"])
        );
    }

    #[test]
    fn test_known_commands_and_flags_untouched() {
        for call in [
            &["curator", "check", "m.yml"][..],
            &["curator", "--help"][..],
            &["curator", "-h"][..],
            &["curator", "-v", "config", "path"][..],
            &["curator", "--no-log-file"][..],
            &["curator"][..],
        ] {
            let (result, inserted) = with_legacy_compile(args(call), COMMANDS);
            assert!(!inserted);
            assert_eq!(result, args(call));
        }
    }
}
