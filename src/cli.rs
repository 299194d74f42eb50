//! CLI argument parsing for chorus-delay

use crate::flatten::{Component, PsdSelection};
use crate::stats::AveragingMethod;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for binned series
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table (default)
    Text,
    /// JSON for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "chorus-delay")]
#[command(version)]
#[command(about = "Chorus wave power versus delay after substorm injections", long_about = None)]
pub struct Cli {
    /// Pipeline configuration (TOML); defaults are used when omitted
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find quiet times after injections in an auroral index series
    Detect {
        /// CSV of `timestamp,value` index samples
        #[arg(long = "index", value_name = "CSV")]
        index: PathBuf,

        /// Where to write the quiet-time events (JSON)
        #[arg(long = "out", value_name = "JSON")]
        out: PathBuf,
    },

    /// Attach probe locations to quiet-time events
    Match {
        /// Quiet-time events from `detect`
        #[arg(long = "events", value_name = "JSON")]
        events: PathBuf,

        /// Probe ephemerides (JSON array)
        #[arg(long = "ephemeris", value_name = "JSON")]
        ephemeris: PathBuf,

        /// Where to write the matched passes (JSON)
        #[arg(long = "out", value_name = "JSON")]
        out: PathBuf,
    },

    /// Compile band power for every matched event into a store
    Compile {
        /// Matched passes from `match`
        #[arg(long = "passes", value_name = "JSON")]
        passes: PathBuf,

        /// Root of the per-probe day files
        #[arg(long = "data-dir", value_name = "DIR")]
        data_dir: PathBuf,

        /// Store to write (JSON lines)
        #[arg(long = "store", value_name = "JSONL")]
        store: PathBuf,

        /// Append to an existing store instead of replacing it
        #[arg(long = "append")]
        append: bool,
    },

    /// Flatten a store into analysis arrays
    Flatten {
        /// Store written by `compile`
        #[arg(long = "store", value_name = "JSONL")]
        store: PathBuf,

        /// Where to write the analysis data (JSON)
        #[arg(long = "out", value_name = "JSON")]
        out: PathBuf,

        /// Integrated band power or in-band peak power
        #[arg(long = "psd", value_enum, default_value = "integrated")]
        psd: PsdSelection,
    },

    /// Bin chorus power by delay
    Bin {
        /// Analysis data from `flatten`
        #[arg(long = "analysis", value_name = "JSON")]
        analysis: PathBuf,

        /// Field component to bin
        #[arg(long = "component", value_enum, default_value = "b")]
        component: Component,

        /// Averaging method (overrides the config)
        #[arg(long = "method", value_enum)]
        method: Option<AveragingMethod>,

        /// Bin width in minutes (overrides the config)
        #[arg(long = "bin-size", value_name = "MINUTES")]
        bin_size: Option<u32>,

        /// Minimum finite samples per bin (overrides the config)
        #[arg(long = "min-samples", value_name = "N")]
        min_samples: Option<usize>,

        /// Bootstrap resamples for the decay slope error (0 skips the fit)
        #[arg(long = "slope-samples", value_name = "N", default_value = "0")]
        slope_samples: usize,

        /// Output format
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_detect() {
        let cli = Cli::parse_from([
            "chorus-delay",
            "detect",
            "--index",
            "sme.csv",
            "--out",
            "events.json",
        ]);
        match cli.command {
            Command::Detect { index, out } => {
                assert_eq!(index, PathBuf::from("sme.csv"));
                assert_eq!(out, PathBuf::from("events.json"));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(!cli.debug);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "chorus-delay",
            "flatten",
            "--store",
            "s.jsonl",
            "--out",
            "a.json",
            "--debug",
            "--config",
            "pipeline.toml",
        ]);
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("pipeline.toml")));
    }

    #[test]
    fn test_cli_flatten_psd_default() {
        let cli = Cli::parse_from(["chorus-delay", "flatten", "--store", "s", "--out", "o"]);
        assert!(matches!(
            cli.command,
            Command::Flatten {
                psd: PsdSelection::Integrated,
                ..
            }
        ));
    }

    #[test]
    fn test_cli_flatten_psd_max() {
        let cli = Cli::parse_from([
            "chorus-delay",
            "flatten",
            "--store",
            "s",
            "--out",
            "o",
            "--psd",
            "max",
        ]);
        assert!(matches!(
            cli.command,
            Command::Flatten {
                psd: PsdSelection::Max,
                ..
            }
        ));
    }

    #[test]
    fn test_cli_bin_defaults() {
        let cli = Cli::parse_from(["chorus-delay", "bin", "--analysis", "a.json"]);
        match cli.command {
            Command::Bin {
                component,
                method,
                bin_size,
                min_samples,
                slope_samples,
                format,
                ..
            } => {
                assert_eq!(component, Component::B);
                assert_eq!(method, None);
                assert_eq!(bin_size, None);
                assert_eq!(min_samples, None);
                assert_eq!(slope_samples, 0);
                assert_eq!(format, OutputFormat::Text);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_bin_overrides() {
        let cli = Cli::parse_from([
            "chorus-delay",
            "bin",
            "--analysis",
            "a.json",
            "--component",
            "e",
            "--method",
            "gmean",
            "--bin-size",
            "15",
            "--format",
            "json",
        ]);
        match cli.command {
            Command::Bin {
                component,
                method,
                bin_size,
                format,
                ..
            } => {
                assert_eq!(component, Component::E);
                assert_eq!(method, Some(AveragingMethod::Gmean));
                assert_eq!(bin_size, Some(15));
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_method() {
        let result = Cli::try_parse_from([
            "chorus-delay",
            "bin",
            "--analysis",
            "a.json",
            "--method",
            "mode",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_compile_append_flag() {
        let cli = Cli::parse_from([
            "chorus-delay",
            "compile",
            "--passes",
            "p.json",
            "--data-dir",
            "data",
            "--store",
            "s.jsonl",
            "--append",
        ]);
        assert!(matches!(cli.command, Command::Compile { append: true, .. }));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["chorus-delay"]).is_err());
    }
}
