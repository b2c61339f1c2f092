//! Command-line surface (§6 EXTERNAL INTERFACES): verbs, long/short option
//! forms, and the `--` that ends option parsing for `launch`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "modlaunch", about = "Vendor-neutral launcher for pluggable module-container runtimes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Recursively remove an instance directory.
    Delete {
        instance: PathBuf,
    },

    /// Materialize or refresh an instance: compute the deployment plan,
    /// run it against the container, then exit without starting it.
    Deploy {
        #[command(flatten)]
        opts: DeployOpts,
        instance: PathBuf,
    },

    /// Load an existing instance and run the container without
    /// recomputing the deployment plan.
    Start {
        #[command(flatten)]
        opts: DeployOpts,
        instance: PathBuf,
    },

    /// Deploy then start in one invocation. A bare `--` ends option
    /// parsing; remaining tokens are passed through to the container
    /// unexamined.
    Launch {
        #[command(flatten)]
        opts: DeployOpts,
        instance: PathBuf,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        container_args: Vec<String>,
    },

    /// Send `stop` over the command channel, either by instance path (read
    /// `instance.link`) or by explicit `host port secret`.
    Stop {
        #[arg(required = true, num_args = 1..=3)]
        target: Vec<String>,
    },
}

#[derive(Args, Debug, Default)]
pub struct DeployOpts {
    /// A bundle source directory; repeatable, applied in order given.
    #[arg(long = "bundle-source", short = 'b')]
    pub bundle_sources: Vec<PathBuf>,

    /// `name=value` launching-property override; repeatable.
    #[arg(long = "property", short = 'D')]
    pub properties: Vec<String>,

    /// Load launching-properties defaults from a property file before
    /// applying `--property` overrides.
    #[arg(long)]
    pub launching_properties: Option<PathBuf>,

    /// Wipe the container's storage area on this run.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub clean: Option<bool>,

    /// `shutdown.timeout`-style value: `none`, or `<n>{ms|s|m}`.
    #[arg(long)]
    pub shutdown_timeout: Option<String>,
}

/// Parse a `--property name=value` token into its two halves.
pub fn parse_property(raw: &str) -> Option<(String, String)> {
    raw.split_once('=').map(|(k, v)| (k.to_string(), v.to_string()))
}
