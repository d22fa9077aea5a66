//! Launch arguments passed by the Stream Deck application
//!
//! Stream Deck starts plugins as
//! `plugin -port 28196 -pluginUUID <uuid> -registerEvent registerPlugin -info <json>`,
//! i.e. with single-dash long flags. They are rewritten to the double-dash
//! form before handing them to clap.

use clap::Parser;
use serde_json::Value;

/// Steam Big Picture toggle for Stream Deck
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(author, version, about, long_about = None)]
pub struct LaunchArgs {
    /// Port of the Stream Deck WebSocket server
    #[arg(long)]
    pub port: u16,

    /// Identifier sent back when registering
    #[arg(long = "pluginUUID")]
    pub plugin_uuid: String,

    /// Event name used to register
    #[arg(long = "registerEvent")]
    pub register_event: String,

    /// JSON blob describing the Stream Deck application and devices
    #[arg(long)]
    pub info: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Use the in-memory console driver instead of driving Steam
    #[arg(long)]
    pub simulate: bool,
}

impl LaunchArgs {
    /// Parse process arguments in Stream Deck's format
    pub fn parse_launch<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    /// The `-info` blob, if present and valid JSON
    pub fn info_json(&self) -> Option<Value> {
        self.info
            .as_deref()
            .and_then(|info| serde_json::from_str(info).ok())
    }

    /// Stream Deck application version from `-info`
    pub fn application_version(&self) -> Option<String> {
        self.info_json()?
            .pointer("/application/version")?
            .as_str()
            .map(str::to_string)
    }
}

/// Long flags that take no value
const SWITCHES: &[&str] = &["simulate", "help", "version"];

/// Turn `-flag` into `--flag`, leaving the program name, values and
/// single-letter flags alone
pub fn normalize_args<I, T>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let mut normalized = Vec::new();
    let mut expect_value = false;

    for (idx, arg) in args.into_iter().map(Into::into).enumerate() {
        let is_long_single_dash = idx > 0
            && !expect_value
            && arg.len() > 2
            && arg.starts_with('-')
            && !arg.starts_with("--")
            && arg[1..].chars().all(|c| c.is_ascii_alphanumeric() || c == '-');

        if is_long_single_dash {
            expect_value = !SWITCHES.contains(&&arg[1..]);
            normalized.push(format!("-{}", arg));
        } else {
            expect_value = false;
            normalized.push(arg);
        }
    }

    normalized
}
