use clap::{ArgAction, Parser};

use crate::types::{CollisionPolicy, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "gphotos-dl",
    about = "Download a Google Photos library into a year/month folder tree"
)]
pub struct Cli {
    /// Root directory for downloads
    #[arg(value_name = "DIRECTORY")]
    pub directory: String,

    /// Cache the OAuth 2.0 token on disk
    #[arg(long = "cachetoken", default_value_t = true, action = ArgAction::Set)]
    pub cache_token: bool,

    /// OAuth client secret downloaded from the Google Cloud console
    #[arg(long, default_value = "client_secret.json")]
    pub client_secret: String,

    /// Where the cached OAuth token is stored
    #[arg(long, default_value = "credentials")]
    pub credentials: String,

    /// Seconds to wait before retrying a rate-limited or failed listing request
    #[arg(long, default_value_t = 0)]
    pub retry_delay: u64,

    /// Give up listing after this many consecutive retries (default: never)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// How to name an item whose path is taken by a different item
    #[arg(long, value_enum, default_value = "suffix-id")]
    pub collision_policy: CollisionPolicy,

    /// Resolve and log paths without downloading anything
    #[arg(long)]
    pub dry_run: bool,

    /// Disable progress spinner
    #[arg(long)]
    pub no_progress_bar: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}
