use std::path::PathBuf;

use crate::types::CollisionPolicy;

/// Application configuration, resolved from the command line.
pub struct Config {
    pub directory: PathBuf,
    pub client_secret: PathBuf,
    pub credentials: PathBuf,

    pub retry_delay_secs: u64,
    pub max_retries: Option<u32>,

    pub collision_policy: CollisionPolicy,

    pub cache_token: bool,
    pub dry_run: bool,
    pub no_progress_bar: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("directory", &self.directory)
            .field("client_secret", &self.client_secret)
            .field("credentials", &self.credentials)
            .field("cache_token", &self.cache_token)
            .field("max_retries", &self.max_retries)
            .field("collision_policy", &self.collision_policy)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        if cli.directory.trim().is_empty() {
            anyhow::bail!("DIRECTORY must not be empty");
        }

        Ok(Self {
            directory: expand_tilde(&cli.directory),
            client_secret: expand_tilde(&cli.client_secret),
            credentials: expand_tilde(&cli.credentials),
            retry_delay_secs: cli.retry_delay,
            max_retries: cli.max_retries,
            collision_policy: cli.collision_policy,
            cache_token: cli.cache_token,
            dry_run: cli.dry_run,
            no_progress_bar: cli.no_progress_bar,
        })
    }
}
