use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_AGENT: &str = concat!("thread_scraper/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_POSTS_PER_PAGE: u32 = 50;

/// What to do when a post is already in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Leave the stored row alone.
    #[default]
    Skip,
    /// Replace the stored row with the new one.
    Overwrite,
    /// Stop the run.
    Abort,
}

/// Run settings. Defaults, then `THREAD_SCRAPER_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Size of a full thread page; scales the per-page `[#N]` markers into ids.
    pub posts_per_page: u32,
    pub max_pages: u32,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            posts_per_page: DEFAULT_POSTS_PER_PAGE,
            max_pages: 1000,
            duplicate_policy: DuplicatePolicy::Skip,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_config(
            Config::builder().add_source(Environment::with_prefix("THREAD_SCRAPER")),
        )
    }

    fn from_config(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let d = Settings::default();
        builder
            .set_default("user_agent", d.user_agent)?
            .set_default("timeout_secs", d.timeout_secs as i64)?
            .set_default("posts_per_page", i64::from(d.posts_per_page))?
            .set_default("max_pages", i64::from(d.max_pages))?
            .set_default("duplicate_policy", "skip")?
            .build()?
            .try_deserialize()
    }
}
