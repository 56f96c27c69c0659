// src/config/credentials.rs
use once_cell::sync::OnceCell;
use std::env;

pub const ENV_SERPAPI: &str = "SERPAPI_API_KEY";
pub const ENV_NEWSDATA: &str = "NEWSDATA_API_KEY";
pub const ENV_GNEWS: &str = "GNEWS_API_KEY";
pub const ENV_PHANTOMBUSTER: &str = "PHANTOMBUSTER_API_KEY";
pub const ENV_PHANTOMBUSTER_AGENT: &str = "PHANTOMBUSTER_AGENT_ID";
pub const ENV_OPENAI: &str = "OPENAI_API_KEY";

/// API credentials, resolved once at process start and handed to client
/// constructors. Core code never reads the environment itself.
#[derive(Clone, Default)]
pub struct Credentials {
    pub serpapi_key: Option<String>,
    pub newsdata_key: Option<String>,
    pub gnews_key: Option<String>,
    pub phantombuster_key: Option<String>,
    pub phantombuster_agent_id: Option<String>,
    pub openai_key: Option<String>,
}

impl Credentials {
    /// Reads every key from the process environment. Blank values count as missing.
    pub fn from_env() -> Self {
        Self {
            serpapi_key: non_blank_env(ENV_SERPAPI),
            newsdata_key: non_blank_env(ENV_NEWSDATA),
            gnews_key: non_blank_env(ENV_GNEWS),
            phantombuster_key: non_blank_env(ENV_PHANTOMBUSTER),
            phantombuster_agent_id: non_blank_env(ENV_PHANTOMBUSTER_AGENT),
            openai_key: non_blank_env(ENV_OPENAI),
        }
    }

    /// Names of the keys that are present; safe to log.
    pub fn present(&self) -> Vec<&'static str> {
        [
            (ENV_SERPAPI, self.serpapi_key.is_some()),
            (ENV_NEWSDATA, self.newsdata_key.is_some()),
            (ENV_GNEWS, self.gnews_key.is_some()),
            (ENV_PHANTOMBUSTER, self.phantombuster_key.is_some()),
            (ENV_PHANTOMBUSTER_AGENT, self.phantombuster_agent_id.is_some()),
            (ENV_OPENAI, self.openai_key.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

// Keys never end up in logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("present", &self.present())
            .finish()
    }
}

fn non_blank_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

static GLOBAL: OnceCell<Credentials> = OnceCell::new();

/// Process-wide init-once store used by the binaries.
pub fn init_global() -> &'static Credentials {
    GLOBAL.get_or_init(Credentials::from_env)
}
