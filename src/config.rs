use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BRAVE_API_URL: &str = "https://api.search.brave.com/res/v1/web/search";
pub const DEFAULT_HF_API_URL: &str =
    "https://api-inference.huggingface.co/models/sshleifer/distilbart-cnn-12-6";

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config::from_env()
});

/// How search provider failures reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Search failures abort the request with an upstream error.
    #[default]
    Strict,
    /// Search failures are logged and an empty result is returned.
    Lenient,
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ErrorPolicy::Strict),
            "lenient" => Ok(ErrorPolicy::Lenient),
            other => Err(format!("unknown error policy: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub brave_api_key: Option<String>,
    pub hf_api_token: Option<String>,
    pub brave_api_url: String,
    pub hf_api_url: String,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
    pub error_policy: ErrorPolicy,
    pub search_timeout: Duration,
    pub fetch_timeout: Duration,
    pub summarize_timeout: Duration,
    pub item_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            brave_api_key: None,
            hf_api_token: None,
            brave_api_url: DEFAULT_BRAVE_API_URL.to_string(),
            hf_api_url: DEFAULT_HF_API_URL.to_string(),
            bind_addr: "0.0.0.0:8000".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
            error_policy: ErrorPolicy::Strict,
            search_timeout: Duration::from_secs(15),
            fetch_timeout: Duration::from_secs(10),
            summarize_timeout: Duration::from_secs(30),
            item_timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn from_env() -> Config {
        let defaults = Config::default();
        let bind_addr = match env::var("BIND_ADDR") {
            Ok(addr) => addr,
            Err(_) => match env::var("PORT") {
                Ok(port) => format!("0.0.0.0:{port}"),
                Err(_) => defaults.bind_addr.clone(),
            },
        };
        let error_policy = get_env_opt("ERROR_POLICY")
            .map(|raw| {
                raw.parse().unwrap_or_else(|e| {
                    tracing::warn!("{e}, falling back to strict");
                    ErrorPolicy::Strict
                })
            })
            .unwrap_or_default();

        Config {
            brave_api_key: get_env_opt("BRAVE_API_KEY"),
            hf_api_token: get_env_opt("HF_API_TOKEN"),
            brave_api_url: get_env_or_default("BRAVE_API_URL", DEFAULT_BRAVE_API_URL),
            hf_api_url: get_env_or_default("HF_API_URL", DEFAULT_HF_API_URL),
            bind_addr,
            cors_origins: get_env_opt("CORS_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or(defaults.cors_origins),
            error_policy,
            search_timeout: get_secs("SEARCH_TIMEOUT_SECS", defaults.search_timeout),
            fetch_timeout: get_secs("FETCH_TIMEOUT_SECS", defaults.fetch_timeout),
            summarize_timeout: get_secs("SUMMARIZE_TIMEOUT_SECS", defaults.summarize_timeout),
            item_timeout: get_secs("ITEM_TIMEOUT_SECS", defaults.item_timeout),
        }
    }

    /// Credentials are optional at boot; say so loudly instead of refusing to start.
    pub fn warn_missing_credentials(&self) {
        if self.brave_api_key.is_none() {
            tracing::warn!("BRAVE_API_KEY not set. Requests to the search provider will fail.");
        }
        if self.hf_api_token.is_none() {
            tracing::warn!("HF_API_TOKEN not set. Summarization will fail.");
        }
    }
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn get_env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_secs(key: &str, default: Duration) -> Duration {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                tracing::warn!("invalid value for {key}: {raw:?}, using default");
                default
            }
        },
        Err(_) => default,
    }
}

#[test]
fn test_parse_origins() {
    assert_eq!(
        parse_origins("http://localhost:3000, https://app.example.com/ ,,"),
        vec!["http://localhost:3000", "https://app.example.com"]
    );
    assert!(parse_origins("  ").is_empty());
}

#[test]
fn test_error_policy_from_str() {
    assert_eq!("strict".parse::<ErrorPolicy>(), Ok(ErrorPolicy::Strict));
    assert_eq!(" Lenient ".parse::<ErrorPolicy>(), Ok(ErrorPolicy::Lenient));
    assert!("loose".parse::<ErrorPolicy>().is_err());
}
