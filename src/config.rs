use anyhow::{bail, Context, Result};
use std::{env, fmt, str::FromStr, time::Duration};

const DEFAULT_REPLICATE_ENDPOINT: &str = "https://api.replicate.com/v1";
// lucataco/ip-adapter
const DEFAULT_REPLICATE_MODEL_VERSION: &str = "5a5277b4f1e0470510e403d3b26bc452f99a0d84";

/// Which external try-on service the process talks to. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Replicate,
    PicCopilot,
    Generic,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Replicate => "replicate",
            ProviderKind::PicCopilot => "piccopilot",
            ProviderKind::Generic => "generic",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replicate" => Ok(ProviderKind::Replicate),
            "piccopilot" | "pic-copilot" | "pic_copilot" => Ok(ProviderKind::PicCopilot),
            "generic" | "default" => Ok(ProviderKind::Generic),
            other => bail!("Unsupported AI provider: {}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub provider: ProviderKind,
    pub api_key: String,
    pub endpoint: String,
    pub timeout: Duration,
    pub retry_count: u32,
    pub retry_base_delay: Duration,
    pub replicate_model_version: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub port: u16,
    pub upload_dir: String,
    pub max_file_size: usize,
    pub jwt_secret: String,
    pub api_base_url: String,
    pub ai: AiConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/outfit_tryon".to_string()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 10)?,
            port: parse_var("PORT", 3001)?,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            max_file_size: parse_var("MAX_FILE_SIZE", 10 * 1024 * 1024)?, // 10MB
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string()),
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
            ai: AiConfig::from_env()?,
        })
    }

    /// `memory://` selects the in-process store instead of PostgreSQL.
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory:")
    }
}

impl AiConfig {
    pub fn from_env() -> Result<Self> {
        let provider: ProviderKind = env::var("AI_PROVIDER")
            .unwrap_or_else(|_| "replicate".to_string())
            .parse()?;

        let (key_vars, endpoint_vars): (&[&str], &[&str]) = match provider {
            ProviderKind::Replicate => (
                &["REPLICATE_API_TOKEN", "AI_API_KEY"],
                &["REPLICATE_API_ENDPOINT", "AI_API_ENDPOINT"],
            ),
            ProviderKind::PicCopilot => (
                &["PIC_COPILOT_API_KEY", "AI_API_KEY"],
                &["PIC_COPILOT_API_ENDPOINT", "AI_API_ENDPOINT"],
            ),
            ProviderKind::Generic => (&["AI_API_KEY"], &["AI_API_ENDPOINT"]),
        };

        let endpoint = match (first_var(endpoint_vars), provider) {
            (Some(endpoint), _) => endpoint,
            (None, ProviderKind::Replicate) => DEFAULT_REPLICATE_ENDPOINT.to_string(),
            (None, _) => bail!(
                "{} provider requires an endpoint ({})",
                provider,
                endpoint_vars.join(" or ")
            ),
        };

        let timeout_ms: u64 = match first_var(&["AI_TIMEOUT_MS", "AI_TIMEOUT"]) {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("AI_TIMEOUT_MS is not a number: {}", raw))?,
            None => 120_000,
        };

        Ok(AiConfig {
            provider,
            api_key: first_var(key_vars).unwrap_or_default(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(timeout_ms),
            retry_count: parse_var("AI_RETRY_COUNT", 3)?,
            retry_base_delay: Duration::from_millis(parse_var("AI_RETRY_BASE_DELAY_MS", 1000)?),
            replicate_model_version: env::var("REPLICATE_MODEL_VERSION")
                .unwrap_or_else(|_| DEFAULT_REPLICATE_MODEL_VERSION.to_string()),
        })
    }
}

fn first_var(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| env::var(key).ok())
        .find(|value| !value.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}
