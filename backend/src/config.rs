use anyhow::{anyhow, Context};
use rand::RngCore;
use std::env;

/// Shortest accepted `SESSION_SECRET`, in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub session_secret: Vec<u8>,
    pub cookie_secure: bool,
    pub frontend_url: String,
    pub cors_allow_origins: Vec<String>,
    pub github_client_id: String,
    pub github_client_secret: String,
    pub github_callback_url: String,
    pub port: u16,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url = var("DATABASE_URL").unwrap_or_else(|| "sqlite://todo.db".to_string());

        let database_max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| anyhow!("Invalid DATABASE_MAX_CONNECTIONS value: {}", raw))?,
            None => 5,
        };

        let session_secret = match var("SESSION_SECRET") {
            Some(secret) if secret.len() < MIN_SESSION_SECRET_LEN => {
                return Err(anyhow!(
                    "SESSION_SECRET must be at least {} bytes",
                    MIN_SESSION_SECRET_LEN
                ));
            }
            Some(secret) => secret.into_bytes(),
            None => {
                tracing::warn!(
                    "SESSION_SECRET not set; generating an ephemeral key, sessions will not survive a restart"
                );
                let mut key = vec![0u8; 64];
                rand::thread_rng().fill_bytes(&mut key);
                key
            }
        };

        let cookie_secure = match var("COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| anyhow!("Invalid COOKIE_SECURE value: {}", raw))?,
            None => true,
        };

        let frontend_url = var("FRONTEND_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let cors_allow_origins = var("CORS_ALLOW_ORIGINS")
            .map(|raw| parse_list(&raw))
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec![frontend_url.clone()]);

        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid PORT value: {}", raw))?,
            None => 8080,
        };

        Ok(Config {
            database_url,
            database_max_connections,
            session_secret,
            cookie_secure,
            frontend_url,
            cors_allow_origins,
            github_client_id: var("GITHUB_CLIENT_ID").unwrap_or_default(),
            github_client_secret: var("GITHUB_CLIENT_SECRET").unwrap_or_default(),
            github_callback_url: var("GITHUB_CALLBACK_URL").unwrap_or_default(),
            port,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().trim_end_matches('/').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
