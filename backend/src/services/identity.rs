//! OAuth identity providers.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::{config::Config, models::user::VerifiedIdentity};

pub const GITHUB_PROVIDER: &str = "github";

const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("todo-backend/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("unknown identity provider: {0}")]
    UnknownProvider(String),
    #[error("identity provider rejected the login: {0}")]
    Rejected(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// Completes an OAuth handshake and yields a verified identity. The provider
/// name comes straight from the request path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    fn authorize_url(&self, provider: &str, state: &str) -> Result<Url, IdentityError>;

    async fn complete(&self, provider: &str, code: &str) -> Result<VerifiedIdentity, IdentityError>;
}

pub struct GithubVerifier {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    callback_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: i64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

impl GithubVerifier {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            client_id: config.github_client_id.clone(),
            client_secret: config.github_client_secret.clone(),
            callback_url: config.github_callback_url.clone(),
        })
    }

    fn ensure_provider(provider: &str) -> Result<(), IdentityError> {
        if provider == GITHUB_PROVIDER {
            Ok(())
        } else {
            Err(IdentityError::UnknownProvider(provider.to_string()))
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<String, IdentityError> {
        let response: TokenResponse = self
            .client
            .post(GITHUB_TOKEN_URL)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&serde_json::json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "code": code,
                "redirect_uri": self.callback_url,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(IdentityError::Rejected(
                response
                    .error_description
                    .or(response.error)
                    .unwrap_or_else(|| "no access token returned".to_string()),
            )),
        }
    }

    async fn primary_email(&self, access_token: &str) -> Result<Option<String>, IdentityError> {
        let emails: Vec<GithubEmail> = self
            .client
            .get(format!("{}/user/emails", GITHUB_API_URL))
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(emails
            .into_iter()
            .find(|entry| entry.primary && entry.verified)
            .map(|entry| entry.email))
    }
}

#[async_trait]
impl IdentityVerifier for GithubVerifier {
    fn authorize_url(&self, provider: &str, state: &str) -> Result<Url, IdentityError> {
        Self::ensure_provider(provider)?;
        let url = Url::parse_with_params(
            GITHUB_AUTHORIZE_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.callback_url.as_str()),
                ("scope", "read:user user:email"),
                ("state", state),
            ],
        )?;
        Ok(url)
    }

    async fn complete(&self, provider: &str, code: &str) -> Result<VerifiedIdentity, IdentityError> {
        Self::ensure_provider(provider)?;
        let access_token = self.exchange_code(code).await?;

        let user: GithubUser = self
            .client
            .get(format!("{}/user", GITHUB_API_URL))
            .bearer_auth(&access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let email = match user.email.filter(|email| !email.is_empty()) {
            Some(email) => email,
            None => self.primary_email(&access_token).await?.unwrap_or_default(),
        };

        Ok(VerifiedIdentity {
            id: user.id.to_string(),
            name: user.name.unwrap_or_else(|| user.login.clone()),
            email,
            avatar_url: user.avatar_url.unwrap_or_default(),
            access_token,
            // GitHub OAuth app tokens do not expire.
            expires_at: None,
        })
    }
}
