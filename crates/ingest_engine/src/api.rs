//! HTTP client for the conversation and graph endpoints.
//!
//! Chat history lives server-side, keyed by the session cookie. The client
//! keeps a cookie jar for its lifetime, and the jar's cookies can be exported
//! and restored so a session outlives one process.
use std::sync::Arc;
use std::time::Duration;

use ingest_logging::{ingest_debug, ingest_warn};
use reqwest::cookie::{CookieStore, Jar};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
    #[error("message is empty")]
    EmptyMessage,
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Turns a message history plus a new user message into an updated history.
#[async_trait::async_trait]
pub trait ConversationEngine: Send + Sync {
    async fn history(&self) -> Result<Vec<Value>, ApiError>;
    async fn send(&self, message: &str) -> Result<Vec<Value>, ApiError>;
    async fn reset(&self) -> Result<(), ApiError>;
}

/// Read-only facts about the knowledge graph behind the conversation.
#[async_trait::async_trait]
pub trait GraphStore: Send + Sync {
    async fn questions(&self) -> Result<Vec<Value>, ApiError>;
    async fn description(&self) -> Result<Value, ApiError>;
}

#[derive(Debug, Deserialize)]
struct MessagesBody {
    #[serde(default)]
    messages: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct QuestionsBody {
    #[serde(default)]
    questions: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct DescriptionBody {
    #[serde(default)]
    description: Value,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    jar: Arc<Jar>,
    base: Url,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let mut base = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::InvalidUrl(format!("{}: {err}", settings.base_url)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self { client, jar, base })
    }

    /// Cookies the server has set for the base URL, as a `Cookie` header value.
    pub fn session_cookies(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base)?;
        match header.to_str() {
            Ok(value) => Some(value.to_string()),
            Err(err) => {
                ingest_warn!("session cookie is not printable: {}", err);
                None
            }
        }
    }

    /// Seed the jar from a value previously returned by [`Self::session_cookies`].
    pub fn restore_session(&self, cookies: &str) {
        for pair in cookies.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            self.jar.add_cookie_str(&format!("{pair}; Path=/"), &self.base);
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|err| ApiError::InvalidUrl(err.to_string()))
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        ingest_debug!("GET {}", url);
        let response = check_status(self.client.get(url).send().await?)?;
        Ok(response.json().await?)
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        ingest_debug!("POST {}", url);
        let response = check_status(self.client.post(url).json(body).send().await?)?;
        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl ConversationEngine for ApiClient {
    async fn history(&self) -> Result<Vec<Value>, ApiError> {
        let body: MessagesBody = self.get("api/messages").await?;
        Ok(body.messages.unwrap_or_default())
    }

    async fn send(&self, message: &str) -> Result<Vec<Value>, ApiError> {
        if message.trim().is_empty() {
            return Err(ApiError::EmptyMessage);
        }
        let body: MessagesBody = self.post("api/chat", &json!({ "message": message })).await?;
        Ok(body.messages.unwrap_or_default())
    }

    async fn reset(&self) -> Result<(), ApiError> {
        let _: MessagesBody = self.post("api/reset", &json!({})).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl GraphStore for ApiClient {
    async fn questions(&self) -> Result<Vec<Value>, ApiError> {
        let body: QuestionsBody = self.get("api/questions").await?;
        Ok(body.questions.unwrap_or_default())
    }

    async fn description(&self) -> Result<Value, ApiError> {
        let body: DescriptionBody = self.get("api/description").await?;
        Ok(body.description)
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::HttpStatus(status.as_u16()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_path_prefix_is_kept() {
        let client = ApiClient::new(&ApiSettings {
            base_url: "http://example.com/app".to_string(),
            ..ApiSettings::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoint("api/chat").unwrap().as_str(),
            "http://example.com/app/api/chat"
        );
    }

    #[test]
    fn restored_cookies_are_reported_back() {
        let client = ApiClient::new(&ApiSettings::default()).unwrap();
        assert_eq!(client.session_cookies(), None);
        client.restore_session("connect.sid=s%3Aabc; theme=dark");
        let cookies = client.session_cookies().unwrap();
        assert!(cookies.contains("connect.sid=s%3Aabc"));
        assert!(cookies.contains("theme=dark"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = ApiClient::new(&ApiSettings {
            base_url: "::nope".to_string(),
            ..ApiSettings::default()
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }
}
