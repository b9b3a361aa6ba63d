//! Client for the chat/query service.

use async_trait::async_trait;
use datachat_types::{
    ChatSummary, CreateChatRequest, DatabaseRef, Message, QueryRequest, QueryResponse,
    ServiceErrorBody,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {}", .message.as_deref().unwrap_or("no detail"))]
    Api { status: u16, message: Option<String> },
}

impl ServiceError {
    /// Human-readable detail supplied by the server, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ServiceError::Api { message, .. } => message.as_deref(),
            ServiceError::Http(_) => None,
        }
    }

    /// Build an API error from a failed response body.
    pub fn from_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ServiceErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .filter(|e| !e.trim().is_empty());
        ServiceError::Api { status, message }
    }
}

/// Remote operations the client depends on.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Chats of the current user, newest first.
    async fn list_chats(&self) -> Result<Vec<ChatSummary>, ServiceError>;

    async fn create_chat(&self, request: &CreateChatRequest) -> Result<ChatSummary, ServiceError>;

    async fn delete_chat(&self, chat_id: &str) -> Result<(), ServiceError>;

    /// Server-side transcript of a chat, oldest first.
    async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>, ServiceError>;

    async fn submit_query(&self, request: &QueryRequest) -> Result<QueryResponse, ServiceError>;

    async fn list_databases(&self) -> Result<Vec<DatabaseRef>, ServiceError>;
}

/// Connection settings for [`HttpChatService`].
#[derive(Debug, Clone)]
pub struct HttpServiceConfig {
    pub base_url: String,
    /// Bearer token issued by the identity provider.
    pub api_token: Option<String>,
    pub timeout: Duration,
}

impl Default for HttpServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            api_token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// [`ChatService`] over the HTTP JSON API.
pub struct HttpChatService {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpChatService {
    pub fn new(config: HttpServiceConfig) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.filter(|t| !t.is_empty()),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self
            .client
            .request(method, self.endpoint(path))
            .header("Content-Type", "application/json");
        if let Some(token) = &self.api_token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        req
    }

    async fn check(resp: Response) -> Result<Response, ServiceError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        debug!(target: "datachat::service", "Request failed with {}: {}", status, text);
        Err(ServiceError::from_body(status, &text))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let resp = self.request(Method::GET, path).send().await?;
        let resp = Self::check(resp).await?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl ChatService for HttpChatService {
    async fn list_chats(&self) -> Result<Vec<ChatSummary>, ServiceError> {
        self.get_json("/api/chats").await
    }

    async fn create_chat(&self, request: &CreateChatRequest) -> Result<ChatSummary, ServiceError> {
        let resp = self
            .request(Method::POST, "/api/chats")
            .json(request)
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        Ok(resp.json().await?)
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<(), ServiceError> {
        let resp = self
            .request(Method::DELETE, &format!("/api/chats/{}", chat_id))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>, ServiceError> {
        self.get_json(&format!("/api/chats/{}/messages", chat_id)).await
    }

    async fn submit_query(&self, request: &QueryRequest) -> Result<QueryResponse, ServiceError> {
        let resp = self
            .request(Method::POST, "/api/query")
            .json(request)
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        Ok(resp.json().await?)
    }

    async fn list_databases(&self) -> Result<Vec<DatabaseRef>, ServiceError> {
        self.get_json("/api/databases").await
    }
}
