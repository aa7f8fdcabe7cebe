//! HTTP chat store - ChatStore over a hosted conversation API.
//!
//! The client is a thin, stateless wrapper: every call carries the API key
//! as a bearer token and the project id and fixed user id in the payload.
//!
//! # Endpoints
//!
//! | Operation | Request                                   | Response       |
//! |-----------|-------------------------------------------|----------------|
//! | create    | `POST {base}/chats`                       | `{"id": ...}`  |
//! | fetch     | `GET {base}/chats/{id}?project_id&user_id` | `{"messages"}` |
//! | save      | `PUT {base}/chats/{id}`                   | any JSON       |

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::domain::chat::{ChatMessage, ConversationId};
use crate::ports::{ChatMeta, ChatStore, ChatStoreError, NewChat, SaveChat, StoredChat};

/// Configuration for the HTTP chat store.
#[derive(Debug, Clone)]
pub struct HttpChatStoreConfig {
    /// API root, without trailing slash.
    pub base_url: String,
    api_key: Secret<String>,
    /// Project the conversations belong to.
    pub project_id: String,
    /// Fixed user every conversation is stored under.
    pub user_id: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl HttpChatStoreConfig {
    /// Creates a configuration.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        project_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: Secret::new(api_key.into()),
            project_id: project_id.into(),
            user_id: user_id.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// HTTP implementation of [`ChatStore`].
pub struct HttpChatStore {
    config: HttpChatStoreConfig,
    client: Client,
}

impl HttpChatStore {
    /// Creates a store client.
    ///
    /// # Errors
    ///
    /// Returns `ChatStoreError::Network` if the HTTP client cannot be built.
    pub fn new(config: HttpChatStoreConfig) -> Result<Self, ChatStoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChatStoreError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn chats_url(&self) -> String {
        format!("{}/chats", self.config.base_url)
    }

    fn chat_url(&self, id: &ConversationId) -> String {
        format!("{}/chats/{}", self.config.base_url, id)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(self.config.api_key())
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ChatStoreError> {
        self.authorized(builder)
            .send()
            .await
            .map_err(|e| ChatStoreError::Network(e.to_string()))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ChatStoreError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ChatStoreError::Decode(e.to_string()))
    }
}

/// Maps a non-success status to an error.
fn status_error(status: StatusCode, body: String) -> ChatStoreError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ChatStoreError::Unauthorized,
        _ => ChatStoreError::Status {
            status: status.as_u16(),
            body,
        },
    }
}

async fn ensure_success(response: Response) -> Result<Response, ChatStoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, body))
}

#[async_trait]
impl ChatStore for HttpChatStore {
    async fn create(&self, title: &str) -> Result<NewChat, ChatStoreError> {
        let body = CreateChatBody {
            project_id: &self.config.project_id,
            user_id: &self.config.user_id,
            title,
        };

        let response = self.send(self.client.post(self.chats_url()).json(&body)).await?;
        let created: NewChat = Self::decode(ensure_success(response).await?).await?;

        tracing::debug!(conversation_id = %created.id, "Created conversation");
        Ok(created)
    }

    async fn fetch(&self, id: &ConversationId) -> Result<StoredChat, ChatStoreError> {
        let query = [
            ("project_id", self.config.project_id.as_str()),
            ("user_id", self.config.user_id.as_str()),
        ];

        let response = self.send(self.client.get(self.chat_url(id)).query(&query)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(StoredChat::default());
        }

        Self::decode(ensure_success(response).await?).await
    }

    async fn save(&self, chat: SaveChat) -> Result<serde_json::Value, ChatStoreError> {
        let body = SaveChatBody {
            project_id: &self.config.project_id,
            user_id: &chat.user_id,
            messages: &chat.messages,
            meta: &chat.meta,
        };

        let response = self.send(self.client.put(self.chat_url(&chat.id)).json(&body)).await?;
        let response = ensure_success(response).await?;

        // Some deployments answer 204; treat an empty body as a bare ack.
        let text = response
            .text()
            .await
            .map_err(|e| ChatStoreError::Decode(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ChatStoreError::Decode(e.to_string()))
    }
}

// ----- Request bodies -----

#[derive(Debug, Serialize)]
struct CreateChatBody<'a> {
    project_id: &'a str,
    user_id: &'a str,
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct SaveChatBody<'a> {
    project_id: &'a str,
    user_id: &'a str,
    messages: &'a [ChatMessage],
    meta: &'a ChatMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::Role;
    use serde_json::json;

    fn store() -> HttpChatStore {
        HttpChatStore::new(HttpChatStoreConfig::new(
            "https://chats.example.com/api/",
            "key-123",
            "proj-1",
            "chat-relay",
        ))
        .unwrap()
    }

    #[test]
    fn config_trims_trailing_slash_and_hides_key() {
        let config = HttpChatStoreConfig::new("https://x.test/", "key-123", "p", "u")
            .with_timeout(Duration::from_secs(3));

        assert_eq!(config.base_url, "https://x.test");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.api_key(), "key-123");
        assert!(!format!("{:?}", config).contains("key-123"));
    }

    #[test]
    fn urls_are_built_from_base() {
        let store = store();
        assert_eq!(store.chats_url(), "https://chats.example.com/api/chats");
        assert_eq!(
            store.chat_url(&ConversationId::new("abc").unwrap()),
            "https://chats.example.com/api/chats/abc"
        );
    }

    #[test]
    fn create_body_shape() {
        let body = CreateChatBody {
            project_id: "proj-1",
            user_id: "chat-relay",
            title: "This is a new chat",
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"project_id": "proj-1", "user_id": "chat-relay", "title": "This is a new chat"})
        );
    }

    #[test]
    fn save_body_shape() {
        let messages = vec![ChatMessage::new("m1", "hi", "u1", Role::User)];
        let meta = ChatMeta { title: "Chat history".into() };
        let body = SaveChatBody {
            project_id: "proj-1",
            user_id: "chat-relay",
            messages: &messages,
            meta: &meta,
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["meta"], json!({"title": "Chat history"}));
    }

    #[test]
    fn auth_statuses_map_to_unauthorized() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            assert_eq!(status_error(status, String::new()), ChatStoreError::Unauthorized);
        }
    }

    #[test]
    fn other_statuses_keep_code_and_body() {
        assert_eq!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom".into()),
            ChatStoreError::Status { status: 500, body: "boom".into() }
        );
    }

    mod against_server {
        use super::*;
        use axum::body::Bytes;
        use axum::extract::State;
        use axum::http::{header, HeaderMap, Method, StatusCode as ServerStatus, Uri};
        use axum::response::{IntoResponse, Response as ServerResponse};
        use axum::{Json, Router};
        use std::sync::{Arc, Mutex};

        #[derive(Debug, Clone)]
        struct Recorded {
            method: Method,
            path: String,
            query: Option<String>,
            authorization: Option<String>,
            body: serde_json::Value,
        }

        type Log = Arc<Mutex<Vec<Recorded>>>;

        /// Stand-in for the hosted API. The chat id picks the response.
        async fn fake_api(
            State(log): State<Log>,
            method: Method,
            uri: Uri,
            headers: HeaderMap,
            body: Bytes,
        ) -> ServerResponse {
            log.lock().unwrap().push(Recorded {
                method: method.clone(),
                path: uri.path().to_string(),
                query: uri.query().map(str::to_string),
                authorization: headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
                body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
            });

            match (method.as_str(), uri.path()) {
                ("POST", "/api/chats") => Json(json!({"id": "c0ffee"})).into_response(),
                ("GET", "/api/chats/known") => Json(json!({
                    "messages": [{"id": "m1", "content": "hi", "user": "u1", "role": "user"}]
                }))
                .into_response(),
                ("GET", "/api/chats/blank") => Json(json!({"messages": null})).into_response(),
                ("PUT", "/api/chats/known") => Json(json!({"saved": true})).into_response(),
                ("PUT", "/api/chats/quiet") => ServerStatus::NO_CONTENT.into_response(),
                ("PUT", "/api/chats/broken") => {
                    (ServerStatus::INTERNAL_SERVER_ERROR, "boom").into_response()
                }
                (_, "/api/chats/locked") => ServerStatus::UNAUTHORIZED.into_response(),
                _ => ServerStatus::NOT_FOUND.into_response(),
            }
        }

        async fn serve() -> (HttpChatStore, Log) {
            let log: Log = Arc::default();
            let app = Router::new().fallback(fake_api).with_state(log.clone());

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            let config = HttpChatStoreConfig::new(
                format!("http://{}/api/", addr),
                "key-123",
                "proj-1",
                "chat-relay",
            );
            (HttpChatStore::new(config).unwrap(), log)
        }

        fn chat(id: &str) -> ConversationId {
            ConversationId::new(id).unwrap()
        }

        fn save_payload(id: &str) -> SaveChat {
            SaveChat {
                id: chat(id),
                user_id: "chat-relay".into(),
                messages: vec![ChatMessage::new("m1", "hi", "u1", Role::User)],
                meta: ChatMeta { title: "Chat history".into() },
            }
        }

        fn only_request(log: &Log) -> Recorded {
            let log = log.lock().unwrap();
            assert_eq!(log.len(), 1);
            log[0].clone()
        }

        #[tokio::test]
        async fn create_posts_title_and_returns_id() {
            let (store, log) = serve().await;

            let created = store.create("This is a new chat").await.unwrap();

            assert_eq!(created.id, chat("c0ffee"));
            let request = only_request(&log);
            assert_eq!(request.method, Method::POST);
            assert_eq!(request.path, "/api/chats");
            assert_eq!(request.authorization.as_deref(), Some("Bearer key-123"));
            assert_eq!(
                request.body,
                json!({
                    "project_id": "proj-1",
                    "user_id": "chat-relay",
                    "title": "This is a new chat"
                })
            );
        }

        #[tokio::test]
        async fn fetch_sends_bearer_and_identity_query() {
            let (store, log) = serve().await;

            let stored = store.fetch(&chat("known")).await.unwrap();

            assert_eq!(
                stored.messages,
                Some(vec![ChatMessage::new("m1", "hi", "u1", Role::User)])
            );
            let request = only_request(&log);
            assert_eq!(request.method, Method::GET);
            assert_eq!(request.path, "/api/chats/known");
            assert_eq!(request.authorization.as_deref(), Some("Bearer key-123"));
            let query = request.query.unwrap_or_default();
            assert!(query.contains("project_id=proj-1"), "query was {}", query);
            assert!(query.contains("user_id=chat-relay"), "query was {}", query);
        }

        #[tokio::test]
        async fn fetch_of_missing_chat_is_empty() {
            let (store, _log) = serve().await;

            let stored = store.fetch(&chat("missing")).await.unwrap();

            assert_eq!(stored, StoredChat::default());
        }

        #[tokio::test]
        async fn fetch_with_null_messages_is_empty() {
            let (store, _log) = serve().await;

            let stored = store.fetch(&chat("blank")).await.unwrap();

            assert_eq!(stored.messages, None);
        }

        #[tokio::test]
        async fn rejected_credentials_are_unauthorized() {
            let (store, _log) = serve().await;

            assert_eq!(
                store.fetch(&chat("locked")).await,
                Err(ChatStoreError::Unauthorized)
            );
            assert_eq!(
                store.save(save_payload("locked")).await,
                Err(ChatStoreError::Unauthorized)
            );
        }

        #[tokio::test]
        async fn save_puts_history_and_returns_ack() {
            let (store, log) = serve().await;

            let ack = store.save(save_payload("known")).await.unwrap();

            assert_eq!(ack, json!({"saved": true}));
            let request = only_request(&log);
            assert_eq!(request.method, Method::PUT);
            assert_eq!(request.path, "/api/chats/known");
            assert_eq!(request.authorization.as_deref(), Some("Bearer key-123"));
            assert_eq!(request.body["project_id"], "proj-1");
            assert_eq!(request.body["user_id"], "chat-relay");
            assert_eq!(request.body["meta"], json!({"title": "Chat history"}));
            assert_eq!(request.body["messages"][0]["content"], "hi");
        }

        #[tokio::test]
        async fn save_without_content_is_null() {
            let (store, _log) = serve().await;

            let ack = store.save(save_payload("quiet")).await.unwrap();

            assert_eq!(ack, serde_json::Value::Null);
        }

        #[tokio::test]
        async fn save_server_error_keeps_status_and_body() {
            let (store, _log) = serve().await;

            let result = store.save(save_payload("broken")).await;

            assert_eq!(
                result,
                Err(ChatStoreError::Status { status: 500, body: "boom".into() })
            );
        }

        #[tokio::test]
        async fn unreachable_api_is_network_error() {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);
            let store = HttpChatStore::new(HttpChatStoreConfig::new(
                format!("http://{}", addr),
                "key-123",
                "proj-1",
                "chat-relay",
            ))
            .unwrap();

            let result = store.create("t").await;

            assert!(matches!(result, Err(ChatStoreError::Network(_))));
        }
    }
}
