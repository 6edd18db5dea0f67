use std::future::Future;

use anyhow::Context;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    config::AppConfig,
    error::{Action, ApiError},
    models::{Item, ItemId, ResourceKind},
    session::{Authenticator, SessionGuard},
};

/// CRUD operations on one REST collection.
///
/// Implementations report outcomes only; callers decide how local state
/// changes.
pub trait ResourceApi {
    /// Resource this API talks to.
    fn kind(&self) -> ResourceKind;

    /// Fetch the whole collection.
    fn list(&self) -> impl Future<Output = Result<Vec<Item>, ApiError>> + Send;

    /// Create an item, returning the server's copy when it echoes one.
    fn create(&self, item: &Item) -> impl Future<Output = Result<Option<Item>, ApiError>> + Send;

    /// Replace the mutable fields of item `id`.
    fn update(
        &self,
        id: &ItemId,
        patch: &Item,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Delete item `id`.
    fn delete(&self, id: &ItemId) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Entry point to the catalog API: one HTTP client shared by every resource.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: SessionGuard,
}

impl ApiClient {
    /// Build a client from configuration.
    pub fn new(config: &AppConfig, session: SessionGuard) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("failed to build HTTP client")?;
        Self::with_http(http, &config.api_base_url, session)
    }

    /// Build a client around an existing [`reqwest::Client`].
    pub fn with_http(http: Client, base_url: &str, session: SessionGuard) -> anyhow::Result<Self> {
        let base_url = Url::parse(&format!("{}/api/", base_url.trim_end_matches('/')))
            .with_context(|| format!("invalid API base url {base_url}"))?;
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    /// Client for one resource collection.
    pub fn resource(&self, kind: ResourceKind) -> ResourceClient {
        ResourceClient {
            api: self.clone(),
            kind,
        }
    }

    /// Client for the login endpoint.
    pub fn auth(&self) -> AuthClient {
        AuthClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
        }
    }

    /// Session whose token authenticates requests.
    pub fn session(&self) -> &SessionGuard {
        &self.session
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Authenticated access to `/api/<resource>`.
#[derive(Debug, Clone)]
pub struct ResourceClient {
    api: ApiClient,
    kind: ResourceKind,
}

impl ResourceClient {
    fn collection_url(&self) -> Url {
        self.api.url(&[self.kind.endpoint()])
    }

    fn item_url(&self, id: &ItemId) -> Url {
        self.api.url(&[self.kind.endpoint(), id.as_str()])
    }

    async fn send(&self, action: Action, request: RequestBuilder) -> Result<Response, ApiError> {
        let token = self.api.session.token().ok_or(ApiError::AuthExpired)?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| ApiError::Network { action, source })?;
        check_status(action, response).await
    }
}

impl ResourceApi for ResourceClient {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn list(&self) -> Result<Vec<Item>, ApiError> {
        let request = self.api.http.get(self.collection_url());
        let response = self.send(Action::List, request).await?;
        let body = read_json(Action::List, response).await?;
        let items = parse_list(self.kind, body)?;
        debug!(resource = self.kind.endpoint(), count = items.len(), "fetched collection");
        Ok(items)
    }

    async fn create(&self, item: &Item) -> Result<Option<Item>, ApiError> {
        let request = self.api.http.post(self.collection_url()).json(item);
        let response = self.send(Action::Create, request).await?;
        let bytes = body_or_empty(Action::Create, response).await;
        let created = serde_json::from_slice::<Value>(&bytes)
            .ok()
            .and_then(|body| parse_created(self.kind, body));
        info!(resource = self.kind.endpoint(), echoed = created.is_some(), "created item");
        Ok(created)
    }

    async fn update(&self, id: &ItemId, patch: &Item) -> Result<(), ApiError> {
        let request = self.api.http.put(self.item_url(id)).json(patch);
        self.send(Action::Update, request).await?;
        info!(resource = self.kind.endpoint(), %id, "updated item");
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> Result<(), ApiError> {
        let request = self.api.http.delete(self.item_url(id));
        self.send(Action::Delete, request).await?;
        info!(resource = self.kind.endpoint(), %id, "deleted item");
        Ok(())
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Client for `POST /api/login`.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: Client,
    base_url: Url,
}

impl Authenticator for AuthClient {
    async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let url = self
            .base_url
            .join("login")
            .map_err(|err| ApiError::failed(Action::Login, err.to_string()))?;
        let response = self
            .http
            .post(url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|source| ApiError::Network {
                action: Action::Login,
                source,
            })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|source| ApiError::Network {
            action: Action::Login,
            source,
        })?;
        if !status.is_success() {
            let reason = error_message(&bytes).unwrap_or_else(|| "Login failed".to_string());
            return Err(ApiError::failed(Action::Login, reason));
        }

        serde_json::from_slice::<LoginResponse>(&bytes)
            .ok()
            .and_then(|body| body.access_token)
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ApiError::failed(Action::Login, "Login failed"))
    }
}

async fn check_status(action: Action, response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::AuthExpired);
    }
    if status.is_success() {
        return Ok(response);
    }
    let bytes = body_or_empty(action, response).await;
    let reason = error_message(&bytes).unwrap_or_else(|| format!("server responded with {status}"));
    Err(ApiError::failed(action, reason))
}

/// Body of a response whose content is optional; a failed read yields nothing.
async fn body_or_empty(action: Action, response: Response) -> Vec<u8> {
    match response.bytes().await {
        Ok(bytes) => bytes.to_vec(),
        Err(err) => {
            debug!(%err, %action, "discarding unreadable response body");
            Vec::new()
        }
    }
}

async fn read_json(action: Action, response: Response) -> Result<Value, ApiError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|source| ApiError::Network { action, source })?;
    serde_json::from_slice(&bytes)
        .map_err(|err| ApiError::failed(action, format!("malformed response body: {err}")))
}

/// Extract the items of `{ "data": { "<endpoint>": [ ... ] } }`.
fn parse_list(kind: ResourceKind, body: Value) -> Result<Vec<Item>, ApiError> {
    let Some(Value::Array(entries)) = body
        .get("data")
        .and_then(|data| data.get(kind.endpoint()))
        .cloned()
    else {
        return Err(ApiError::failed(
            Action::List,
            "unexpected response structure",
        ));
    };
    entries
        .into_iter()
        .map(|entry| {
            Item::from_value(entry).ok_or_else(|| {
                ApiError::failed(Action::List, "unexpected response structure")
            })
        })
        .collect()
}

/// The created item when the server echoes it, top-level or under `data`.
fn parse_created(kind: ResourceKind, body: Value) -> Option<Item> {
    let key = kind.id_key();
    let candidates = [
        Some(&body),
        body.get("data"),
        body.get("data").and_then(|data| data.get(kind.singular())),
    ];
    candidates
        .into_iter()
        .flatten()
        .find(|value| value.get(key).and_then(ItemId::from_value).is_some())
        .cloned()
        .and_then(Item::from_value)
}

fn error_message(bytes: &[u8]) -> Option<String> {
    let body: Value = serde_json::from_slice(bytes).ok()?;
    ["message", "msg", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::{
        extract::Path,
        http::{header::AUTHORIZATION, HeaderMap, StatusCode as AxumStatus},
        routing::{get, post, put},
        Json, Router,
    };
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    const TOKEN: &str = "good-token";

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            == Some("Bearer good-token")
    }

    async fn serve(router: Router) -> Result<String> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok(format!("http://{addr}"))
    }

    fn catalog(log: Arc<Mutex<Vec<String>>>) -> Router {
        let put_log = log.clone();
        let delete_log = log;
        Router::new()
            .route(
                "/api/games",
                get(|headers: HeaderMap| async move {
                    if !authorized(&headers) {
                        return (AxumStatus::UNAUTHORIZED, Json(json!({"msg": "expired"})));
                    }
                    (
                        AxumStatus::OK,
                        Json(json!({"data": {"games": [
                            {"id_game": 1, "name": "Doom", "released": 1993, "score": 90},
                            {"id_game": 2, "name": "Quake", "released": 1996, "score": 88}
                        ]}})),
                    )
                })
                .post(|Json(body): Json<Value>| async move {
                    let mut created = body;
                    created["id_game"] = json!(3);
                    (AxumStatus::CREATED, Json(json!({"data": created})))
                }),
            )
            .route(
                "/api/games/:id",
                put(move |Path(id): Path<String>, Json(body): Json<Value>| {
                    let log = put_log.clone();
                    async move {
                        log.lock().push(format!("PUT {id} {}", body["name"]));
                        AxumStatus::NO_CONTENT
                    }
                })
                .delete(move |Path(id): Path<String>| {
                    let log = delete_log.clone();
                    async move {
                        log.lock().push(format!("DELETE {id}"));
                        AxumStatus::OK
                    }
                }),
            )
            .route(
                "/api/genres",
                get(|| async {
                    (
                        AxumStatus::INTERNAL_SERVER_ERROR,
                        Json(json!({"message": "database offline"})),
                    )
                })
                .post(|| async { AxumStatus::CREATED }),
            )
            .route(
                "/api/ratings",
                get(|| async { Json(json!({"data": {"genres": []}})) }),
            )
            .route(
                "/api/login",
                post(|Json(body): Json<Value>| async move {
                    if body["username"] == "admin" && body["password"] == "secret" {
                        (AxumStatus::OK, Json(json!({"access_token": TOKEN})))
                    } else {
                        (AxumStatus::UNAUTHORIZED, Json(json!({"msg": "Bad credentials"})))
                    }
                }),
            )
    }

    async fn client(token: Option<&str>) -> Result<(ApiClient, Arc<Mutex<Vec<String>>>)> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let base = serve(catalog(log.clone())).await?;
        let session = SessionGuard::ephemeral();
        if let Some(token) = token {
            session.set_token(token);
        }
        Ok((ApiClient::with_http(Client::new(), &base, session)?, log))
    }

    #[tokio::test]
    async fn lists_items_with_bearer_token() -> Result<()> {
        let (api, _) = client(Some(TOKEN)).await?;
        let games = api.resource(ResourceKind::Games).list().await?;
        assert_eq!(games.len(), 2);
        assert_eq!(games[1].text("name"), "Quake");
        Ok(())
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_expired() -> Result<()> {
        let (api, _) = client(Some("stale")).await?;
        let result = api.resource(ResourceKind::Games).list().await;
        assert!(matches!(result, Err(ApiError::AuthExpired)));

        let (anonymous, _) = client(None).await?;
        let result = anonymous.resource(ResourceKind::Games).list().await;
        assert!(matches!(result, Err(ApiError::AuthExpired)));
        Ok(())
    }

    #[tokio::test]
    async fn server_errors_and_bad_payloads_are_request_failures() -> Result<()> {
        let (api, _) = client(Some(TOKEN)).await?;
        match api.resource(ResourceKind::Genres).list().await {
            Err(ApiError::RequestFailed { action, reason }) => {
                assert_eq!(action, Action::List);
                assert_eq!(reason, "database offline");
            }
            other => panic!("unexpected result {other:?}"),
        }
        match api.resource(ResourceKind::Ratings).list().await {
            Err(ApiError::RequestFailed { reason, .. }) => {
                assert_eq!(reason, "unexpected response structure");
            }
            other => panic!("unexpected result {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn mutations_hit_item_urls() -> Result<()> {
        let (api, log) = client(Some(TOKEN)).await?;
        let games = api.resource(ResourceKind::Games);

        let created = games
            .create(&Item::new().with("name", "Heretic"))
            .await?
            .expect("server echoes created game");
        assert_eq!(created.id("id_game"), Some(ItemId::from(3)));

        let genres = api.resource(ResourceKind::Genres);
        assert_eq!(genres.create(&Item::new().with("nama_genre", "RPG")).await?, None);

        games
            .update(&ItemId::from(1), &Item::new().with("name", "Doom II"))
            .await?;
        games.delete(&ItemId::from(2)).await?;
        assert_eq!(
            log.lock().clone(),
            vec!["PUT 1 \"Doom II\"".to_string(), "DELETE 2".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn login_returns_access_token() -> Result<()> {
        let (api, _) = client(None).await?;
        let auth = api.auth();
        assert_eq!(auth.login("admin", "secret").await?, TOKEN);

        match auth.login("admin", "nope").await {
            Err(ApiError::RequestFailed { action, reason }) => {
                assert_eq!(action, Action::Login);
                assert_eq!(reason, "Bad credentials");
            }
            other => panic!("unexpected result {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() -> Result<()> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let session = SessionGuard::ephemeral();
        session.set_token(TOKEN);
        let api = ApiClient::with_http(Client::new(), &format!("http://{addr}"), session)?;
        let result = api.resource(ResourceKind::Users).delete(&ItemId::from(1)).await;
        assert!(matches!(
            result,
            Err(ApiError::Network {
                action: Action::Delete,
                ..
            })
        ));
        Ok(())
    }

    /// Answers every request with the status line of `respond`, promising a
    /// longer body than it sends before hanging up.
    async fn truncating_server(respond: fn(&str) -> &'static str) -> Result<String> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&chunk[..n]),
                    }
                    let text = String::from_utf8_lossy(&request);
                    if let Some(end) = text.find("\r\n\r\n") {
                        let length = text
                            .lines()
                            .find_map(|line| {
                                let (name, value) = line.split_once(':')?;
                                name.eq_ignore_ascii_case("content-length")
                                    .then(|| value.trim().parse::<usize>().ok())?
                            })
                            .unwrap_or(0);
                        if request.len() >= end + 4 + length {
                            break;
                        }
                    }
                }
                let method = String::from_utf8_lossy(&request)
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                let status = respond(&method);
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: 64\r\nConnection: close\r\n\r\n{{\"data\""
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        Ok(format!("http://{addr}"))
    }

    #[tokio::test]
    async fn truncated_bodies_do_not_hide_the_outcome() -> Result<()> {
        let base = truncating_server(|method| match method {
            "POST" => "201 Created",
            _ => "500 Internal Server Error",
        })
        .await?;
        let session = SessionGuard::ephemeral();
        session.set_token(TOKEN);
        let api = ApiClient::with_http(Client::new(), &base, session)?;
        let games = api.resource(ResourceKind::Games);

        assert_eq!(games.create(&Item::new().with("name", "Hexen")).await?, None);

        match games.delete(&ItemId::from(1)).await {
            Err(ApiError::RequestFailed { action, reason }) => {
                assert_eq!(action, Action::Delete);
                assert_eq!(reason, "server responded with 500 Internal Server Error");
            }
            other => panic!("unexpected result {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn created_item_is_found_top_level_or_nested() {
        let top = json!({"id_dev": 4, "nama_dev": "Remedy"});
        let nested = json!({"data": {"developer": {"id_dev": 5}}});
        let none = json!({"message": "created"});
        assert!(parse_created(ResourceKind::Developers, top).is_some());
        assert_eq!(
            parse_created(ResourceKind::Developers, nested).and_then(|i| i.id("id_dev")),
            Some(ItemId::from(5))
        );
        assert!(parse_created(ResourceKind::Developers, none).is_none());
    }
}
