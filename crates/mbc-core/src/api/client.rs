//! API client for the club backend.
//!
//! This module provides the `ApiClient` struct for the member flows
//! (sign-in, registration, profile) and the public content reads
//! (pages, navigation).

use std::time::Duration;

use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{
    page_link, Collection, Member, NavigationItem, Page, ProfileUpdate, Registration,
};
use crate::models::content::{NavigationItemAttributes, PageAttributes};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub jwt: String,
    pub user: Member,
}

/// With email confirmation enabled the backend withholds the JWT until
/// the address is confirmed.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub jwt: Option<String>,
    pub user: Member,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

/// Which credential a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Credential {
    Anonymous,
    Member,
    SiteKey,
}

/// API client for the club backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    api_key: Option<String>,
    initial_backoff: Duration,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url` (e.g. `https://cms.example.org/api`)
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            api_key: None,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Set the member's bearer token for authenticated requests
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    /// Site key sent with public content requests
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(&self, credential: Credential) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        let secret = match credential {
            Credential::Anonymous => None,
            Credential::Member => Some(self.token.as_deref().ok_or(ApiError::Unauthorized)?),
            Credential::SiteKey => self.api_key.as_deref(),
        };
        if let Some(secret) = secret {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", secret))
                .map_err(|e| ApiError::InvalidResponse(format!("Unusable credential: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send a `method` request to `url`. GETs are retried with exponential
    /// backoff while the backend answers 429; writes are sent once.
    async fn send<T, B>(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
        credential: Credential,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let retry_rate_limit = method == Method::GET;
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let mut request = self
                .client
                .request(method.clone(), url)
                .headers(self.auth_headers(credential)?);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = request.send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    let text = response.text().await?;
                    return serde_json::from_str(&text).map_err(|e| {
                        ApiError::InvalidResponse(format!("Failed to parse JSON from {}: {}", url, e))
                    });
                }
                None => {
                    retries += 1;
                    if !retry_rate_limit || retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        credential: Credential,
    ) -> Result<T, ApiError> {
        self.send::<T, ()>(Method::GET, &self.url(path), query, None, credential)
            .await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        credential: Credential,
    ) -> Result<T, ApiError> {
        self.send(Method::POST, &self.url(path), &[], Some(body), credential)
            .await
    }

    async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        credential: Credential,
    ) -> Result<T, ApiError> {
        self.send(Method::PUT, &self.url(path), &[], Some(body), credential)
            .await
    }

    // ===== Member Flows =====

    /// Sign in with username (or email) and password
    pub async fn authenticate(&self, identifier: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = LoginRequest { identifier, password };
        let auth: AuthResponse = self.post("/auth/local", &body, Credential::Anonymous).await?;
        debug!(user_id = auth.user.id, "Authenticated");
        Ok(auth)
    }

    /// Submit a new membership application
    pub async fn register(&self, registration: &Registration) -> Result<RegisterResponse, ApiError> {
        let response: RegisterResponse = self
            .post("/auth/local/register", registration, Credential::Anonymous)
            .await?;
        debug!(
            user_id = response.user.id,
            token_issued = response.jwt.is_some(),
            "Registered member"
        );
        Ok(response)
    }

    /// Fetch the signed-in member, including their role
    pub async fn fetch_me(&self) -> Result<Member, ApiError> {
        self.get("/users/me", &[("populate", "role")], Credential::Member).await
    }

    /// Save profile changes for member `id`
    pub async fn update_member(&self, id: i64, update: &ProfileUpdate) -> Result<Member, ApiError> {
        self.put(&format!("/users/{}", id), update, Credential::Member).await
    }

    // ===== Public Content =====

    /// Fetch the site navigation menu
    pub async fn fetch_navigation(&self) -> Result<Vec<NavigationItem>, ApiError> {
        let parsed: Collection<NavigationItemAttributes> = self
            .get("/navigation-items", &[("populate", "*")], Credential::SiteKey)
            .await?;
        let items: Vec<NavigationItem> =
            parsed.data.into_iter().map(|e| e.attributes.into()).collect();
        debug!(count = items.len(), "Fetched navigation items");
        Ok(items)
    }

    /// Fetch the page published at `/<slug>`; the empty slug is the home page
    pub async fn fetch_page(&self, slug: &str) -> Result<Option<Page>, ApiError> {
        let link = page_link(slug);
        let parsed: Collection<PageAttributes> = self
            .get("/pages", &[("filters[Link][$eq]", link.as_str())], Credential::SiteKey)
            .await?;
        Ok(parsed.data.into_iter().next().map(Page::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn member_json() -> serde_json::Value {
        json!({"id": 7, "username": "thandim", "email": "thandi@example.org",
               "role": {"id": 1, "name": "Authenticated"}})
    }

    #[tokio::test]
    async fn test_authenticate_posts_identifier() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/local"))
            .and(body_json(json!({"identifier": "thandim", "password": "correct horse"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jwt": "abc.def.ghi", "user": member_json()
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let auth = client.authenticate("thandim", "correct horse").await.unwrap();
        assert_eq!(auth.jwt, "abc.def.ghi");
        assert_eq!(auth.user.username, "thandim");
    }

    #[tokio::test]
    async fn test_authenticate_failure_surfaces_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/local"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "data": null,
                "error": {"status": 400, "name": "ValidationError",
                          "message": "Invalid identifier or password"}
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let err = client.authenticate("thandim", "wrong password").await.unwrap_err();
        assert_eq!(err.member_message(), "Invalid username or password");
    }

    #[tokio::test]
    async fn test_fetch_me_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .and(query_param("populate", "role"))
            .and(header("authorization", "Bearer abc.def.ghi"))
            .respond_with(ResponseTemplate::new(200).set_body_json(member_json()))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap().with_token("abc.def.ghi");
        let me = client.fetch_me().await.unwrap();
        assert_eq!(me.id, 7);
        assert_eq!(me.role_name(), Some("Authenticated"));
    }

    #[tokio::test]
    async fn test_fetch_me_without_token_never_calls_backend() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(member_json()))
            .expect(0)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        assert!(matches!(client.fetch_me().await, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_update_member_puts_to_member_id() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/users/7"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({"postalCode": "8001"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(member_json()))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap().with_token("tok");
        let update = ProfileUpdate {
            postal_code: Some("8001".to_string()),
            ..Default::default()
        };
        client.update_member(7, &update).await.unwrap();
    }

    #[tokio::test]
    async fn test_public_content_uses_site_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/navigation-items"))
            .and(query_param("populate", "*"))
            .and(header("authorization", "Bearer site-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": 1, "attributes": {
                    "Displayname": "Home", "Link": "/",
                    "navigation_subitems": {"data": []}
                }}]
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri())
            .unwrap()
            .with_api_key(Some("site-key".to_string()));
        let nav = client.fetch_navigation().await.unwrap();
        assert_eq!(nav.len(), 1);
        assert_eq!(nav[0].display_name, "Home");
    }

    #[tokio::test]
    async fn test_fetch_page_filters_by_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pages"))
            .and(query_param("filters[Link][$eq]", "/join-the-club"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": 4, "attributes": {
                    "Link": "/join-the-club", "content": "<p>Join us</p>"
                }}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/pages"))
            .and(query_param("filters[Link][$eq]", "/missing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let page = client.fetch_page("join-the-club").await.unwrap().unwrap();
        assert_eq!(page.content, "<p>Join us</p>");
        assert!(client.fetch_page("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/navigation-items"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/navigation-items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri())
            .unwrap()
            .with_initial_backoff(Duration::from_millis(1));
        assert!(client.fetch_navigation().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(u64::from(MAX_RATE_LIMIT_RETRIES) + 1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri())
            .unwrap()
            .with_initial_backoff(Duration::from_millis(1));
        assert!(matches!(client.fetch_page("").await, Err(ApiError::RateLimited)));
    }

    #[tokio::test]
    async fn test_rate_limited_writes_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/local"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/users/7"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri())
            .unwrap()
            .with_initial_backoff(Duration::from_millis(1))
            .with_token("abc.def.ghi");
        assert!(matches!(
            client.authenticate("thandim", "correct horse").await,
            Err(ApiError::RateLimited)
        ));
        assert!(matches!(
            client.update_member(7, &ProfileUpdate::default()).await,
            Err(ApiError::RateLimited)
        ));
    }
}
