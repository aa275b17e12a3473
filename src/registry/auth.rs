//! Bearer token authentication for registry requests
//!
//! [`TokenModifier`] is a [`RequestModifier`] that runs the registry challenge-response
//! handshake for the request it is given:
//! 1. ping the same method and URL without a body
//! 2. on 401, pick the bearer challenge and fetch a token from its realm
//! 3. set `Authorization: Bearer <token>` on the request
//!
//! The handshake runs on every request. With a [`TokenCache`] attached only the token
//! fetch is skipped while a cached token is valid; the ping still happens.

use crate::config::AuthConfig;
use crate::error::handlers::HttpErrorHandler;
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::registry::challenge::{response_challenges, Challenge};
use crate::registry::token_cache::{TokenCache, TokenKey};
use crate::registry::transport::{HttpTransport, RequestModifier};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Request, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

pub const BEARER_SCHEME: &str = "bearer";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
    expires_in: Option<u64>,
    issued_at: Option<String>,
}

/// Bearer credential issued by a token endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub expires_in: Option<u64>,
    pub issued_at: Option<String>,
}

impl Token {
    /// Parse the token endpoint's JSON envelope. `access_token` is accepted when
    /// `token` is absent.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let response: TokenResponse = serde_json::from_slice(body)
            .map_err(|e| RegistryError::Auth(format!("Failed to parse token response: {}", e)))?;

        let value = response
            .token
            .filter(|t| !t.is_empty())
            .or(response.access_token.filter(|t| !t.is_empty()))
            .ok_or_else(|| RegistryError::Auth("Token response contains no token".to_string()))?;

        Ok(Self {
            value,
            expires_in: response.expires_in,
            issued_at: response.issued_at,
        })
    }
}

/// Request modifier performing the bearer handshake
pub struct TokenModifier {
    transport: Arc<dyn HttpTransport>,
    // Builds token requests only; they are sent through `transport`
    requests: Client,
    auth: AuthConfig,
    cache: Option<TokenCache>,
    output: Logger,
}

impl TokenModifier {
    /// `transport` must be the undecorated transport: pings and token requests
    /// are never themselves modified.
    pub fn new(auth: AuthConfig, transport: Arc<dyn HttpTransport>, output: Logger) -> Self {
        Self {
            transport,
            requests: Client::new(),
            auth,
            cache: None,
            output,
        }
    }

    pub fn with_cache(mut self, cache: Option<TokenCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Ping the request's endpoint. `None` means no authentication is required.
    async fn ping(&self, request: &Request) -> Result<Option<Challenge>> {
        let ping = Request::new(request.method().clone(), request.url().clone());
        let response = self.transport.send(ping).await?;
        let status = response.status();

        self.output
            .detail(&format!("Ping {} {} -> {}", request.method(), request.url().path(), status));

        match status {
            StatusCode::OK => Ok(None),
            StatusCode::UNAUTHORIZED => {
                let challenges = response_challenges(response.headers());
                match challenges.into_iter().find(|c| c.is_scheme(BEARER_SCHEME)) {
                    Some(challenge) => Ok(Some(challenge)),
                    None => Err(RegistryError::Auth(format!(
                        "No {} challenge offered by {}; unsupported authentication scheme",
                        BEARER_SCHEME,
                        request.url().host_str().unwrap_or("registry")
                    ))),
                }
            }
            other => Err(RegistryError::Registry(format!(
                "Unexpected status {} probing {} {}",
                other,
                request.method(),
                request.url()
            ))),
        }
    }

    async fn fetch_token(&self, challenge: &Challenge) -> Result<Token> {
        let mut url = url::Url::parse(challenge.realm()).map_err(|e| {
            RegistryError::Validation(format!("Invalid token realm {}: {}", challenge.realm(), e))
        })?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("service", challenge.service());
            if !challenge.scope().is_empty() {
                query.append_pair("scope", challenge.scope());
            }
        }

        self.output.detail(&format!("Requesting token from: {}", url));

        let mut builder = self.requests.get(url);
        if self.auth.has_credentials() {
            let username = self.auth.username.as_deref().unwrap_or_default();
            let password = self.auth.password.as_deref().unwrap_or_default();
            builder = builder.basic_auth(username, Some(password));
        }
        let request = builder
            .build()
            .map_err(|e| RegistryError::Validation(format!("Invalid token request: {}", e)))?;

        let response = self.transport.send(request).await?;
        let status = response.status();
        if status != StatusCode::OK {
            let error_text = HttpErrorHandler::error_text(response).await;
            return Err(HttpErrorHandler::handle_auth_error(status, &error_text));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RegistryError::Network(format!("Failed to read token response: {}", e)))?;
        let token = Token::from_json(&body)?;

        self.output.detail(&format!("Token obtained (length: {} chars)", token.value.len()));
        if let Some(expires_in) = token.expires_in {
            self.output.detail(&format!("Token expires in {} seconds", expires_in));
        }

        Ok(token)
    }

    async fn token_for(&self, challenge: &Challenge) -> Result<Token> {
        let Some(cache) = &self.cache else {
            return self.fetch_token(challenge).await;
        };

        let key = TokenKey {
            realm: challenge.realm().to_string(),
            service: challenge.service().to_string(),
            scope: challenge.scope().to_string(),
        };
        if let Some(token) = cache.get(&key)? {
            self.output.detail("Reusing cached token");
            return Ok(token);
        }

        let received_at = Instant::now();
        let token = self.fetch_token(challenge).await?;
        cache.insert(key, token.clone(), received_at)?;
        Ok(token)
    }
}

#[async_trait]
impl RequestModifier for TokenModifier {
    async fn modify(&self, request: &mut Request) -> Result<()> {
        let Some(challenge) = self.ping(request).await? else {
            self.output.detail("No authentication required, skipping token");
            return Ok(());
        };

        if challenge.realm().is_empty() {
            self.output.detail("Empty realm, skipping token");
            return Ok(());
        }

        let token = self.token_for(&challenge).await?;
        let value = HeaderValue::from_str(&format!("Bearer {}", token.value))
            .map_err(|e| RegistryError::Auth(format!("Token is not a valid header value: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, value);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::transport::testing::{respond, FnTransport};
    use crate::registry::transport::Transport;
    use reqwest::Method;

    const CHALLENGE: &str =
        r#"Bearer realm="https://auth.example/token",service="registry.example",scope="repository:lib:pull""#;

    fn manifest_request() -> Request {
        Request::new(
            Method::GET,
            url::Url::parse("https://registry.example/v2/lib/manifests/v1").unwrap(),
        )
    }

    /// Registry that demands a bearer token and a token server issuing `abc123`
    fn registry_requiring_token() -> Arc<FnTransport> {
        FnTransport::new(|req| {
            if req.url.host_str() == Some("auth.example") {
                return respond(200, &[("content-type", "application/json")], br#"{"token":"abc123"}"#);
            }
            match req.headers.get(AUTHORIZATION) {
                Some(value) if value == "Bearer abc123" => respond(200, &[], b"manifest"),
                _ => respond(401, &[("www-authenticate", CHALLENGE)], b""),
            }
        })
    }

    #[tokio::test]
    async fn test_auth_challenge_decorates_request() {
        let inner = registry_requiring_token();
        let modifier = TokenModifier::new(AuthConfig::anonymous(), inner.clone(), Logger::new_quiet());
        let transport = Transport::new(inner.clone(), Logger::new_quiet()).with_modifier(Arc::new(modifier));

        let response = transport.send(manifest_request()).await.unwrap();
        assert_eq!(response.status(), 200);

        let recorded = inner.recorded();
        assert_eq!(recorded.len(), 3);

        // Ping: same method and URL, no credentials
        assert_eq!(recorded[0].method, Method::GET);
        assert_eq!(recorded[0].url.path(), "/v2/lib/manifests/v1");
        assert!(recorded[0].headers.get(AUTHORIZATION).is_none());

        // Token fetch
        let token_url = &recorded[1].url;
        assert_eq!(token_url.host_str(), Some("auth.example"));
        let query: Vec<(String, String)> = token_url.query_pairs().into_owned().collect();
        assert!(query.contains(&("service".to_string(), "registry.example".to_string())));
        assert!(query.contains(&("scope".to_string(), "repository:lib:pull".to_string())));
        assert!(recorded[1].headers.get(AUTHORIZATION).is_none());

        // Decorated request
        assert_eq!(recorded[2].headers.get(AUTHORIZATION).unwrap(), "Bearer abc123");
    }

    #[tokio::test]
    async fn test_no_auth_fast_path() {
        let inner = FnTransport::new(|_| respond(200, &[], b""));
        let modifier = TokenModifier::new(AuthConfig::anonymous(), inner.clone(), Logger::new_quiet());

        let mut request = manifest_request();
        modifier.modify(&mut request).await.unwrap();

        assert!(request.headers().get(AUTHORIZATION).is_none());
        let recorded = inner.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].url.host_str(), Some("registry.example"));
    }

    #[tokio::test]
    async fn test_bearer_selected_regardless_of_position() {
        let inner = FnTransport::new(|req| {
            if req.url.host_str() == Some("auth.example") {
                return respond(200, &[], br#"{"token":"abc123"}"#);
            }
            respond(
                401,
                &[
                    ("www-authenticate", r#"Basic realm="registry""#),
                    ("www-authenticate", r#"Digest realm="registry", nonce="x""#),
                    ("www-authenticate", CHALLENGE),
                ],
                b"",
            )
        });
        let modifier = TokenModifier::new(AuthConfig::anonymous(), inner.clone(), Logger::new_quiet());

        let mut request = manifest_request();
        modifier.modify(&mut request).await.unwrap();
        assert_eq!(request.headers().get(AUTHORIZATION).unwrap(), "Bearer abc123");
    }

    #[tokio::test]
    async fn test_unsupported_scheme_fails() {
        let inner = FnTransport::new(|_| respond(401, &[("www-authenticate", r#"Basic realm="registry""#)], b""));
        let modifier = TokenModifier::new(AuthConfig::anonymous(), inner.clone(), Logger::new_quiet());

        let err = modifier.modify(&mut manifest_request()).await.unwrap_err();
        assert!(matches!(err, RegistryError::Auth(_)));
        assert_eq!(inner.recorded().len(), 1);
    }

    #[tokio::test]
    async fn test_unexpected_ping_status_fails() {
        let inner = FnTransport::new(|_| respond(500, &[], b"boom"));
        let modifier = TokenModifier::new(AuthConfig::anonymous(), inner, Logger::new_quiet());

        let err = modifier.modify(&mut manifest_request()).await.unwrap_err();
        assert!(matches!(err, RegistryError::Registry(_)));
    }

    #[tokio::test]
    async fn test_token_endpoint_failure_is_auth_error() {
        let inner = FnTransport::new(|req| {
            if req.url.host_str() == Some("auth.example") {
                return respond(403, &[], b"denied");
            }
            respond(401, &[("www-authenticate", CHALLENGE)], b"")
        });
        let modifier = TokenModifier::new(AuthConfig::anonymous(), inner, Logger::new_quiet());

        let err = modifier.modify(&mut manifest_request()).await.unwrap_err();
        assert!(matches!(err, RegistryError::Auth(_)));
    }

    #[tokio::test]
    async fn test_malformed_token_body_is_auth_error() {
        let inner = FnTransport::new(|req| {
            if req.url.host_str() == Some("auth.example") {
                return respond(200, &[], b"<html>not json</html>");
            }
            respond(401, &[("www-authenticate", CHALLENGE)], b"")
        });
        let modifier = TokenModifier::new(AuthConfig::anonymous(), inner, Logger::new_quiet());

        let err = modifier.modify(&mut manifest_request()).await.unwrap_err();
        assert!(matches!(err, RegistryError::Auth(_)));
    }

    #[tokio::test]
    async fn test_malformed_realm_is_validation_error() {
        let inner = FnTransport::new(|_| {
            respond(401, &[("www-authenticate", r#"Bearer realm="not a url",service="registry.example""#)], b"")
        });
        let modifier = TokenModifier::new(AuthConfig::anonymous(), inner, Logger::new_quiet());

        let err = modifier.modify(&mut manifest_request()).await.unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_basic_auth_and_empty_scope() {
        let inner = FnTransport::new(|req| {
            if req.url.host_str() == Some("auth.example") {
                return respond(200, &[], br#"{"access_token":"xyz","expires_in":300}"#);
            }
            respond(401, &[("www-authenticate", r#"Bearer realm="https://auth.example/token",service="registry.example""#)], b"")
        });
        let auth = AuthConfig::new(Some("user".to_string()), Some("pass".to_string()));
        let modifier = TokenModifier::new(auth, inner.clone(), Logger::new_quiet());

        let mut request = manifest_request();
        modifier.modify(&mut request).await.unwrap();
        assert_eq!(request.headers().get(AUTHORIZATION).unwrap(), "Bearer xyz");

        let token_request = &inner.recorded()[1];
        // base64("user:pass")
        assert_eq!(token_request.headers.get(AUTHORIZATION).unwrap(), "Basic dXNlcjpwYXNz");
        assert!(!token_request.url.query_pairs().any(|(key, _)| key == "scope"));
    }

    #[tokio::test]
    async fn test_handshake_repeats_per_request_without_cache() {
        let inner = registry_requiring_token();
        let modifier = TokenModifier::new(AuthConfig::anonymous(), inner.clone(), Logger::new_quiet());

        modifier.modify(&mut manifest_request()).await.unwrap();
        modifier.modify(&mut manifest_request()).await.unwrap();

        let token_fetches = inner
            .recorded()
            .iter()
            .filter(|r| r.url.host_str() == Some("auth.example"))
            .count();
        assert_eq!(token_fetches, 2);
    }

    #[tokio::test]
    async fn test_cache_saves_token_fetch_but_still_pings() {
        let inner = registry_requiring_token();
        let modifier = TokenModifier::new(AuthConfig::anonymous(), inner.clone(), Logger::new_quiet())
            .with_cache(Some(TokenCache::new()));

        let mut first = manifest_request();
        let mut second = manifest_request();
        modifier.modify(&mut first).await.unwrap();
        modifier.modify(&mut second).await.unwrap();
        assert_eq!(second.headers().get(AUTHORIZATION).unwrap(), "Bearer abc123");

        let recorded = inner.recorded();
        let token_fetches = recorded.iter().filter(|r| r.url.host_str() == Some("auth.example")).count();
        let pings = recorded.iter().filter(|r| r.url.host_str() == Some("registry.example")).count();
        assert_eq!(token_fetches, 1);
        assert_eq!(pings, 2);
    }

    #[test]
    fn test_token_from_json() {
        let token = Token::from_json(br#"{"token":"abc","expires_in":60,"issued_at":"2019-09-01T00:00:00Z"}"#).unwrap();
        assert_eq!(token.value, "abc");
        assert_eq!(token.expires_in, Some(60));
        assert_eq!(token.issued_at.as_deref(), Some("2019-09-01T00:00:00Z"));

        assert!(Token::from_json(br#"{"expires_in":60}"#).is_err());
        assert!(Token::from_json(br#"{"token":""}"#).is_err());
    }
}
