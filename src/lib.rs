//! # turnstile-guard
//!
//! Cloudflare Turnstile form verification middleware for [Axum](https://github.com/tokio-rs/axum).
//!
//! This crate provides middleware that verifies [Cloudflare Turnstile](https://www.cloudflare.com/products/turnstile/)
//! tokens submitted through HTML forms. Turnstile is Cloudflare's privacy-first CAPTCHA
//! alternative; the client-side widget injects a hidden `cf-turnstile-response` field into
//! the form it protects, and this middleware verifies that field server-side before your
//! handler ever runs.
//!
//! ## Features
//!
//! - 🔒 Easy integration with Axum applications
//! - 🎯 Tower middleware layer for flexible composition
//! - 📝 Reads the token from the submitted form body, the way the widget delivers it
//! - ⚙️ Configurable form field, verification endpoint, and request timeout
//! - 🧪 Support for Cloudflare's test keys
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! turnstile-guard = "0.1"
//! axum = "0.8"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use axum::{routing::post, Router};
//! use turnstile_guard::TurnstileLayer;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Protect a form endpoint
//!     let app = Router::new()
//!         .route("/login", post(login_handler))
//!         .layer(TurnstileLayer::from_secret("your-secret-key"));
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
//!         .await
//!         .unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//!
//! // Only runs if the submitted form carried a valid token
//! async fn login_handler() -> &'static str {
//!     "Welcome!"
//! }
//! ```
//!
//! The secret is usually kept out of the source tree. [`TurnstileLayer::from_env`] reads it
//! from the `TURNSTILE_SECRET_KEY` environment variable once at startup:
//!
//! ```rust,no_run
//! use turnstile_guard::TurnstileLayer;
//!
//! let layer = TurnstileLayer::from_env().expect("TURNSTILE_SECRET_KEY must be set");
//! ```
//!
//! ## How It Works
//!
//! 1. The Turnstile widget adds a hidden `cf-turnstile-response` field to the form
//! 2. The middleware buffers the `application/x-www-form-urlencoded` body and extracts
//!    that field — the query string is never consulted
//! 3. The token is verified against Cloudflare's `siteverify` endpoint
//! 4. On success the request (body intact) proceeds to your handler, which may extract
//!    [`VerifiedTurnstile`]; on any failure the request is rejected with `403 Forbidden`
//!
//! ## Advanced Configuration
//!
//! ```rust
//! use std::time::Duration;
//! use turnstile_guard::{TurnstileConfig, TurnstileLayer};
//!
//! let config = TurnstileConfig::new("your-secret-key")
//!     .with_form_field("my-captcha-token")
//!     .with_verify_url("https://custom-endpoint.example.com/verify")
//!     .with_timeout(Duration::from_secs(5));
//!
//! let layer = TurnstileLayer::new(config);
//! ```
//!
//! ## Testing
//!
//! Cloudflare provides test keys that always pass or fail verification:
//!
//! - **Always passes**: `1x0000000000000000000000000000000AA`
//! - **Always fails**: `2x0000000000000000000000000000000AA`
//!
//! ```rust,no_run
//! use turnstile_guard::TurnstileLayer;
//!
//! // Use the test key that always passes
//! let layer = TurnstileLayer::from_secret("1x0000000000000000000000000000000AA");
//! ```
//!
//! ## Response Codes
//!
//! Every rejection is a `403 Forbidden` with a plain-text body. The client cannot tell
//! a provider outage and an invalid token apart beyond the message text:
//!
//! - `Turnstile token missing`: the form field was absent or empty
//! - `Turnstile verification failed: <reason>`: the provider rejected the token or
//!   could not be reached
//!
//! ## Extracting the Verified Marker
//!
//! The [`VerifiedTurnstile`] type implements [`FromRequestParts`],
//! so you can use it as an extractor in your handlers:
//!
//! ```rust
//! use turnstile_guard::VerifiedTurnstile;
//!
//! async fn handler(_verified: VerifiedTurnstile) -> &'static str {
//!     "Only reached if Turnstile verification succeeded"
//! }
//! ```

mod layer;
mod middleware;
mod verifier;

pub use layer::TurnstileLayer;
pub use middleware::TurnstileMiddleware;

use std::time::Duration;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use serde::{Deserialize, Serialize};

/// Configuration for Turnstile verification
#[derive(Clone, Debug)]
pub struct TurnstileConfig {
    /// Cloudflare Turnstile secret key
    pub secret: String,
    /// Form field carrying the token (default: "cf-turnstile-response")
    pub form_field: String,
    /// Verification endpoint (default: Cloudflare's endpoint)
    pub verify_url: String,
    /// Timeout for the outbound verification call (default: 10 seconds)
    pub timeout: Duration,
}

impl TurnstileConfig {
    /// Create a new config with the given secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            form_field: "cf-turnstile-response".to_string(),
            verify_url: "https://challenges.cloudflare.com/turnstile/v0/siteverify".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Create a config from the `TURNSTILE_SECRET_KEY` environment variable.
    ///
    /// Read once at startup; per-request code never touches the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = std::env::var("TURNSTILE_SECRET_KEY")
            .map_err(|_| ConfigError::Missing("TURNSTILE_SECRET_KEY"))?;
        Ok(Self::new(secret))
    }

    /// Set a custom form field name
    pub fn with_form_field(mut self, name: impl Into<String>) -> Self {
        self.form_field = name.into();
        self
    }

    /// Set a custom verification URL (for testing)
    pub fn with_verify_url(mut self, url: impl Into<String>) -> Self {
        self.verify_url = url.into();
        self
    }

    /// Set a custom timeout for the verification call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Startup-time configuration failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
}

#[derive(Serialize)]
struct VerifyRequest {
    secret: String,
    response: String,
}

#[derive(Deserialize, Debug)]
struct VerifyResponse {
    success: bool,
    #[serde(rename = "error-codes")]
    error_codes: Option<Vec<String>>,
}

/// Marker type that can be extracted in handlers after successful verification
#[derive(Clone, Debug)]
pub struct VerifiedTurnstile;

impl<S> FromRequestParts<S> for VerifiedTurnstile
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedTurnstile>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
