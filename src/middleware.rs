use crate::{verifier, TurnstileConfig, VerifiedTurnstile};
use axum::{
    body::{self, Body},
    http::{header, request::Parts, Request, Response, StatusCode},
};
use futures_util::future::BoxFuture;
use std::task::{Context, Poll};
use tower_service::Service;

/// Bodies larger than this cannot be buffered for token extraction.
const MAX_FORM_BODY_BYTES: usize = 1024 * 1024;

const TOKEN_MISSING: &str = "Turnstile token missing";
const VERIFICATION_FAILED: &str = "Turnstile verification failed";

/// Middleware that verifies Turnstile tokens submitted in form bodies
#[derive(Clone)]
pub struct TurnstileMiddleware<S> {
    inner: S,
    config: TurnstileConfig,
}

impl<S> TurnstileMiddleware<S> {
    pub fn new(inner: S, config: TurnstileConfig) -> Self {
        Self { inner, config }
    }
}

impl<S> Service<Request<Body>> for TurnstileMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let config = self.config.clone();
        let inner = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, inner);

        Box::pin(async move {
            let (parts, raw_body) = req.into_parts();

            // The widget delivers the token inside the submitted form body.
            // The query string is never consulted.
            if !is_form_content_type(&parts) {
                return Ok(forbidden(TOKEN_MISSING.to_string()));
            }

            let bytes = match body::to_bytes(raw_body, MAX_FORM_BODY_BYTES).await {
                Ok(bytes) => bytes,
                Err(_) => return Ok(forbidden(TOKEN_MISSING.to_string())),
            };

            let token = form_token(&bytes, &config.form_field);

            if token.is_empty() {
                return Ok(forbidden(TOKEN_MISSING.to_string()));
            }

            // Verify token
            match verifier::verify_token(&token, &config).await {
                Ok(true) => {
                    // Token is valid - hand the buffered body back to the
                    // downstream handler and mark the request verified
                    let mut req = Request::from_parts(parts, Body::from(bytes));
                    req.extensions_mut().insert(VerifiedTurnstile);
                    inner.call(req).await
                }
                Ok(false) => Ok(forbidden(format!(
                    "{VERIFICATION_FAILED}: verification rejected"
                ))),
                Err(err) => {
                    tracing::warn!(error = %err, "turnstile verification errored");
                    Ok(forbidden(format!("{VERIFICATION_FAILED}: {err}")))
                }
            }
        })
    }
}

fn is_form_content_type(parts: &Parts) -> bool {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

/// First value of `field` in the urlencoded body, or an empty string.
fn form_token(bytes: &[u8], field: &str) -> String {
    form_urlencoded::parse(bytes)
        .find(|(name, _)| name == field)
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}

fn forbidden(message: String) -> Response<Body> {
    Response::builder()
        .status(StatusCode::FORBIDDEN)
        .body(Body::from(message))
        .unwrap()
}
