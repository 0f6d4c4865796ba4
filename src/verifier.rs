use crate::{TurnstileConfig, VerifyRequest, VerifyResponse};

/// Failure modes of one `siteverify` round trip.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("siteverify request failed: {0}")]
    Transport(reqwest::Error),
    #[error("siteverify response malformed: {0}")]
    Decode(reqwest::Error),
}

/// Verify a Turnstile token with Cloudflare.
///
/// One form-encoded POST per call; no retries. Returns the provider's
/// `success` flag verbatim.
pub async fn verify_token(token: &str, config: &TurnstileConfig) -> Result<bool, VerifyError> {
    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(VerifyError::Transport)?;

    let response = client
        .post(&config.verify_url)
        .form(&VerifyRequest {
            secret: config.secret.clone(),
            response: token.to_string(),
        })
        .send()
        .await
        .map_err(VerifyError::Transport)?;

    let result: VerifyResponse = response.json().await.map_err(|err| {
        if err.is_decode() {
            VerifyError::Decode(err)
        } else {
            VerifyError::Transport(err)
        }
    })?;

    if !result.success
        && let Some(errors) = &result.error_codes
    {
        tracing::warn!(?errors, "turnstile verification rejected");
    }

    Ok(result.success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, secret: &str) -> TurnstileConfig {
        TurnstileConfig::new(secret).with_verify_url(format!("{}/siteverify", server.uri()))
    }

    #[tokio::test]
    async fn sends_form_encoded_secret_and_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/siteverify"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("secret=top-secret"))
            .and(body_string_contains("response=tok-123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let success = verify_token("tok-123", &config_for(&server, "top-secret"))
            .await
            .unwrap();
        assert!(success);
    }

    #[tokio::test]
    async fn reports_provider_rejection_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "error-codes": ["invalid-input-response"]
            })))
            .mount(&server)
            .await;

        let success = verify_token("bad-tok", &config_for(&server, "top-secret"))
            .await
            .unwrap();
        assert!(!success);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let config = TurnstileConfig::new("s").with_verify_url("http://127.0.0.1:1/siteverify");

        let err = verify_token("tok", &config).await.unwrap_err();
        assert!(matches!(err, VerifyError::Transport(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = verify_token("tok", &config_for(&server, "s"))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::Decode(_)));
    }
}
