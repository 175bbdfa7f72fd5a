//! HTTP credential exchange for root credentials.
//!
//! Root credentials are traded for a session token by POSTing
//! `{"user": ..., "pass": ...}` to the sign-in endpoint. The server answers with a
//! JSON body carrying its own `code`; anything other than `200` is a failure whose
//! `details` field becomes the error message.

use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;
use wsrpc_core::{ClientError, HandshakeStep, Result};

#[derive(Serialize)]
struct SigninRequest<'a> {
    user: &'a str,
    pass: &'a str,
}

#[derive(Deserialize)]
struct SigninResponse {
    code: i64,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

fn failed(message: impl Into<String>) -> ClientError {
    ClientError::handshake(HandshakeStep::Signin, message)
}

/// Exchange root credentials for a session token.
#[instrument(skip(http, login_url, password), fields(url = %login_url))]
pub async fn signin(
    http: &reqwest::Client,
    login_url: &Url,
    username: &str,
    password: &str,
) -> Result<String> {
    let resp = http
        .post(login_url.clone())
        .header(ACCEPT, "application/json")
        .json(&SigninRequest {
            user: username,
            pass: password,
        })
        .send()
        .await
        .map_err(|e| failed(e.to_string()))?;

    let status = resp.status().as_u16();
    let body = resp.text().await.map_err(|e| failed(e.to_string()))?;
    let parsed: SigninResponse = serde_json::from_str(&body).map_err(|_| {
        failed(format!(
            "unexpected sign-in response ({status}): {}",
            body.chars().take(200).collect::<String>()
        ))
    })?;

    if parsed.code != 200 {
        return Err(failed(
            parsed
                .details
                .unwrap_or_else(|| format!("sign-in rejected with code {}", parsed.code)),
        ));
    }
    let token = parsed
        .token
        .ok_or_else(|| failed("sign-in response carried no token"))?;
    debug!("signed in");
    Ok(token)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
