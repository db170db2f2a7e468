//! Bitwarden Secrets Manager client.
//!
//! Resolves secrets (the database URL) with the machine-account token in
//! `BWS_ACCESS_TOKEN`. Without a token, or when Bitwarden cannot be reached,
//! the plain environment variable is used instead.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_API_URL: &str = "https://api.bitwarden.com";

pub struct SecretsClient {
    access_token: Option<String>,
    api_url: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct BwsSecretResponse {
    value: String,
}

impl SecretsClient {
    pub fn new(access_token: Option<String>, api_url: impl Into<String>) -> Self {
        Self {
            access_token,
            api_url: api_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Token from `BWS_ACCESS_TOKEN`, API base from `BWS_API_URL`.
    pub fn from_env() -> Self {
        let access_token = std::env::var("BWS_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        let api_url = std::env::var("BWS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(access_token, api_url)
    }

    /// Bitwarden first (when a token is configured), then `env_fallback`.
    pub async fn get_secret(&self, secret_id: &str, env_fallback: &str) -> Result<String> {
        if let Some(token) = &self.access_token {
            match self.fetch_from_bitwarden(token, secret_id).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(secret_id, error = %e, "bitwarden lookup failed, using env var");
                }
            }
        }

        std::env::var(env_fallback).with_context(|| {
            format!("secret '{secret_id}' not found in Bitwarden and env var '{env_fallback}' is not set")
        })
    }

    async fn fetch_from_bitwarden(&self, token: &str, secret_id: &str) -> Result<String> {
        let url = format!("{}/secrets/{}", self.api_url.trim_end_matches('/'), secret_id);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .context("request to Bitwarden Secrets Manager failed")?;

        if !resp.status().is_success() {
            return Err(anyhow!("Bitwarden API returned status {}", resp.status()));
        }

        let body: BwsSecretResponse = resp
            .json()
            .await
            .context("failed to parse Bitwarden response")?;
        Ok(body.value)
    }
}
