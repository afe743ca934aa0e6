use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use super::SearchProvider;
use crate::{config::PexelsConfig, error::AppError};

/// Client for the Pexels photo search API. The key is sent with each
/// request; the underlying `reqwest::Client` carries no default credentials.
#[derive(Clone)]
pub struct PexelsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    photos: Option<Vec<Photo>>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    src: Option<PhotoSources>,
}

#[derive(Debug, Deserialize)]
struct PhotoSources {
    large: Option<String>,
    large2x: Option<String>,
    original: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl PexelsClient {
    /// `None` when no API key is configured.
    pub fn from_config(cfg: &PexelsConfig) -> anyhow::Result<Option<Self>> {
        let Some(api_key) = cfg.api_key.clone() else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build pexels http client")?;
        Ok(Some(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
        }))
    }
}

#[async_trait]
impl SearchProvider for PexelsClient {
    #[tracing::instrument(skip(self))]
    async fn first_image_url(&self, query: &str) -> Result<String, AppError> {
        let url = format!("{}/v1/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .query(&[("query", query), ("per_page", "1")])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, timeout = e.is_timeout(), "pexels request failed");
                if e.is_timeout() {
                    AppError::Upstream("Image search timed out".into())
                } else {
                    AppError::Upstream("Image search is unavailable".into())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            warn!(error = %e, %status, "pexels body read failed");
            AppError::Upstream("Image search is unavailable".into())
        })?;
        debug!(%status, "pexels responded");
        interpret_response(status, &body)
    }
}

/// Maps a Pexels reply onto the search outcome.
fn interpret_response(status: StatusCode, body: &str) -> Result<String, AppError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            warn!(%status, "pexels rejected the api key");
            return Err(AppError::UpstreamAuth);
        }
        StatusCode::TOO_MANY_REQUESTS => {
            warn!("pexels rate limit hit");
            return Err(AppError::RateLimited);
        }
        s if !s.is_success() => {
            let message = serde_json::from_str::<ErrorBody>(body)
                .ok()
                .and_then(|b| b.error)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Failed to search image".to_string());
            warn!(%status, %message, "pexels error");
            return Err(AppError::Upstream(message));
        }
        _ => {}
    }

    let parsed: SearchResponse = serde_json::from_str(body).map_err(|e| {
        warn!(error = %e, "pexels returned an unparseable body");
        malformed()
    })?;
    let photos = parsed.photos.ok_or_else(malformed)?;
    let Some(first) = photos.into_iter().next() else {
        return Err(AppError::NotFound(
            "No images found for this search query".into(),
        ));
    };

    let src = first.src.ok_or_else(malformed)?;
    let image_url = src
        .large
        .or(src.large2x)
        .or(src.original)
        .ok_or_else(malformed)?;

    match Url::parse(&image_url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(image_url),
        _ => Err(malformed()),
    }
}

fn malformed() -> AppError {
    AppError::Upstream("Image search returned an unexpected response".into())
}
