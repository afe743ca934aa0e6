//! Image search proxy.
//!
//! [`SearchProxy`] owns the request-side contract (prompt validation and the
//! configured-credential check) and hands the query to a [`SearchProvider`],
//! which speaks to the external service and classifies its replies.

pub mod pexels;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;

/// Outbound side of the proxy.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// URL of the primary image of the first match for `query`.
    async fn first_image_url(&self, query: &str) -> Result<String, AppError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub image_url: String,
    pub normalized_prompt: String,
}

#[derive(Clone)]
pub struct SearchProxy {
    provider: Option<Arc<dyn SearchProvider>>,
}

impl SearchProxy {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// A proxy with no provider credential. Every search fails with
    /// `AppError::Configuration`.
    pub fn unconfigured() -> Self {
        Self { provider: None }
    }

    pub fn ensure_configured(&self) -> Result<(), AppError> {
        self.provider()?;
        Ok(())
    }

    fn provider(&self) -> Result<&Arc<dyn SearchProvider>, AppError> {
        self.provider.as_ref().ok_or_else(|| {
            AppError::Configuration("Image search API key not configured".into())
        })
    }

    pub async fn search(&self, prompt: &str) -> Result<SearchHit, AppError> {
        let normalized_prompt = normalize_prompt(prompt)?;
        let image_url = self.provider()?.first_image_url(&normalized_prompt).await?;
        Ok(SearchHit {
            image_url,
            normalized_prompt,
        })
    }
}

/// Trims and collapses inner whitespace; empty prompts are rejected.
pub fn normalize_prompt(prompt: &str) -> Result<String, AppError> {
    let normalized = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Err(AppError::Validation(
            "Please provide a search query".into(),
        ));
    }
    Ok(normalized)
}
