//! HTTP implementation of the remote alert provider.
//!
//! Talks to the listening provider's REST API with bearer authentication,
//! paginating alert listings internally and exposing cursor-based mention
//! pages. Callers never see pagination of the alert directory.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use url::Url;

use super::{AlertProvider, Mention, MentionPage, MentionQuery, ProviderError, RemoteAlert};
use crate::config::AppConfig;

/// Remote alert API client backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpAlertProvider {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
    page_size: u32,
}

impl HttpAlertProvider {
    pub fn new(base: Url, token: Option<String>, page_size: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
            token,
            page_size: page_size.max(1),
        }
    }

    /// Build a provider from application configuration.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, url::ParseError> {
        let base = Url::parse(&cfg.provider_api_base)?;
        Ok(Self::new(
            base,
            cfg.provider_api_token.clone(),
            cfg.provider_page_size,
        ))
    }

    fn bearer_token(&self) -> Result<&str, ProviderError> {
        self.token
            .as_deref()
            .ok_or(ProviderError::MissingCredential)
    }

    async fn get_json(&self, url: Url) -> Result<JsonValue, ProviderError> {
        let token = self.bearer_token()?;

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        response
            .json::<JsonValue>()
            .await
            .map_err(ProviderError::Network)
    }

    fn alerts_url(&self, offset: u32) -> Result<Url, ProviderError> {
        let mut url = self
            .base
            .join("v1/alerts")
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("limit", &self.page_size.to_string())
            .append_pair("offset", &offset.to_string());
        Ok(url)
    }

    fn mentions_url(&self, query: &MentionQuery) -> Result<Url, ProviderError> {
        let mut url = self
            .base
            .join(&format!("v1/alerts/{}/mentions", query.remote_alert_id))
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("since", &query.since.to_rfc3339())
                .append_pair("limit", &query.page_size.to_string());
            if let Some(cursor) = &query.cursor {
                pairs.append_pair("cursor", cursor);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl AlertProvider for HttpAlertProvider {
    async fn list_alerts(&self) -> Result<Vec<RemoteAlert>, ProviderError> {
        let mut alerts: Vec<RemoteAlert> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut offset = 0u32;

        loop {
            let payload = self.get_json(self.alerts_url(offset)?).await?;

            let page = payload
                .get("alerts")
                .and_then(JsonValue::as_array)
                .ok_or_else(|| {
                    ProviderError::Malformed("alert listing missing 'alerts' array".to_string())
                })?;

            for value in page {
                let alert = parse_alert(value)?;
                if seen.insert(alert.id.clone()) {
                    alerts.push(alert);
                }
            }

            let has_more = payload
                .get("has_more")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false);
            if !has_more || page.is_empty() {
                break;
            }
            offset += page.len() as u32;
        }

        tracing::debug!(count = alerts.len(), "Fetched remote alert directory");
        Ok(alerts)
    }

    async fn fetch_mentions(&self, query: &MentionQuery) -> Result<MentionPage, ProviderError> {
        let payload = self.get_json(self.mentions_url(query)?).await?;

        let items = payload
            .get("mentions")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| {
                ProviderError::Malformed("mention page missing 'mentions' array".to_string())
            })?;

        let mentions = items
            .iter()
            .map(parse_mention)
            .collect::<Result<Vec<_>, _>>()?;

        let next_cursor = payload
            .get("next_cursor")
            .and_then(JsonValue::as_str)
            .map(str::to_string);
        let has_more = payload
            .get("has_more")
            .and_then(JsonValue::as_bool)
            .unwrap_or(next_cursor.is_some());

        Ok(MentionPage {
            mentions,
            next_cursor,
            has_more,
        })
    }
}

fn parse_alert(value: &JsonValue) -> Result<RemoteAlert, ProviderError> {
    let id = json_id(value.get("id"))
        .ok_or_else(|| ProviderError::Malformed("alert entry missing 'id'".to_string()))?;
    let name = value
        .get("name")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("alert-{}", id));
    let is_active = value
        .get("is_active")
        .and_then(JsonValue::as_bool)
        .unwrap_or(true);

    Ok(RemoteAlert {
        id,
        name,
        is_active,
        raw: value.clone(),
    })
}

fn parse_mention(value: &JsonValue) -> Result<Mention, ProviderError> {
    let id = json_id(value.get("id"))
        .ok_or_else(|| ProviderError::Malformed("mention entry missing 'id'".to_string()))?;
    let published_at = value
        .get("published_at")
        .and_then(JsonValue::as_str)
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc));

    Ok(Mention {
        id,
        published_at,
        raw: value.clone(),
    })
}

/// Providers are inconsistent about numeric vs string ids.
fn json_id(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() > 200 {
        let truncated: String = body.chars().take(200).collect();
        format!("{}...", truncated)
    } else {
        body.to_string()
    }
}
