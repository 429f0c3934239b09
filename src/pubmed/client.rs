use crate::config::EutilsConfig;
use crate::errors::AppError;
use crate::pubmed::{LinkKind, PubMedApi};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

/// Results requested from esearch; the resolver only consumes the first.
const ESEARCH_RETMAX: u32 = 20;

/// HTTP client for NCBI E-utilities.
///
/// A direct rate limiter gates every outbound call: NCBI allows 3 req/s
/// anonymously and 10 req/s with an API key, and bans offenders.
pub struct EutilsClient {
    http: reqwest::Client,
    config: EutilsConfig,
    limiter: DefaultDirectRateLimiter,
}

impl EutilsClient {
    pub fn new(config: EutilsConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Upstream(format!("Failed to build HTTP client: {e}")))?;

        let per_second =
            NonZeroU32::new(config.requests_per_second.max(1)).unwrap_or(NonZeroU32::MIN);
        let limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self { http, config, limiter })
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("retmode", "json".to_string()),
            ("tool", self.config.tool.clone()),
        ];
        if let Some(email) = &self.config.email {
            params.push(("email", email.clone()));
        }
        if let Some(key) = &self.config.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    async fn get_text(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
    ) -> Result<String, AppError> {
        self.limiter.until_ready().await;

        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        debug!(endpoint, "E-utilities request");

        let response = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("{endpoint} request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "{endpoint} returned {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("{endpoint} body unreadable: {e}")))
    }
}

#[async_trait]
impl PubMedApi for EutilsClient {
    async fn search(&self, term: &str) -> Result<Vec<String>, AppError> {
        let mut params = self.base_params();
        params.push(("term", term.to_string()));
        params.push(("retmax", ESEARCH_RETMAX.to_string()));

        let body = self.get_text("esearch.fcgi", &params).await?;
        parse_esearch(&body)
    }

    async fn fetch_summary(&self, pmid: &str) -> Result<String, AppError> {
        let mut params = self.base_params();
        params.push(("id", pmid.to_string()));

        self.get_text("esummary.fcgi", &params).await
    }

    async fn links(&self, pmid: &str, kind: LinkKind) -> Result<Vec<String>, AppError> {
        let mut params = self.base_params();
        params.push(("dbfrom", "pubmed".to_string()));
        params.push(("id", pmid.to_string()));
        params.push(("linkname", kind.linkname().to_string()));

        let body = self.get_text("elink.fcgi", &params).await?;
        parse_elink(&body, kind.linkname())
    }
}

#[derive(Deserialize)]
struct EsearchEnvelope {
    esearchresult: Option<EsearchResult>,
}

#[derive(Deserialize, Default)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

fn parse_esearch(body: &str) -> Result<Vec<String>, AppError> {
    let envelope: EsearchEnvelope = serde_json::from_str(body)
        .map_err(|e| AppError::Upstream(format!("esearch response unreadable: {e}")))?;
    let result = envelope
        .esearchresult
        .ok_or_else(|| AppError::Upstream("esearch response missing esearchresult".into()))?;
    Ok(result.idlist)
}

#[derive(Deserialize)]
struct ElinkEnvelope {
    #[serde(default)]
    linksets: Vec<LinkSet>,
}

#[derive(Deserialize, Default)]
struct LinkSet {
    #[serde(default)]
    linksetdbs: Vec<LinkSetDb>,
}

#[derive(Deserialize, Default)]
struct LinkSetDb {
    #[serde(default)]
    linkname: String,
    // Older mirrors emit numeric ids, current ones strings; accept both.
    #[serde(default)]
    links: Vec<serde_json::Value>,
}

fn parse_elink(body: &str, linkname: &str) -> Result<Vec<String>, AppError> {
    let envelope: ElinkEnvelope = serde_json::from_str(body)
        .map_err(|e| AppError::Upstream(format!("elink response unreadable: {e}")))?;

    // A paper with no links for the relation simply has no linksetdb entry.
    let ids = envelope
        .linksets
        .into_iter()
        .flat_map(|set| set.linksetdbs)
        .find(|db| db.linkname == linkname)
        .map(|db| {
            db.links
                .into_iter()
                .filter_map(|v| match v {
                    serde_json::Value::String(s) => Some(s),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ids)
}
