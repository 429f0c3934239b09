//! Metadata parser: raw esummary payload -> `PaperRecord`.

use crate::db::models::PaperRecord;
use crate::errors::AppError;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Deserialize)]
struct SummaryEnvelope {
    result: Option<SummaryResult>,
}

#[derive(Deserialize, Default)]
struct SummaryResult {
    #[serde(default)]
    uids: Vec<String>,
    #[serde(flatten)]
    records: HashMap<String, serde_json::Value>,
}

#[derive(Deserialize, Default)]
struct DocSummary {
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: Vec<DocAuthor>,
    #[serde(default)]
    fulljournalname: Option<String>,
    /// Abbreviated journal name, used when `fulljournalname` is absent.
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    pubdate: Option<String>,
    #[serde(default, rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    articleids: Vec<ArticleId>,
    // Emitted as a number or a (possibly empty) string depending on mirror.
    #[serde(default)]
    pmcrefcount: serde_json::Value,
    /// esummary reports unknown uids as a per-document error field, not HTTP.
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize, Default)]
struct DocAuthor {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize, Default)]
struct ArticleId {
    #[serde(default)]
    idtype: String,
    #[serde(default)]
    value: String,
}

/// Parse the raw esummary payload for `pmid` into a `PaperRecord`.
pub fn parse_summary(pmid: &str, raw: &str) -> Result<PaperRecord, AppError> {
    let envelope: SummaryEnvelope = serde_json::from_str(raw)
        .map_err(|e| AppError::ParseFailure(format!("summary for {pmid} is not valid JSON: {e}")))?;

    let result = envelope
        .result
        .ok_or_else(|| AppError::ParseFailure(format!("summary for {pmid} has no result envelope")))?;

    let doc_value = result
        .records
        .get(pmid)
        .or_else(|| result.uids.first().and_then(|uid| result.records.get(uid)))
        .ok_or_else(|| AppError::ParseFailure(format!("summary has no document for {pmid}")))?;

    let doc: DocSummary = serde_json::from_value(doc_value.clone())
        .map_err(|e| AppError::ParseFailure(format!("document for {pmid} is malformed: {e}")))?;

    if let Some(error) = doc.error {
        return Err(AppError::ParseFailure(format!("upstream error for {pmid}: {error}")));
    }
    if doc.title.is_empty() {
        return Err(AppError::ParseFailure(format!("document for {pmid} has no title")));
    }

    let doi = doc
        .articleids
        .iter()
        .find(|id| id.idtype == "doi" && !id.value.is_empty())
        .map(|id| id.value.clone());

    Ok(PaperRecord {
        pmid: pmid.to_string(),
        doi,
        title: doc.title,
        authors: doc
            .authors
            .into_iter()
            .map(|a| a.name)
            .filter(|n| !n.is_empty())
            .collect(),
        journal: doc
            .fulljournalname
            .filter(|j| !j.is_empty())
            .or(doc.source.filter(|s| !s.is_empty())),
        year: doc.pubdate.as_deref().and_then(parse_year),
        abstract_text: doc.abstract_text.filter(|a| !a.is_empty()),
        citation_count: citation_count(&doc.pmcrefcount),
    })
}

/// esummary pubdate looks like "2019 Aug 24" or "2021 Jan-Feb".
fn parse_year(pubdate: &str) -> Option<i32> {
    pubdate.split_whitespace().next()?.parse().ok()
}

fn citation_count(value: &serde_json::Value) -> u32 {
    match value {
        serde_json::Value::Number(n) => n.as_u64().unwrap_or(0) as u32,
        serde_json::Value::String(s) => s.parse().unwrap_or(0),
        _ => 0,
    }
}
