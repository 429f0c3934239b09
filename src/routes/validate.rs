use crate::errors::AppError;
use crate::routes::require_doi;
use crate::services::AppState;
use axum::{extract::State, Json};
use regex_lite::Regex;
use serde::Serialize;
use std::sync::OnceLock;

static DOI_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Registrant prefix, a slash, then any non-whitespace suffix.
fn doi_pattern() -> &'static Regex {
    DOI_PATTERN.get_or_init(|| {
        Regex::new(r"^(?i)10\.\d{4,9}/\S+$").expect("DOI pattern compiles")
    })
}

pub(crate) fn is_valid_doi(doi: &str) -> bool {
    doi_pattern().is_match(doi)
}

#[derive(Serialize)]
pub struct ValidateDoiResponse {
    pub valid: bool,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pmid: Option<String>,
}

/// POST /validate-doi
///
/// Syntactically invalid DOIs short-circuit without an upstream call. An
/// upstream outage propagates as 502 rather than masquerading as
/// `found: false` - a service outage is not evidence the DOI does not exist.
pub async fn validate_doi(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ValidateDoiResponse>, AppError> {
    let doi = require_doi(&body)?;

    if !is_valid_doi(doi) {
        return Ok(Json(ValidateDoiResponse {
            valid: false,
            found: false,
            pmid: None,
        }));
    }

    match state.resolver.resolve(doi).await {
        Ok(pmid) => Ok(Json(ValidateDoiResponse {
            valid: true,
            found: true,
            pmid: Some(pmid),
        })),
        Err(AppError::DoiNotFound { .. }) => Ok(Json(ValidateDoiResponse {
            valid: true,
            found: false,
            pmid: None,
        })),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_dois() {
        assert!(is_valid_doi("10.1000/xyz123"));
        assert!(is_valid_doi("10.1016/j.cell.2019.05.031"));
        assert!(is_valid_doi("10.1371/journal.pone.0123456"));
        assert!(is_valid_doi("10.1002/(SICI)1097-4555(199711)28:11<873::AID-JRS177>3.0.CO;2-B"));
    }

    #[test]
    fn test_rejects_malformed_dois() {
        assert!(!is_valid_doi(""));
        assert!(!is_valid_doi("not-a-doi"));
        assert!(!is_valid_doi("11.1000/xyz"));
        assert!(!is_valid_doi("10.12/short-prefix"));
        assert!(!is_valid_doi("10.1000/"));
        assert!(!is_valid_doi("10.1000/with space"));
    }
}
