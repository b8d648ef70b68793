use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AbacError {
    #[error("Failed to load rule file `{path}`")]
    #[diagnostic(
        code(palisade::abac::rule_load),
        help("Check that the path exists and is readable (a JSON file or a directory of JSON files)")
    )]
    RuleLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid rule: {0}")]
    #[diagnostic(
        code(palisade::abac::invalid_rule),
        help("A rule is {{ \"rule\": {{...}}, \"result\": \"allow\"|\"deny\", \"mask\": [...] }}; condition keys start with sbj., ctx. or obj.")
    )]
    InvalidRule(String),

    #[error("Unknown operator `{0}`")]
    #[diagnostic(
        code(palisade::abac::unknown_operator),
        help("Supported operators: eq, not, in, lt, gt, and, or")
    )]
    UnknownOperator(String),

    #[error("JSON parse error: {0}")]
    #[diagnostic(
        code(palisade::abac::json),
        help("Rule trees, subjects and contexts must be valid JSON documents")
    )]
    Json(#[from] serde_json::Error),
}

impl AbacError {
    /// True for errors caused by the rule payload rather than the environment.
    pub fn is_rule_error(&self) -> bool {
        matches!(
            self,
            AbacError::InvalidRule(_) | AbacError::UnknownOperator(_) | AbacError::Json(_)
        )
    }
}

impl IntoResponse for AbacError {
    fn into_response(self) -> Response {
        let status = if self.is_rule_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
