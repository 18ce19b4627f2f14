use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use trivia_core::model::{Category, CategoryId, Difficulty, Question, QuestionDraft, SessionToken};

use super::{BatchRequest, QuestionSource};
use crate::error::{ProviderConfigError, SourceError};

pub const DEFAULT_BASE_URL: &str = "https://opentdb.com";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ProviderConfig {
    /// Defaults overridden by `TRIVIA_API_BASE_URL` and `TRIVIA_REQUEST_TIMEOUT_SECS`.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("TRIVIA_API_BASE_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let request_timeout = env::var("TRIVIA_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs);
        Self {
            base_url,
            request_timeout,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Open Trivia DB response codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success,
    NoResults,
    InvalidParameter,
    TokenNotFound,
    TokenEmpty,
    RateLimit,
    Unknown(u8),
}

impl ResponseCode {
    #[must_use]
    pub fn from_u8(code: u8) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::NoResults,
            2 => Self::InvalidParameter,
            3 => Self::TokenNotFound,
            4 => Self::TokenEmpty,
            5 => Self::RateLimit,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::NoResults => 1,
            Self::InvalidParameter => 2,
            Self::TokenNotFound => 3,
            Self::TokenEmpty => 4,
            Self::RateLimit => 5,
            Self::Unknown(other) => other,
        }
    }
}

/// HTTP client for the Open Trivia DB API.
#[derive(Clone)]
pub struct OpenTdbClient {
    client: Client,
    base_url: Url,
}

impl OpenTdbClient {
    /// Build a client for the configured provider.
    ///
    /// # Errors
    ///
    /// Returns `ProviderConfigError` if the base URL does not parse or the
    /// HTTP client cannot be constructed.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderConfigError> {
        let base_url = Url::parse(config.base_url.trim()).map_err(|_| {
            ProviderConfigError::InvalidBaseUrl {
                raw: config.base_url.clone(),
            }
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderConfigError::InvalidBaseUrl {
                raw: config.base_url,
            });
        }
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    async fn get_text(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<String, SourceError> {
        let response = self
            .client
            .get(self.endpoint(path))
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::HttpStatus(response.status()));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl QuestionSource for OpenTdbClient {
    async fn request_token(&self) -> Result<SessionToken, SourceError> {
        let body = self
            .get_text("api_token.php", &[("command", "request".to_string())])
            .await?;
        let token = parse_token(&body)?;
        debug!(?token, "received session token");
        Ok(token)
    }

    async fn fetch_batch(&self, request: &BatchRequest) -> Result<Vec<Question>, SourceError> {
        debug!(
            category = ?request.category,
            difficulty = %request.difficulty,
            amount = request.amount,
            "requesting questions"
        );
        let body = self.get_text("api.php", &question_query(request)).await?;
        parse_questions(&body)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, SourceError> {
        let body = self.get_text("api_category.php", &[]).await?;
        parse_categories(&body)
    }
}

//
// ─── WIRE FORMAT ───────────────────────────────────────────────────────────────
//

pub(crate) fn question_query(request: &BatchRequest) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("amount", request.amount.max(1).to_string()),
        ("type", "multiple".to_string()),
    ];
    if let Some(category) = request.category {
        query.push(("category", category.to_string()));
    }
    if let Some(difficulty) = request.difficulty.as_query() {
        query.push(("difficulty", difficulty.to_string()));
    }
    if let Some(token) = &request.token {
        query.push(("token", token.as_str().to_string()));
    }
    query
}

pub(crate) fn parse_token(body: &str) -> Result<SessionToken, SourceError> {
    let payload: TokenResponse = serde_json::from_str(body)?;
    match ResponseCode::from_u8(payload.response_code) {
        ResponseCode::Success => payload
            .token
            .filter(|token| !token.trim().is_empty())
            .map(SessionToken::new)
            .ok_or(SourceError::MissingToken),
        other => Err(SourceError::Provider {
            code: other.as_u8(),
        }),
    }
}

pub(crate) fn parse_questions(body: &str) -> Result<Vec<Question>, SourceError> {
    let payload: QuestionsResponse = serde_json::from_str(body)?;
    match ResponseCode::from_u8(payload.response_code) {
        ResponseCode::Success => {}
        ResponseCode::NoResults => {
            debug!("provider has no questions for this request");
            return Ok(Vec::new());
        }
        ResponseCode::TokenEmpty => {
            warn!("session token exhausted every question for this request");
            return Ok(Vec::new());
        }
        other => {
            return Err(SourceError::Provider {
                code: other.as_u8(),
            });
        }
    }

    let mut questions = Vec::with_capacity(payload.results.len());
    for item in payload.results {
        match item.into_draft().validate() {
            Ok(question) => questions.push(question),
            Err(err) => warn!(error = %err, "skipping malformed question"),
        }
    }
    Ok(questions)
}

pub(crate) fn parse_categories(body: &str) -> Result<Vec<Category>, SourceError> {
    let payload: CategoriesResponse = serde_json::from_str(body)?;
    Ok(payload
        .trivia_categories
        .into_iter()
        .map(|category| Category::new(CategoryId::new(category.id), category.name))
        .collect())
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    response_code: u8,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuestionsResponse {
    response_code: u8,
    #[serde(default)]
    results: Vec<WireQuestion>,
}

#[derive(Debug, Deserialize)]
struct WireQuestion {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    question: String,
    correct_answer: String,
    #[serde(default)]
    incorrect_answers: Vec<String>,
}

impl WireQuestion {
    fn into_draft(self) -> QuestionDraft {
        let difficulty = self
            .difficulty
            .as_deref()
            .and_then(|raw| raw.parse::<Difficulty>().ok())
            .unwrap_or_default();
        let mut draft = QuestionDraft::new(self.question, self.correct_answer, self.incorrect_answers)
            .with_difficulty(difficulty);
        if let Some(category) = self.category {
            draft = draft.with_category(category);
        }
        draft
    }
}

#[derive(Debug, Deserialize)]
struct CategoriesResponse {
    trivia_categories: Vec<WireCategory>,
}

#[derive(Debug, Deserialize)]
struct WireCategory {
    id: u32,
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUESTIONS_OK: &str = r#"{
        "response_code": 0,
        "results": [
            {
                "type": "multiple",
                "difficulty": "easy",
                "category": "Science &amp; Nature",
                "question": "What is the chemical symbol for &quot;gold&quot;?",
                "correct_answer": "Au",
                "incorrect_answers": ["Ag", "Gd", "Go"]
            },
            {
                "type": "multiple",
                "difficulty": "hard",
                "category": "History",
                "question": "Broken item",
                "correct_answer": "Same",
                "incorrect_answers": ["Same", "Other", "Third"]
            }
        ]
    }"#;

    #[test]
    fn parses_questions_and_skips_malformed_items() {
        let questions = parse_questions(QUESTIONS_OK).unwrap();
        assert_eq!(questions.len(), 1);
        let question = &questions[0];
        assert_eq!(question.correct_answer(), "Au");
        assert_eq!(question.difficulty(), Difficulty::Easy);
        assert_eq!(question.category(), Some("Science &amp; Nature"));
        assert!(question.prompt().contains("&quot;"));
    }

    #[test]
    fn no_results_is_an_empty_batch() {
        let questions = parse_questions(r#"{"response_code": 1, "results": []}"#).unwrap();
        assert!(questions.is_empty());
    }

    #[test]
    fn exhausted_token_is_an_empty_batch() {
        let questions = parse_questions(r#"{"response_code": 4, "results": []}"#).unwrap();
        assert!(questions.is_empty());
    }

    #[test]
    fn rate_limit_is_a_provider_error() {
        let err = parse_questions(r#"{"response_code": 5, "results": []}"#).unwrap_err();
        assert!(matches!(err, SourceError::Provider { code: 5 }));
    }

    #[test]
    fn garbage_body_is_a_payload_error() {
        let err = parse_questions("<html>oops</html>").unwrap_err();
        assert!(matches!(err, SourceError::Payload(_)));
    }

    #[test]
    fn parses_token() {
        let token = parse_token(
            r#"{"response_code":0,"response_message":"Token Generated Successfully!","token":"abc123"}"#,
        )
        .unwrap();
        assert_eq!(token.as_str(), "abc123");
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = parse_token(r#"{"response_code":0}"#).unwrap_err();
        assert!(matches!(err, SourceError::MissingToken));
    }

    #[test]
    fn parses_categories() {
        let categories = parse_categories(
            r#"{"trivia_categories":[{"id":9,"name":"General Knowledge"},{"id":10,"name":"Entertainment: Books"}]}"#,
        )
        .unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].id, CategoryId::new(9));
        assert_eq!(categories[1].name, "Entertainment: Books");
    }

    #[test]
    fn query_includes_only_set_filters() {
        let generic = question_query(&BatchRequest {
            category: None,
            difficulty: Difficulty::Any,
            amount: 10,
            token: None,
        });
        assert_eq!(
            generic,
            vec![("amount", "10".to_string()), ("type", "multiple".to_string())]
        );

        let filtered = question_query(&BatchRequest {
            category: Some(CategoryId::new(9)),
            difficulty: Difficulty::Hard,
            amount: 5,
            token: Some(SessionToken::new("tok")),
        });
        assert!(filtered.contains(&("category", "9".to_string())));
        assert!(filtered.contains(&("difficulty", "hard".to_string())));
        assert!(filtered.contains(&("token", "tok".to_string())));
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let err = OpenTdbClient::new(ProviderConfig::default().with_base_url("not a url"))
            .err()
            .unwrap();
        assert!(matches!(err, ProviderConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn endpoint_joins_paths() {
        let client =
            OpenTdbClient::new(ProviderConfig::default().with_base_url("http://localhost:8080/"))
                .unwrap();
        assert_eq!(
            client.endpoint("api.php"),
            "http://localhost:8080/api.php"
        );
    }
}
