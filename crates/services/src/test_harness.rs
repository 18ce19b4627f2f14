//! Scripted question source for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use trivia_core::model::{Category, CategoryId, Difficulty, Question, QuestionDraft, SessionToken};

use crate::error::SourceError;
use crate::source::{BatchRequest, QuestionSource};

pub(crate) fn question(prompt: &str) -> Question {
    QuestionDraft::new(prompt, format!("{prompt} answer"), ["Wrong A", "Wrong B", "Wrong C"])
        .validate()
        .expect("valid test question")
}

#[derive(Default)]
pub(crate) struct ScriptedSource {
    generic: Vec<Question>,
    categories: HashMap<CategoryId, Vec<Question>>,
    failing: HashSet<CategoryId>,
    unfiltered_only: HashSet<CategoryId>,
    max_amount: HashMap<CategoryId, u32>,
    fail_token: bool,
    requests: Mutex<Vec<BatchRequest>>,
    tokens_issued: AtomicUsize,
}

impl ScriptedSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_generic(mut self, questions: impl IntoIterator<Item = Question>) -> Self {
        self.generic = questions.into_iter().collect();
        self
    }

    pub(crate) fn with_category(
        mut self,
        id: u32,
        questions: impl IntoIterator<Item = Question>,
    ) -> Self {
        self.categories
            .insert(CategoryId::new(id), questions.into_iter().collect());
        self
    }

    pub(crate) fn with_failing_category(mut self, id: u32) -> Self {
        self.failing.insert(CategoryId::new(id));
        self
    }

    /// Category only answers requests without a difficulty filter.
    pub(crate) fn only_when_unfiltered(mut self, id: u32) -> Self {
        self.unfiltered_only.insert(CategoryId::new(id));
        self
    }

    /// Category only answers requests asking for at most `amount` questions.
    pub(crate) fn only_up_to_amount(mut self, id: u32, amount: u32) -> Self {
        self.max_amount.insert(CategoryId::new(id), amount);
        self
    }

    pub(crate) fn with_failing_token(mut self) -> Self {
        self.fail_token = true;
        self
    }

    pub(crate) fn requests(&self) -> Vec<BatchRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub(crate) fn tokens_issued(&self) -> usize {
        self.tokens_issued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionSource for ScriptedSource {
    async fn request_token(&self) -> Result<SessionToken, SourceError> {
        if self.fail_token {
            return Err(SourceError::MissingToken);
        }
        let n = self.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SessionToken::new(format!("token-{n}")))
    }

    async fn fetch_batch(&self, request: &BatchRequest) -> Result<Vec<Question>, SourceError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());

        let pool = match request.category {
            None => &self.generic,
            Some(id) => {
                if self.failing.contains(&id) {
                    return Err(SourceError::Provider { code: 5 });
                }
                if self.unfiltered_only.contains(&id) && request.difficulty != Difficulty::Any {
                    return Ok(Vec::new());
                }
                if self
                    .max_amount
                    .get(&id)
                    .is_some_and(|max| request.amount > *max)
                {
                    return Ok(Vec::new());
                }
                match self.categories.get(&id) {
                    Some(questions) => questions,
                    None => return Ok(Vec::new()),
                }
            }
        };

        let take = usize::try_from(request.amount).unwrap_or(usize::MAX);
        Ok(pool.iter().take(take).cloned().collect())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, SourceError> {
        let mut ids: Vec<_> = self.categories.keys().copied().collect();
        ids.sort();
        Ok(ids
            .into_iter()
            .map(|id| Category::new(id, format!("Category {id}")))
            .collect())
    }
}
