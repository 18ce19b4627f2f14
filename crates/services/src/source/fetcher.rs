use std::collections::BTreeSet;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use trivia_core::model::{CategoryId, Difficulty, Question, SessionToken};

use super::{BatchRequest, QuestionSource};

/// Questions requested per provider call.
pub const DEFAULT_BATCH_AMOUNT: u32 = 10;

/// Gap between successive provider calls. Open Trivia DB rejects requests
/// made less than five seconds apart from the same client.
pub const DEFAULT_REQUEST_SPACING: Duration = Duration::from_secs(5);

/// What to do when a category request comes back empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZeroResultFallback {
    /// Accept the empty result.
    #[default]
    None,
    /// Retry once without the difficulty filter; if that is still empty and
    /// `reduced_amount` is set, retry once more asking for fewer questions.
    RetryWithoutDifficulty { reduced_amount: Option<u32> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub amount: u32,
    pub request_spacing: Duration,
    pub zero_result_fallback: ZeroResultFallback,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            amount: DEFAULT_BATCH_AMOUNT,
            request_spacing: DEFAULT_REQUEST_SPACING,
            zero_result_fallback: ZeroResultFallback::None,
        }
    }
}

impl FetchSettings {
    /// Set the per-request amount. Zero is clamped to one.
    #[must_use]
    pub fn with_amount(mut self, amount: u32) -> Self {
        self.amount = amount.max(1);
        self
    }

    #[must_use]
    pub fn with_request_spacing(mut self, spacing: Duration) -> Self {
        self.request_spacing = spacing;
        self
    }

    #[must_use]
    pub fn with_zero_result_fallback(mut self, fallback: ZeroResultFallback) -> Self {
        self.zero_result_fallback = fallback;
        self
    }
}

/// Progress callbacks for the driving loop while a fetch is in flight.
pub trait FetchObserver: Send {
    /// A category (or the generic pool, `None`) is about to be requested.
    /// `index` is 1-based.
    fn on_request(&mut self, _category: Option<CategoryId>, _index: usize, _total: usize) {}

    /// A category finished with `loaded` usable questions.
    fn on_loaded(&mut self, _category: Option<CategoryId>, _loaded: usize) {}

    /// The fetcher is about to wait before the next request.
    fn on_wait(&mut self, _delay: Duration) {}
}

/// Observer that ignores every callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FetchObserver for NoopObserver {}

/// Enforces `request_spacing` between successive provider requests.
///
/// Remembers when the last request went out, so one pacer shared across
/// fetches keeps back-to-back fetches spaced too.
#[derive(Debug, Clone)]
pub struct RequestPacer {
    spacing: Duration,
    last_request: Option<Instant>,
}

impl RequestPacer {
    #[must_use]
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last_request: None,
        }
    }

    /// Wait out whatever is left of the spacing since the previous request,
    /// then record a new request.
    pub async fn ready(&mut self, observer: &mut dyn FetchObserver) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.spacing {
                let delay = self.spacing - elapsed;
                observer.on_wait(delay);
                tokio::time::sleep(delay).await;
            }
        }
        self.last_request = Some(Instant::now());
    }

    #[must_use]
    pub fn last_request(&self) -> Option<Instant> {
        self.last_request
    }
}

/// Turns a session's category selection into paced provider requests.
///
/// Never fails: a request that errors counts as a request that returned no
/// questions.
pub struct QuestionFetcher<'a> {
    source: &'a dyn QuestionSource,
    settings: &'a FetchSettings,
}

impl<'a> QuestionFetcher<'a> {
    #[must_use]
    pub fn new(source: &'a dyn QuestionSource, settings: &'a FetchSettings) -> Self {
        Self { source, settings }
    }

    /// Fetch `amount` questions per category, concatenated in category order.
    ///
    /// An empty category set issues a single request for generic questions.
    /// Spacing only applies within this call; use [`QuestionFetcher::fetch_paced`]
    /// to keep it across calls.
    pub async fn fetch(
        &self,
        categories: &BTreeSet<CategoryId>,
        difficulty: Difficulty,
        amount: u32,
        token: Option<&SessionToken>,
        observer: &mut dyn FetchObserver,
    ) -> Vec<Question> {
        let mut pacer = RequestPacer::new(self.settings.request_spacing);
        self.fetch_paced(categories, difficulty, amount, token, &mut pacer, observer)
            .await
    }

    /// Like [`QuestionFetcher::fetch`], spacing requests with a caller-owned pacer.
    pub async fn fetch_paced(
        &self,
        categories: &BTreeSet<CategoryId>,
        difficulty: Difficulty,
        amount: u32,
        token: Option<&SessionToken>,
        pacer: &mut RequestPacer,
        observer: &mut dyn FetchObserver,
    ) -> Vec<Question> {
        let targets: Vec<Option<CategoryId>> = if categories.is_empty() {
            vec![None]
        } else {
            categories.iter().copied().map(Some).collect()
        };
        let total = targets.len();
        let mut collected = Vec::new();

        for (idx, category) in targets.into_iter().enumerate() {
            observer.on_request(category, idx + 1, total);
            let questions = self
                .fetch_category(category, difficulty, amount, token, pacer, observer)
                .await;
            if questions.is_empty() {
                debug!(?category, "category yielded no questions");
            }
            observer.on_loaded(category, questions.len());
            collected.extend(questions);
        }

        collected
    }

    async fn fetch_category(
        &self,
        category: Option<CategoryId>,
        difficulty: Difficulty,
        amount: u32,
        token: Option<&SessionToken>,
        pacer: &mut RequestPacer,
        observer: &mut dyn FetchObserver,
    ) -> Vec<Question> {
        let amount = amount.max(1);
        let questions = self
            .request(category, difficulty, amount, token, pacer, observer)
            .await;
        if !questions.is_empty() {
            return questions;
        }

        let ZeroResultFallback::RetryWithoutDifficulty { reduced_amount } =
            self.settings.zero_result_fallback
        else {
            return questions;
        };

        if difficulty.is_filtered() {
            debug!(?category, %difficulty, "retrying without difficulty filter");
            let questions = self
                .request(category, Difficulty::Any, amount, token, pacer, observer)
                .await;
            if !questions.is_empty() {
                return questions;
            }
        }

        match reduced_amount {
            Some(reduced) if reduced > 0 && reduced < amount => {
                debug!(?category, reduced, "retrying with a smaller batch");
                self.request(category, Difficulty::Any, reduced, token, pacer, observer)
                    .await
            }
            _ => Vec::new(),
        }
    }

    async fn request(
        &self,
        category: Option<CategoryId>,
        difficulty: Difficulty,
        amount: u32,
        token: Option<&SessionToken>,
        pacer: &mut RequestPacer,
        observer: &mut dyn FetchObserver,
    ) -> Vec<Question> {
        pacer.ready(observer).await;
        let request = BatchRequest {
            category,
            difficulty,
            amount,
            token: token.cloned(),
        };
        match self.source.fetch_batch(&request).await {
            Ok(questions) => questions,
            Err(err) => {
                warn!(error = %err, ?category, "question request failed, treating as empty");
                Vec::new()
            }
        }
    }
}
