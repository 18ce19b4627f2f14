use std::fmt;
use std::sync::Arc;

use rand::rng;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use trivia_core::model::{Question, SessionToken};

use super::state::{
    ActiveQuestion, AnswerOutcome, EnginePhase, EnsureOutcome, GameState, STARTING_LIVES,
    SessionConfig,
};
use crate::source::{
    FetchObserver, FetchSettings, NoopObserver, QuestionFetcher, QuestionSource, RequestPacer,
};

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Owns all mutable state of one trivia session.
///
/// The driving loop awaits [`GameEngine::ensure_questions`], renders
/// [`GameEngine::snapshot`], and feeds the player's choice (or `None` on
/// timeout) into [`GameEngine::submit_answer`] until the snapshot is
/// `Finished`.
pub struct GameEngine {
    source: Arc<dyn QuestionSource>,
    fetch: FetchSettings,
    /// Outlives single fetches and sessions; provider spacing is per client.
    pacer: RequestPacer,
    config: SessionConfig,
    token: Option<SessionToken>,
    questions: Vec<Question>,
    current: usize,
    score: u32,
    lives: u32,
    started: bool,
}

impl GameEngine {
    #[must_use]
    pub fn new(source: Arc<dyn QuestionSource>, fetch: FetchSettings) -> Self {
        Self {
            source,
            pacer: RequestPacer::new(fetch.request_spacing),
            fetch,
            config: SessionConfig::default(),
            token: None,
            questions: Vec::new(),
            current: 0,
            score: 0,
            lives: STARTING_LIVES,
            started: false,
        }
    }

    /// Reset all session state and obtain a fresh session token.
    ///
    /// A token request that fails is logged and the session continues
    /// without one; the provider then may repeat questions.
    pub async fn start(&mut self, config: SessionConfig) {
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.current = 0;
        self.questions.clear();
        self.config = config;
        self.started = true;
        self.token = match self.source.request_token().await {
            Ok(token) => Some(token),
            Err(err) => {
                warn!(error = %err, "session token unavailable, continuing without one");
                None
            }
        };
        info!(
            categories = self.config.categories.len(),
            difficulty = %self.config.difficulty,
            has_token = self.token.is_some(),
            "session started"
        );
    }

    /// Make sure a question is available, fetching a new buffer when the
    /// current one is empty or used up.
    pub async fn ensure_questions(&mut self) -> EnsureOutcome {
        self.ensure_questions_with(&mut NoopObserver).await
    }

    /// Like [`GameEngine::ensure_questions`], reporting fetch progress to `observer`.
    pub async fn ensure_questions_with(
        &mut self,
        observer: &mut dyn FetchObserver,
    ) -> EnsureOutcome {
        if self.is_finished() {
            return EnsureOutcome::Finished;
        }
        if self.current < self.questions.len() {
            return EnsureOutcome::Ready;
        }

        self.started = true;
        let mut fetched = QuestionFetcher::new(self.source.as_ref(), &self.fetch)
            .fetch_paced(
                &self.config.categories,
                self.config.difficulty,
                self.fetch.amount,
                self.token.as_ref(),
                &mut self.pacer,
                observer,
            )
            .await;
        fetched.shuffle(&mut rng());

        self.questions = fetched;
        self.current = 0;

        if self.questions.is_empty() {
            warn!("no questions available");
            EnsureOutcome::Empty
        } else {
            debug!(loaded = self.questions.len(), "question buffer replaced");
            EnsureOutcome::Fetched(self.questions.len())
        }
    }

    /// Pure read of the current state.
    #[must_use]
    pub fn snapshot(&self) -> GameState {
        if self.is_finished() {
            return GameState::Finished {
                score: self.score,
                lives: self.lives,
            };
        }
        let Some(question) = self.questions.get(self.current) else {
            return GameState::Loading {
                score: self.score,
                lives: self.lives,
            };
        };

        GameState::Active(ActiveQuestion {
            prompt: question.prompt().to_string(),
            choices: question.choices(),
            score: self.score,
            position: self.current + 1,
            total: self.questions.len(),
            lives: self.lives,
            correct_answer: question.correct_answer().to_string(),
        })
    }

    /// Score the current question and advance.
    ///
    /// `None` means the player ran out of time. Calls made after the session
    /// finished, or while no question is available, are ignored.
    pub fn submit_answer(&mut self, choice: Option<&str>) -> AnswerOutcome {
        if self.is_finished() {
            return AnswerOutcome::Ignored;
        }
        let Some(question) = self.questions.get(self.current) else {
            return AnswerOutcome::Ignored;
        };

        let outcome = match choice {
            None => AnswerOutcome::TimedOut {
                correct_answer: question.correct_answer().to_string(),
            },
            Some(text) if question.is_correct(text) => AnswerOutcome::Correct,
            Some(_) => AnswerOutcome::Wrong {
                correct_answer: question.correct_answer().to_string(),
            },
        };

        if outcome.lost_life() {
            self.lives = self.lives.saturating_sub(1);
        } else {
            self.score = self.score.saturating_add(1);
        }
        self.current += 1;

        debug!(?outcome, score = self.score, lives = self.lives, "answer scored");
        if self.is_finished() {
            info!(score = self.score, "session finished");
        }
        outcome
    }

    #[must_use]
    pub fn phase(&self) -> EnginePhase {
        if self.is_finished() {
            EnginePhase::Finished
        } else if self.current < self.questions.len() {
            EnginePhase::Active
        } else if self.started {
            EnginePhase::Loading
        } else {
            EnginePhase::Empty
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.lives == 0
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn lives(&self) -> u32 {
        self.lives
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn session_config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn session_token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

}

impl fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameEngine")
            .field("config", &self.config)
            .field("token", &self.token)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("score", &self.score)
            .field("lives", &self.lives)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    use trivia_core::model::{CategoryId, Difficulty};

    use crate::test_harness::{ScriptedSource, question};

    fn settings() -> FetchSettings {
        FetchSettings::default().with_request_spacing(Duration::ZERO)
    }

    fn engine_with(source: ScriptedSource) -> (GameEngine, Arc<ScriptedSource>) {
        let source = Arc::new(source);
        let engine = GameEngine::new(source.clone(), settings());
        (engine, source)
    }

    fn generic(count: usize) -> ScriptedSource {
        ScriptedSource::new().with_generic((0..count).map(|i| question(&format!("Q{i}"))))
    }

    async fn active_engine(count: usize) -> GameEngine {
        let (mut engine, _) = engine_with(generic(count));
        engine.start(SessionConfig::default()).await;
        assert_eq!(engine.ensure_questions().await, EnsureOutcome::Fetched(count));
        engine
    }

    fn current_active(engine: &GameEngine) -> ActiveQuestion {
        match engine.snapshot() {
            GameState::Active(active) => active,
            other => panic!("expected active state, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn new_engine_is_empty_and_snapshots_as_loading() {
        let (engine, _) = engine_with(generic(3));
        assert_eq!(engine.phase(), EnginePhase::Empty);
        assert_eq!(
            engine.snapshot(),
            GameState::Loading {
                score: 0,
                lives: STARTING_LIVES
            }
        );
    }

    #[tokio::test]
    async fn start_requests_token_and_enters_loading() {
        let (mut engine, source) = engine_with(generic(3));
        engine.start(SessionConfig::default()).await;

        assert_eq!(source.tokens_issued(), 1);
        assert_eq!(engine.session_token().map(SessionToken::as_str), Some("token-1"));
        assert_eq!(engine.phase(), EnginePhase::Loading);
        assert!(source.requests().is_empty());
    }

    #[tokio::test]
    async fn start_without_token_still_plays() {
        let (mut engine, source) = engine_with(generic(2).with_failing_token());
        engine.start(SessionConfig::default()).await;

        assert!(engine.session_token().is_none());
        assert_eq!(engine.ensure_questions().await, EnsureOutcome::Fetched(2));
        assert_eq!(source.requests()[0].token, None);
    }

    #[tokio::test]
    async fn fetched_buffer_starts_at_zero_and_is_active() {
        let engine = active_engine(4).await;
        assert_eq!(engine.current_index(), 0);
        assert_eq!(engine.phase(), EnginePhase::Active);
        let active = current_active(&engine);
        assert_eq!(active.position, 1);
        assert_eq!(active.total, 4);
    }

    #[tokio::test]
    async fn ensure_questions_is_idempotent_while_questions_remain() {
        let (mut engine, source) = engine_with(generic(3));
        engine.start(SessionConfig::default()).await;
        engine.ensure_questions().await;
        assert_eq!(engine.ensure_questions().await, EnsureOutcome::Ready);
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test]
    async fn fetch_uses_session_token_and_difficulty() {
        let (mut engine, source) = engine_with(
            ScriptedSource::new().with_category(9, (0..3).map(|i| question(&format!("Q{i}")))),
        );
        engine
            .start(SessionConfig::new([CategoryId::new(9)], Difficulty::Easy))
            .await;
        engine.ensure_questions().await;

        let requests = source.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].category, Some(CategoryId::new(9)));
        assert_eq!(requests[0].difficulty, Difficulty::Easy);
        assert_eq!(requests[0].token.as_ref().map(SessionToken::as_str), Some("token-1"));
    }

    #[tokio::test]
    async fn empty_fetch_stays_loading() {
        let (mut engine, _) = engine_with(ScriptedSource::new());
        engine.start(SessionConfig::default()).await;

        assert_eq!(engine.ensure_questions().await, EnsureOutcome::Empty);
        assert_eq!(engine.phase(), EnginePhase::Loading);
        assert!(matches!(engine.snapshot(), GameState::Loading { .. }));
    }

    #[tokio::test]
    async fn choices_end_with_the_correct_answer() {
        let engine = active_engine(1).await;
        let active = current_active(&engine);
        assert_eq!(active.choices.len(), 4);
        assert_eq!(active.choices.last(), Some(&active.correct_answer));
        assert!(active.choices.contains(&active.correct_answer));
    }

    #[tokio::test]
    async fn correct_answer_matches_any_casing_and_padding() {
        let mut engine = active_engine(3).await;
        let active = current_active(&engine);
        let shouted = format!("  {}\n", active.correct_answer.to_uppercase());

        assert_eq!(engine.submit_answer(Some(&shouted)), AnswerOutcome::Correct);
        assert_eq!(engine.score(), 1);
        assert_eq!(engine.lives(), STARTING_LIVES);
        assert_eq!(engine.current_index(), 1);
    }

    #[tokio::test]
    async fn wrong_answer_costs_a_life() {
        let mut engine = active_engine(3).await;
        let active = current_active(&engine);

        let outcome = engine.submit_answer(Some("Wrong A"));
        assert_eq!(
            outcome,
            AnswerOutcome::Wrong {
                correct_answer: active.correct_answer
            }
        );
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.lives(), STARTING_LIVES - 1);
        assert_eq!(engine.current_index(), 1);
    }

    #[tokio::test]
    async fn timeout_costs_a_life_and_never_scores() {
        let mut engine = active_engine(3).await;
        let outcome = engine.submit_answer(None);
        assert!(matches!(outcome, AnswerOutcome::TimedOut { .. }));
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.lives(), STARTING_LIVES - 1);
    }

    #[tokio::test]
    async fn five_wrong_answers_finish_the_session() {
        let mut engine = active_engine(10).await;
        for _ in 0..5 {
            engine.submit_answer(Some("definitely not it"));
        }
        assert_eq!(engine.snapshot(), GameState::Finished { score: 0, lives: 0 });
        assert_eq!(engine.phase(), EnginePhase::Finished);
    }

    #[tokio::test]
    async fn finished_session_ignores_everything() {
        let mut engine = active_engine(10).await;
        let active = current_active(&engine);
        engine.submit_answer(Some(&active.correct_answer));
        for _ in 0..5 {
            engine.submit_answer(None);
        }
        let finished = engine.snapshot();
        assert_eq!(finished, GameState::Finished { score: 1, lives: 0 });
        let index = engine.current_index();

        assert_eq!(engine.submit_answer(None), AnswerOutcome::Ignored);
        assert_eq!(engine.submit_answer(Some("anything")), AnswerOutcome::Ignored);
        assert_eq!(engine.ensure_questions().await, EnsureOutcome::Finished);
        assert_eq!(engine.snapshot(), finished);
        assert_eq!(engine.current_index(), index);
    }

    #[tokio::test]
    async fn exhausted_buffer_snapshots_loading_until_refetch() {
        let (mut engine, source) = engine_with(generic(1));
        engine.start(SessionConfig::default()).await;
        engine.ensure_questions().await;

        let active = current_active(&engine);
        assert_eq!(engine.submit_answer(Some(&active.correct_answer)), AnswerOutcome::Correct);
        assert_eq!(engine.score(), 1);
        assert_eq!(engine.current_index(), 1);
        assert_eq!(
            engine.snapshot(),
            GameState::Loading {
                score: 1,
                lives: STARTING_LIVES
            }
        );

        assert_eq!(engine.ensure_questions().await, EnsureOutcome::Fetched(1));
        assert_eq!(engine.current_index(), 0);
        assert_eq!(source.requests().len(), 2);
        assert_eq!(current_active(&engine).score, 1);
    }

    #[tokio::test]
    async fn submit_while_loading_is_ignored() {
        let (mut engine, _) = engine_with(ScriptedSource::new());
        engine.start(SessionConfig::default()).await;
        engine.ensure_questions().await;

        assert_eq!(engine.submit_answer(None), AnswerOutcome::Ignored);
        assert_eq!(engine.lives(), STARTING_LIVES);
        assert_eq!(engine.current_index(), 0);
    }

    #[tokio::test]
    async fn empty_category_contributes_nothing() {
        let (mut engine, _) = engine_with(
            ScriptedSource::new().with_category(9, (0..10).map(|i| question(&format!("Q{i}")))),
        );
        engine
            .start(SessionConfig::new(
                [CategoryId::new(9), CategoryId::new(9999)],
                Difficulty::Any,
            ))
            .await;

        assert_eq!(engine.ensure_questions().await, EnsureOutcome::Fetched(10));
        assert_eq!(engine.buffer_len(), 10);

        let mut prompts = HashSet::new();
        while let GameState::Active(active) = engine.snapshot() {
            prompts.insert(active.prompt.clone());
            engine.submit_answer(Some(&active.correct_answer));
        }
        assert_eq!(prompts.len(), 10);
        assert_eq!(engine.score(), 10);
    }

    #[tokio::test]
    async fn restart_resets_state_and_token() {
        let (mut engine, source) = engine_with(generic(5));
        engine.start(SessionConfig::default()).await;
        engine.ensure_questions().await;
        engine.submit_answer(None);
        engine.submit_answer(None);

        engine.start(SessionConfig::default()).await;
        assert_eq!(engine.lives(), STARTING_LIVES);
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.buffer_len(), 0);
        assert_eq!(engine.current_index(), 0);
        assert_eq!(source.tokens_issued(), 2);
        assert_eq!(engine.session_token().map(SessionToken::as_str), Some("token-2"));
    }

    #[tokio::test]
    async fn lives_never_increase_or_underflow() {
        let mut engine = active_engine(10).await;
        let mut previous = engine.lives();
        let inputs = [None, Some("nope"), None, Some("nope"), None, None, Some("nope")];
        for input in inputs {
            engine.submit_answer(input);
            assert!(engine.lives() <= previous);
            previous = engine.lives();
        }
        assert_eq!(engine.lives(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn refetch_after_empty_fetch_respects_request_spacing() {
        let source = Arc::new(ScriptedSource::new());
        let mut engine = GameEngine::new(source.clone(), FetchSettings::default());
        engine.start(SessionConfig::default()).await;

        let started = tokio::time::Instant::now();
        assert_eq!(engine.ensure_questions().await, EnsureOutcome::Empty);
        assert_eq!(engine.ensure_questions().await, EnsureOutcome::Empty);

        assert_eq!(source.requests().len(), 2);
        assert!(started.elapsed() >= crate::source::DEFAULT_REQUEST_SPACING);
    }
}
