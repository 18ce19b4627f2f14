//! Menu, loading and question screens driving the game engine.
use std::io;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use crossterm::style::Stylize;
use rand::rng;
use rand::seq::SliceRandom;
use services::{
    ActiveQuestion, AnswerOutcome, AppServices, EnginePhase, EnsureOutcome, FetchObserver,
    GameEngine, GameState, STARTING_LIVES, SessionConfig,
};
use tracing::{debug, info, warn};
use trivia_core::model::{Category, CategoryId, Preferences, decode_html};

use crate::terminal::{Screen, read_key};

const FEEDBACK_PAUSE: Duration = Duration::from_millis(1500);
const TIMER_TICK: Duration = Duration::from_secs(1);

enum MenuChoice {
    Play,
    Categories,
    Difficulty,
    Exit,
}

enum Answer {
    Picked(String),
    TimedOut,
    Quit,
}

pub struct TriviaApp {
    services: AppServices,
    preferences: Preferences,
    /// Provider category list, fetched on first use.
    categories: Option<Vec<Category>>,
    answer_timeout: Duration,
    screen: Screen,
}

impl TriviaApp {
    pub fn new(
        services: AppServices,
        preferences: Preferences,
        answer_timeout: Duration,
        screen: Screen,
    ) -> Self {
        Self {
            services,
            preferences,
            categories: None,
            answer_timeout,
            screen,
        }
    }

    pub async fn run(&mut self) -> io::Result<()> {
        loop {
            match self.menu()? {
                MenuChoice::Play => self.play().await?,
                MenuChoice::Categories => self.select_categories().await?,
                MenuChoice::Difficulty => {
                    let next = self.preferences.difficulty().cycle();
                    self.preferences.set_difficulty(next);
                    self.save_preferences().await;
                }
                MenuChoice::Exit => return Ok(()),
            }
        }
    }

    //
    // ─── MENU ──────────────────────────────────────────────────────────────────
    //

    fn menu(&mut self) -> io::Result<MenuChoice> {
        loop {
            self.draw_menu()?;
            match read_key(None)? {
                Some(KeyCode::Char('1') | KeyCode::Enter) => return Ok(MenuChoice::Play),
                Some(KeyCode::Char('2')) => return Ok(MenuChoice::Categories),
                Some(KeyCode::Char('3')) => return Ok(MenuChoice::Difficulty),
                Some(KeyCode::Char('q') | KeyCode::Esc) => return Ok(MenuChoice::Exit),
                _ => {}
            }
        }
    }

    fn draw_menu(&mut self) -> io::Result<()> {
        let selected = self.selected_labels();
        let screen = &mut self.screen;
        screen.clear()?;
        screen.styled("TERMINAL TRIVIA".bold())?;
        screen.blank()?;
        screen.line(format!("Difficulty: {}", self.preferences.difficulty()))?;
        screen.line(format!("Categories: {selected}"))?;
        screen.blank()?;
        screen.line("1  Start game")?;
        screen.line("2  Select categories")?;
        screen.line("3  Cycle difficulty")?;
        screen.line("q  Exit")?;
        screen.flush()
    }

    fn selected_labels(&self) -> String {
        let chosen = self.preferences.categories();
        if chosen.is_empty() {
            return "any".into();
        }
        let known = self.categories.as_deref().unwrap_or_default();
        chosen
            .iter()
            .map(|id| decode_html(&Category::label_for(known, *id)).into_owned())
            .collect::<Vec<_>>()
            .join(", ")
    }

    async fn select_categories(&mut self) -> io::Result<()> {
        let categories = self.load_categories().await?;
        if categories.is_empty() {
            self.screen.clear()?;
            self.screen.line("Category list unavailable. Press any key.")?;
            self.screen.flush()?;
            read_key(None)?;
            return Ok(());
        }

        let before = self.preferences.clone();
        let mut cursor = 0usize;
        loop {
            self.draw_categories(&categories, cursor)?;
            match read_key(None)? {
                Some(KeyCode::Up | KeyCode::Char('k')) => cursor = cursor.saturating_sub(1),
                Some(KeyCode::Down | KeyCode::Char('j')) => {
                    cursor = (cursor + 1).min(categories.len() - 1);
                }
                Some(KeyCode::Char(' ') | KeyCode::Enter) => {
                    if let Some(category) = categories.get(cursor) {
                        self.preferences.toggle_category(category.id);
                    }
                }
                Some(KeyCode::Esc | KeyCode::Char('q')) => break,
                _ => {}
            }
        }

        if self.preferences != before {
            self.save_preferences().await;
        }
        Ok(())
    }

    async fn load_categories(&mut self) -> io::Result<Vec<Category>> {
        if let Some(categories) = &self.categories {
            return Ok(categories.clone());
        }
        self.screen.clear()?;
        self.screen.line("Loading categories...")?;
        self.screen.flush()?;

        let loaded = self.services.categories().await;
        if !loaded.is_empty() {
            self.categories = Some(loaded.clone());
        }
        Ok(loaded)
    }

    fn draw_categories(&mut self, categories: &[Category], cursor: usize) -> io::Result<()> {
        let visible = Screen::rows().saturating_sub(5).max(1);
        let offset = cursor.saturating_sub(visible - 1);
        let screen = &mut self.screen;
        screen.clear()?;
        screen.styled("SELECT CATEGORIES".bold())?;
        screen.line("up/down move, space toggle, q back (none selected = any)")?;
        screen.blank()?;
        for (index, category) in categories.iter().enumerate().skip(offset).take(visible) {
            let mark = if self.preferences.is_selected(category.id) {
                "[x]"
            } else {
                "[ ]"
            };
            let row = format!("{mark} {}", decode_html(&category.name));
            if index == cursor {
                screen.styled(format!("> {row}").reverse())?;
            } else {
                screen.line(format!("  {row}"))?;
            }
        }
        screen.flush()
    }

    async fn save_preferences(&mut self) {
        match self
            .services
            .preferences()
            .save(self.preferences.to_draft())
            .await
        {
            Ok(saved) => self.preferences = saved,
            Err(err) => warn!(error = %err, "could not save preferences"),
        }
    }

    //
    // ─── GAME ──────────────────────────────────────────────────────────────────
    //

    async fn play(&mut self) -> io::Result<()> {
        if needs_category_names(&self.preferences, self.categories.as_deref()) {
            self.load_categories().await?;
        }
        self.screen.clear()?;
        self.screen.line("Starting a new session...")?;
        self.screen.flush()?;

        let mut engine = self.services.new_engine();
        engine
            .start(SessionConfig::from_preferences(&self.preferences))
            .await;

        loop {
            match self.load_questions(&mut engine).await? {
                EnsureOutcome::Finished => break,
                EnsureOutcome::Empty => {
                    if self.offer_retry()? {
                        continue;
                    }
                    return Ok(());
                }
                EnsureOutcome::Ready | EnsureOutcome::Fetched(_) => {}
            }

            let active = match engine.snapshot() {
                GameState::Finished { .. } => break,
                GameState::Loading { .. } => continue,
                GameState::Active(active) => active,
            };

            let outcome = match self.ask(&active)? {
                Answer::Picked(choice) => engine.submit_answer(Some(&choice)),
                Answer::TimedOut => engine.submit_answer(None),
                Answer::Quit => {
                    info!(score = engine.score(), "session abandoned");
                    return Ok(());
                }
            };
            self.show_feedback(&outcome, engine.lives())?;
        }

        self.game_over(engine.score())
    }

    async fn load_questions(&mut self, engine: &mut GameEngine) -> io::Result<EnsureOutcome> {
        if engine.phase() != EnginePhase::Loading {
            return Ok(engine.ensure_questions().await);
        }

        self.screen.clear()?;
        self.screen.styled("Loading questions".bold())?;
        self.screen.flush()?;
        let mut progress = LoadingProgress {
            screen: Screen::default(),
            labels: self.categories.clone().unwrap_or_default(),
        };
        Ok(engine.ensure_questions_with(&mut progress).await)
    }

    /// Returns whether the player wants another fetch.
    fn offer_retry(&mut self) -> io::Result<bool> {
        self.screen.blank()?;
        self.screen
            .styled("No questions available for this selection.".yellow())?;
        self.screen.line("r  Retry")?;
        self.screen.line("any other key  Back to menu")?;
        self.screen.flush()?;
        Ok(matches!(read_key(None)?, Some(KeyCode::Char('r'))))
    }

    fn ask(&mut self, active: &ActiveQuestion) -> io::Result<Answer> {
        let mut order: Vec<usize> = (0..active.choices.len()).collect();
        order.shuffle(&mut rng());

        let deadline = Instant::now() + self.answer_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Answer::TimedOut);
            }
            self.draw_question(active, &order, remaining)?;

            match read_key(Some(remaining.min(TIMER_TICK)))? {
                None => {}
                Some(KeyCode::Esc | KeyCode::Char('q')) => return Ok(Answer::Quit),
                Some(code) => {
                    if let Some(choice) = choice_for_key(code, &order, &active.choices) {
                        return Ok(Answer::Picked(choice.to_string()));
                    }
                }
            }
        }
    }

    fn draw_question(
        &mut self,
        active: &ActiveQuestion,
        order: &[usize],
        remaining: Duration,
    ) -> io::Result<()> {
        let screen = &mut self.screen;
        screen.clear()?;
        screen.line(format!(
            "Score {}   Lives {}   Question {}/{}",
            active.score,
            hearts(active.lives),
            active.position,
            active.total
        ))?;
        screen.blank()?;
        screen.styled(decode_html(&active.prompt).into_owned().bold())?;
        screen.blank()?;
        for (slot, index) in order.iter().enumerate() {
            if let Some(choice) = active.choices.get(*index) {
                screen.line(format!(" {}) {}", slot + 1, decode_html(choice)))?;
            }
        }
        screen.blank()?;
        screen.line(format!(
            "Time left: {}s   (1-{} to answer, q to quit)",
            whole_seconds(remaining),
            order.len()
        ))?;
        screen.flush()
    }

    fn show_feedback(&mut self, outcome: &AnswerOutcome, lives: u32) -> io::Result<()> {
        let screen = &mut self.screen;
        screen.blank()?;
        match outcome {
            AnswerOutcome::Correct => screen.styled("Correct!".green().bold())?,
            AnswerOutcome::Wrong { correct_answer } => screen.styled(
                format!("Wrong. The answer was {}.", decode_html(correct_answer)).red(),
            )?,
            AnswerOutcome::TimedOut { correct_answer } => screen.styled(
                format!("Time's up. The answer was {}.", decode_html(correct_answer)).yellow(),
            )?,
            AnswerOutcome::Ignored => return Ok(()),
        }
        if outcome.lost_life() {
            screen.line(format!("Lives left: {lives}"))?;
        }
        screen.flush()?;
        read_key(Some(FEEDBACK_PAUSE))?;
        Ok(())
    }

    fn game_over(&mut self, score: u32) -> io::Result<()> {
        let screen = &mut self.screen;
        screen.clear()?;
        screen.styled("GAME OVER".red().bold())?;
        screen.blank()?;
        screen.line(format!("Final score: {score}"))?;
        screen.blank()?;
        screen.line("Press any key to return to the menu.")?;
        screen.flush()?;
        read_key(None)?;
        Ok(())
    }
}

/// Prints fetch progress under the loading header.
struct LoadingProgress {
    screen: Screen,
    labels: Vec<Category>,
}

impl LoadingProgress {
    fn label(&self, category: Option<CategoryId>) -> String {
        category.map_or_else(
            || "any category".to_string(),
            |id| decode_html(&Category::label_for(&self.labels, id)).into_owned(),
        )
    }

    fn print(&mut self, text: String) {
        if let Err(err) = self.screen.line(text).and_then(|()| self.screen.flush()) {
            debug!(error = %err, "could not draw fetch progress");
        }
    }
}

impl FetchObserver for LoadingProgress {
    fn on_request(&mut self, category: Option<CategoryId>, index: usize, total: usize) {
        let line = format!("[{index}/{total}] {}...", self.label(category));
        self.print(line);
    }

    fn on_loaded(&mut self, _category: Option<CategoryId>, loaded: usize) {
        self.print(format!("      {loaded} questions"));
    }

    fn on_wait(&mut self, delay: Duration) {
        self.print(format!(
            "      waiting {}s for the provider",
            whole_seconds(delay)
        ));
    }
}

/// The loading screen names selected categories; fetch the list if it is missing.
fn needs_category_names(preferences: &Preferences, known: Option<&[Category]>) -> bool {
    !preferences.categories().is_empty() && known.is_none()
}

/// Maps a number key to the raw choice shown in that slot.
fn choice_for_key<'a>(code: KeyCode, order: &[usize], choices: &'a [String]) -> Option<&'a str> {
    let KeyCode::Char(key) = code else {
        return None;
    };
    let slot = key.to_digit(10)?.checked_sub(1)?;
    let index = *order.get(usize::try_from(slot).ok()?)?;
    choices.get(index).map(String::as_str)
}

fn hearts(lives: u32) -> String {
    (0..STARTING_LIVES)
        .map(|n| if n < lives { '♥' } else { '·' })
        .collect()
}

/// Seconds rounded up, so a countdown never shows 0 while time remains.
fn whole_seconds(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices() -> Vec<String> {
        ["Venus", "Jupiter", "Mars"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn number_keys_follow_display_order() {
        let choices = choices();
        let order = [2, 0, 1];
        assert_eq!(
            choice_for_key(KeyCode::Char('1'), &order, &choices),
            Some("Mars")
        );
        assert_eq!(
            choice_for_key(KeyCode::Char('3'), &order, &choices),
            Some("Jupiter")
        );
    }

    #[test]
    fn out_of_range_keys_pick_nothing() {
        let choices = choices();
        let order = [0, 1, 2];
        assert_eq!(choice_for_key(KeyCode::Char('0'), &order, &choices), None);
        assert_eq!(choice_for_key(KeyCode::Char('4'), &order, &choices), None);
        assert_eq!(choice_for_key(KeyCode::Char('x'), &order, &choices), None);
        assert_eq!(choice_for_key(KeyCode::Enter, &order, &choices), None);
    }

    #[test]
    fn saved_categories_without_names_trigger_a_lookup() {
        let saved = Preferences::from_persisted(vec![CategoryId::new(9)], Default::default());
        let names = [Category::new(CategoryId::new(9), "General Knowledge")];

        assert!(needs_category_names(&saved, None));
        assert!(!needs_category_names(&saved, Some(&names[..])));
        assert!(!needs_category_names(&Preferences::default(), None));
    }

    #[test]
    fn loading_progress_uses_category_names() {
        let progress = LoadingProgress {
            screen: Screen::default(),
            labels: vec![Category::new(CategoryId::new(9), "General Knowledge")],
        };
        assert_eq!(progress.label(Some(CategoryId::new(9))), "General Knowledge");
        assert_eq!(progress.label(Some(CategoryId::new(31))), "Category 31");
        assert_eq!(progress.label(None), "any category");
    }

    #[test]
    fn hearts_show_lost_lives() {
        assert_eq!(hearts(STARTING_LIVES), "♥♥♥♥♥");
        assert_eq!(hearts(2), "♥♥···");
        assert_eq!(hearts(0), "·····");
    }

    #[test]
    fn countdown_rounds_up() {
        assert_eq!(whole_seconds(Duration::from_millis(6_100)), 7);
        assert_eq!(whole_seconds(Duration::from_secs(3)), 3);
        assert_eq!(whole_seconds(Duration::ZERO), 0);
    }
}
