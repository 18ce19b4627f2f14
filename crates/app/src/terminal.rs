//! Terminal setup/teardown and small drawing helpers for the text UI.
use std::fmt::Display;
use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

use crossterm::{
    cursor::{Hide, MoveTo, MoveToNextLine, Show},
    event::{self as term_event, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Print, PrintStyledContent, StyledContent},
    terminal::{
        self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
        enable_raw_mode,
    },
};

pub fn init() -> io::Result<Screen> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;
    Ok(Screen::default())
}

pub fn restore() -> io::Result<()> {
    execute!(io::stdout(), Show, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

pub struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = restore();
    }
}

/// Line-oriented writer over stdout. Raw mode needs explicit line moves.
pub struct Screen {
    out: Stdout,
}

impl Default for Screen {
    fn default() -> Self {
        Self { out: io::stdout() }
    }
}

impl Screen {
    pub fn clear(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))
    }

    pub fn line(&mut self, text: impl Display) -> io::Result<()> {
        queue!(self.out, Print(text), MoveToNextLine(1))
    }

    pub fn styled<D: Display>(&mut self, text: StyledContent<D>) -> io::Result<()> {
        queue!(self.out, PrintStyledContent(text), MoveToNextLine(1))
    }

    pub fn blank(&mut self) -> io::Result<()> {
        queue!(self.out, MoveToNextLine(1))
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Terminal height, 24 when unknown.
    pub fn rows() -> usize {
        terminal::size().map_or(24, |(_, rows)| usize::from(rows))
    }
}

/// Wait for a key press. `None` timeout waits forever; an elapsed timeout
/// yields `Ok(None)`. Ctrl-C is reported as `Esc`.
pub fn read_key(timeout: Option<Duration>) -> io::Result<Option<KeyCode>> {
    let deadline = timeout.map(|t| Instant::now() + t);
    loop {
        if let Some(deadline) = deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !term_event::poll(remaining)? {
                return Ok(None);
            }
        }

        if let TermEvent::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = term_event::read()?
        {
            if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
                return Ok(Some(KeyCode::Esc));
            }
            return Ok(Some(code));
        }
    }
}
