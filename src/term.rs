use crate::TermInt;
use crate::state::{GameState, HEIGHT, KEY_QUIT, WIDTH};
use std::{io::{Stdout, Write, stdout}, time::Duration};

use anyhow::{Context, Result};
use crossterm::{cursor, execute, queue, style, terminal};
use crossterm::terminal::{ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, poll, read};

/// Characters per grid cell: the marker plus up to two digits
pub const CELL_WIDTH: usize = 3;
const MARKER: char = 'O';

/// Draws the game state somewhere.
pub trait Renderer {
    fn render(&mut self, state: &GameState) -> Result<()>;
}

/// Non-blocking source of single keypresses.
pub trait InputSource {
    fn has_pending_key(&mut self) -> Result<bool>;

    /// Consumes exactly one key. Only meant to be called after
    /// `has_pending_key` returned true.
    fn read_key(&mut self) -> Result<char>;
}

pub struct TermManager<W: Write = Stdout> {
    out: W,
    pending: Option<char>,
    alt_screen: bool,
    raw: bool,
}

impl TermManager {
    pub fn new() -> Self {
        TermManager::with_writer(stdout())
    }
}

impl<W: Write> TermManager<W> {
    pub fn with_writer(out: W) -> Self {
        TermManager { out, pending: None, alt_screen: false, raw: false }
    }

    /// Each flag is set as soon as its step lands, so a failed setup
    /// leaves `restore` knowing exactly what to undo.
    pub fn setup(&mut self) -> Result<()> {
        execute!(self.out, EnterAlternateScreen).context("Error entering alt screen")?;
        self.alt_screen = true;

        terminal::enable_raw_mode().context("Error setting raw mode")?;
        self.raw = true;

        execute!(self.out, cursor::Hide, cursor::DisableBlinking, terminal::Clear(ClearType::All))
            .context("Error hiding cursor")?;
        Ok(())
    }

    /// Undoes whatever `setup` managed to apply, in reverse order.
    pub fn restore(&mut self) -> Result<()> {
        if self.raw {
            self.raw = false;
            terminal::disable_raw_mode().context("Error unsetting raw mode")?;
        }

        if self.alt_screen {
            self.alt_screen = false;
            execute!(self.out, cursor::Show, cursor::EnableBlinking, LeaveAlternateScreen)
                .context("Error leaving alt screen")?;
        }

        Ok(())
    }

    fn poll_key(&mut self) -> Result<Option<char>> {
        while poll(Duration::from_millis(0)).context("Error polling input")? {
            if let Event::Key(ev) = read().context("Error reading input")? {
                if let Some(ch) = key_char(&ev) {
                    return Ok(Some(ch));
                }
            }
        }

        Ok(None)
    }
}

impl<W: Write> Drop for TermManager<W> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            log::error!("{:#}", e);
        }
    }
}

impl<W: Write> InputSource for TermManager<W> {
    fn has_pending_key(&mut self) -> Result<bool> {
        if self.pending.is_none() {
            self.pending = self.poll_key()?;
        }

        Ok(self.pending.is_some())
    }

    fn read_key(&mut self) -> Result<char> {
        if let Some(ch) = self.pending.take() {
            return Ok(ch);
        }

        loop {
            if let Event::Key(ev) = read().context("Error reading input")? {
                if let Some(ch) = key_char(&ev) {
                    return Ok(ch);
                }
            }
        }
    }
}

impl<W: Write> Renderer for TermManager<W> {
    fn render(&mut self, state: &GameState) -> Result<()> {
        for (y, line) in frame_lines(state).iter().enumerate() {
            queue!(self.out, cursor::MoveTo(0, y as TermInt), style::Print(line))
                .context("Error drawing frame")?;
        }

        self.out.flush().context("Error flushing")?;
        Ok(())
    }
}

/// Lays out the grid rows followed by the status line.
pub fn frame_lines(state: &GameState) -> Vec<String> {
    let row_len = WIDTH as usize * CELL_WIDTH;
    let mut field = vec![vec![' '; row_len]; HEIGHT as usize];

    for ball in state.balls() {
        put_label(&mut field, ball.x, ball.y, ball.value);
    }

    // Player goes last so it hides whatever ball shares its cell
    let player = state.player();
    put_label(&mut field, player.x, HEIGHT - 1, player.value);

    let mut lines: Vec<String> = field.into_iter().map(|row| row.into_iter().collect()).collect();
    lines.push(format!("Player's Value: {}{}", MARKER, player.value));
    lines
}

fn put_label(field: &mut [Vec<char>], x: TermInt, y: TermInt, value: u8) {
    if x >= WIDTH || y >= HEIGHT {
        return;
    }

    let row = &mut field[y as usize];
    let start = x as usize * CELL_WIDTH;
    let label = format!("{}{:<2}", MARKER, value);

    for (offset, ch) in label.chars().enumerate() {
        if let Some(cell) = row.get_mut(start + offset) {
            *cell = ch;
        }
    }
}

fn key_char(ev: &KeyEvent) -> Option<char> {
    match ev {
        KeyEvent { code: KeyCode::Char('c'), modifiers: KeyModifiers::CONTROL } => Some(KEY_QUIT),
        KeyEvent { code: KeyCode::Char(ch), modifiers: KeyModifiers::NONE | KeyModifiers::SHIFT } => Some(*ch),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Ball;

    #[test]
    fn frame_has_fixed_size_and_status_line() {
        let lines = frame_lines(&GameState::new());

        assert_eq!(lines.len(), HEIGHT as usize + 1);
        for line in &lines[..HEIGHT as usize] {
            assert_eq!(line.chars().count(), WIDTH as usize * CELL_WIDTH);
        }
        assert_eq!(lines[HEIGHT as usize], "Player's Value: O3");
    }

    #[test]
    fn balls_and_player_are_drawn_in_their_cells() {
        let mut state = GameState::with_player(2, 7);
        state.push_ball(Ball::new(0, 0, 12));
        state.push_ball(Ball::new(39, 5, 4));

        let lines = frame_lines(&state);

        assert!(lines[0].starts_with("O12 "));
        assert!(lines[5].ends_with("O4 "));
        assert_eq!(&lines[HEIGHT as usize - 1][..9], "      O7 ");
    }

    #[test]
    fn player_covers_a_ball_on_its_cell() {
        let mut state = GameState::with_player(1, 3);
        state.push_ball(Ball::new(1, HEIGHT - 1, 14));

        let lines = frame_lines(&state);

        assert_eq!(&lines[HEIGHT as usize - 1][3..6], "O3 ");
    }

    #[test]
    fn out_of_range_balls_are_not_drawn() {
        let mut state = GameState::with_player(0, 3);
        state.push_ball(Ball::new(WIDTH, 0, 9));
        state.push_ball(Ball::new(0, HEIGHT, 9));

        let lines = frame_lines(&state);

        assert!(lines[..HEIGHT as usize - 1].iter().all(|l| l.trim().is_empty()));
        assert_eq!(lines[HEIGHT as usize - 1].trim(), "O3");
    }

    #[test]
    fn ctrl_c_maps_to_the_quit_key() {
        let ctrl_c = KeyEvent { code: KeyCode::Char('c'), modifiers: KeyModifiers::CONTROL };
        let plain = KeyEvent { code: KeyCode::Char('d'), modifiers: KeyModifiers::NONE };
        let arrow = KeyEvent { code: KeyCode::Left, modifiers: KeyModifiers::NONE };

        assert_eq!(key_char(&ctrl_c), Some(KEY_QUIT));
        assert_eq!(key_char(&plain), Some('d'));
        assert_eq!(key_char(&arrow), None);
    }

    #[test]
    fn other_modified_keys_are_dropped() {
        let ctrl_d = KeyEvent { code: KeyCode::Char('d'), modifiers: KeyModifiers::CONTROL };
        let alt_a = KeyEvent { code: KeyCode::Char('a'), modifiers: KeyModifiers::ALT };
        let shifted = KeyEvent { code: KeyCode::Char('D'), modifiers: KeyModifiers::SHIFT };

        assert_eq!(key_char(&ctrl_d), None);
        assert_eq!(key_char(&alt_a), None);
        assert_eq!(key_char(&shifted), Some('D'));
    }

    #[test]
    fn restore_without_setup_writes_nothing() {
        let mut term = TermManager::with_writer(Vec::new());

        term.restore().unwrap();

        assert!(term.out.is_empty());
    }

    #[test]
    fn restore_leaves_alt_screen_after_raw_mode_failed() {
        // Alt screen entered, raw mode never enabled
        let mut term = TermManager::with_writer(Vec::new());
        term.alt_screen = true;

        term.restore().unwrap();
        term.restore().unwrap();

        let out = String::from_utf8(term.out.clone()).unwrap();
        assert_eq!(out.matches("\x1B[?1049l").count(), 1);
        assert!(out.contains("\x1B[?25h"));
        assert!(!term.alt_screen && !term.raw);
    }
}
