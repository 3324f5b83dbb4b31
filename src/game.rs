use std::{io::stdin, thread::sleep, time::{Duration, SystemTime, UNIX_EPOCH}};

use crate::state::{GameState, Outcome};
use crate::term::{InputSource, Renderer, TermManager};

use anyhow::{Context, Result};
use rand::{Rng, SeedableRng, rngs::StdRng};

const TICK_INTERVAL_MS: u64 = 100;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Ending {
    Won,
    Lost,
    Quit,
}

impl Ending {
    pub fn message(&self) -> &'static str {
        match self {
            Ending::Won => "Congratulations! You win!",
            Ending::Lost => "Game Over! You collided with a bigger number.",
            Ending::Quit => "Quit.",
        }
    }
}

pub struct NumberBallGame {
    term: TermManager,
    rng: StdRng,
}

impl NumberBallGame {
    pub fn new() -> Self {
        let seed = SystemTime::now().duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        log::debug!("RNG seed {}", seed);

        NumberBallGame { term: TermManager::new(), rng: StdRng::seed_from_u64(seed) }
    }

    pub fn show_intro(&self) -> Result<()> {
        println!("Welcome to the Number Ball Game!");
        println!("Use 'a' to move left, 'd' to move right. Eat smaller numbers to grow!");
        println!("Press any key to start...");

        let mut line = String::new();
        stdin().read_line(&mut line).context("Error reading from stdin")?;
        Ok(())
    }

    pub fn play(&mut self) -> Result<Ending> {
        if let Err(e) = self.term.setup() {
            // Put back whatever did get applied so the error lands on the normal screen
            self.term.restore()?;
            return Err(e);
        }
        log::info!("Game started");

        let interval = Duration::from_millis(TICK_INTERVAL_MS);
        let res = run(GameState::new(), &mut self.term, &mut self.rng, interval);

        // Restore before reporting so the message lands on the normal screen
        self.term.restore()?;
        let ending = res?;
        log::info!("Game ended: {:?}", ending);
        Ok(ending)
    }
}

/// Runs ticks until the game is won, lost or quit.
pub fn run<T, R>(mut state: GameState, term: &mut T, rng: &mut R, interval: Duration) -> Result<Ending>
where
    T: InputSource + Renderer,
    R: Rng,
{
    term.render(&state)?;

    loop {
        sleep(interval);

        match state.step(rng) {
            Outcome::Won => {
                term.render(&state)?;
                return Ok(Ending::Won);
            },
            Outcome::Lost => {
                term.render(&state)?;
                return Ok(Ending::Lost);
            },
            Outcome::Continue => {},
        }

        if term.has_pending_key()? && state.apply_key(term.read_key()?) {
            return Ok(Ending::Quit);
        }

        term.render(&state)?;
    }
}
