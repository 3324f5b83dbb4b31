use crate::TermInt;
use Outcome::*;

use rand::Rng;

pub const WIDTH: TermInt = 40;
pub const HEIGHT: TermInt = 20;
pub const INITIAL_VALUE: u8 = 3;
pub const MAX_BALL_VALUE: u8 = 15;
pub const MAX_BALLS: usize = 100;
pub const SPAWN_PROBABILITY: f64 = 0.2;

pub const KEY_LEFT: char = 'a';
pub const KEY_RIGHT: char = 'd';
/// What a raw-mode terminal delivers for Ctrl+C
pub const KEY_QUIT: char = '\x03';

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Won,
    Lost,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ball {
    pub x: TermInt,
    pub y: TermInt,
    pub value: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Player {
    pub x: TermInt,
    pub value: u8,
}

pub struct GameState {
    player: Player,
    balls: Vec<Ball>,
}

impl Ball {
    pub fn new(x: TermInt, y: TermInt, value: u8) -> Self {
        Ball { x, y, value }
    }
}

impl GameState {
    pub fn new() -> Self {
        Self::with_player(WIDTH / 2, INITIAL_VALUE)
    }

    pub fn with_player(x: TermInt, value: u8) -> Self {
        let player = Player { x: x.min(WIDTH - 1), value };
        GameState { player, balls: Vec::with_capacity(MAX_BALLS) }
    }

    pub fn player(&self) -> Player {
        self.player
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    /// Inserts a ball as-is, subject to the same capacity limit as spawning.
    pub fn push_ball(&mut self, ball: Ball) -> bool {
        if self.balls.len() >= MAX_BALLS {
            return false;
        }

        self.balls.push(ball);
        true
    }

    /// Steps 1 to 4 of a tick: fall, expire, spawn and resolve the bottom row.
    pub fn step<R: Rng>(&mut self, rng: &mut R) -> Outcome {
        self.advance_balls();
        self.maybe_spawn(rng);
        log::trace!("{} balls active", self.balls.len());
        self.check_collision()
    }

    pub fn advance_balls(&mut self) {
        for ball in self.balls.iter_mut() {
            ball.y += 1;
        }

        self.balls.retain(|ball| ball.y < HEIGHT);
    }

    pub fn maybe_spawn<R: Rng>(&mut self, rng: &mut R) -> bool {
        rng.gen_bool(SPAWN_PROBABILITY) && self.spawn_ball(rng)
    }

    pub fn spawn_ball<R: Rng>(&mut self, rng: &mut R) -> bool {
        if self.balls.len() >= MAX_BALLS {
            return false;
        }

        let ball = Ball::new(rng.gen_range(0..WIDTH), 0, rng.gen_range(1..=MAX_BALL_VALUE));
        log::debug!("Spawned O{} at column {}", ball.value, ball.x);
        self.push_ball(ball)
    }

    /// Resolves the first ball sitting on the player's cell, if any.
    pub fn check_collision(&mut self) -> Outcome {
        let hit = self.balls.iter()
            .position(|ball| ball.y == HEIGHT - 1 && ball.x == self.player.x);

        let i = match hit {
            Some(i) => i,
            None => return Continue,
        };

        let ball = self.balls[i];
        if ball.value >= self.player.value {
            log::debug!("O{} crashed into O{}", self.player.value, ball.value);
            return Lost;
        }

        self.balls.remove(i);
        self.player.value += 1;
        log::debug!("Ate O{}, now O{}", ball.value, self.player.value);

        if self.player.value > MAX_BALL_VALUE { Won } else { Continue }
    }

    /// Applies one keypress. Returns true if the key asks to quit.
    pub fn apply_key(&mut self, key: char) -> bool {
        match key {
            KEY_LEFT if self.player.x > 0 => self.player.x -= 1,
            KEY_RIGHT if self.player.x < WIDTH - 1 => self.player.x += 1,
            KEY_QUIT => return true,
            _ => {}
        }

        false
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
