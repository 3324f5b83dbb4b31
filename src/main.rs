mod game;
mod state;
mod term;

pub type TermInt = u16;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr, which shares the game screen: redirect it when
    // raising RUST_LOG, e.g. `RUST_LOG=debug number_balls 2>game.log`
    env_logger::init();

    let mut game = game::NumberBallGame::new();
    game.show_intro()?;

    // Terminal setup failures are fatal and exit non-zero from here
    let ending = game.play()?;
    println!("{}", ending.message());
    Ok(())
}
