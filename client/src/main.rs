mod actor;
mod avatar;
mod camera;
mod cli;
mod game;
mod level;
mod player;
mod pose;
mod render;
mod transport;

use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;

use cli::Cli;
use game::Game;
use player::{IdleInput, InputSource, WanderInput};
use render::HeadlessRenderer;
use transport::Transport;

/// How often the loop reports what it is doing.
const STATUS_INTERVAL: Duration = Duration::from_secs(5);

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let input: Box<dyn InputSource> = if cli.wander {
        Box::new(WanderInput::default())
    } else {
        Box::new(IdleInput)
    };
    let mut game = Game::new(&cli.map, &cli.username, cli.avatar(), input)
        .with_context(|| format!("cannot start map '{}'", cli.map))?;
    let mut transport = Transport::connect(&cli.ip, cli.port, &cli.username)
        .with_context(|| format!("cannot reach {}:{}", cli.ip, cli.port))?;
    let mut renderer = HeadlessRenderer::new();

    let frame_time = Duration::from_secs_f64(1.0 / f64::from(cli.fps.max(1)));
    let mut last = Instant::now();
    let mut last_status = last;
    let mut frame = 0u64;

    while cli.frames.is_none_or(|limit| frame < limit) {
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;

        game.frame(dt, now, &mut transport, &mut renderer)?;
        frame += 1;

        if now.duration_since(last_status) >= STATUS_INTERVAL {
            last_status = now;
            let remotes: Vec<String> = game
                .remotes()
                .iter()
                .map(|p| format!("{}:{}", p.id(), p.username().unwrap_or("?")))
                .collect();
            log::info!(
                "frame {frame}: player {:?} {:?} at {:.1?}, remotes {remotes:?}",
                transport.local_id(),
                game.player().controller().state(),
                game.player_position(),
            );
        }

        if let Some(rest) = frame_time.checked_sub(now.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    log::info!(
        "ran {} frames on {}, {} cubes drawn",
        renderer.frames(),
        game.level().name,
        renderer.total_cubes()
    );
    Ok(())
}
