//! Pongflow demo driver.
//!
//! Runs a headless game on a synthetic lockstep clock with a naive
//! follow-the-ball controller on both paddles, and reports progress until the
//! ball gets past one of them.

use anyhow::Context;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use pongflow::game::network::GameNetwork;
use pongflow::game::state::RenderFrame;
use pongflow::{
    signal, Action, Buffering, ControlEvent, FrameClock, GameConfig, SignalSender, VERSION,
};

/// Synthetic frame period, a 62.5 Hz display.
const FRAME_MS: f64 = 16.0;

/// Hard cap so a controller good enough to rally forever still terminates.
const MAX_TICKS: u64 = 100_000;

/// Progress report interval, about ten seconds of simulated play.
const REPORT_TICKS: u64 = 625;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing config file {path}"))?
        }
        None => GameConfig::default(),
    };
    let seed = 12345u64;

    info!("Pongflow v{}", VERSION);
    info!(seed, board = ?(config.board_width, config.board_height), "starting demo game");

    let (feed, clock) = FrameClock::feed(Buffering::Rendezvous);
    let (controls_tx, controls_rx) = signal(Buffering::Sliding(8));
    let (network, mut frames) = GameNetwork::start(config.clone(), seed, clock, controls_rx).await;

    let mut ts = 0.0;
    feed.send(ts).await; // baseline frame
    let mut ticks = 0u64;
    let mut last_report = 0u64;
    let mut left_dir = 0i8;
    let mut right_dir = 0i8;
    let mut last_frame: Option<RenderFrame> = None;

    while ticks < MAX_TICKS && !feed.is_stopped() {
        ts += FRAME_MS;
        feed.send(ts).await;
        let Some(frame) = frames.recv().await else {
            break;
        };
        ticks += 1;

        steer(
            &controls_tx,
            &config,
            frame.ball_position.y,
            frame.left_paddle,
            &mut left_dir,
            Action::LeftUp,
            Action::LeftDown,
        )
        .await;
        steer(
            &controls_tx,
            &config,
            frame.ball_position.y,
            frame.right_paddle,
            &mut right_dir,
            Action::RightUp,
            Action::RightDown,
        )
        .await;

        if ticks - last_report >= REPORT_TICKS {
            info!(
                tick = ticks,
                score = frame.state.score,
                ball = %frame.ball_position,
                "rally in progress"
            );
            last_report = ticks;
        }
        last_frame = Some(frame);
    }

    if ticks >= MAX_TICKS {
        info!(ticks, "tick cap reached, stopping the network");
        network.stop();
    }
    drop(feed);
    drop(controls_tx);
    while frames.recv().await.is_some() {}
    network.wait().await?;

    let frame = last_frame.context("no frames produced")?;
    info!(
        ticks,
        score = frame.state.score,
        phase = ?frame.state.phase,
        "game finished"
    );
    Ok(())
}

/// Move one paddle toward the ball, emitting key transitions only when the
/// desired direction changes.
async fn steer(
    controls: &SignalSender<ControlEvent>,
    cfg: &GameConfig,
    ball_y: f64,
    paddle_y: f64,
    held: &mut i8,
    up: Action,
    down: Action,
) {
    let center = paddle_y + cfg.paddle_height / 2.0;
    let desired: i8 = if ball_y < center - cfg.paddle_step {
        -1
    } else if ball_y > center + cfg.paddle_step {
        1
    } else {
        0
    };
    if desired == *held {
        return;
    }
    match *held {
        -1 => controls.send(ControlEvent::release(up)).await,
        1 => controls.send(ControlEvent::release(down)).await,
        _ => {}
    }
    match desired {
        -1 => controls.send(ControlEvent::press(up)).await,
        1 => controls.send(ControlEvent::press(down)).await,
        _ => {}
    }
    *held = desired;
}
