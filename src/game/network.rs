//! Game Network
//!
//! Wires the simulation nodes into the cyclic dataflow graph and runs them as
//! tokio tasks. Every node follows the same shape: read one value from each
//! input signal per tick, compute, write one value to each output signal. The
//! hubs' synchronized back-pressure keeps the cycle consistent; the ticker
//! drives it and halts it.
//!
//! Per tick, in data order: the ticker emits a delta; the collision detector
//! reads delta, acceleration and both paddle positions, emits the new
//! velocity and game state, then reads the position its velocity produced;
//! the ball positioner integrates; the gravitation node turns the new
//! position into the next tick's acceleration. Paddle keys enter through
//! rate-sustained side channels so sporadic input never starves a
//! synchronized read.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::flow::clock::{FrameClock, StopHandle, Ticker};
use crate::flow::hub::Hub;
use crate::flow::rate::sustain;
use crate::flow::signal::{signal, Buffering, SignalReceiver, SignalSender};
use crate::flow::FlowError;
use crate::game::collision::{step, TickInput};
use crate::game::config::{GameConfig, GravityCell};
use crate::game::input::{Action, ControlEvent, PaddleKeys};
use crate::game::physics::{gravity_accel, integrate, serve_velocity};
use crate::game::state::{GameState, RenderFrame};

/// A running game: the node tasks plus the handles to stop and observe them.
///
/// Construct with [`GameNetwork::start`]; a reset is a fresh `start` with a
/// new seed, never a restart of a finished network.
pub struct GameNetwork {
    tasks: JoinSet<Result<(), FlowError>>,
    stop: StopHandle,
    gravity: Arc<GravityCell>,
}

impl GameNetwork {
    /// Build the signal graph, seed it and spawn every node.
    ///
    /// Returns the network handle and the per-tick render frames. `clock`
    /// supplies frame timestamps; `controls` carries key transitions from
    /// whatever front end exists.
    pub async fn start(
        config: GameConfig,
        seed: u64,
        clock: FrameClock,
        controls: SignalReceiver<ControlEvent>,
    ) -> (GameNetwork, SignalReceiver<RenderFrame>) {
        let stop = clock.stop_handle();
        let gravity = Arc::new(GravityCell::new(config.gravity, config.gravity_max));

        let mut rng = DeterministicRng::new(seed);
        let serve = serve_velocity(&mut rng, &config);
        let ball_start = config.center();
        info!(seed, ?serve, "starting game network");

        // Tick deltas fan out to every per-tick consumer.
        let (tick_tx, tick_rx) = signal(Buffering::Rendezvous);
        let tick_hub = Hub::new(tick_rx);
        let (_t1, tick_collision) = tick_hub.tap(true);
        let (_t2, tick_positioner) = tick_hub.tap(true);
        let (_t3, tick_left) = tick_hub.tap(true);
        let (_t4, tick_right) = tick_hub.tap(true);
        let (_t5, tick_render) = tick_hub.tap(true);

        let (vel_tx, vel_rx) = signal(Buffering::Rendezvous);
        let vel_hub = Hub::new(vel_rx);
        let (_v1, vel_positioner) = vel_hub.tap(true);
        let (_v2, vel_render) = vel_hub.tap(true);

        let (pos_tx, pos_rx) = signal(Buffering::Rendezvous);
        let pos_hub = Hub::new(pos_rx);
        let (_p1, pos_collision) = pos_hub.tap(true);
        let (_p2, pos_gravitation) = pos_hub.tap(true);
        let (_p3, pos_render) = pos_hub.tap(true);

        let (acc_tx, acc_rx) = signal(Buffering::Rendezvous);
        let acc_hub = Hub::new(acc_rx);
        let (_a1, acc_collision) = acc_hub.tap(true);
        let (_a2, acc_positioner) = acc_hub.tap(true);

        let (padl_tx, padl_rx) = signal(Buffering::Rendezvous);
        let padl_hub = Hub::new(padl_rx);
        let (_l1, padl_collision) = padl_hub.tap(true);
        let (_l2, padl_render) = padl_hub.tap(true);

        let (padr_tx, padr_rx) = signal(Buffering::Rendezvous);
        let padr_hub = Hub::new(padr_rx);
        let (_r1, padr_collision) = padr_hub.tap(true);
        let (_r2, padr_render) = padr_hub.tap(true);

        let (state_tx, state_rx) = signal(Buffering::Rendezvous);
        let state_hub = Hub::new(state_rx);
        let (_s1, state_halt) = state_hub.tap(true);
        let (_s2, state_render) = state_hub.tap(true);

        // Key signals are seeded so the sustains have a held value from the
        // very first tick; sliding buffering keeps the router from ever
        // blocking on a tick boundary.
        let (left_keys_tx, left_keys_rx) = signal(Buffering::Sliding(2));
        let (right_keys_tx, right_keys_rx) = signal(Buffering::Sliding(2));
        left_keys_tx.send(PaddleKeys::default()).await;
        right_keys_tx.send(PaddleKeys::default()).await;
        let left_held = sustain(left_keys_rx, tick_left);
        let right_held = sustain(right_keys_rx, tick_right);

        let (frames_tx, frames_rx) = signal(Buffering::Sliding(2));

        let mut tasks = JoinSet::new();
        tasks.spawn(Ticker::new(clock, state_halt, tick_tx).run(|s: &GameState| s.is_over()));
        tasks.spawn(collision_node(
            config.clone(),
            rng,
            ball_start,
            serve,
            tick_collision,
            acc_collision,
            padl_collision,
            padr_collision,
            pos_collision,
            vel_tx,
            state_tx,
        ));
        tasks.spawn(ball_positioner(
            ball_start,
            tick_positioner,
            vel_positioner,
            acc_positioner,
            pos_tx,
        ));
        tasks.spawn(gravitation(
            config.clone(),
            gravity.clone(),
            ball_start,
            pos_gravitation,
            acc_tx,
        ));
        tasks.spawn(paddle_positioner(config.clone(), left_held, padl_tx));
        tasks.spawn(paddle_positioner(config.clone(), right_held, padr_tx));
        tasks.spawn(render_node(
            tick_render,
            pos_render,
            vel_render,
            padl_render,
            padr_render,
            state_render,
            frames_tx,
        ));
        tasks.spawn(input_router(
            config,
            gravity.clone(),
            controls,
            left_keys_tx,
            right_keys_tx,
            stop.clone(),
        ));

        (
            GameNetwork {
                tasks,
                stop,
                gravity,
            },
            frames_rx,
        )
    }

    /// Ask the network to shut down. The frame source halts and every node
    /// drains out through the normal closure cascade.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Current gravity constant, as adjusted by control events.
    pub fn gravity(&self) -> f64 {
        self.gravity.get()
    }

    /// Join every node task. Returns the first protocol error any node hit,
    /// after all of them have exited.
    pub async fn wait(mut self) -> Result<(), FlowError> {
        let mut first_err = None;
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "node failed");
                    first_err.get_or_insert(e);
                }
                Err(e) => error!(error = %e, "node task panicked"),
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// The collision detector, the only node that owns the game's random state.
///
/// Holds the previous position, velocity and state internally; its last read
/// each tick is the position its own velocity output just produced.
#[allow(clippy::too_many_arguments)]
async fn collision_node(
    cfg: GameConfig,
    mut rng: DeterministicRng,
    start: Vec2,
    serve: Vec2,
    mut ticks: SignalReceiver<f64>,
    mut acc: SignalReceiver<Vec2>,
    mut left: SignalReceiver<f64>,
    mut right: SignalReceiver<f64>,
    mut pos: SignalReceiver<Vec2>,
    vel_out: SignalSender<Vec2>,
    state_out: SignalSender<GameState>,
) -> Result<(), FlowError> {
    let mut position = start;
    let mut velocity = serve;
    let mut state = GameState::initial();
    loop {
        let Some(dt) = ticks.recv().await else {
            break;
        };
        let Some(acceleration) = acc.recv().await else {
            return Err(FlowError::closed_mid_iteration("collision", "acceleration"));
        };
        let Some(left_paddle) = left.recv().await else {
            return Err(FlowError::closed_mid_iteration("collision", "left-paddle"));
        };
        let Some(right_paddle) = right.recv().await else {
            return Err(FlowError::closed_mid_iteration("collision", "right-paddle"));
        };

        let out = step(
            &cfg,
            &mut rng,
            &TickInput {
                dt,
                position,
                velocity,
                acceleration,
                left_paddle,
                right_paddle,
                state,
            },
        );
        velocity = out.velocity;
        state = out.state;
        vel_out.send(velocity).await;
        state_out.send(state).await;

        // The position the ball positioner computed from this tick's
        // velocity, which next tick's prediction starts from.
        let Some(p) = pos.recv().await else {
            return Err(FlowError::closed_mid_iteration("collision", "position"));
        };
        position = p;
    }
    debug!("collision node drained");
    Ok(())
}

/// Integrates the ball position from this tick's velocity and acceleration.
async fn ball_positioner(
    start: Vec2,
    mut ticks: SignalReceiver<f64>,
    mut vel: SignalReceiver<Vec2>,
    mut acc: SignalReceiver<Vec2>,
    pos_out: SignalSender<Vec2>,
) -> Result<(), FlowError> {
    let mut position = start;
    loop {
        let Some(dt) = ticks.recv().await else {
            break;
        };
        let Some(velocity) = vel.recv().await else {
            return Err(FlowError::closed_mid_iteration("ball-positioner", "velocity"));
        };
        let Some(acceleration) = acc.recv().await else {
            return Err(FlowError::closed_mid_iteration(
                "ball-positioner",
                "acceleration",
            ));
        };
        position = integrate(position, velocity, acceleration, dt);
        pos_out.send(position).await;
    }
    debug!("ball positioner drained");
    Ok(())
}

/// Turns each new ball position into the next tick's gravity acceleration.
///
/// Seeds the initial acceleration before its loop so the first tick's reads
/// are already satisfiable.
async fn gravitation(
    cfg: GameConfig,
    gravity: Arc<GravityCell>,
    start: Vec2,
    mut pos: SignalReceiver<Vec2>,
    acc_out: SignalSender<Vec2>,
) -> Result<(), FlowError> {
    let center = cfg.center();
    acc_out.send(gravity_accel(start, center, gravity.get())).await;
    while let Some(p) = pos.recv().await {
        acc_out.send(gravity_accel(p, center, gravity.get())).await;
    }
    debug!("gravitation node drained");
    Ok(())
}

/// Moves one paddle by the per-tick step of its sustained key state,
/// clamped to the board.
async fn paddle_positioner(
    cfg: GameConfig,
    mut keys: SignalReceiver<PaddleKeys>,
    pos_out: SignalSender<f64>,
) -> Result<(), FlowError> {
    let mut position = cfg.paddle_start();
    while let Some(k) = keys.recv().await {
        position = (position + k.direction() * cfg.paddle_step).clamp(0.0, cfg.max_paddle_travel());
        pos_out.send(position).await;
    }
    Ok(())
}

/// Assembles one [`RenderFrame`] per tick for the external consumer.
async fn render_node(
    mut ticks: SignalReceiver<f64>,
    mut pos: SignalReceiver<Vec2>,
    mut vel: SignalReceiver<Vec2>,
    mut padl: SignalReceiver<f64>,
    mut padr: SignalReceiver<f64>,
    mut state: SignalReceiver<GameState>,
    frames: SignalSender<RenderFrame>,
) -> Result<(), FlowError> {
    loop {
        let Some(dt) = ticks.recv().await else {
            break;
        };
        let Some(ball_position) = pos.recv().await else {
            return Err(FlowError::closed_mid_iteration("render", "position"));
        };
        let Some(ball_velocity) = vel.recv().await else {
            return Err(FlowError::closed_mid_iteration("render", "velocity"));
        };
        let Some(left_paddle) = padl.recv().await else {
            return Err(FlowError::closed_mid_iteration("render", "left-paddle"));
        };
        let Some(right_paddle) = padr.recv().await else {
            return Err(FlowError::closed_mid_iteration("render", "right-paddle"));
        };
        let Some(state) = state.recv().await else {
            return Err(FlowError::closed_mid_iteration("render", "state"));
        };
        let fps = if dt > 0.0 { 1000.0 / dt } else { 0.0 };
        frames
            .send(RenderFrame {
                ball_position,
                ball_velocity,
                left_paddle,
                right_paddle,
                state,
                fps,
            })
            .await;
    }
    debug!("render node drained");
    Ok(())
}

/// Routes control events to the key signals and the gravity cell.
///
/// Exits when the control stream closes or the network stops.
async fn input_router(
    cfg: GameConfig,
    gravity: Arc<GravityCell>,
    mut controls: SignalReceiver<ControlEvent>,
    left_tx: SignalSender<PaddleKeys>,
    right_tx: SignalSender<PaddleKeys>,
    stop: StopHandle,
) -> Result<(), FlowError> {
    let mut left = PaddleKeys::default();
    let mut right = PaddleKeys::default();
    loop {
        tokio::select! {
            ev = controls.recv() => {
                let Some(ev) = ev else { break };
                match ev.action {
                    Action::LeftUp => {
                        left.up = ev.pressed;
                        left_tx.send(left).await;
                    }
                    Action::LeftDown => {
                        left.down = ev.pressed;
                        left_tx.send(left).await;
                    }
                    Action::RightUp => {
                        right.up = ev.pressed;
                        right_tx.send(right).await;
                    }
                    Action::RightDown => {
                        right.down = ev.pressed;
                        right_tx.send(right).await;
                    }
                    Action::GravityUp if ev.pressed => gravity.adjust(cfg.gravity_step),
                    Action::GravityDown if ev.pressed => gravity.adjust(-cfg.gravity_step),
                    Action::GravityUp | Action::GravityDown => {}
                }
            }
            _ = stop.stopped() => break,
        }
    }
    debug!("input router drained");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Phase;
    use std::time::Duration;
    use tokio::time::timeout;

    const TEST_BUDGET: Duration = Duration::from_secs(30);

    /// Drive the network in lockstep: one timestamp in, one frame out.
    async fn run_lockstep(
        feed: &crate::flow::clock::FrameFeed,
        frames: &mut SignalReceiver<RenderFrame>,
        steps: usize,
    ) -> Vec<RenderFrame> {
        let mut out = Vec::new();
        feed.send(0.0).await;
        let mut ts = 0.0;
        for _ in 0..steps {
            if feed.is_stopped() {
                break;
            }
            ts += 16.0;
            feed.send(ts).await;
            match frames.recv().await {
                Some(f) => out.push(f),
                None => break,
            }
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_reaches_game_over_when_paddles_flee() {
        // Small paddles parked at the top edge cannot cover any first
        // crossing of a center serve, so the game must end.
        let cfg = GameConfig {
            paddle_height: 4.0,
            padding: 1.0,
            ..GameConfig::default()
        };
        let (feed, clock) = FrameClock::feed(Buffering::Rendezvous);
        let (controls_tx, controls_rx) = signal(Buffering::Sliding(8));
        let (network, mut frames) = GameNetwork::start(cfg, 42, clock, controls_rx).await;

        controls_tx.send(ControlEvent::press(Action::LeftUp)).await;
        controls_tx.send(ControlEvent::press(Action::RightUp)).await;

        let collected = timeout(TEST_BUDGET, run_lockstep(&feed, &mut frames, 500))
            .await
            .expect("network stalled");
        let last = collected.last().expect("at least one frame");
        assert_eq!(last.state.phase, Phase::GameOver);
        assert!((last.fps - 62.5).abs() < 1e-9);

        // Drain and join: every node exits without a protocol error.
        drop(feed);
        drop(controls_tx);
        while frames.recv().await.is_some() {}
        timeout(TEST_BUDGET, network.wait())
            .await
            .expect("join stalled")
            .expect("clean shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_key_moves_paddle_and_clamps_at_edge() {
        let cfg = GameConfig::default();
        let (feed, clock) = FrameClock::feed(Buffering::Rendezvous);
        let (controls_tx, controls_rx) = signal(Buffering::Sliding(8));
        let (network, mut frames) = GameNetwork::start(cfg, 7, clock, controls_rx).await;

        controls_tx.send(ControlEvent::press(Action::LeftUp)).await;

        // 40 ticks: enough to drive the paddle from 40 to 0, too few for the
        // serve to reach a paddle plane.
        let collected = timeout(TEST_BUDGET, run_lockstep(&feed, &mut frames, 40))
            .await
            .expect("network stalled");
        assert_eq!(collected.len(), 40);

        let mut prev = f64::MAX;
        for frame in &collected {
            assert!(frame.left_paddle <= prev, "paddle only moves up");
            assert!(frame.left_paddle >= 0.0, "paddle stays on the board");
            assert_eq!(frame.right_paddle, 40.0, "idle paddle stays put");
            assert_ne!(frame.state.phase, Phase::GameOver);
            prev = frame.left_paddle;
        }
        assert_eq!(collected.last().map(|f| f.left_paddle), Some(0.0));

        network.stop();
        drop(feed);
        drop(controls_tx);
        while frames.recv().await.is_some() {}
        timeout(TEST_BUDGET, network.wait())
            .await
            .expect("join stalled")
            .expect("clean shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn test_gravity_keys_adjust_shared_cell() {
        let cfg = GameConfig::default();
        let step = cfg.gravity_step;
        let (feed, clock) = FrameClock::feed(Buffering::Rendezvous);
        let (controls_tx, controls_rx) = signal(Buffering::Sliding(8));
        let (network, mut frames) = GameNetwork::start(cfg, 1, clock, controls_rx).await;
        assert_eq!(network.gravity(), 0.0);

        for _ in 0..3 {
            controls_tx.send(ControlEvent::press(Action::GravityUp)).await;
            controls_tx
                .send(ControlEvent::release(Action::GravityUp))
                .await;
        }
        // Paused-time sleep resolves once the router has gone idle.
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!((network.gravity() - 3.0 * step).abs() < 1e-12);

        controls_tx
            .send(ControlEvent::press(Action::GravityDown))
            .await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!((network.gravity() - 2.0 * step).abs() < 1e-12);

        network.stop();
        drop(feed);
        drop(controls_tx);
        while frames.recv().await.is_some() {}
        timeout(TEST_BUDGET, network.wait())
            .await
            .expect("join stalled")
            .expect("clean shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_seed_replays_identically() {
        let mut runs = Vec::new();
        for _ in 0..2 {
            let (feed, clock) = FrameClock::feed(Buffering::Rendezvous);
            let (controls_tx, controls_rx) = signal(Buffering::Sliding(8));
            let (network, mut frames) =
                GameNetwork::start(GameConfig::default(), 1234, clock, controls_rx).await;

            let collected = timeout(TEST_BUDGET, run_lockstep(&feed, &mut frames, 40))
                .await
                .expect("network stalled");

            network.stop();
            drop(feed);
            drop(controls_tx);
            while frames.recv().await.is_some() {}
            timeout(TEST_BUDGET, network.wait())
                .await
                .expect("join stalled")
                .expect("clean shutdown");
            runs.push(collected);
        }
        assert_eq!(runs[0], runs[1]);
    }
}
