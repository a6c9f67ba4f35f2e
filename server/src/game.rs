//! Fixed-rate tick scheduler.
//!
//! Each iteration waits until the frame budget has passed since the previous
//! iteration began, then runs one world step followed by one broadcast. A
//! slow tick only delays the next one; there is no catch-up.

use crate::network::ServerMessage;
use crate::session::Session;
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Ticks between periodic debug statistics.
const STATS_INTERVAL: u64 = 300;

pub struct GameLoop {
    session: Session,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    tick_duration: Duration,
    busy_time: Duration,
    slow_ticks: u64,
}

impl GameLoop {
    pub fn new(
        session: Session,
        server_rx: mpsc::UnboundedReceiver<ServerMessage>,
        tick_duration: Duration,
    ) -> Self {
        Self {
            session,
            server_rx,
            tick_duration,
            busy_time: Duration::ZERO,
            slow_ticks: 0,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn slow_ticks(&self) -> u64 {
        self.slow_ticks
    }

    /// Advances the world once and broadcasts the result.
    pub fn tick(&mut self) {
        self.session.step();
        if let Err(e) = self.session.broadcast() {
            error!("Failed to encode tick {}: {}", self.session.world().tick(), e);
        }
    }

    /// Runs until every message sender is gone, then hands the session back.
    pub async fn run(mut self) -> Session {
        info!(
            "Game loop started ({} ms per tick)",
            self.tick_duration.as_millis()
        );
        let mut next_tick = Instant::now() + self.tick_duration;

        loop {
            tokio::select! {
                message = self.server_rx.recv() => match message {
                    Some(message) => self.session.handle(message),
                    None => {
                        info!("All connection sources closed, stopping game loop");
                        break;
                    }
                },

                _ = sleep_until(next_tick) => {
                    let started = Instant::now();
                    self.tick();
                    let elapsed = started.elapsed();
                    self.record(elapsed);
                    next_tick = started + self.tick_duration;
                }
            }
        }

        self.session
    }

    fn record(&mut self, elapsed: Duration) {
        self.busy_time += elapsed;
        if elapsed > self.tick_duration {
            self.slow_ticks += 1;
            warn!(
                "Tick {} took {:.2} ms, over the {} ms budget",
                self.session.world().tick(),
                elapsed.as_secs_f64() * 1000.0,
                self.tick_duration.as_millis()
            );
        }

        let tick = self.session.world().tick();
        if tick % STATS_INTERVAL == 0 {
            let world = self.session.world();
            debug!(
                "Tick {}: {} clients, {} tanks, {} projectiles, {} powerups, avg {:.3} ms/tick, {} slow",
                tick,
                self.session.clients().len(),
                world.tanks().count(),
                world.projectiles().count(),
                world.powerups().count(),
                self.busy_time.as_secs_f64() * 1000.0 / STATS_INTERVAL as f64,
                self.slow_ticks
            );
            self.busy_time = Duration::ZERO;
        }
    }
}
