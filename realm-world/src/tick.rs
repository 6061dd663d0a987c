//! Fixed-period scheduler executing a deterministic, ordered list of
//! periodic effects (`spec.md` §4.7). Direct generalization of the
//! teacher's `World::register_system` / `process_systems` / `run_once` /
//! `run` loop (`lib/neutronium/src/world.rs`): same fixed-period
//! `thread::sleep`-based scheduling and "process in registration order,
//! log and continue on failure" policy, but over a fixed hand-written
//! `Vec<Box<dyn Effect>>` instead of a generic archetype-query system
//! (`spec.md` §9 Non-goal on further system generality).

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use slog::Logger;

use realm_persistence::Store;

use crate::map_manager::MapManager;
use crate::outbox::Outbox;
use crate::registry::SessionRegistry;

/// One registered piece of periodic simulation work.
pub trait Effect: Send {
    /// Runs to completion under the world lock. Reads and mutates world
    /// state, enqueuing broadcasts on `outbox`.
    fn apply(
        &mut self,
        world: &mut MapManager,
        store: &Store,
        outbox: &mut Outbox,
        now: u64,
    ) -> anyhow::Result<()>;

    /// Effect's minimum period, in seconds.
    fn interval_s(&self) -> u64;

    /// For diagnostics.
    fn name(&self) -> &'static str;
}

struct Scheduled {
    effect: Box<dyn Effect>,
    last_run: u64,
}

pub struct TickEngine {
    tick_period: Duration,
    world: Arc<Mutex<MapManager>>,
    store: Store,
    registry: Arc<SessionRegistry>,
    effects: Vec<Scheduled>,
    log: Logger,
}

impl TickEngine {
    pub fn new(
        tick_ms: u64,
        world: Arc<Mutex<MapManager>>,
        store: Store,
        registry: Arc<SessionRegistry>,
        log: Logger,
    ) -> TickEngine {
        TickEngine {
            tick_period: Duration::from_millis(tick_ms),
            world,
            store,
            registry,
            effects: Vec::new(),
            log,
        }
    }

    /// Registers `effect`. Order matters: effects run in registration
    /// order every tick they're due (`spec.md` §4.7 "Registered
    /// effects (order matters)").
    pub fn register(&mut self, effect: Box<dyn Effect>) {
        self.effects.push(Scheduled { effect, last_run: 0 });
    }

    /// Runs every due effect once, under the world lock for the
    /// duration of each effect's `apply`. An effect's failure is caught,
    /// logged with context, and the engine continues with the next
    /// effect on the same tick (`spec.md` §4.7 "Failure semantics").
    pub fn run_once(&mut self, now: u64) {
        let mut world = self.world.lock().expect("world lock poisoned");
        let mut outbox = Outbox::new(self.registry.clone());

        for scheduled in &mut self.effects {
            if now < scheduled.last_run + scheduled.effect.interval_s() {
                continue;
            }

            match scheduled
                .effect
                .apply(&mut world, &self.store, &mut outbox, now)
            {
                Ok(()) => {}
                Err(err) => {
                    slog::error!(
                        self.log,
                        "effect failed";
                        "effect" => scheduled.effect.name(),
                        "error" => %err,
                    );
                }
            }
            scheduled.last_run = now;
        }

        drop(world);
        outbox.flush();
    }

    /// Runs the scheduler loop with frame-rate limiting, forever.
    pub fn run(&mut self, mut now_fn: impl FnMut() -> u64, mut running: impl FnMut() -> bool) {
        while running() {
            let frame_start = Instant::now();
            self.run_once(now_fn());
            let elapsed = frame_start.elapsed();
            if elapsed < self.tick_period {
                std::thread::sleep(self.tick_period - elapsed);
            }
        }
    }
}
