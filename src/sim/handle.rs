//! Single-writer command queue onto the simulation loop
//!
//! Network tasks submit closures and suspend on a oneshot reply; the loop
//! task drains them in order against the world it exclusively owns. This is
//! the only path from the network layer into simulation state.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use super::SimWorld;

type SimCommand = Box<dyn FnOnce(&mut dyn SimWorld) + Send>;

/// The simulation loop has shut down (scene torn down); sessions holding a
/// handle observe this instead of keeping the simulation alive.
#[derive(Debug, thiserror::Error)]
#[error("simulation loop is gone")]
pub struct SimGone;

/// Cloneable, non-owning handle to the simulation loop
#[derive(Clone)]
pub struct SimHandle {
    tx: mpsc::Sender<SimCommand>,
}

impl SimHandle {
    /// Run a closure on the simulation loop and wait for its result.
    ///
    /// The caller suspends until the closure has executed, so a reply always
    /// reflects post-closure state. No timeout: a stalled loop stalls the
    /// caller's protocol (documented risk).
    pub async fn call<F, R>(&self, f: F) -> Result<R, SimGone>
    where
        F: FnOnce(&mut dyn SimWorld) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let cmd: SimCommand = Box::new(move |world| {
            let _ = reply_tx.send(f(world));
        });
        self.tx.send(cmd).await.map_err(|_| SimGone)?;
        reply_rx.await.map_err(|_| SimGone)
    }
}

/// Owns the world and drains the command queue
pub struct SimLoop {
    world: Box<dyn SimWorld>,
    rx: mpsc::Receiver<SimCommand>,
}

impl SimLoop {
    pub fn new(world: Box<dyn SimWorld>) -> (Self, SimHandle) {
        let (tx, rx) = mpsc::channel(64);
        (Self { world, rx }, SimHandle { tx })
    }

    /// Spawn the loop as a background task
    pub fn spawn(world: Box<dyn SimWorld>) -> (SimHandle, JoinHandle<()>) {
        let (mut sim_loop, handle) = Self::new(world);
        let task = tokio::spawn(async move { sim_loop.run().await });
        (handle, task)
    }

    /// Drain commands until every handle is dropped
    pub async fn run(&mut self) {
        while let Some(cmd) = self.rx.recv().await {
            cmd(self.world.as_mut());
        }
        debug!("Simulation command queue closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Control, RewardEvents, Telemetry};

    struct CounterWorld {
        ticks: u32,
    }

    impl SimWorld for CounterWorld {
        fn apply_control(&mut self, _control: Control) {}

        fn step_one_tick(&mut self, _dt: f64) {
            self.ticks += 1;
        }

        fn read_observation(&mut self) -> Vec<f64> {
            vec![self.ticks as f64]
        }

        fn read_telemetry(&self) -> Telemetry {
            Telemetry {
                agent_hp: 100.0,
                agent_max_hp: 100.0,
                agent_alive: true,
                target_lives: 3,
                target_distance: 0.0,
                speed_frac: 0.0,
                heading_error_cos: 1.0,
                in_weapon_range: false,
            }
        }

        fn consume_reward_events(&mut self) -> RewardEvents {
            RewardEvents::default()
        }

        fn is_done(&self) -> bool {
            false
        }

        fn reset_episode(&mut self) {
            self.ticks = 0;
        }
    }

    #[tokio::test]
    async fn calls_execute_in_submission_order() {
        let (handle, _task) = SimLoop::spawn(Box::new(CounterWorld { ticks: 0 }));

        for _ in 0..5 {
            handle.call(|w| w.step_one_tick(1.0 / 60.0)).await.unwrap();
        }
        let obs = handle.call(|w| w.read_observation()).await.unwrap();
        assert_eq!(obs, vec![5.0]);
    }

    #[tokio::test]
    async fn dropped_loop_surfaces_as_sim_gone() {
        let (sim_loop, handle) = SimLoop::new(Box::new(CounterWorld { ticks: 0 }));
        drop(sim_loop);

        let result = handle.call(|w| w.is_done()).await;
        assert!(result.is_err());
    }
}
