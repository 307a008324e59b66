//! Background poll scheduling.
//!
//! The engine itself must stay on the host's simulation thread. Periodic
//! work is therefore split: a [`PollScheduler`] thread only decides *when*
//! work is due and sends a [`PollTask`] over a channel, and the simulation
//! thread drains the channel and runs the tasks through
//! [`Engine::run_poll_tasks`].
//!
//! ```no_run
//! use std::time::Duration;
//! use affix_engine::engine::PollScheduler;
//!
//! let mut scheduler = PollScheduler::start(Duration::from_millis(250), Duration::from_secs(5)).unwrap();
//! // ... once per frame on the game thread:
//! let tasks = scheduler.drain();
//! # drop(tasks);
//! scheduler.shutdown();
//! ```

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::core::TimePoint;
use crate::host::Host;

use super::Engine;

/// Work the scheduler can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PollTask {
    /// Advance live traps.
    TickTraps,
    /// Rebuild active counts from equipment.
    Resync,
}

/// Owns the poll thread and the receiving end of its channel.
///
/// Dropping the scheduler stops the thread.
#[derive(Debug)]
pub struct PollScheduler {
    rx: Receiver<PollTask>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PollScheduler {
    /// Spawn the poll thread. A zero interval disables that task.
    pub fn start(trap_interval: Duration, resync_interval: Duration) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let schedule = [
            (PollTask::TickTraps, trap_interval),
            (PollTask::Resync, resync_interval),
        ];

        let handle = thread::Builder::new()
            .name("affix-poll".into())
            .spawn(move || poll_loop(&tx, &flag, schedule))?;
        debug!(?trap_interval, ?resync_interval, "poll scheduler started");

        Ok(Self {
            rx,
            stop,
            handle: Some(handle),
        })
    }

    /// Every task sent since the last drain, in order.
    pub fn drain(&self) -> Vec<PollTask> {
        self.rx.try_iter().collect()
    }

    /// True until [`PollScheduler::shutdown`] runs.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop the thread and wait for it.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                warn!("poll thread panicked");
            }
            debug!("poll scheduler stopped");
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn poll_loop(tx: &Sender<PollTask>, stop: &AtomicBool, schedule: [(PollTask, Duration); 2]) {
    let started = Instant::now();
    let mut due: Vec<(PollTask, Duration, Instant)> = schedule
        .into_iter()
        .filter(|(_, interval)| !interval.is_zero())
        .map(|(task, interval)| (task, interval, started + interval))
        .collect();

    while !stop.load(Ordering::Acquire) {
        let now = Instant::now();
        for (task, interval, next) in &mut due {
            if now >= *next {
                if tx.send(*task).is_err() {
                    return;
                }
                *next = now + *interval;
            }
        }
        match due.iter().map(|(_, _, next)| *next).min() {
            Some(wake) => thread::park_timeout(wake.saturating_duration_since(Instant::now())),
            None => thread::park(),
        }
    }
}

impl Engine {
    /// Run drained poll tasks. Repeated tasks collapse into one run.
    pub fn run_poll_tasks(
        &mut self,
        host: &mut dyn Host,
        tasks: impl IntoIterator<Item = PollTask>,
        now: TimePoint,
    ) {
        let (mut traps, mut resync) = (false, false);
        for task in tasks {
            match task {
                PollTask::TickTraps => traps = true,
                PollTask::Resync => resync = true,
            }
        }
        if !self.config_loaded {
            return;
        }
        if resync {
            self.resync(host, now);
        }
        if traps {
            self.tick_traps(host, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_host::RecordingHost;
    use crate::affixes::{ActionSpec, AffixDefinition, Trigger};
    use crate::core::{ActorId, AffixToken, EngineSettings, FormId, InstanceKey};
    use crate::host::EquippedInstance;

    #[test]
    fn test_scheduler_emits_and_stops() {
        let mut scheduler =
            PollScheduler::start(Duration::from_millis(5), Duration::from_millis(10)).unwrap();
        thread::sleep(Duration::from_millis(100));
        let tasks = scheduler.drain();
        assert!(tasks.contains(&PollTask::TickTraps));
        assert!(tasks.contains(&PollTask::Resync));

        scheduler.shutdown();
        assert!(!scheduler.is_running());
        scheduler.drain();
        thread::sleep(Duration::from_millis(30));
        assert!(scheduler.drain().is_empty());
    }

    #[test]
    fn test_zero_intervals_send_nothing() {
        let scheduler = PollScheduler::start(Duration::ZERO, Duration::ZERO).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(scheduler.drain().is_empty());
    }

    #[test]
    fn test_run_poll_tasks_resyncs() {
        let player = ActorId::new(0x14);
        let mut host = RecordingHost::with_player(player);
        let mut engine = Engine::new(EngineSettings::default(), 1);
        engine.load_config(
            vec![AffixDefinition::new("a")
                .on(Trigger::Hit)
                .with_action(ActionSpec::DebugNotify { message: "a".into() })],
            vec![],
        );
        host.equipped
            .push(EquippedInstance::new(InstanceKey::new(FormId::new(1), 1)).with_tokens([AffixToken::from_id("a")]));

        engine.run_poll_tasks(&mut host, [PollTask::TickTraps], TimePoint::ZERO);
        assert_eq!(engine.active_count(AffixToken::from_id("a")), 0);
        engine.run_poll_tasks(&mut host, [PollTask::Resync, PollTask::Resync], TimePoint::ZERO);
        assert_eq!(engine.active_count(AffixToken::from_id("a")), 1);
    }
}
