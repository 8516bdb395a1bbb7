//! Blast scheduler
//!
//! One background thread advances every blast by a fixed increment per tick,
//! asks the front-end for a redraw, then sleeps for the configured interval.
//! Cancellation is cooperative and checked once per tick, never in the
//! middle of one.

use crate::blast::BlastSet;
use crate::config::BlastConfig;
use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info};

/// Redraw request emitted after every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redraw;

pub struct Scheduler;

impl Scheduler {
    /// Spawn the ticking thread
    pub fn start(blasts: BlastSet, config: BlastConfig) -> Result<SchedulerHandle> {
        let cancel = Arc::new(AtomicBool::new(false));
        let (redraw_tx, redraw_rx) = mpsc::channel();
        let (config_tx, config_rx) = mpsc::channel();

        let thread_cancel = Arc::clone(&cancel);
        let thread = thread::Builder::new()
            .name("blast-scheduler".into())
            .spawn(move || run(&blasts, config, &thread_cancel, &redraw_tx, &config_rx))?;

        info!("scheduler started");
        Ok(SchedulerHandle {
            cancel,
            redraws: redraw_rx,
            updates: config_tx,
            thread: Some(thread),
        })
    }
}

fn run(
    blasts: &BlastSet,
    mut config: BlastConfig,
    cancel: &AtomicBool,
    redraw: &Sender<Redraw>,
    updates: &Receiver<BlastConfig>,
) {
    let mut ticks: u64 = 0;
    loop {
        // Settings only change at tick boundaries
        for update in updates.try_iter() {
            config = update;
        }
        if cancel.load(Ordering::Acquire) {
            break;
        }

        match blasts.advance_all(config.blast_increment, config.max_radius()) {
            Ok(report) => {
                ticks += 1;
                if report.retired > 0 {
                    debug!(tick = ticks, live = report.advanced, retired = report.retired, "tick");
                }
            },
            Err(e) => {
                error!(error = %e, "scheduler cannot reach the blast set, stopping");
                break;
            },
        }

        if redraw.send(Redraw).is_err() {
            // Nobody left to draw
            break;
        }

        thread::sleep(config.tick_interval());
    }
    info!(ticks, "scheduler stopped");
}

/// Owner side of a running scheduler. Dropping it stops the thread.
pub struct SchedulerHandle {
    cancel: Arc<AtomicBool>,
    redraws: Receiver<Redraw>,
    updates: Sender<BlastConfig>,
    thread: Option<thread::JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Drain pending redraw requests; true if at least one arrived
    pub fn poll_redraw(&self) -> bool {
        self.redraws.try_iter().count() > 0
    }

    /// Hand a new configuration to the ticking thread
    pub fn update_config(&self, config: BlastConfig) {
        // A send error means the thread already exited
        let _ = self.updates.send(config);
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Request cancellation and wait for the current tick to finish
    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("scheduler thread panicked");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blast::Blast;
    use std::time::{Duration, Instant};

    fn fast_config() -> BlastConfig {
        BlastConfig {
            moves_per_second: 1000,
            ..BlastConfig::default()
        }
    }

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn test_ticks_grow_blasts_and_request_redraws() {
        let blasts = BlastSet::new();
        blasts.add(Blast::new(10, 10)).unwrap();
        let mut handle = Scheduler::start(blasts.clone(), fast_config()).unwrap();

        assert!(wait_for(|| handle.poll_redraw()));
        assert!(wait_for(|| blasts.snapshot().unwrap()[0].radius() > 0.0));

        handle.stop();
        assert!(!handle.is_running());
    }

    #[test]
    fn test_stop_freezes_radius() {
        let blasts = BlastSet::new();
        blasts.add(Blast::new(0, 0)).unwrap();
        let mut handle = Scheduler::start(blasts.clone(), fast_config()).unwrap();
        assert!(wait_for(|| blasts.snapshot().unwrap()[0].radius() >= 1.2));
        handle.stop();

        let frozen = blasts.snapshot().unwrap()[0].radius();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(blasts.snapshot().unwrap()[0].radius(), frozen);
    }

    #[test]
    fn test_blast_expires_while_running() {
        let blasts = BlastSet::new();
        blasts.add(Blast::new(5, 5)).unwrap();
        let config = BlastConfig {
            max_iterations: 5,
            ..fast_config()
        };
        let handle = Scheduler::start(blasts.clone(), config).unwrap();
        assert!(wait_for(|| blasts.is_empty().unwrap()));
        drop(handle);
    }

    #[test]
    fn test_config_update_reaches_thread() {
        let blasts = BlastSet::new();
        let handle = Scheduler::start(blasts.clone(), fast_config()).unwrap();
        handle.update_config(BlastConfig {
            blast_increment: 50.0,
            ..fast_config()
        });
        thread::sleep(Duration::from_millis(20));
        blasts.add(Blast::new(0, 0)).unwrap();
        assert!(wait_for(|| blasts.snapshot().unwrap()[0].radius() > 0.0));
        // The first step already uses the new increment
        assert!(blasts.snapshot().unwrap()[0].radius() >= 50.0);
        drop(handle);
    }
}
