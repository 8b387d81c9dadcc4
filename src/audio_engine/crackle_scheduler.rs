// src/audio_engine/crackle_scheduler.rs

//! Control-plane timer that decides when the fire crackles.
//!
//! Runs on its own thread, sleeps a random delay, then hands a
//! [`CrackleEvent`] to the renderer through the SPSC queue. It never writes
//! samples. Disarming wakes the sleep immediately and joins the thread.

use crate::error::{EngineError, EngineResult};
use crate::fire_components::CrackleEvent;
use crate::soundscape::CrackleTuning;
use rand::rngs::StdRng;
use rand::SeedableRng;
use ringbuf::HeapProducer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, trace};

// Keeps the scheduler's random stream independent of the renderer's when both share a seed.
const SCHEDULER_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

pub struct CrackleScheduler {
    cancel: Option<Sender<()>>,
    thread_handle: Option<JoinHandle<()>>,
    triggers_sent: Arc<AtomicUsize>,
}

impl CrackleScheduler {
    /// Spawns the timer thread. Crackles recur until [`disarm`](Self::disarm) or drop.
    pub fn arm(
        mut outbox: HeapProducer<CrackleEvent>,
        tuning: CrackleTuning,
        seed: Option<u64>,
    ) -> EngineResult<Self> {
        let (cancel, cancelled) = mpsc::channel::<()>();
        let triggers_sent = Arc::new(AtomicUsize::new(0));
        let triggers_sent_clone = triggers_sent.clone();

        let thread_handle = thread::Builder::new()
            .name("emberglow-crackle".to_string())
            .spawn(move || {
                let mut rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(seed ^ SCHEDULER_SEED_SALT),
                    None => StdRng::from_entropy(),
                };
                loop {
                    let event = CrackleEvent::random(&mut rng, &tuning);
                    match cancelled.recv_timeout(Duration::from_secs_f32(event.delay_seconds)) {
                        Err(RecvTimeoutError::Timeout) => {
                            if outbox.push(event).is_err() {
                                trace!("crackle queue full, trigger dropped");
                            } else {
                                triggers_sent_clone.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("crackle scheduler stopped");
            })
            .map_err(|e| EngineError::Scheduler(format!("failed to spawn timer thread: {e}")))?;

        debug!("crackle scheduler armed");
        Ok(Self {
            cancel: Some(cancel),
            thread_handle: Some(thread_handle),
            triggers_sent,
        })
    }

    /// Cancels the pending trigger, waits for the timer thread to exit and
    /// returns the final trigger count.
    pub fn disarm(mut self) -> usize {
        self.shutdown();
        self.triggers_sent()
    }

    /// Triggers successfully queued so far.
    pub fn triggers_sent(&self) -> usize {
        self.triggers_sent.load(Ordering::Relaxed)
    }

    fn shutdown(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            // A send error only means the thread is already gone.
            let _ = cancel.send(());
        }
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                error!("crackle scheduler thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for CrackleScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_engine::crackle_queue;
    use std::time::Instant;

    fn fast_tuning() -> CrackleTuning {
        CrackleTuning {
            delay_seconds: [0.005, 0.01],
            ..CrackleTuning::default()
        }
    }

    #[test]
    fn test_triggers_arrive_and_respect_windows() {
        let (tx, mut rx) = crackle_queue();
        let tuning = fast_tuning();
        let scheduler = CrackleScheduler::arm(tx, tuning, Some(1)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut received = Vec::new();
        while received.len() < 3 && Instant::now() < deadline {
            while let Some(event) = rx.pop() {
                received.push(event);
            }
            thread::sleep(Duration::from_millis(2));
        }
        scheduler.disarm();

        assert!(received.len() >= 3, "only {} triggers", received.len());
        for e in received {
            assert!(e.burst_duration_frames >= 200 && e.burst_duration_frames <= 600);
            assert!(e.peak_amplitude >= 0.008 && e.peak_amplitude <= 0.025);
        }
    }

    #[test]
    fn test_disarm_is_prompt_and_final() {
        let (tx, mut rx) = crackle_queue();
        let tuning = CrackleTuning {
            delay_seconds: [30.0, 60.0],
            ..CrackleTuning::default()
        };
        let scheduler = CrackleScheduler::arm(tx, tuning, Some(2)).unwrap();

        let started = Instant::now();
        scheduler.disarm();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(rx.pop().is_none());
    }

    #[test]
    fn test_full_queue_drops_instead_of_blocking() {
        let (tx, rx) = crackle_queue();
        let tuning = CrackleTuning {
            delay_seconds: [0.0, 0.001],
            ..CrackleTuning::default()
        };
        let scheduler = CrackleScheduler::arm(tx, tuning, Some(3)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while rx.len() < crate::audio_engine::CRACKLE_QUEUE_CAPACITY && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        thread::sleep(Duration::from_millis(20));
        let sent = scheduler.triggers_sent();
        drop(scheduler);
        assert_eq!(sent, crate::audio_engine::CRACKLE_QUEUE_CAPACITY);
    }
}
