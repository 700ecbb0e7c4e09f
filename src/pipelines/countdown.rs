// SPDX-License-Identifier: GPL-3.0-only

//! Countdown timer driving the "get ready" cue
//!
//! A cooperative, cancellable tick sequence: one tick per wall-clock second,
//! a flash cue on the last tick, a short settle delay, then resolution.
//! Cues are published on a watch channel for whatever surface renders them.

use crate::constants::FLASH_SETTLE;
use crate::errors::CaptureError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Visual cue published while a countdown runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountdownCue {
    /// No countdown in progress
    #[default]
    Idle,
    /// Seconds remaining before the grab
    Tick(u32),
    /// The grab is imminent; fire the flash
    Flash,
}

/// Countdown timer owned by the session controller
///
/// `run` takes `&mut self` and holds the borrow across its awaits, so a
/// second concurrent countdown on the same timer cannot be expressed.
pub struct CountdownTimer {
    cue_tx: watch::Sender<CountdownCue>,
    settle: Duration,
}

impl CountdownTimer {
    /// Create a timer together with the cue receiver for the display layer
    pub fn new() -> (Self, watch::Receiver<CountdownCue>) {
        let (cue_tx, cue_rx) = watch::channel(CountdownCue::Idle);
        (
            Self {
                cue_tx,
                settle: FLASH_SETTLE,
            },
            cue_rx,
        )
    }

    /// Override the settle delay between the flash cue and resolution
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Subscribe to countdown cues
    pub fn subscribe(&self) -> watch::Receiver<CountdownCue> {
        self.cue_tx.subscribe()
    }

    /// Run one countdown of `seconds` ticks, resolving exactly once.
    ///
    /// The cancel flag is observed at every tick boundary: once set, the cue
    /// returns to `Idle` and the run resolves with
    /// [`CaptureError::Cancelled`] without completing its sequence.
    pub async fn run(
        &mut self,
        seconds: u32,
        cancel: &Arc<AtomicBool>,
    ) -> Result<(), CaptureError> {
        debug!(seconds, "Countdown started");

        for remaining in (1..=seconds).rev() {
            if cancel.load(Ordering::SeqCst) {
                return self.cancelled();
            }
            let _ = self.cue_tx.send(CountdownCue::Tick(remaining));
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        if cancel.load(Ordering::SeqCst) {
            return self.cancelled();
        }

        let _ = self.cue_tx.send(CountdownCue::Flash);
        tokio::time::sleep(self.settle).await;

        if cancel.load(Ordering::SeqCst) {
            return self.cancelled();
        }

        let _ = self.cue_tx.send(CountdownCue::Idle);
        debug!("Countdown complete");
        Ok(())
    }

    fn cancelled(&self) -> Result<(), CaptureError> {
        debug!("Countdown cancelled");
        let _ = self.cue_tx.send(CountdownCue::Idle);
        Err(CaptureError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_countdown_resolves_once_after_ticks_and_settle() {
        let (mut timer, rx) = CountdownTimer::new();
        let cancel = Arc::new(AtomicBool::new(false));

        timer.run(3, &cancel).await.unwrap();
        assert_eq!(*rx.borrow(), CountdownCue::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_publishes_flash_before_resolving() {
        let (mut timer, mut rx) = CountdownTimer::new();
        let cancel = Arc::new(AtomicBool::new(false));

        let watcher = tokio::spawn(async move {
            let mut saw_flash = false;
            while rx.changed().await.is_ok() {
                if *rx.borrow() == CountdownCue::Flash {
                    saw_flash = true;
                }
                if saw_flash && *rx.borrow() == CountdownCue::Idle {
                    break;
                }
            }
            saw_flash
        });

        timer.run(2, &cancel).await.unwrap();
        assert!(watcher.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pre_cancelled_countdown_never_completes() {
        let (mut timer, rx) = CountdownTimer::new();
        let cancel = Arc::new(AtomicBool::new(true));

        let result = timer.run(5, &cancel).await;
        assert!(matches!(result, Err(CaptureError::Cancelled)));
        assert_eq!(*rx.borrow(), CountdownCue::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_countdown_stops_the_sequence() {
        let (mut timer, _rx) = CountdownTimer::new();
        let cancel = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&cancel);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            flag.store(true, Ordering::SeqCst);
        });

        let result = timer.run(10, &cancel).await;
        assert!(matches!(result, Err(CaptureError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_second_countdown_still_flashes() {
        let (mut timer, mut rx) = CountdownTimer::new();
        let cancel = Arc::new(AtomicBool::new(false));

        let watcher = tokio::spawn(async move {
            let mut saw_flash = false;
            while rx.changed().await.is_ok() {
                if *rx.borrow() == CountdownCue::Flash {
                    saw_flash = true;
                    break;
                }
            }
            saw_flash
        });

        timer.run(0, &cancel).await.unwrap();
        assert!(watcher.await.unwrap());
    }
}
