use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ffmpeg_next::Rational;

use crate::core::rescale::{rescale_q_rnd, Rounding};

/// Cooperative stop signal shared between an embedding application and a
/// running pipeline. Cloning hands out another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Wall-clock gate that throttles packet emission to real playback speed.
///
/// The reference instant is captured on the first gated packet and never
/// reset for the rest of the session.
pub struct PacingGate {
    reference: Option<Instant>,
}

const MAX_SLEEP_SLICE: Duration = Duration::from_millis(100);

impl PacingGate {
    pub fn new() -> Self {
        Self { reference: None }
    }

    /// Block until `dts` (in `time_base` units) is due on the wall clock.
    ///
    /// The first call records the reference instant and returns at once, so
    /// the first packet always flushes without delay. Later calls convert
    /// `dts` to microseconds and sleep off the shortfall against elapsed
    /// real time; packets at or behind the wall clock pass straight
    /// through, so a burst of equal timestamps flushes back to back. The
    /// sleep is sliced and `cancel` re-checked between slices.
    pub fn wait_until_due(&mut self, dts: Option<i64>, time_base: Rational, cancel: &CancelFlag) {
        let reference = match self.reference {
            Some(reference) => reference,
            None => {
                self.reference = Some(Instant::now());
                return;
            }
        };

        let Some(dts) = dts else { return };
        let due_us = rescale_q_rnd(
            dts,
            time_base,
            Rational::new(1, 1_000_000),
            Rounding::NearInfPassMinMax,
        );
        // A passed-through sentinel carries no deadline.
        if due_us == i64::MAX || due_us <= 0 {
            return;
        }

        let mut remaining = due_us.saturating_sub(elapsed_us(reference));
        while remaining > 0 && !cancel.is_cancelled() {
            let slice = Duration::from_micros(remaining as u64).min(MAX_SLEEP_SLICE);
            std::thread::sleep(slice);
            remaining = due_us.saturating_sub(elapsed_us(reference));
        }
    }
}

impl Default for PacingGate {
    fn default() -> Self {
        Self::new()
    }
}

fn elapsed_us(reference: Instant) -> i64 {
    i64::try_from(reference.elapsed().as_micros()).unwrap_or(i64::MAX)
}
