// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded busy-wait polling.
//!
//! Power and reset sequencing code often runs with interrupts masked, so it
//! may not sleep; it may only spin. Every spin in this workspace goes through
//! [`poll_until`], which checks a condition a fixed number of times with a
//! short [`DelayUs`] between failed checks.
//!
//! Timeouts are counted in attempts, not wall-clock time: "timed out" means
//! `limit` checks all came back false. That keeps behavior deterministic for a
//! given delay, at the cost of depending on the delay being calibrated to the
//! hardware.

#![cfg_attr(target_os = "none", no_std)]

pub use embedded_hal::blocking::delay::DelayUs;

/// The condition was still false after every permitted attempt.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TimedOut;

/// Checks `cond` up to `limit` times, waiting `delay_us` after each check that
/// comes back false.
///
/// On success, returns the zero-based index of the attempt that saw the
/// condition hold (so `Ok(0)` means it was already true).
pub fn poll_until<D, F>(
    limit: u32,
    delay_us: u32,
    delay: &mut D,
    mut cond: F,
) -> Result<u32, TimedOut>
where
    D: DelayUs<u32>,
    F: FnMut() -> bool,
{
    for attempt in 0..limit {
        if cond() {
            return Ok(attempt);
        }
        delay.delay_us(delay_us);
    }
    Err(TimedOut)
}

/// Runs `action` and then checks `done`, up to `limit` times, waiting
/// `delay_us` between rounds in which `done` was false.
///
/// This is the shape of a write-1-to-clear status bit that the hardware may
/// re-assert: clear it, look again, and repeat until it stays clear.
pub fn retry_until<D, A, F>(
    limit: u32,
    delay_us: u32,
    delay: &mut D,
    mut action: A,
    mut done: F,
) -> Result<u32, TimedOut>
where
    D: DelayUs<u32>,
    A: FnMut(),
    F: FnMut() -> bool,
{
    poll_until(limit, delay_us, delay, || {
        action();
        done()
    })
}

/// A delay that does nothing but count how long it was asked to wait.
///
/// Useful for host tests of code that would otherwise spin on real hardware.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CountingDelay {
    pub calls: u32,
    pub total_us: u64,
}

impl DelayUs<u32> for CountingDelay {
    fn delay_us(&mut self, us: u32) {
        self.calls += 1;
        self.total_us += u64::from(us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_success_does_not_delay() {
        let mut d = CountingDelay::default();
        assert_eq!(poll_until(10, 1, &mut d, || true), Ok(0));
        assert_eq!(d.calls, 0);
    }

    #[test]
    fn success_on_last_attempt_is_success() {
        let mut d = CountingDelay::default();
        let mut n = 0;
        let r = poll_until(5, 3, &mut d, || {
            n += 1;
            n == 5
        });
        assert_eq!(r, Ok(4));
        assert_eq!(d.calls, 4);
        assert_eq!(d.total_us, 12);
    }

    #[test]
    fn exhausting_the_budget_times_out() {
        let mut d = CountingDelay::default();
        let mut checks = 0;
        let r = poll_until(7, 1, &mut d, || {
            checks += 1;
            false
        });
        assert_eq!(r, Err(TimedOut));
        assert_eq!(checks, 7);
        assert_eq!(d.calls, 7);
    }

    #[test]
    fn zero_budget_never_checks() {
        let mut d = CountingDelay::default();
        let r = poll_until(0, 1, &mut d, || panic!("checked"));
        assert_eq!(r, Err(TimedOut));
    }

    #[test]
    fn retry_runs_action_before_every_check() {
        let mut d = CountingDelay::default();
        let actions = core::cell::Cell::new(0);
        let r = retry_until(
            10,
            1,
            &mut d,
            || actions.set(actions.get() + 1),
            || actions.get() == 3,
        );
        assert_eq!(r, Ok(2));
        assert_eq!(actions.get(), 3);
    }
}
