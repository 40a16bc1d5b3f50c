// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rate-limited VP error reporting and periodic recovery.
//!
//! A VP that has wedged tends to fail every request from then on, so errors
//! arrive in storms. Two independent countdowns keep a storm in check:
//!
//! - the first [`MAX_COUNT_ERR`] errors are traced in full, with the failing
//!   site's selectors and caller location; after that each error only bumps
//!   a per-kind tally in the budget and a payload-free entry in a ring of its
//!   own, so a storm can't evict the full reports;
//! - for VPs whose [`VpOps`] is recoverable, every
//!   [`MAX_RETRIES_BEFORE_RECOVER`]th error triggers the recovery hook.
//!
//! The countdowns are shared by every domain reporting into the same
//! [`ErrorBudget`] and are updated atomically.

use core::panic::Location;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use ringbuf::{ringbuf, ringbuf_entry};

use crate::domain::{VpInstance, VpOps};
use crate::{MAX_COUNT_ERR, MAX_RETRIES_BEFORE_RECOVER};

/// Where in a scaling sequence the VP let us down.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Fault {
    /// The VP never went idle ahead of a scale.
    IdleTimeout { target_uv: u32 },
    /// TRANXDONE would not stay clear before the forced update.
    TxdoneStuck {
        target_uv: u32,
        target_vsel: u8,
        current_vsel: u8,
    },
    /// TRANXDONE never showed up after the forced update.
    TxdoneMissing {
        target_uv: u32,
        target_vsel: u8,
        current_vsel: u8,
    },
    /// TRANXDONE would not stay clear after the forced update.
    TxdoneUncleared {
        target_uv: u32,
        target_vsel: u8,
        current_vsel: u8,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FaultKind {
    IdleTimeout = 0,
    TxdoneStuck = 1,
    TxdoneMissing = 2,
    TxdoneUncleared = 3,
}

const FAULT_KINDS: usize = 4;

impl Fault {
    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::IdleTimeout { .. } => FaultKind::IdleTimeout,
            Fault::TxdoneStuck { .. } => FaultKind::TxdoneStuck,
            Fault::TxdoneMissing { .. } => FaultKind::TxdoneMissing,
            Fault::TxdoneUncleared { .. } => FaultKind::TxdoneUncleared,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    Error {
        domain: &'static str,
        vp_id: u8,
        fault: Fault,
        caller: &'static Location<'static>,
    },
    Recover {
        domain: &'static str,
        vp_id: u8,
    },
}

ringbuf!(Trace, 64, Trace::None);

#[derive(Copy, Clone, Debug, PartialEq)]
enum Suppressed {
    None,
    RateLimited,
}

ringbuf!(SUPPRESSED_RINGBUF, Suppressed, 4, Suppressed::None);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Verbosity {
    Full,
    RateLimited,
}

/// What [`ErrorBudget::report_and_maybe_recover`] decided to do.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Report {
    pub verbosity: Verbosity,
    pub recovered: bool,
}

pub struct ErrorBudget {
    messages: AtomicU8,
    recover_countdown: AtomicU8,
    recover_every: u8,
    suppressed: [AtomicU32; FAULT_KINDS],
}

impl ErrorBudget {
    /// A budget using the configured limits, suitable for a `static`.
    pub const fn new() -> Self {
        Self::with_limits(MAX_COUNT_ERR, MAX_RETRIES_BEFORE_RECOVER)
    }

    /// # Panics
    ///
    /// If `retries_before_recover` is zero.
    pub const fn with_limits(messages: u8, retries_before_recover: u8) -> Self {
        assert!(retries_before_recover > 0);
        Self {
            messages: AtomicU8::new(messages),
            recover_countdown: AtomicU8::new(retries_before_recover),
            recover_every: retries_before_recover,
            suppressed: [
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
            ],
        }
    }

    /// Full-verbosity reports left before rate limiting kicks in.
    pub fn messages_left(&self) -> u8 {
        self.messages.load(Ordering::Relaxed)
    }

    /// Errors of `kind` reported after the message budget ran out.
    pub fn suppressed(&self, kind: FaultKind) -> u32 {
        self.suppressed[kind as usize].load(Ordering::Relaxed)
    }

    /// Errors left until the next recovery.
    pub fn until_recovery(&self) -> u8 {
        self.recover_countdown.load(Ordering::Relaxed)
    }

    #[track_caller]
    pub fn report_and_maybe_recover<O: VpOps>(
        &self,
        domain: &'static str,
        vp: &VpInstance<O>,
        fault: Fault,
    ) -> Report {
        let verbosity = match self.messages.fetch_update(
            Ordering::Relaxed,
            Ordering::Relaxed,
            |left| left.checked_sub(1),
        ) {
            Ok(_) => {
                ringbuf_entry!(Trace::Error {
                    domain,
                    vp_id: vp.id,
                    fault,
                    caller: Location::caller(),
                });
                Verbosity::Full
            }
            Err(_) => {
                self.suppressed[fault.kind() as usize]
                    .fetch_add(1, Ordering::Relaxed);
                ringbuf_entry!(SUPPRESSED_RINGBUF, Suppressed::RateLimited);
                Verbosity::RateLimited
            }
        };

        let recovered = O::RECOVERABLE && self.count_towards_recovery();
        if recovered {
            ringbuf_entry!(Trace::Recover {
                domain,
                vp_id: vp.id
            });
            vp.ops.recover(vp.id);
        }

        Report {
            verbosity,
            recovered,
        }
    }

    /// Takes one off the recovery countdown, rearming it and returning `true`
    /// when it runs out.
    fn count_towards_recovery(&self) -> bool {
        let every = self.recover_every;
        // The closure always returns Some, so this can't fail.
        let prev = match self.recover_countdown.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |left| Some(if left <= 1 { every } else { left - 1 }),
        ) {
            Ok(prev) | Err(prev) => prev,
        };
        prev <= 1
    }
}

impl Default for ErrorBudget {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{VpCommon, VpRegs};
    use core::cell::Cell;
    use std::sync::atomic::AtomicU32;

    static COMMON: VpCommon = VpCommon {
        vpconfig_erroroffset_mask: 0xff << 24,
        vpconfig_errorgain_mask: 0xff << 16,
        vpconfig_initvoltage_mask: 0xff << 8,
        vpconfig_timeouten: 1 << 3,
        vpconfig_initvdd: 1 << 2,
        vpconfig_forceupdate: 1 << 1,
        vpconfig_vpenable: 1 << 0,
        vstatus_vpidle: 1 << 0,
        vstepmin_smpswaittimemin_shift: 8,
        vstepmin_stepmin_shift: 0,
        vstepmax_smpswaittimemax_shift: 8,
        vstepmax_stepmax_shift: 0,
        vlimitto_vddmin_shift: 16,
        vlimitto_vddmax_shift: 24,
        vlimitto_timeout_shift: 0,
        vpvoltage_mask: 0xff,
    };

    const REGS: VpRegs = VpRegs {
        vpconfig: 0,
        vstatus: 4,
        vlimitto: 8,
        voltage: 12,
        vstepmax: 16,
        vstepmin: 20,
    };

    #[derive(Default)]
    struct Recoverable {
        recoveries: Cell<u32>,
    }

    impl VpOps for Recoverable {
        const RECOVERABLE: bool = true;

        fn check_txdone(&self, _vp_id: u8) -> bool {
            false
        }
        fn clear_txdone(&self, _vp_id: u8) {}
        fn recover(&self, _vp_id: u8) {
            self.recoveries.set(self.recoveries.get() + 1);
        }
    }

    struct Plain;

    impl VpOps for Plain {
        fn check_txdone(&self, _vp_id: u8) -> bool {
            false
        }
        fn clear_txdone(&self, _vp_id: u8) {}
    }

    const FAULT: Fault = Fault::IdleTimeout { target_uv: 1_100_000 };

    #[test]
    fn full_reports_then_rate_limited() {
        let budget = ErrorBudget::with_limits(3, 50);
        let vp = VpInstance::new(0, REGS, &COMMON, Plain);

        let verbosities: Vec<_> = (0..5)
            .map(|_| {
                budget
                    .report_and_maybe_recover("budget_rl", &vp, FAULT)
                    .verbosity
            })
            .collect();
        assert_eq!(
            verbosities,
            [
                Verbosity::Full,
                Verbosity::Full,
                Verbosity::Full,
                Verbosity::RateLimited,
                Verbosity::RateLimited,
            ]
        );
        assert_eq!(budget.messages_left(), 0);
        assert_eq!(budget.suppressed(FaultKind::IdleTimeout), 2);
    }

    #[test]
    fn alternating_faults_keep_full_reports() {
        let budget = ErrorBudget::with_limits(3, 50);
        let vp = VpInstance::new(0, REGS, &COMMON, Plain);
        let missing = Fault::TxdoneMissing {
            target_uv: 1_100_000,
            target_vsel: 0x28,
            current_vsel: 0x20,
        };
        let uncleared = Fault::TxdoneUncleared {
            target_uv: 1_100_000,
            target_vsel: 0x28,
            current_vsel: 0x20,
        };

        for _ in 0..20 {
            for fault in [missing, uncleared] {
                budget.report_and_maybe_recover("budget_alt", &vp, fault);
            }
        }

        let full = __RINGBUF.count_matching(|t| {
            matches!(t, Trace::Error { domain: "budget_alt", .. })
        });
        assert_eq!(full, 3);
        assert_eq!(budget.suppressed(FaultKind::TxdoneMissing), 18);
        assert_eq!(budget.suppressed(FaultKind::TxdoneUncleared), 19);
        assert_eq!(budget.suppressed(FaultKind::IdleTimeout), 0);
        // Every rate-limited report, from any budget, shares one slot.
        assert_eq!(SUPPRESSED_RINGBUF.inspect(|rb| rb.iter().count()), 1);
    }

    #[test]
    fn recovers_once_per_cycle() {
        let n2 = 50;
        let budget = ErrorBudget::with_limits(10, n2);
        let vp = VpInstance::new(1, REGS, &COMMON, Recoverable::default());

        let mut fired_at = vec![];
        for i in 1..=u32::from(n2) + 1 {
            let r = budget.report_and_maybe_recover("budget_once", &vp, FAULT);
            if r.recovered {
                fired_at.push(i);
            }
        }
        assert_eq!(fired_at, [u32::from(n2)]);
        assert_eq!(vp.ops.recoveries.get(), 1);
        assert_eq!(budget.until_recovery(), n2 - 1);

        for _ in u32::from(n2) + 2..=2 * u32::from(n2) {
            budget.report_and_maybe_recover("budget_once", &vp, FAULT);
        }
        assert_eq!(vp.ops.recoveries.get(), 2);
        assert_eq!(budget.until_recovery(), n2);
    }

    #[test]
    fn unrecoverable_vp_leaves_countdown_alone() {
        let budget = ErrorBudget::with_limits(10, 2);
        let vp = VpInstance::new(2, REGS, &COMMON, Plain);
        for _ in 0..5 {
            let r = budget.report_and_maybe_recover("budget_plain", &vp, FAULT);
            assert!(!r.recovered);
        }
        assert_eq!(budget.until_recovery(), 2);
    }

    #[test]
    fn shared_across_threads() {
        struct Counting(AtomicU32);
        impl VpOps for Counting {
            const RECOVERABLE: bool = true;
            fn check_txdone(&self, _vp_id: u8) -> bool {
                false
            }
            fn clear_txdone(&self, _vp_id: u8) {}
            fn recover(&self, _vp_id: u8) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        let budget = ErrorBudget::with_limits(10, 7);
        let vp = VpInstance::new(0, REGS, &COMMON, Counting(AtomicU32::new(0)));

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..70 {
                        budget.report_and_maybe_recover(
                            "budget_threads",
                            &vp,
                            FAULT,
                        );
                    }
                });
            }
        });

        assert_eq!(vp.ops.0.load(Ordering::Relaxed), 280 / 7);
        assert_eq!(budget.messages_left(), 0);
    }
}
