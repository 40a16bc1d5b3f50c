// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The I/O pad wakeup daisy chain.
//!
//! Pads with WAKEUPENABLE set in their mux register latch wakeup events into
//! a chain clocked by WUCLKIN. Pulsing that clock clears stale latches and
//! brings the chain in line with the current mux settings.

use bounded_poll::{poll_until, DelayUs};
use ringbuf::{ringbuf, ringbuf_entry};

use crate::mmio::Mmio;
use crate::prminst::{Partition, PrmInstances};
use crate::regs::{IoPmCtrl, IrqMpu, PRM_IO_PMCTRL};

/// What [`PrmInstances::reconfigure_io_chain`] managed to do.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IoChainStatus {
    /// An I/O wakeup interrupt was pending, so the chain was left alone for
    /// the interrupt handler to recycle.
    SkippedPendingWakeup,
    Reconfigured {
        /// WUCLKOUT never followed WUCLKIN high.
        assert_timed_out: bool,
        /// WUCLKOUT never followed WUCLKIN low.
        deassert_timed_out: bool,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Trace {
    None,
    WakeupEnabled,
    ChainSkipped,
    ClockAssertTimeout,
    ClockDeassertTimeout,
    Chain(IoChainStatus),
    Erratum612,
}

ringbuf!(Trace, 8, Trace::None);

impl<M: Mmio> PrmInstances<M> {
    /// Lets latched I/O pad wakeup events wake the PRCM.
    pub fn enable_io_wakeup(&self) {
        ringbuf_entry!(Trace::WakeupEnabled);
        let wuen = IoPmCtrl::GLOBAL_WUEN.bits();
        self.rmw_inst_reg_bits(
            wuen,
            wuen,
            Partition::Prm,
            self.soc().device_inst(),
            PRM_IO_PMCTRL,
        );
    }

    /// Clears latched I/O wakeup events and realigns the wakeup gates with
    /// the pad mux, by cycling WUCLKIN and following WUCLKOUT.
    ///
    /// Timeouts are traced and reported but don't stop the sequence.
    pub fn reconfigure_io_chain<D: DelayUs<u32>>(
        &self,
        delay: &mut D,
    ) -> IoChainStatus {
        if self.soc().is_omap44xx() {
            let [pending, _] = self.read_pending_irqs();
            if pending & IrqMpu::IO_ST.bits() != 0 {
                ringbuf_entry!(Trace::ChainSkipped);
                return IoChainStatus::SkippedPendingWakeup;
            }
        }

        let inst = self.soc().device_inst();
        let ctrl = IoPmCtrl::WUCLK_CTRL.bits();
        let wuclk_out = || {
            self.read_inst_reg(Partition::Prm, inst, PRM_IO_PMCTRL)
                & IoPmCtrl::WUCLK_STATUS.bits()
                != 0
        };
        let budget = self.config().iopad_latch_time;
        let delay_us = self.config().poll_delay_us;

        self.rmw_inst_reg_bits(ctrl, ctrl, Partition::Prm, inst, PRM_IO_PMCTRL);
        let assert_timed_out =
            poll_until(budget, delay_us, delay, wuclk_out).is_err();
        if assert_timed_out {
            ringbuf_entry!(Trace::ClockAssertTimeout);
        }

        self.rmw_inst_reg_bits(ctrl, 0, Partition::Prm, inst, PRM_IO_PMCTRL);
        let deassert_timed_out =
            poll_until(budget, delay_us, delay, || !wuclk_out()).is_err();
        if deassert_timed_out {
            ringbuf_entry!(Trace::ClockDeassertTimeout);
        }

        let status = IoChainStatus::Reconfigured {
            assert_timed_out,
            deassert_timed_out,
        };
        ringbuf_entry!(Trace::Chain(status));
        status
    }

    /// Boot-time PRCM setup: turns on I/O wakeups and, on parts with erratum
    /// i612, recycles the wakeup chain left stale by a warm reset.
    ///
    /// Returns the chain status if it was recycled.
    pub fn prcm_init<D: DelayUs<u32>>(
        &self,
        delay: &mut D,
    ) -> Option<IoChainStatus> {
        self.enable_io_wakeup();

        if self.soc().has_erratum_i612() {
            ringbuf_entry!(Trace::Erratum612);
            Some(self.reconfigure_io_chain(delay))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmio::sim::{Reaction, SimMmio};
    use crate::prminst::PrmGlobals;
    use crate::{SocVariant, MAX_IOPAD_LATCH_TIME};
    use bounded_poll::CountingDelay;

    const PRM_BASE: usize = 0x4a30_6000;
    const IRQSTATUS: usize = PRM_BASE + 0x10;
    const IRQENABLE: usize = PRM_BASE + 0x18;

    fn prm(soc: SocVariant) -> PrmInstances<SimMmio> {
        let mut p = PrmInstances::new(SimMmio::new(), soc);
        p.base_init(&PrmGlobals {
            prm: PRM_BASE,
            prcm_mpu: 0x4800_0000,
            scrm: 0x4a30_a000,
        });
        p
    }

    fn pmctrl(p: &PrmInstances<SimMmio>) -> usize {
        PRM_BASE + p.soc().device_inst() as usize + 0x20
    }

    /// Makes WUCLKOUT follow WUCLKIN after `lag` reads.
    fn follow_clock(p: &PrmInstances<SimMmio>, lag: u32) {
        let addr = pmctrl(p);
        let ctrl = IoPmCtrl::WUCLK_CTRL.bits();
        let status = IoPmCtrl::WUCLK_STATUS.bits();
        for level in [true, false] {
            p.mmio().on_write(
                addr,
                ctrl,
                if level { ctrl } else { 0 },
                Reaction {
                    addr,
                    bits: status,
                    set: level,
                    after_reads: lag,
                },
            );
        }
    }

    #[test]
    fn wakeup_enable_sets_only_wuen() {
        let p = prm(SocVariant::Omap446x);
        p.mmio().poke(pmctrl(&p), 0x100);
        p.enable_io_wakeup();
        assert_eq!(p.mmio().peek(pmctrl(&p)), 0x1_0100);
    }

    #[test]
    fn chain_cycles_the_wakeup_clock() {
        let p = prm(SocVariant::Omap54xx);
        follow_clock(&p, 3);
        let mut delay = CountingDelay::default();

        let status = p.reconfigure_io_chain(&mut delay);

        assert_eq!(
            status,
            IoChainStatus::Reconfigured {
                assert_timed_out: false,
                deassert_timed_out: false,
            }
        );
        let addr = pmctrl(&p);
        assert_eq!(p.mmio().writes(), [(addr, 0x100), (addr, 0x200)]);
        assert_eq!(p.mmio().peek(addr), 0);
        assert_eq!(delay.calls, 6);
    }

    #[test]
    fn stuck_clock_is_reported_per_edge() {
        let p = prm(SocVariant::Omap54xx);
        let mut delay = CountingDelay::default();

        let status = p.reconfigure_io_chain(&mut delay);

        assert_eq!(
            status,
            IoChainStatus::Reconfigured {
                assert_timed_out: true,
                deassert_timed_out: false,
            }
        );
        assert_eq!(delay.calls, MAX_IOPAD_LATCH_TIME);
    }

    #[test]
    fn pending_io_wakeup_defers_on_omap4() {
        let p = prm(SocVariant::Omap443x);
        p.mmio().poke(IRQSTATUS, IrqMpu::IO_ST.bits());
        p.mmio().poke(IRQENABLE, IrqMpu::IO_ST.bits());

        let status = p.reconfigure_io_chain(&mut CountingDelay::default());

        assert_eq!(status, IoChainStatus::SkippedPendingWakeup);
        assert!(p.mmio().writes().is_empty());
    }

    #[test]
    fn masked_io_wakeup_does_not_defer() {
        let p = prm(SocVariant::Omap443x);
        follow_clock(&p, 0);
        p.mmio().poke(IRQSTATUS, IrqMpu::IO_ST.bits());

        let status = p.reconfigure_io_chain(&mut CountingDelay::default());

        assert!(matches!(status, IoChainStatus::Reconfigured { .. }));
    }

    #[test]
    fn prcm_init_applies_i612_where_needed() {
        let p = prm(SocVariant::Omap443x);
        follow_clock(&p, 0);
        let r = p.prcm_init(&mut CountingDelay::default());
        assert!(matches!(r, Some(IoChainStatus::Reconfigured { .. })));
        assert_ne!(p.mmio().peek(pmctrl(&p)) & 0x1_0000, 0);

        let p = prm(SocVariant::Omap447x);
        let r = p.prcm_init(&mut CountingDelay::default());
        assert_eq!(r, None);
        assert_eq!(p.mmio().writes(), [(pmctrl(&p), 0x1_0000)]);
    }
}
