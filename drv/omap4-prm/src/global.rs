// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Whole-chip software reset, and the record of why we last reset.

use bounded_poll::DelayUs;
use ringbuf::{ringbuf, ringbuf_entry};

use crate::mmio::Mmio;
use crate::prminst::{Partition, PrmInstances};
use crate::regs::{RstCtrl, RstSt, PRM_RSTCTRL, PRM_RSTST};

/// Causes of the last reset, as latched in PRM_RSTST.
pub type ResetStatus = RstSt;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Trace {
    None,
    WarmReset,
    ColdReset,
    StatusCleared(u32),
}

ringbuf!(Trace, 4, Trace::None);

impl<M: Mmio> PrmInstances<M> {
    /// Requests a global warm reset.
    ///
    /// On hardware this does not return in any meaningful sense; the chip
    /// resets shortly after the write lands.
    pub fn global_warm_sw_reset(&self) {
        let inst = self.soc().device_inst();
        ringbuf_entry!(Trace::WarmReset);

        let v = self.read_inst_reg(Partition::Prm, inst, PRM_RSTCTRL)
            | RstCtrl::RST_GLOBAL_WARM_SW.bits();
        self.write_inst_reg(v, Partition::Prm, inst, PRM_RSTCTRL);

        // OCP barrier
        self.read_inst_reg(Partition::Prm, inst, PRM_RSTCTRL);
    }

    /// Requests a global cold reset, then waits out the time the PRCM takes
    /// to assert it.
    pub fn global_cold_sw_reset<D: DelayUs<u32>>(&self, delay: &mut D) {
        let inst = self.soc().device_inst();
        ringbuf_entry!(Trace::ColdReset);

        // The boot ROM or PPA may have left this latched.
        self.write_inst_reg(
            RstSt::GLOBAL_COLD_RST.bits(),
            Partition::Prm,
            inst,
            PRM_RSTST,
        );

        let v = self.read_inst_reg(Partition::Prm, inst, PRM_RSTCTRL)
            | RstCtrl::RST_GLOBAL_COLD_SW.bits();
        self.write_inst_reg(v, Partition::Prm, inst, PRM_RSTCTRL);

        // OCP barrier
        self.read_inst_reg(Partition::Prm, inst, PRM_RSTCTRL);

        delay.delay_us(self.config().cold_reset_settle_us);
    }

    pub fn reset_status(&self) -> ResetStatus {
        let inst = self.soc().device_inst();
        RstSt::from_bits_truncate(self.read_inst_reg(
            Partition::Prm,
            inst,
            PRM_RSTST,
        ))
    }

    /// Clears the given reset causes.
    pub fn clear_reset_status(&self, which: ResetStatus) {
        let inst = self.soc().device_inst();
        ringbuf_entry!(Trace::StatusCleared(which.bits()));
        self.write_inst_reg(which.bits(), Partition::Prm, inst, PRM_RSTST);
    }
}
