// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver for the OMAP4/OMAP5 Power and Reset Manager (PRM).
//!
//! The PRCM register space is split into partitions (PRM, CM1, CM2, SCRM,
//! PRCM_MPU), each mapped at its own base address and subdivided into
//! instances. [`PrmInstances`] owns the partition table and is the only
//! thing in this crate that touches registers; every other module adds
//! methods to it or borrows it:
//!
//! - [`reset`]: module hardreset lines;
//! - [`global`]: whole-chip warm and cold software reset;
//! - [`irq`]: the PRM's MPU interrupt status and enable registers;
//! - [`iochain`]: I/O pad wakeup daisy chain;
//! - [`vcvp`]: the VC/VP register bank and transaction-done events, in the
//!   shape `drv-omap-vp` wants them.

#![cfg_attr(target_os = "none", no_std)]

pub mod global;
pub mod iochain;
pub mod irq;
pub mod mmio;
pub mod prminst;
pub mod regs;
pub mod reset;
pub mod vcvp;

pub use global::ResetStatus;
pub use iochain::IoChainStatus;
pub use mmio::{Mmio, VolatileMmio};
pub use prminst::{Partition, PrmGlobals, PrmInstances, MAX_PARTITIONS};
pub use reset::ResetError;
pub use vcvp::{AbbId, Omap4VcVpRegs, Omap4VpOps, VpId, OMAP4_VP_COMMON};

#[cfg(not(target_os = "none"))]
pub use mmio::sim::{Reaction, SimMmio};

include!(concat!(env!("OUT_DIR"), "/prm_config.rs"));

/// Polling budgets and delays used by a [`PrmInstances`]. Defaults come from
/// the `omap4-prm` table of the application config.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PrmConfig {
    pub hardreset_wait: u32,
    pub iopad_latch_time: u32,
    pub cold_reset_settle_us: u32,
    pub poll_delay_us: u32,
}

impl Default for PrmConfig {
    fn default() -> Self {
        Self {
            hardreset_wait: MAX_MODULE_HARDRESET_WAIT,
            iopad_latch_time: MAX_IOPAD_LATCH_TIME,
            cold_reset_settle_us: COLD_RESET_SETTLE_US,
            poll_delay_us: PRM_POLL_DELAY_US,
        }
    }
}

/// The chips this driver knows how to handle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SocVariant {
    Omap443x,
    Omap446x,
    Omap447x,
    /// OMAP5430 and OMAP5432 ES1.0.
    Omap54xxEs1,
    Omap54xx,
}

impl SocVariant {
    pub fn is_omap44xx(self) -> bool {
        matches!(
            self,
            SocVariant::Omap443x | SocVariant::Omap446x | SocVariant::Omap447x
        )
    }

    /// Offset of the PRM_DEVICE instance within the PRM partition.
    pub fn device_inst(self) -> i16 {
        if self.is_omap44xx() {
            regs::OMAP4430_PRM_DEVICE_INST
        } else {
            regs::OMAP54XX_PRM_DEVICE_INST
        }
    }

    /// Erratum i612: the I/O wakeup clock isn't recycled by a global warm
    /// reset, so stale pad wakeups can survive it.
    pub fn has_erratum_i612(self) -> bool {
        matches!(self, SocVariant::Omap443x | SocVariant::Omap54xxEs1)
    }
}
