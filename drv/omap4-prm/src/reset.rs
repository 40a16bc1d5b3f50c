// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Module hardreset lines.
//!
//! Some IP blocks (DSP, IPU, IVA) contain processors held in reset by one
//! or more hardreset lines in their RM_RSTCTRL register. Each line has a
//! matching bit in RM_RSTST, four bytes further on, which the PRCM sets
//! once the submodule has actually come out of reset.

use bounded_poll::{poll_until, DelayUs};
use num_derive::FromPrimitive;
use ringbuf::{ringbuf, ringbuf_entry};

use crate::mmio::Mmio;
use crate::prminst::{Partition, PrmInstances};

/// Distance from RM_RSTCTRL to RM_RSTST.
const RST_CTRL_ST_OFFSET: u16 = 4;

#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
#[repr(u32)]
pub enum ResetError {
    /// The line was already deasserted; nothing was written.
    AlreadyDeasserted = 1,
    /// The submodule didn't report leaving reset in time.
    Busy = 2,
}

impl From<ResetError> for u32 {
    fn from(e: ResetError) -> Self {
        e as u32
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Trace {
    None,
    Assert {
        part: Partition,
        inst: i16,
        rstctrl: u16,
        shift: u8,
    },
    Deassert {
        part: Partition,
        inst: i16,
        rstctrl: u16,
        shift: u8,
    },
    AlreadyDeasserted {
        rstctrl: u16,
        shift: u8,
    },
    OutOfReset {
        polls: u32,
    },
    StillInReset {
        rstctrl: u16,
        shift: u8,
    },
}

ringbuf!(Trace, 16, Trace::None);

fn line_mask(shift: u8) -> u32 {
    debug_assert!(shift < 32, "reset line {shift} out of range");
    1 << shift
}

impl<M: Mmio> PrmInstances<M> {
    /// Reports whether bit `shift` of the register at `rstctrl` is set.
    ///
    /// Also used on the RSTST register, to see whether a reset completed.
    pub fn is_hardreset_asserted(
        &self,
        shift: u8,
        part: Partition,
        inst: i16,
        rstctrl: u16,
    ) -> bool {
        self.read_inst_reg(part, inst, rstctrl) & line_mask(shift) != 0
    }

    pub fn assert_hardreset(
        &self,
        shift: u8,
        part: Partition,
        inst: i16,
        rstctrl: u16,
    ) {
        ringbuf_entry!(Trace::Assert {
            part,
            inst,
            rstctrl,
            shift
        });
        let mask = line_mask(shift);
        self.rmw_inst_reg_bits(mask, mask, part, inst, rstctrl);
    }

    /// Releases a hardreset line and waits for the PRCM to confirm the
    /// submodule is out of reset.
    pub fn deassert_hardreset<D: DelayUs<u32>>(
        &self,
        shift: u8,
        part: Partition,
        inst: i16,
        rstctrl: u16,
        delay: &mut D,
    ) -> Result<(), ResetError> {
        let mask = line_mask(shift);
        // Register offsets are 16 bits wide and wrap.
        let rstst = rstctrl.wrapping_add(RST_CTRL_ST_OFFSET);

        if !self.is_hardreset_asserted(shift, part, inst, rstctrl) {
            ringbuf_entry!(Trace::AlreadyDeasserted { rstctrl, shift });
            return Err(ResetError::AlreadyDeasserted);
        }

        ringbuf_entry!(Trace::Deassert {
            part,
            inst,
            rstctrl,
            shift
        });

        // RSTST is write-1-to-clear; write only our bit.
        self.rmw_inst_reg_bits(0xffff_ffff, mask, part, inst, rstst);
        self.rmw_inst_reg_bits(mask, 0, part, inst, rstctrl);

        match poll_until(
            self.config().hardreset_wait,
            self.config().poll_delay_us,
            delay,
            || self.is_hardreset_asserted(shift, part, inst, rstst),
        ) {
            Ok(polls) => {
                ringbuf_entry!(Trace::OutOfReset { polls });
                Ok(())
            }
            Err(_) => {
                ringbuf_entry!(Trace::StillInReset { rstctrl, shift });
                Err(ResetError::Busy)
            }
        }
    }
}
