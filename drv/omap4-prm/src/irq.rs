// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The PRM's interrupt lines to the MPU.
//!
//! Two status/enable register pairs live in the PRM_OCP_SOCKET instance.
//! Arrays of two `u32`s below are always `[MPU, MPU_2]`.

use crate::mmio::Mmio;
use crate::prminst::{Partition, PrmInstances};
use crate::regs::{
    IrqMpu, OMAP4430_PRM_OCP_SOCKET_INST as OCP_SOCKET, PRM_IRQENABLE_MPU,
    PRM_IRQENABLE_MPU_2, PRM_IRQSTATUS_MPU, PRM_IRQSTATUS_MPU_2, REVISION_PRM,
};

/// A PRCM interrupt that gets its own handler.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PrcmIrq {
    pub name: &'static str,
    /// Bit index across both status registers; 32 and up is MPU_2.
    pub offset: u8,
    pub priority: bool,
}

pub const OMAP4_PRCM_IRQS: [PrcmIrq; 2] = [
    PrcmIrq {
        name: "wkup",
        offset: IrqMpu::WKUP_ST.bits().trailing_zeros() as u8,
        priority: false,
    },
    PrcmIrq {
        name: "io",
        offset: IrqMpu::IO_ST.bits().trailing_zeros() as u8,
        priority: true,
    },
];

impl<M: Mmio> PrmInstances<M> {
    fn ocp_read(&self, reg: u16) -> u32 {
        self.read_inst_reg(Partition::Prm, OCP_SOCKET, reg)
    }

    fn ocp_write(&self, value: u32, reg: u16) {
        self.write_inst_reg(value, Partition::Prm, OCP_SOCKET, reg)
    }

    fn pending_irq_reg(&self, irqen: u16, irqst: u16) -> u32 {
        let mask = self.ocp_read(irqen);
        mask & self.ocp_read(irqst)
    }

    /// Returns the PRM MPU interrupts that are both raised and enabled.
    pub fn read_pending_irqs(&self) -> [u32; 2] {
        [
            self.pending_irq_reg(PRM_IRQENABLE_MPU, PRM_IRQSTATUS_MPU),
            self.pending_irq_reg(PRM_IRQENABLE_MPU_2, PRM_IRQSTATUS_MPU_2),
        ]
    }

    /// Forces buffered writes to the PRM to complete, by reading it back.
    pub fn ocp_barrier(&self) {
        self.ocp_read(REVISION_PRM);
    }

    /// Masks every PRM MPU interrupt and returns the enables as they were.
    pub fn save_and_clear_irqen(&self) -> [u32; 2] {
        let saved = [
            self.ocp_read(PRM_IRQENABLE_MPU),
            self.ocp_read(PRM_IRQENABLE_MPU_2),
        ];
        self.ocp_write(0, PRM_IRQENABLE_MPU);
        self.ocp_write(0, PRM_IRQENABLE_MPU_2);

        // Without this, an interrupt can still fire after we return.
        self.ocp_barrier();
        saved
    }

    /// Writes back enables saved by [`Self::save_and_clear_irqen`]. Anything
    /// pending fires once the writes land.
    pub fn restore_irqen(&self, saved: [u32; 2]) {
        self.ocp_write(saved[0], PRM_IRQENABLE_MPU);
        self.ocp_write(saved[1], PRM_IRQENABLE_MPU_2);
    }
}
