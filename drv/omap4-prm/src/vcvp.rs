// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OMAP4/OMAP5 implementations of the `drv-omap-vp` capabilities.
//!
//! The VC and VP registers live in the PRM_DEVICE instance of the PRM
//! partition. Transaction-done events for the VPs and the ABB LDOs are
//! reported in the PRM_IRQSTATUS_MPU registers of PRM_OCP_SOCKET.

use drv_omap_vp::{DomainRegs, VpCommon, VpInstance, VpOps, VpRegs};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use ringbuf::{ringbuf, ringbuf_entry};

use crate::mmio::Mmio;
use crate::prminst::{Partition, PrmInstances};
use crate::regs::{
    IrqMpu, IrqMpu2, OMAP4430_PRM_OCP_SOCKET_INST, PRM_IRQSTATUS_MPU,
    PRM_IRQSTATUS_MPU_2, PRM_VP_CORE_CONFIG, PRM_VP_IVA_CONFIG,
    PRM_VP_MPU_CONFIG,
};

pub static OMAP4_VP_COMMON: VpCommon = VpCommon {
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

#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
#[repr(u8)]
pub enum VpId {
    Mpu = 0,
    Iva = 1,
    Core = 2,
}

impl VpId {
    pub fn regs(self) -> VpRegs {
        let base = match self {
            VpId::Mpu => PRM_VP_MPU_CONFIG,
            VpId::Iva => PRM_VP_IVA_CONFIG,
            VpId::Core => PRM_VP_CORE_CONFIG,
        };
        VpRegs {
            vpconfig: base,
            vstatus: base + 0x04,
            vlimitto: base + 0x08,
            voltage: base + 0x0c,
            vstepmax: base + 0x10,
            vstepmin: base + 0x14,
        }
    }

    /// Status register and bit reporting this VP's TRANXDONE.
    fn tranxdone(self) -> (u16, u32) {
        match self {
            VpId::Mpu => (
                PRM_IRQSTATUS_MPU_2,
                IrqMpu2::VP_MPU_TRANXDONE_ST.bits(),
            ),
            VpId::Iva => {
                (PRM_IRQSTATUS_MPU, IrqMpu::VP_IVA_TRANXDONE_ST.bits())
            }
            VpId::Core => {
                (PRM_IRQSTATUS_MPU, IrqMpu::VP_CORE_TRANXDONE_ST.bits())
            }
        }
    }

    /// Builds the VP instance for this VP on OMAP4/OMAP5.
    pub fn instance<O>(self, ops: O) -> VpInstance<O> {
        VpInstance::new(self as u8, self.regs(), &OMAP4_VP_COMMON, ops)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AbbId {
    Mpu,
    Iva,
}

impl AbbId {
    fn done(self) -> (u16, u32) {
        match self {
            AbbId::Mpu => {
                (PRM_IRQSTATUS_MPU_2, IrqMpu2::ABB_MPU_DONE_ST.bits())
            }
            AbbId::Iva => {
                (PRM_IRQSTATUS_MPU, IrqMpu::ABB_IVA_DONE_ST.bits())
            }
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Trace {
    None,
    UnknownVp(u8),
}

ringbuf!(Trace, 4, Trace::None);

impl<M: Mmio> PrmInstances<M> {
    fn irqstatus_test(&self, (reg, bit): (u16, u32)) -> bool {
        self.read_inst_reg(Partition::Prm, OMAP4430_PRM_OCP_SOCKET_INST, reg)
            & bit
            != 0
    }

    fn irqstatus_ack(&self, (reg, bit): (u16, u32)) {
        self.write_inst_reg(
            bit,
            Partition::Prm,
            OMAP4430_PRM_OCP_SOCKET_INST,
            reg,
        );
    }

    pub fn abb_check_txdone(&self, abb: AbbId) -> bool {
        self.irqstatus_test(abb.done())
    }

    pub fn abb_clear_txdone(&self, abb: AbbId) {
        self.irqstatus_ack(abb.done())
    }
}

/// The VC/VP register bank of one PRM, as a [`DomainRegs`].
pub struct Omap4VcVpRegs<'a, M> {
    prm: &'a PrmInstances<M>,
    inst: i16,
}

impl<'a, M: Mmio> Omap4VcVpRegs<'a, M> {
    /// Uses the PRM_DEVICE instance for the PRM's SoC generation.
    pub fn new(prm: &'a PrmInstances<M>) -> Self {
        Self {
            prm,
            inst: prm.soc().device_inst(),
        }
    }
}

impl<M: Mmio> DomainRegs for Omap4VcVpRegs<'_, M> {
    fn read(&self, offset: u8) -> u32 {
        self.prm
            .read_inst_reg(Partition::Prm, self.inst, u16::from(offset))
    }

    fn write(&self, value: u32, offset: u8) {
        self.prm.write_inst_reg(
            value,
            Partition::Prm,
            self.inst,
            u16::from(offset),
        )
    }

    fn rmw(&self, mask: u32, bits: u32, offset: u8) -> Option<u32> {
        Some(self.prm.rmw_inst_reg_bits(
            mask,
            bits,
            Partition::Prm,
            self.inst,
            u16::from(offset),
        ))
    }
}

/// TRANXDONE handling for OMAP4/OMAP5 VPs, as a [`VpOps`].
///
/// There's no recovery procedure for these VPs.
pub struct Omap4VpOps<'a, M> {
    prm: &'a PrmInstances<M>,
}

impl<'a, M: Mmio> Omap4VpOps<'a, M> {
    pub fn new(prm: &'a PrmInstances<M>) -> Self {
        Self { prm }
    }
}

impl<M: Mmio> VpOps for Omap4VpOps<'_, M> {
    fn check_txdone(&self, vp_id: u8) -> bool {
        match VpId::from_u8(vp_id) {
            Some(vp) => self.prm.irqstatus_test(vp.tranxdone()),
            None => {
                ringbuf_entry!(Trace::UnknownVp(vp_id));
                false
            }
        }
    }

    fn clear_txdone(&self, vp_id: u8) {
        match VpId::from_u8(vp_id) {
            Some(vp) => self.prm.irqstatus_ack(vp.tranxdone()),
            None => ringbuf_entry!(Trace::UnknownVp(vp_id)),
        }
    }
}
