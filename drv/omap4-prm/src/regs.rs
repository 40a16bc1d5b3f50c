// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! PRM instance offsets, register offsets, and register bits.

use bitflags::bitflags;

// Instances within the PRM partition.
pub const OMAP4430_PRM_OCP_SOCKET_INST: i16 = 0x0000;
pub const OMAP4430_PRM_DEVICE_INST: i16 = 0x1b00;
pub const OMAP54XX_PRM_DEVICE_INST: i16 = 0x1c00;

// PRM_OCP_SOCKET registers.
pub const REVISION_PRM: u16 = 0x0000;
pub const PRM_IRQSTATUS_MPU: u16 = 0x0010;
pub const PRM_IRQSTATUS_MPU_2: u16 = 0x0014;
pub const PRM_IRQENABLE_MPU: u16 = 0x0018;
pub const PRM_IRQENABLE_MPU_2: u16 = 0x001c;

// PRM_DEVICE registers.
pub const PRM_RSTCTRL: u16 = 0x0000;
pub const PRM_RSTST: u16 = 0x0004;
pub const PRM_IO_PMCTRL: u16 = 0x0020;

bitflags! {
    /// PRM_RSTCTRL
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct RstCtrl: u32 {
        const RST_GLOBAL_WARM_SW = 1 << 0;
        const RST_GLOBAL_COLD_SW = 1 << 1;
    }
}

bitflags! {
    /// PRM_RSTST. Write 1 to clear.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct RstSt: u32 {
        const GLOBAL_COLD_RST = 1 << 0;
        const GLOBAL_WARM_SW_RST = 1 << 1;
        const MPU_WDT_RST = 1 << 3;
        const EXTERNAL_WARM_RST = 1 << 5;
        const VDD_MPU_VOLT_MGR_RST = 1 << 6;
        const VDD_IVA_VOLT_MGR_RST = 1 << 7;
        const VDD_CORE_VOLT_MGR_RST = 1 << 8;
        const ICEPICK_RST = 1 << 9;
        const C2C_RST = 1 << 10;
    }
}

bitflags! {
    /// PRM_IRQSTATUS_MPU and PRM_IRQENABLE_MPU. Status bits are write 1 to
    /// clear.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct IrqMpu: u32 {
        const WKUP_ST = 1 << 0;
        const IO_ST = 1 << 9;
        const VP_CORE_TRANXDONE_ST = 1 << 21;
        const VP_IVA_TRANXDONE_ST = 1 << 29;
        const ABB_IVA_DONE_ST = 1 << 31;
        const _ = !0;
    }
}

bitflags! {
    /// PRM_IRQSTATUS_MPU_2 and PRM_IRQENABLE_MPU_2.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct IrqMpu2: u32 {
        const VP_MPU_TRANXDONE_ST = 1 << 5;
        const ABB_MPU_DONE_ST = 1 << 7;
        const _ = !0;
    }
}

bitflags! {
    /// PRM_IO_PMCTRL
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct IoPmCtrl: u32 {
        const WUCLK_CTRL = 1 << 8;
        const WUCLK_STATUS = 1 << 9;
        const GLOBAL_WUEN = 1 << 16;
    }
}

// VC/VP registers in PRM_DEVICE, per VP, in the order CONFIG, STATUS,
// VLIMITTO, VOLTAGE, VSTEPMAX, VSTEPMIN.
pub const PRM_VP_CORE_CONFIG: u8 = 0x40;
pub const PRM_VP_MPU_CONFIG: u8 = 0x58;
pub const PRM_VP_IVA_CONFIG: u8 = 0x70;
