// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! What a voltage domain must provide for the VP engine to drive it.
//!
//! A domain is assembled from optional capabilities. Each one is a trait
//! implemented by the SoC layer (see `drv-omap4-prm` for OMAP4/5); the
//! engine checks for the pieces it needs on every call and refuses to touch
//! hardware when one is missing.

/// Register access for the VC/VP bank a domain lives in.
///
/// Offsets are byte offsets within that bank. `rmw` is optional; banks that
/// can't do it return `None` and the engine treats that as a missing
/// capability.
pub trait DomainRegs {
    fn read(&self, offset: u8) -> u32;
    fn write(&self, value: u32, offset: u8);

    /// Replaces the bits under `mask` with `bits`, returning the value
    /// written.
    fn rmw(&self, _mask: u32, _bits: u32, _offset: u8) -> Option<u32> {
        None
    }
}

/// Electrical characteristics of the PMIC feeding a domain.
///
/// Voltages are in microvolts; `slew_rate` is in µV/µs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PmicParams {
    pub step_size: u32,
    pub slew_rate: u32,
    pub vp_erroroffset: u8,
    pub vp_vstepmin: u8,
    pub vp_vstepmax: u8,
    pub vp_timeout_us: u32,
    pub vddmin: u32,
    pub vddmax: u32,
}

/// Conversion between microvolts and the PMIC's voltage selector.
pub trait Pmic {
    fn params(&self) -> &PmicParams;
    fn uv_to_vsel(&self, uv: u32) -> u8;
    fn vsel_to_uv(&self, vsel: u8) -> u32;
}

/// SoC-specific handling of a VP's transaction-done event.
pub trait VpOps {
    /// Whether this VP has a recovery hook worth calling. When `false`, the
    /// error budget leaves its recovery countdown alone.
    const RECOVERABLE: bool = false;

    fn check_txdone(&self, vp_id: u8) -> bool;
    fn clear_txdone(&self, vp_id: u8);

    fn recover(&self, _vp_id: u8) {}
}

/// Bit layout of the registers shared by every VP on a SoC generation.
///
/// Each `*_mask` names a multi-bit field; its shift is the mask's lowest set
/// bit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VpCommon {
    pub vpconfig_erroroffset_mask: u32,
    pub vpconfig_errorgain_mask: u32,
    pub vpconfig_initvoltage_mask: u32,
    pub vpconfig_timeouten: u32,
    pub vpconfig_initvdd: u32,
    pub vpconfig_forceupdate: u32,
    pub vpconfig_vpenable: u32,
    pub vstatus_vpidle: u32,
    pub vstepmin_smpswaittimemin_shift: u32,
    pub vstepmin_stepmin_shift: u32,
    pub vstepmax_smpswaittimemax_shift: u32,
    pub vstepmax_stepmax_shift: u32,
    pub vlimitto_vddmin_shift: u32,
    pub vlimitto_vddmax_shift: u32,
    pub vlimitto_timeout_shift: u32,
    pub vpvoltage_mask: u32,
}

/// Places `value` in the field described by `mask`.
pub(crate) fn field_prep(mask: u32, value: u32) -> u32 {
    (value << mask.trailing_zeros()) & mask
}

/// Extracts the field described by `mask` from `reg`.
pub(crate) fn field_get(mask: u32, reg: u32) -> u32 {
    (reg & mask) >> mask.trailing_zeros()
}

/// Offsets of one VP's registers within the domain's register bank.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VpRegs {
    pub vpconfig: u8,
    pub vstatus: u8,
    pub vlimitto: u8,
    pub voltage: u8,
    pub vstepmax: u8,
    pub vstepmin: u8,
}

/// One Voltage Processor instance.
#[derive(Debug)]
pub struct VpInstance<O> {
    pub id: u8,
    pub regs: VpRegs,
    pub common: &'static VpCommon,
    pub ops: O,
    pub(crate) enabled: bool,
}

impl<O> VpInstance<O> {
    pub const fn new(
        id: u8,
        regs: VpRegs,
        common: &'static VpCommon,
        ops: O,
    ) -> Self {
        Self {
            id,
            regs,
            common,
            ops,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Voltage Controller limits for a domain, in microvolts.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VcParams {
    pub on: u32,
    pub onlp: u32,
    pub ret: u32,
    pub off: u32,
}

/// Voltage Processor limits for a domain, in microvolts.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VpParams {
    pub vddmin: u32,
    pub vddmax: u32,
}

/// A voltage domain: a rail and everything needed to move it.
///
/// Any capability may be absent. Boards routinely describe domains that have
/// no VP, or whose PMIC isn't wired up yet.
#[derive(Debug)]
pub struct VoltageDomain<R, O, P> {
    pub name: &'static str,
    /// System clock feeding the VP, in Hz.
    pub sys_clk_rate: u32,
    pub regs: Option<R>,
    pub pmic: Option<P>,
    pub vp: Option<VpInstance<O>>,
    pub vc_param: Option<VcParams>,
    pub vp_param: Option<VpParams>,
}

/// An operating point for a domain.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VoltData {
    pub volt_nominal: u32,
    /// Voltage after SmartReflex calibration, if calibration has run.
    pub volt_calibrated: Option<u32>,
    pub vp_errgain: u8,
    pub sr_efuse_offs: u16,
    pub sr_errminlimit: u8,
}

impl VoltData {
    pub const fn new(volt_nominal: u32, vp_errgain: u8) -> Self {
        Self {
            volt_nominal,
            volt_calibrated: None,
            vp_errgain,
            sr_efuse_offs: 0,
            sr_errminlimit: 0,
        }
    }

    /// The voltage to actually program: calibrated if known, else nominal.
    pub fn operation_voltage(&self) -> u32 {
        self.volt_calibrated.unwrap_or(self.volt_nominal)
    }
}

/// Hooks run by the Voltage Controller around a forced update.
pub trait VoltageController {
    type Error;

    /// Prepares the VC for a move to `target_uv` and returns
    /// `(target_vsel, current_vsel)`.
    fn pre_scale(
        &mut self,
        domain: &'static str,
        target_uv: u32,
        target: &VoltData,
    ) -> Result<(u8, u8), Self::Error>;

    fn post_scale(
        &mut self,
        domain: &'static str,
        target_uv: u32,
        target: &VoltData,
        target_vsel: u8,
        current_vsel: u8,
    );
}

/// Lookup of a domain's current operating point.
pub trait VoltageTable {
    fn current_volt_data(&self, domain: &str) -> Option<VoltData>;
}
