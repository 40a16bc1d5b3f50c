// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver for the OMAP Voltage Processor (VP).
//!
//! The VP sits between the PRCM and the PMIC and moves a voltage domain from
//! one level to another. This crate drives it in *force update* mode: the
//! target selector is loaded into VPCONFIG.INITVOLTAGE and the VP is told to
//! send it to the PMIC at once, with the Voltage Controller notified before
//! and after via [`VoltageController`].
//!
//! Everything SoC-specific comes in through the capability traits in
//! [`domain`]; this crate only knows the sequencing.
//!
//! All waits are bounded busy-waits (see [`bounded_poll`]). A VP that stops
//! responding is reported through an [`ErrorBudget`], which keeps error
//! storms out of the trace ring and periodically invokes recovery.

#![cfg_attr(target_os = "none", no_std)]

pub mod budget;
pub mod domain;
pub mod error;

pub use budget::{ErrorBudget, Fault, FaultKind, Report, Verbosity};
pub use domain::{
    DomainRegs, Pmic, PmicParams, VcParams, VoltData, VoltageController,
    VoltageDomain, VoltageTable, VpCommon, VpInstance, VpOps, VpParams,
    VpRegs,
};
pub use error::{ScaleError, VpError};

use bounded_poll::{poll_until, retry_until, DelayUs, TimedOut};
use domain::{field_get, field_prep};
use ringbuf::{ringbuf, ringbuf_entry};

include!(concat!(env!("OUT_DIR"), "/vp_config.rs"));

/// Polling budgets used by a [`Vp`]. Defaults come from the `omap-vp` table
/// of the application config.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VpConfig {
    pub idle_timeout: u32,
    pub tranxdone_timeout: u32,
    pub poll_delay_us: u32,
}

impl Default for VpConfig {
    fn default() -> Self {
        Self {
            idle_timeout: VP_IDLE_TIMEOUT,
            tranxdone_timeout: VP_TRANXDONE_TIMEOUT,
            poll_delay_us: VP_POLL_DELAY_US,
        }
    }
}

/// A capability a domain was asked for but doesn't have.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Missing {
    Regs,
    Rmw,
    Pmic,
    Vp,
    VcParam,
    VpParam,
    Target,
    SlewRate,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Trace {
    None,
    Missing {
        domain: &'static str,
        what: Missing,
    },
    Init {
        vp_id: u8,
        vddmin: u8,
        vddmax: u8,
        waittime: u32,
        timeout: u32,
    },
    ErrorGain {
        vp_id: u8,
        errgain: u8,
    },
    IdleTimeout {
        vp_id: u8,
    },
    ScaleStart {
        vp_id: u8,
        target_uv: u32,
    },
    PreScaleFailed {
        vp_id: u8,
    },
    ForceUpdate {
        vp_id: u8,
        vpconfig: u32,
        target_vsel: u8,
        current_vsel: u8,
    },
    ScaleDone {
        vp_id: u8,
        target_uv: u32,
    },
    NoCurrentVoltage {
        domain: &'static str,
    },
    Enabled {
        vp_id: u8,
        volt: u32,
    },
    AlreadyDisabled {
        domain: &'static str,
    },
    Disabled {
        vp_id: u8,
    },
}

ringbuf!(Trace, 32, Trace::None);

/// Handle for driving Voltage Processors.
///
/// One `Vp` can drive any number of domains; it holds only the busy-wait
/// delay, the polling budgets, and a reference to the error budget those
/// domains report into.
pub struct Vp<'a, D> {
    errors: &'a ErrorBudget,
    delay: D,
    config: VpConfig,
}

impl<'a, D: DelayUs<u32>> Vp<'a, D> {
    pub fn new(errors: &'a ErrorBudget, delay: D) -> Self {
        Self::with_config(errors, delay, VpConfig::default())
    }

    pub fn with_config(
        errors: &'a ErrorBudget,
        delay: D,
        config: VpConfig,
    ) -> Self {
        Self {
            errors,
            delay,
            config,
        }
    }

    pub fn config(&self) -> &VpConfig {
        &self.config
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Returns the voltage the VP last sent to the PMIC, in microvolts, or
    /// zero if the domain can't tell us.
    pub fn read_current_voltage<R, O, P>(
        &self,
        domain: &VoltageDomain<R, O, P>,
    ) -> u32
    where
        R: DomainRegs,
        P: Pmic,
    {
        let name = domain.name;
        let Some(regs) = domain.regs.as_ref() else {
            return missing(name, Missing::Regs, 0);
        };
        let Some(vp) = domain.vp.as_ref() else {
            return missing(name, Missing::Vp, 0);
        };
        let Some(pmic) = domain.pmic.as_ref() else {
            return missing(name, Missing::Pmic, 0);
        };

        let vsel =
            field_get(vp.common.vpvoltage_mask, regs.read(vp.regs.voltage));
        pmic.vsel_to_uv(vsel as u8)
    }

    /// Programs the VP's static configuration: error offset, step sizes,
    /// step timing, and voltage limits. Leaves the VP disabled.
    pub fn init<R, O, P>(&mut self, domain: &mut VoltageDomain<R, O, P>)
    where
        R: DomainRegs,
        P: Pmic,
    {
        let name = domain.name;
        let Some(pmic) = domain.pmic.as_ref() else {
            return missing(name, Missing::Pmic, ());
        };
        let Some(regs) = domain.regs.as_ref() else {
            return missing(name, Missing::Regs, ());
        };
        let Some(vp) = domain.vp.as_mut() else {
            return missing(name, Missing::Vp, ());
        };
        let Some(vc_param) = domain.vc_param.as_ref() else {
            return missing(name, Missing::VcParam, ());
        };
        let Some(vp_param) = domain.vp_param.as_ref() else {
            return missing(name, Missing::VpParam, ());
        };
        let p = pmic.params();
        if p.slew_rate == 0 {
            return missing(name, Missing::SlewRate, ());
        }

        vp.enabled = false;

        let sys_clk_khz = domain.sys_clk_rate / 1000;
        // VLIMITTO.TIMEOUT is 16 bits; saturate rather than spill into VDDMIN.
        let timeout = (u64::from(sys_clk_khz) * u64::from(p.vp_timeout_us)
            / 1000)
            .min(0xffff) as u32;

        let vddmin = vp_param.vddmin.max(p.vddmin).max(vc_param.ret);
        let vddmax = vp_param.vddmax.min(p.vddmax);
        let vddmin = pmic.uv_to_vsel(vddmin);
        let vddmax = pmic.uv_to_vsel(vddmax);

        let waittime = (u64::from(p.step_size) * u64::from(sys_clk_khz))
            .div_ceil(1000 * u64::from(p.slew_rate))
            as u32;

        ringbuf_entry!(Trace::Init {
            vp_id: vp.id,
            vddmin,
            vddmax,
            waittime,
            timeout,
        });

        let c = vp.common;
        let vpconfig = field_prep(
            c.vpconfig_erroroffset_mask,
            u32::from(p.vp_erroroffset),
        ) | c.vpconfig_timeouten;
        regs.write(vpconfig, vp.regs.vpconfig);

        regs.write(
            (waittime << c.vstepmin_smpswaittimemin_shift)
                | (u32::from(p.vp_vstepmin) << c.vstepmin_stepmin_shift),
            vp.regs.vstepmin,
        );

        regs.write(
            (u32::from(p.vp_vstepmax) << c.vstepmax_stepmax_shift)
                | (waittime << c.vstepmax_smpswaittimemax_shift),
            vp.regs.vstepmax,
        );

        regs.write(
            (u32::from(vddmax) << c.vlimitto_vddmax_shift)
                | (u32::from(vddmin) << c.vlimitto_vddmin_shift)
                | (timeout << c.vlimitto_timeout_shift),
            vp.regs.vlimitto,
        );
    }

    /// Checks whether the VP's last transaction has completed.
    ///
    /// Returns `false` for a domain with no VP.
    pub fn is_transaction_done<R, O: VpOps, P>(
        &self,
        domain: &VoltageDomain<R, O, P>,
    ) -> bool {
        match domain.vp.as_ref() {
            Some(vp) => vp.ops.check_txdone(vp.id),
            None => missing(domain.name, Missing::Vp, false),
        }
    }

    pub fn clear_transaction_done<R, O: VpOps, P>(
        &self,
        domain: &VoltageDomain<R, O, P>,
    ) {
        match domain.vp.as_ref() {
            Some(vp) => vp.ops.clear_txdone(vp.id),
            None => missing(domain.name, Missing::Vp, ()),
        }
    }

    /// Loads the error gain for `target` into VPCONFIG, so that SmartReflex
    /// corrections use the right gain once the domain gets there.
    pub fn update_error_gain<R, O, P>(
        &self,
        domain: &VoltageDomain<R, O, P>,
        target: Option<&VoltData>,
    ) -> Result<(), VpError>
    where
        R: DomainRegs,
    {
        let name = domain.name;
        let Some(vp) = domain.vp.as_ref() else {
            return missing(name, Missing::Vp, Err(VpError::InvalidArgument));
        };
        let Some(target) = target else {
            return missing(
                name,
                Missing::Target,
                Err(VpError::InvalidArgument),
            );
        };
        let Some(regs) = domain.regs.as_ref() else {
            return missing(name, Missing::Regs, Err(VpError::InvalidArgument));
        };

        let mask = vp.common.vpconfig_errorgain_mask;
        let bits = field_prep(mask, u32::from(target.vp_errgain));
        if regs.rmw(mask, bits, vp.regs.vpconfig).is_none() {
            return missing(name, Missing::Rmw, Err(VpError::InvalidArgument));
        }
        ringbuf_entry!(Trace::ErrorGain {
            vp_id: vp.id,
            errgain: target.vp_errgain,
        });
        Ok(())
    }

    /// Moves `domain` to `target` using the VP's force-update mode.
    ///
    /// Fails without touching hardware if the domain lacks registers, a
    /// PMIC, or a VP, or if no target is given. Fails with `Timeout` if the
    /// VP isn't idle, or if a previous transaction's TRANXDONE can't be
    /// cleared; both are reported to the error budget first. Once the update
    /// has been triggered, timeouts are reported and the sequence runs to
    /// completion, since the PMIC may already be moving.
    pub fn force_update_scale<R, O, P, C>(
        &mut self,
        domain: &VoltageDomain<R, O, P>,
        target: Option<&VoltData>,
        vc: &mut C,
    ) -> Result<(), ScaleError<C::Error>>
    where
        R: DomainRegs,
        O: VpOps,
        P: Pmic,
        C: VoltageController,
    {
        let name = domain.name;
        let Some(regs) = domain.regs.as_ref() else {
            return missing(
                name,
                Missing::Regs,
                Err(ScaleError::InvalidArgument),
            );
        };
        let Some(pmic) = domain.pmic.as_ref() else {
            return missing(
                name,
                Missing::Pmic,
                Err(ScaleError::InvalidArgument),
            );
        };
        let Some(target) = target else {
            return missing(
                name,
                Missing::Target,
                Err(ScaleError::InvalidArgument),
            );
        };
        let Some(vp) = domain.vp.as_ref() else {
            return missing(
                name,
                Missing::Vp,
                Err(ScaleError::InvalidArgument),
            );
        };

        let target_uv = target.operation_voltage();
        ringbuf_entry!(Trace::ScaleStart {
            vp_id: vp.id,
            target_uv
        });

        if self.wait_for_idle(regs, vp).is_err() {
            self.errors.report_and_maybe_recover(
                name,
                vp,
                Fault::IdleTimeout { target_uv },
            );
            return Err(ScaleError::Timeout);
        }

        let (target_vsel, current_vsel) = vc
            .pre_scale(name, target_uv, target)
            .inspect_err(|_| {
                ringbuf_entry!(Trace::PreScaleFailed { vp_id: vp.id })
            })
            .map_err(ScaleError::PreScale)?;

        // Anything left over from an earlier transaction would make the
        // wait below meaningless.
        if self.clear_txdone(vp).is_err() {
            self.errors.report_and_maybe_recover(
                name,
                vp,
                Fault::TxdoneStuck {
                    target_uv,
                    target_vsel,
                    current_vsel,
                },
            );
            return Err(ScaleError::Timeout);
        }

        let vpconfig = set_init_voltage(regs, pmic, vp, target_uv);

        ringbuf_entry!(Trace::ForceUpdate {
            vp_id: vp.id,
            vpconfig,
            target_vsel,
            current_vsel,
        });
        regs.write(
            vpconfig | vp.common.vpconfig_forceupdate,
            vp.regs.vpconfig,
        );

        let started = poll_until(
            self.config.tranxdone_timeout,
            self.config.poll_delay_us,
            &mut self.delay,
            || vp.ops.check_txdone(vp.id),
        );
        if started.is_err() {
            self.errors.report_and_maybe_recover(
                name,
                vp,
                Fault::TxdoneMissing {
                    target_uv,
                    target_vsel,
                    current_vsel,
                },
            );
        }

        vc.post_scale(name, target_uv, target, target_vsel, current_vsel);

        if self.clear_txdone(vp).is_err() {
            self.errors.report_and_maybe_recover(
                name,
                vp,
                Fault::TxdoneUncleared {
                    target_uv,
                    target_vsel,
                    current_vsel,
                },
            );
        }

        regs.write(vpconfig, vp.regs.vpconfig);

        ringbuf_entry!(Trace::ScaleDone {
            vp_id: vp.id,
            target_uv
        });
        Ok(())
    }

    /// Turns the VP on at the domain's current operating point. Does nothing
    /// if it's already on.
    pub fn enable<R, O, P, T>(
        &mut self,
        domain: &mut VoltageDomain<R, O, P>,
        table: &T,
    ) where
        R: DomainRegs,
        P: Pmic,
        T: VoltageTable,
    {
        let name = domain.name;
        let Some(vp) = domain.vp.as_mut() else {
            return missing(name, Missing::Vp, ());
        };
        let Some(regs) = domain.regs.as_ref() else {
            return missing(name, Missing::Regs, ());
        };
        if vp.enabled {
            return;
        }
        let Some(pmic) = domain.pmic.as_ref() else {
            return missing(name, Missing::Pmic, ());
        };
        let Some(volt) = table.current_volt_data(name) else {
            ringbuf_entry!(Trace::NoCurrentVoltage { domain: name });
            return;
        };

        let volt = volt.operation_voltage();
        let vpconfig = set_init_voltage(regs, pmic, vp, volt)
            | vp.common.vpconfig_vpenable;
        regs.write(vpconfig, vp.regs.vpconfig);
        vp.enabled = true;

        ringbuf_entry!(Trace::Enabled { vp_id: vp.id, volt });
    }

    /// Turns the VP off, waiting for it to go idle on either side of the
    /// write. Idle timeouts are traced but don't stop the disable.
    pub fn disable<R, O, P>(&mut self, domain: &mut VoltageDomain<R, O, P>)
    where
        R: DomainRegs,
    {
        let name = domain.name;
        let Some(vp) = domain.vp.as_mut() else {
            return missing(name, Missing::Vp, ());
        };
        let Some(regs) = domain.regs.as_ref() else {
            return missing(name, Missing::Regs, ());
        };
        if !vp.enabled {
            ringbuf_entry!(Trace::AlreadyDisabled { domain: name });
            return;
        }

        let _ = self.wait_for_idle(regs, vp);

        let vpconfig =
            regs.read(vp.regs.vpconfig) & !vp.common.vpconfig_vpenable;
        regs.write(vpconfig, vp.regs.vpconfig);

        let _ = self.wait_for_idle(regs, vp);

        vp.enabled = false;
        ringbuf_entry!(Trace::Disabled { vp_id: vp.id });
    }

    fn wait_for_idle<R: DomainRegs, O>(
        &mut self,
        regs: &R,
        vp: &VpInstance<O>,
    ) -> Result<(), TimedOut> {
        let idle = vp.common.vstatus_vpidle;
        poll_until(
            self.config.idle_timeout,
            self.config.poll_delay_us,
            &mut self.delay,
            || regs.read(vp.regs.vstatus) & idle != 0,
        )
        .map(|_| ())
        .inspect_err(|_| ringbuf_entry!(Trace::IdleTimeout { vp_id: vp.id }))
    }

    /// Clears TRANXDONE until it stays clear.
    fn clear_txdone<O: VpOps>(
        &mut self,
        vp: &VpInstance<O>,
    ) -> Result<(), TimedOut> {
        retry_until(
            self.config.tranxdone_timeout,
            self.config.poll_delay_us,
            &mut self.delay,
            || vp.ops.clear_txdone(vp.id),
            || !vp.ops.check_txdone(vp.id),
        )
        .map(|_| ())
    }
}

/// Pulses INITVDD with INITVOLTAGE set to `volt`, which loads the voltage
/// into the VP without sending it anywhere. Returns VPCONFIG as left, with
/// INITVDD and FORCEUPDATE clear.
fn set_init_voltage<R: DomainRegs, P: Pmic, O>(
    regs: &R,
    pmic: &P,
    vp: &VpInstance<O>,
    volt: u32,
) -> u32 {
    let c = vp.common;
    let vsel = pmic.uv_to_vsel(volt);

    let mut vpconfig = regs.read(vp.regs.vpconfig);
    vpconfig &= !(c.vpconfig_initvoltage_mask
        | c.vpconfig_forceupdate
        | c.vpconfig_initvdd);
    vpconfig |= field_prep(c.vpconfig_initvoltage_mask, u32::from(vsel));
    regs.write(vpconfig, vp.regs.vpconfig);

    regs.write(vpconfig | c.vpconfig_initvdd, vp.regs.vpconfig);
    regs.write(vpconfig, vp.regs.vpconfig);

    vpconfig
}

fn missing<T>(domain: &'static str, what: Missing, ret: T) -> T {
    ringbuf_entry!(Trace::Missing { domain, what });
    ret
}
