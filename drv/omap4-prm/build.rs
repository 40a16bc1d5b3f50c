// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::ensure;
use serde::Deserialize;

/// This represents our _subset_ of global config and _must not_ be marked with
/// `deny_unknown_fields`!
#[derive(Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct GlobalConfig {
    #[serde(default)]
    omap4_prm: PrmConfig,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
struct PrmConfig {
    /// Polls of a module's reset status after releasing its hardreset line.
    hardreset_wait: u32,
    /// Polls of WUCLK_STATUS per edge when recycling the I/O wakeup chain.
    iopad_latch_time: u32,
    /// Time the PRCM needs to assert a software cold reset, in microseconds.
    cold_reset_settle_us: u32,
    /// Busy-wait between polls, in microseconds.
    poll_delay_us: u32,
}

impl Default for PrmConfig {
    fn default() -> Self {
        Self {
            hardreset_wait: 10_000,
            iopad_latch_time: 100,
            // Two to three 32 kHz cycles is ~91.6us; allow twice that.
            cold_reset_settle_us: 184,
            poll_delay_us: 1,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cfg = build_util::config_or_default::<GlobalConfig>()?.omap4_prm;

    ensure!(
        cfg.hardreset_wait > 0,
        "omap4-prm.hardreset-wait must be nonzero"
    );
    ensure!(
        cfg.iopad_latch_time > 0,
        "omap4-prm.iopad-latch-time must be nonzero"
    );

    build_util::write_consts(
        "prm_config.rs",
        &[
            ("MAX_MODULE_HARDRESET_WAIT", "u32", &cfg.hardreset_wait),
            ("MAX_IOPAD_LATCH_TIME", "u32", &cfg.iopad_latch_time),
            ("COLD_RESET_SETTLE_US", "u32", &cfg.cold_reset_settle_us),
            ("PRM_POLL_DELAY_US", "u32", &cfg.poll_delay_us),
        ],
    )?;
    Ok(())
}
