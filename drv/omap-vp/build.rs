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
    omap_vp: VpConfig,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
struct VpConfig {
    /// Polls of VSTATUS.VPINIDLE before giving up on the VP going idle.
    idle_timeout: u32,
    /// Polls of TRANXDONE, both while clearing it and while waiting for it.
    tranxdone_timeout: u32,
    /// Busy-wait between polls, in microseconds.
    poll_delay_us: u32,
    /// Errors logged at full verbosity before switching to terse entries.
    error_messages: u8,
    /// Errors between calls to the VP's recovery hook.
    retries_before_recover: u8,
}

impl Default for VpConfig {
    fn default() -> Self {
        Self {
            idle_timeout: 200,
            tranxdone_timeout: 300,
            poll_delay_us: 1,
            error_messages: 10,
            retries_before_recover: 50,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cfg = build_util::config_or_default::<GlobalConfig>()?.omap_vp;

    ensure!(cfg.idle_timeout > 0, "omap-vp.idle-timeout must be nonzero");
    ensure!(
        cfg.tranxdone_timeout > 0,
        "omap-vp.tranxdone-timeout must be nonzero"
    );
    ensure!(
        cfg.retries_before_recover > 0,
        "omap-vp.retries-before-recover must be nonzero"
    );

    build_util::write_consts(
        "vp_config.rs",
        &[
            ("VP_IDLE_TIMEOUT", "u32", &cfg.idle_timeout),
            ("VP_TRANXDONE_TIMEOUT", "u32", &cfg.tranxdone_timeout),
            ("VP_POLL_DELAY_US", "u32", &cfg.poll_delay_us),
            ("MAX_COUNT_ERR", "u8", &cfg.error_messages),
            (
                "MAX_RETRIES_BEFORE_RECOVER",
                "u8",
                &cfg.retries_before_recover,
            ),
        ],
    )?;
    Ok(())
}
