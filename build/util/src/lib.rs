// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Helpers for driver build scripts.
//!
//! The board/app configuration is handed to every build script as a TOML
//! document in the `APP_CONFIG` environment variable. Each driver pulls out
//! the table it cares about with [`config_or_default`] and turns it into
//! constants in `OUT_DIR`.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::env;
use std::fmt::Display;
use std::io::Write;
use std::path::PathBuf;

/// Name of the environment variable carrying the app-wide configuration.
pub const APP_CONFIG_VAR: &str = "APP_CONFIG";

/// Pulls the part of the app-wide configuration that `T` describes, or
/// `T::default()` if the environment variable is missing. A variable that
/// fails to parse is still an `Err`.
///
/// `T` should not set `deny_unknown_fields`, since it only covers one
/// driver's share of the document; the driver's own table inside it may.
pub fn config_or_default<T: DeserializeOwned + Default>() -> Result<T> {
    // We want to emit this whether or not the env var is present, so that we'll
    // be re-run if it becomes present.
    println!("cargo:rerun-if-env-changed={APP_CONFIG_VAR}");

    match env::var(APP_CONFIG_VAR) {
        Ok(text) => parse(&text),
        Err(_) => {
            println!("--- ${APP_CONFIG_VAR} not present, using defaults ---");
            Ok(T::default())
        }
    }
}

fn parse<T: DeserializeOwned>(text: &str) -> Result<T> {
    println!("--- toml for ${APP_CONFIG_VAR} ---");
    println!("{text}");
    toml::from_str(text).context("parsing app config")
}

/// Writes `pub const NAME: TYPE = VALUE;` lines into `$OUT_DIR/<file>`, for
/// the crate to `include!`.
pub fn write_consts(
    file: &str,
    consts: &[(&str, &str, &dyn Display)],
) -> Result<()> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let mut out = std::fs::File::create(out_dir.join(file))?;
    for (name, ty, value) in consts {
        writeln!(out, "pub const {name}: {ty} = {value};")?;
    }
    Ok(())
}
