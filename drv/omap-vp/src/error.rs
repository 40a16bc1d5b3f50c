// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use num_derive::FromPrimitive;

#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
#[repr(u32)]
pub enum VpError {
    /// A required capability or argument was missing; nothing was written.
    InvalidArgument = 1,
    /// The VP never reached the state we were waiting for.
    Timeout = 2,
}

impl From<VpError> for u32 {
    fn from(e: VpError) -> Self {
        e as u32
    }
}

/// Failure of a forced voltage update.
///
/// `PreScale` carries the Voltage Controller's own error through untouched.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScaleError<E> {
    InvalidArgument,
    Timeout,
    PreScale(E),
}

impl<E> From<VpError> for ScaleError<E> {
    fn from(e: VpError) -> Self {
        match e {
            VpError::InvalidArgument => ScaleError::InvalidArgument,
            VpError::Timeout => ScaleError::Timeout,
        }
    }
}
