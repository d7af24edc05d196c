// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use std::fmt::Display;
use std::num::NonZero;

/// A VXLAN Network Identifier: a 24-bit value identifying an overlay network.
///
/// Zero is reserved and the maximum legal value is 2<sup>24</sup> - 1. Use [`Vni::new_checked`]
/// to build one from a `u32`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Vni(NonZero<u32>);

impl Display for Vni {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.get())
    }
}

impl Vni {
    /// The minimum legal [`Vni`] value (1).
    pub const MIN: u32 = 1;
    /// The maximum legal [`Vni`] value (2<sup>24</sup> - 1).
    pub const MAX: u32 = 0x00_FF_FF_FF;

    /// Create a new [`Vni`] from a `u32`.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidVni`] error if the value is 0 or greater than [`Vni::MAX`].
    pub fn new_checked(vni: u32) -> Result<Vni, InvalidVni> {
        match NonZero::<u32>::new(vni) {
            None => Err(InvalidVni::ReservedZero),
            _ if vni > Vni::MAX => Err(InvalidVni::TooLarge(vni)),
            Some(vni) => Ok(Vni(vni)),
        }
    }

    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0.get()
    }
}

/// Errors that can occur when converting a `u32` to a [`Vni`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidVni {
    #[error("Zero is not a legal Vni")]
    ReservedZero,
    #[error("The value {0} is too large to be a Vni (max is {MAX})", MAX = Vni::MAX)]
    TooLarge(u32),
}

impl From<Vni> for u32 {
    fn from(vni: Vni) -> u32 {
        vni.as_u32()
    }
}

impl TryFrom<u32> for Vni {
    type Error = InvalidVni;

    fn try_from(vni: u32) -> Result<Vni, Self::Error> {
        Vni::new_checked(vni)
    }
}
