use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference from the UI thread to an object living on the engine thread.
///
/// The integer is the slot index in the engine's object table. `-1` means unbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetInstanceHandle(i32);

impl AssetInstanceHandle {
    pub const INVALID: Self = Self(-1);

    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(i32::try_from(index).unwrap_or(-1))
    }

    pub const fn internal_value(self) -> i32 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != -1
    }

    pub(crate) fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl Default for AssetInstanceHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for AssetInstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            write!(f, "#invalid")
        }
    }
}
