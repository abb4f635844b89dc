// used to give worths a structured encoding in the persisted records
use serde::{Deserialize, Serialize};

// used for the total order over worths
use std::cmp::Ordering;
// used to print out readable forms of a worth
use std::fmt;
// used so worths can key lookups
use std::hash::{Hash, Hasher};

use crate::error::{ExchequerError, Result};

/// The worth of one unit of a stackable resource.
///
/// A worth is a strictly positive, finite scalar. Zero, negative and
/// non-finite scalars never make it past construction, so every worth held
/// by a keeper or a snapshot is safe to divide by and to compare.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Worth(f64);

impl Worth {
    pub fn new<T: Into<f64>>(scalar: T) -> Result<Self> {
        let scalar = scalar.into();
        if !scalar.is_finite() || scalar <= 0.0 {
            return Err(ExchequerError::InvalidWorth(scalar));
        }
        Ok(Self(scalar))
    }
    pub fn get(&self) -> f64 {
        self.0
    }
    /// The per-unit worth of a registration covering `units` units.
    ///
    /// Fails for zero units, and for factors so large that the per-unit
    /// worth would no longer be a positive number.
    pub fn factor(&self, units: u32) -> Result<Self> {
        if units == 0 {
            return Err(ExchequerError::Execution(
                "cannot factor a worth over zero units".to_string(),
            ));
        }
        Self::new(self.0 / units as f64)
    }
}

// Equality and order come from the total order over the underlying scalar,
// which keeps them consistent with each other and with hashing.
impl PartialEq for Worth {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}
impl Eq for Worth {}
impl PartialOrd for Worth {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Worth {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
impl Hash for Worth {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}
impl fmt::Display for Worth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl TryFrom<f64> for Worth {
    type Error = ExchequerError;
    fn try_from(scalar: f64) -> Result<Self> {
        Self::new(scalar)
    }
}
impl From<Worth> for f64 {
    fn from(worth: Worth) -> f64 {
        worth.0
    }
}
impl<'a> From<&'a Worth> for f64 {
    fn from(worth: &Worth) -> f64 {
        worth.0
    }
}
