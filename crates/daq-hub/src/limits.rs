//! Output voltage limits

use daq_sdk::VoltageRange;
use serde::{Deserialize, Serialize};

use crate::error::HubError;

/// Software clamp applied to every output setpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoltageLimits {
    min: f64,
    max: f64,
}

impl VoltageLimits {
    /// Validated limits; `min` must not exceed `max`
    pub fn new(min: f64, max: f64) -> Result<Self, HubError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(HubError::InvalidLimits { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Nearest value inside the limits (NaN maps to `min`)
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl Default for VoltageLimits {
    fn default() -> Self {
        Self {
            min: -10.0,
            max: 10.0,
        }
    }
}

impl From<VoltageLimits> for VoltageRange {
    fn from(limits: VoltageLimits) -> Self {
        VoltageRange::new(limits.min, limits.max)
    }
}
