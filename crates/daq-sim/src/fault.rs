//! Status-code fault injection

use serde::{Deserialize, Serialize};

/// SDK operation a fault applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimOp {
    Version,
    DeviceNames,
    ProductType,
    SerialNumber,
    IsSimulated,
    PhysicalChannels,
    CreateTask,
    CreateChannel,
    StartTask,
    StopTask,
    ClearTask,
    WriteAnalog,
    ReadAnalog,
    WriteDigital,
    PortWidth,
}

/// A status code returned in place of the normal result
///
/// With a `target`, the fault only fires when the call concerns that name:
/// a device identifier for device queries, a physical channel or port for
/// channel and task operations. Without one it fires for every call of `op`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimFault {
    pub op: SimOp,
    pub target: Option<String>,
    pub code: i32,
}

impl SimFault {
    /// Fault every call of `op`
    pub fn always(op: SimOp, code: i32) -> Self {
        Self {
            op,
            target: None,
            code,
        }
    }

    /// Fault calls of `op` concerning `target`
    pub fn on(op: SimOp, target: impl Into<String>, code: i32) -> Self {
        Self {
            op,
            target: Some(target.into()),
            code,
        }
    }

    /// Whether this fault fires for `op` on any of `names`
    pub fn matches<'a>(&self, op: SimOp, mut names: impl Iterator<Item = &'a str>) -> bool {
        if self.op != op {
            return false;
        }
        match &self.target {
            None => true,
            Some(target) => names.any(|name| name == target),
        }
    }
}
