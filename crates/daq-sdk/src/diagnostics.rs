//! Status code diagnostic text
//!
//! The table below is diagnostic only. Behaviour depends solely on the sign
//! of a code (see [`crate::Severity`]); the text exists so that logs say
//! something more useful than a bare number.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Text returned for codes missing from the table
pub const UNKNOWN_CODE_TEXT: &str = "Unrecognized status code";

/// Well-known codes referenced by the coordinator and the simulator
pub mod codes {
    pub const SUCCESS: i32 = 0;
    pub const INVALID_TASK: i32 = -200_088;
    pub const INVALID_DEVICE_ID: i32 = -200_220;
    pub const PHYSICAL_CHANNEL_MISSING: i32 = -200_170;
    pub const UNSUPPORTED_VALUE: i32 = -200_077;
    pub const READ_TIMEOUT: i32 = -200_474;
    pub const WRITE_TIMEOUT: i32 = -200_560;
    pub const RESOURCE_RESERVED: i32 = -50_103;
    pub const DEVICE_NOT_ACCESSIBLE: i32 = -201_003;
    pub const DEVICE_IN_USE: i32 = -200_022;
    pub const OUTPUT_OUT_OF_RANGE: i32 = -200_561;
    pub const TASK_NOT_RUNNING: i32 = -200_479;
    pub const READ_OVERWRITE: i32 = 200_015;
    pub const VALUE_COERCED: i32 = 200_013;
}

static STATUS_TABLE: &[(i32, &str)] = &[
    (0, "No error"),
    // Warnings
    (200_003, "Timestamp counter has rolled over"),
    (200_005, "Data in the buffer was overwritten before it was read"),
    (200_007, "Sample clock rate was coerced to a supported value"),
    (200_010, "Finite acquisition or generation has been stopped before the requested number of samples were acquired or generated"),
    (200_011, "Input buffer overflowed; some samples may have been lost"),
    (200_012, "Specified property is not supported by the device and was ignored"),
    (200_013, "Value was coerced to the nearest supported value"),
    (200_015, "Read was performed while data was being overwritten in the buffer"),
    (200_016, "Onboard device memory overflowed; some samples may have been lost"),
    (200_019, "Analog-to-digital converter overrange detected"),
    (200_025, "Task was not started explicitly; it was started implicitly by a read or write"),
    (200_026, "Output voltage was clipped to the channel limits"),
    (200_036, "Channel calibration has expired"),
    (200_040, "Device self-test completed with warnings"),
    (209_800, "Device was reset during operation"),
    (209_801, "Device firmware is older than the driver expects"),
    (209_802, "Device has been simulated; values do not reflect real hardware"),
    // Errors: resources
    (-50_103, "The specified resource is reserved; the operation could not be completed as specified"),
    (-50_150, "Device driver software is not responding"),
    (-50_175, "Requested operation was interrupted by another thread"),
    (-50_202, "Unexpected error in the device driver"),
    (-50_256, "Device memory could not be allocated"),
    (-50_352, "Memory for the requested operation could not be allocated"),
    (-50_405, "Device is not connected or has been removed"),
    // Errors: devices
    (-200_020, "Device was not found or is not responding"),
    (-200_022, "Resource requested by this task has already been reserved by a different task"),
    (-200_220, "Device identifier is invalid"),
    (-200_324, "Device is not responding; power cycle the device"),
    (-200_327, "Device is already in use by another process"),
    (-200_706, "Device does not support the requested operation"),
    (-201_003, "Device cannot be accessed; it may have been disconnected"),
    (-201_105, "Device product type does not match the expected type"),
    (-201_401, "Device USB communication failed"),
    // Errors: tasks
    (-200_088, "Task specified is invalid or does not exist"),
    (-200_089, "Task name specified conflicts with an existing task name"),
    (-200_103, "Requested operation is not supported while the task is running"),
    (-200_428, "Task was cleared while an operation was in progress"),
    (-200_479, "Specified operation cannot be performed while the task is not running"),
    (-200_557, "Specified property cannot be set while the task is running"),
    (-200_587, "Requested operation could not be performed because the task is not committed"),
    (-200_983, "Task has already been started"),
    // Errors: channels
    (-200_077, "Requested value is not a supported value for this property"),
    (-200_170, "Physical channel specified does not exist on this device"),
    (-200_171, "Virtual channel name already exists in the task"),
    (-200_172, "Physical channel name specified is invalid"),
    (-200_230, "Task contains no channels"),
    (-200_257, "Physical channel is not valid for the requested direction"),
    (-200_431, "Minimum value is greater than the maximum value"),
    (-200_435, "Specified line does not exist on the port"),
    (-200_465, "Line grouping is invalid for the specified port"),
    (-200_485, "Analog output range is not supported by the device"),
    (-200_486, "Analog input range is not supported by the device"),
    (-201_062, "Channel was used in more than one task"),
    // Errors: reading and writing
    (-200_278, "Attempted to read samples that are no longer available"),
    (-200_279, "Application is not able to keep up with the hardware acquisition"),
    (-200_284, "Some or all of the requested samples were not acquired before the timeout"),
    (-200_290, "Onboard buffer underflowed during generation"),
    (-200_293, "Buffer is too small for the requested operation"),
    (-200_462, "Generation cannot be started because the output buffer is empty"),
    (-200_474, "Read did not complete before the specified timeout"),
    (-200_524, "Write cannot be performed because the task has no output channels"),
    (-200_560, "Write did not complete before the specified timeout"),
    (-200_561, "Output value is outside the range of the channel"),
    (-200_621, "Onboard memory underflow during generation"),
    (-200_802, "Digital output word exceeds the width of the port"),
    (-201_025, "Non-buffered hardware-timed operations are not supported for this device"),
    // Errors: clocks and timing
    (-200_019, "Analog-to-digital converter conversion attempted before the prior conversion completed"),
    (-200_300, "Sample rate exceeds the maximum sample rate for the number of channels"),
    (-200_332, "Sample clock rate is below the minimum supported rate"),
    (-200_452, "Specified timing property is not supported for the task type"),
    // Errors: driver
    (-200_001, "Driver has not been installed or the installation is corrupt"),
    (-200_015, "Unable to load the driver runtime"),
    (-200_017, "Driver session was closed unexpectedly"),
    (-201_235, "Driver version is incompatible with the device firmware"),
];

fn status_index() -> &'static HashMap<i32, &'static str> {
    static INDEX: OnceLock<HashMap<i32, &'static str>> = OnceLock::new();
    INDEX.get_or_init(|| STATUS_TABLE.iter().copied().collect())
}

/// Look up the diagnostic text for a status code
pub fn error_text(code: i32) -> &'static str {
    status_index()
        .get(&code)
        .copied()
        .unwrap_or(UNKNOWN_CODE_TEXT)
}
