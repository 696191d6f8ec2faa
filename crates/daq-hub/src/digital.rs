//! Digital line bit-packing
//!
//! Several logical lines share one hardware port and are written together as
//! a single word. A line's physical level is its logical state XOR its
//! inversion flag.

use daq_sdk::SdkError;

use crate::state::ChannelHandle;

/// One logical digital output line on a port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitalLine {
    pub handle: ChannelHandle,
    /// Bit index within the port
    pub bit: u32,
    /// Logical state requested by the caller
    pub enabled: bool,
    /// Line is active-low
    pub inverted: bool,
}

impl DigitalLine {
    /// A new line, logically disabled
    pub fn new(handle: ChannelHandle, bit: u32, inverted: bool) -> Self {
        Self {
            handle,
            bit,
            enabled: false,
            inverted,
        }
    }

    /// Level driven on the wire
    pub fn physical_level(&self) -> bool {
        physical_level(self.enabled, self.inverted)
    }

    fn mask(&self) -> u32 {
        1u32.checked_shl(self.bit).unwrap_or(0)
    }
}

/// Physical level for a logical state
pub fn physical_level(enabled: bool, inverted: bool) -> bool {
    enabled ^ inverted
}

/// Logical state for a physical level
pub fn logical_state(level: bool, inverted: bool) -> bool {
    level ^ inverted
}

/// Port word driving every line at its current physical level
pub fn port_word<'a>(lines: impl IntoIterator<Item = &'a DigitalLine>) -> u32 {
    lines
        .into_iter()
        .filter(|line| line.physical_level())
        .fold(0, |word, line| word | line.mask())
}

/// Port word driving every line to its disabled level
///
/// Inverted lines go high, every other line goes low.
pub fn fail_safe_word<'a>(lines: impl IntoIterator<Item = &'a DigitalLine>) -> u32 {
    lines
        .into_iter()
        .filter(|line| line.inverted)
        .fold(0, |word, line| word | line.mask())
}

/// Check that every line fits on a port of `width` lines
pub fn check_lines(port: &str, width: u32, lines: &[DigitalLine]) -> Result<(), SdkError> {
    if width == 0 {
        return Err(SdkError::Configuration(format!(
            "port {port} reports a width of zero lines"
        )));
    }
    let usable = width.min(32);
    for line in lines {
        if line.bit >= usable {
            return Err(SdkError::Configuration(format!(
                "line {} of {} is outside the port's {} lines",
                line.bit, port, width
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(handle: u32, bit: u32, enabled: bool, inverted: bool) -> DigitalLine {
        DigitalLine {
            handle: ChannelHandle(handle),
            bit,
            enabled,
            inverted,
        }
    }

    #[test]
    fn test_packing_example() {
        let mut lines = vec![line(0, 0, true, false), line(1, 1, false, true)];
        assert_eq!(port_word(&lines), 0b11);

        lines[0].enabled = false;
        lines[1].enabled = true;
        assert_eq!(port_word(&lines), 0);
    }

    #[test]
    fn test_fail_safe_ignores_enabled_state() {
        let lines = vec![
            line(0, 0, true, false),
            line(1, 3, true, true),
            line(2, 5, false, true),
        ];
        assert_eq!(fail_safe_word(&lines), 0b10_1000);
    }

    #[test]
    fn test_check_lines() {
        let lines = vec![line(0, 3, false, false)];
        assert!(check_lines("Dev1/port1", 4, &lines).is_ok());
        assert!(matches!(
            check_lines("Dev1/port1", 3, &lines),
            Err(SdkError::Configuration(_))
        ));
        assert!(matches!(
            check_lines("Dev1/port1", 0, &[]),
            Err(SdkError::Configuration(_))
        ));
    }

    proptest! {
        #[test]
        fn word_reflects_each_line(states in prop::collection::vec((any::<bool>(), any::<bool>()), 1..32)) {
            let lines: Vec<DigitalLine> = states
                .iter()
                .enumerate()
                .map(|(bit, (enabled, inverted))| line(bit as u32, bit as u32, *enabled, *inverted))
                .collect();

            let word = port_word(&lines);
            let safe = fail_safe_word(&lines);
            for l in &lines {
                let bit_set = word & (1 << l.bit) != 0;
                prop_assert_eq!(bit_set, l.enabled != l.inverted);
                prop_assert_eq!(logical_state(bit_set, l.inverted), l.enabled);
                prop_assert_eq!(safe & (1 << l.bit) != 0, l.inverted);
            }
        }
    }
}
