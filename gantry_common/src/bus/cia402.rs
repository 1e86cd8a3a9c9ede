//! CiA-402 control and status words.
//!
//! | Control word | Meaning |
//! |--------------|---------|
//! | `0x0000` | Disable voltage (neutral) |
//! | `0x0006` | Shutdown |
//! | `0x0007` | Switch on |
//! | `0x000F` | Enable operation |
//! | `0x001F` | Enable operation + new setpoint (profile position) |
//! | `0x0080` | Fault reset |

use bitflags::bitflags;

/// Raw control-word patterns written to a drive.
pub struct ControlWord;

impl ControlWord {
    pub const DISABLE: u16 = 0x0000;
    pub const SHUTDOWN: u16 = 0x0006;
    pub const SWITCH_ON: u16 = 0x0007;
    pub const ENABLE_OPERATION: u16 = 0x000F;
    pub const NEW_SETPOINT: u16 = 0x0010;
    pub const FAULT_RESET: u16 = 0x0080;
}

bitflags! {
    /// Status word bits reported by a drive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusWord: u16 {
        const READY_TO_SWITCH_ON = 0x0001;
        const SWITCHED_ON = 0x0002;
        const OPERATION_ENABLED = 0x0004;
        const FAULT = 0x0008;
        const VOLTAGE_ENABLED = 0x0010;
        const QUICK_STOP = 0x0020;
        const SWITCH_ON_DISABLED = 0x0040;
        const WARNING = 0x0080;
        const REMOTE = 0x0200;
        const TARGET_REACHED = 0x0400;
    }
}

const STATE_MASK: u16 = 0x006F;
const DISABLED_MASK: u16 = 0x004F;

impl StatusWord {
    /// Full "operation enabled" pattern, `(sw & 0x6F) == 0x27`.
    #[inline]
    pub const fn is_operation_enabled(self) -> bool {
        self.bits() & STATE_MASK == 0x0027
    }

    #[inline]
    pub const fn is_switched_on(self) -> bool {
        self.bits() & STATE_MASK == 0x0023
    }

    #[inline]
    pub const fn is_ready_to_switch_on(self) -> bool {
        self.bits() & STATE_MASK == 0x0021
    }

    #[inline]
    pub const fn is_switch_on_disabled(self) -> bool {
        self.bits() & DISABLED_MASK == 0x0040
    }

    #[inline]
    pub const fn is_fault(self) -> bool {
        self.bits() & Self::FAULT.bits() != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_enabled_pattern_ignores_high_bits() {
        assert!(StatusWord::from_bits_retain(0x0627).is_operation_enabled());
        assert!(!StatusWord::from_bits_retain(0x0023).is_operation_enabled());
        // Quick-stop active (bit 5 cleared) is not "enabled".
        assert!(!StatusWord::from_bits_retain(0x0007).is_operation_enabled());
    }

    #[test]
    fn fault_bit() {
        assert!(StatusWord::from_bits_retain(0x0218).is_fault());
        assert!(!StatusWord::from_bits_retain(0x0250).is_fault());
    }

    #[test]
    fn enable_operation_with_setpoint() {
        assert_eq!(
            ControlWord::ENABLE_OPERATION | ControlWord::NEW_SETPOINT,
            0x001F
        );
    }
}
