//! Six-slot one-time code entry.

use crate::OtpValidationError;
use std::fmt;

/// Number of digits in a one-time code.
pub const OTP_LENGTH: usize = 6;

/// Digits entered so far plus the slot that has focus.
///
/// Mirrors a row of single-character inputs: typing moves focus right,
/// backspace on an empty slot moves it left.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpCode {
    slots: [Option<char>; OTP_LENGTH],
    focus: usize,
}

impl OtpCode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot that currently has focus.
    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn slots(&self) -> &[Option<char>; OTP_LENGTH] {
        &self.slots
    }

    /// Put a digit into `slot` and advance focus unless it is the last slot.
    pub fn input(&mut self, slot: usize, ch: char) -> Result<(), OtpValidationError> {
        check_slot(slot)?;
        if !ch.is_ascii_digit() {
            return Err(OtpValidationError::NotADigit { slot, ch });
        }
        self.slots[slot] = Some(ch);
        self.focus = (slot + 1).min(OTP_LENGTH - 1);
        Ok(())
    }

    /// Backspace pressed on `slot`.
    ///
    /// Clears the slot if it holds a digit; on an empty slot focus moves to
    /// the previous one instead.
    pub fn backspace(&mut self, slot: usize) -> Result<(), OtpValidationError> {
        check_slot(slot)?;
        if self.slots[slot].take().is_some() {
            self.focus = slot;
        } else {
            self.focus = slot.saturating_sub(1);
        }
        Ok(())
    }

    /// Replace all slots from a pasted code.
    pub fn fill(&mut self, code: &str) -> Result<(), OtpValidationError> {
        let code = code.trim();
        let len = code.chars().count();
        if len > OTP_LENGTH {
            return Err(OtpValidationError::TooLong(len));
        }
        if let Some((slot, ch)) = code.chars().enumerate().find(|(_, c)| !c.is_ascii_digit()) {
            return Err(OtpValidationError::NotADigit { slot, ch });
        }

        self.clear();
        for (slot, ch) in code.chars().enumerate() {
            self.slots[slot] = Some(ch);
        }
        self.focus = len.min(OTP_LENGTH - 1);
        Ok(())
    }

    /// Empty every slot and focus the first.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Indexes of empty slots, in order.
    pub fn missing_slots(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// The full code, if every slot is filled.
    pub fn value(&self) -> Option<String> {
        self.slots.iter().copied().collect()
    }

    /// The full code, or which slots are still empty.
    pub fn validate(&self) -> Result<String, OtpValidationError> {
        self.value().ok_or_else(|| OtpValidationError::Incomplete {
            missing: self.missing_slots(),
        })
    }
}

// Empty slots render as '_'.
impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for slot in &self.slots {
            write!(f, "{}", slot.unwrap_or('_'))?;
        }
        Ok(())
    }
}

fn check_slot(slot: usize) -> Result<(), OtpValidationError> {
    if slot >= OTP_LENGTH {
        return Err(OtpValidationError::SlotOutOfRange(slot));
    }
    Ok(())
}
