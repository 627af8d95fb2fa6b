//! On-flash layout of a single log line. This is the only place that knows how a key and a value
//! are packed into a line and how a line is laid out in flash.

use core::fmt::{Debug, Formatter};
use core::mem::size_of;

pub(crate) const LINE_SIZE: usize = size_of::<u32>();
pub(crate) const FREE_PATTERN: u32 = u32::MAX;

pub const DEFAULT_PAGE_SIZE: usize = 1024;
pub const MAX_KEYS: usize = 256;

/// Returned by [`crate::Eeprom::get_value_or_sentinel`] if a key was never written.
pub const NOT_FOUND: u16 = 0xCAFE;

// The free pattern must never be a valid encoding, which holds as long as no key has all bits set.
const _: () = assert!(MAX_KEYS <= u16::MAX as usize, "Key space must not reach 0xFFFF");

/// A 32 bit record: key in the upper half, value in the lower half. Stored little endian, so
/// key 0x002A with value 0xBEEF ends up as `EF BE 2A 00` in flash.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub(crate) struct LogLine(u32);

impl LogLine {
    pub(crate) const fn new(key: u16, value: u16) -> Self {
        Self(((key as u32) << u16::BITS) | value as u32)
    }

    pub(crate) const fn key(&self) -> u16 {
        (self.0 >> u16::BITS) as u16
    }

    pub(crate) const fn value(&self) -> u16 {
        self.0 as u16
    }

    pub(crate) const fn is_free(&self) -> bool {
        self.0 == FREE_PATTERN
    }

    pub(crate) const fn from_bytes(raw: [u8; LINE_SIZE]) -> Self {
        Self(u32::from_le_bytes(raw))
    }

    pub(crate) const fn to_bytes(self) -> [u8; LINE_SIZE] {
        self.0.to_le_bytes()
    }
}

impl Debug for LogLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        if self.is_free() {
            return f.write_str("LogLine(free)");
        }
        let key = self.key();
        let value = self.value();
        f.write_fmt(format_args!("LogLine {{ key: {key:>3}, value: 0x{value:0>4x} }}"))
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LogLine {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "LogLine({=u16}: {=u16:#x})", self.key(), self.value())
    }
}
