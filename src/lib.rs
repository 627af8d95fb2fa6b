#![doc = include_str ! ("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

mod bitmap;
pub mod error;
mod get;
mod internal;
pub mod platform;
mod raw;
mod set;

pub use get::Get;
pub use raw::{DEFAULT_PAGE_SIZE, MAX_KEYS, NOT_FOUND};
pub use set::Set;

use crate::error::Error;
use crate::internal::Page;
use crate::platform::Platform;
use crate::raw::LINE_SIZE;

/// Location and geometry of the two flash pages backing the storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Flash offsets of page A and page B.
    pub pages: [u32; 2],
    /// Size of each page in bytes. Every 4 bytes hold one line.
    pub page_size: usize,
    /// Keys `0..num_keys` are valid. At most [`MAX_KEYS`] and at most one key per line.
    pub num_keys: u16,
}

impl Config {
    pub const fn new(page_a: u32, page_b: u32) -> Self {
        Self {
            pages: [page_a, page_b],
            page_size: DEFAULT_PAGE_SIZE,
            num_keys: MAX_KEYS as u16,
        }
    }

    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub const fn with_num_keys(mut self, num_keys: u16) -> Self {
        self.num_keys = num_keys;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE as u32)
    }
}

/// One of the two configured pages.
#[derive(strum::FromRepr, strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(usize)]
pub enum PageSlot {
    A = 0,
    B = 1,
}

impl PageSlot {
    pub(crate) fn other(self) -> PageSlot {
        match self {
            PageSlot::A => PageSlot::B,
            PageSlot::B => PageSlot::A,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub active: PageSlot,
    /// Lines on the active page that hold a record, superseded ones included.
    pub written: u32,
    /// Lines on the active page that are still erased.
    pub empty: u32,
    /// Distinct valid keys that currently have a value.
    pub live_keys: u16,
}

/// EEPROM emulation on top of two flash pages.
///
/// New values are appended to the active page. Once it is full, the latest value of every key is
/// copied over to the other page, which then becomes the active one, and the old page is erased.
/// Both pages therefore wear evenly.
pub struct Eeprom<T: Platform> {
    pub(crate) hal: T,
    pub(crate) pages: [Page; 2],
    pub(crate) active: PageSlot,
    pub(crate) num_keys: u16,
    /// Set once the flash reported an error. Writes are refused from then on, reads still go to
    /// the flash and report their own errors.
    pub(crate) faulted: bool,
}

impl<T: Platform> Eeprom<T> {
    /// Opens the storage on the given pages.
    ///
    /// Only the first line of page B is read: if it is erased page A holds the data, otherwise
    /// page B does. A page switch always leaves the demoted page erased, so nothing else is needed.
    pub fn new(config: Config, mut hal: T) -> Result<Eeprom<T>, Error> {
        Self::validate(&config, &hal)?;

        let pages = config.pages.map(|address| Page::new(address, config.page_size));

        let active = if pages[PageSlot::B as usize].is_empty(&mut hal)? {
            PageSlot::A
        } else {
            PageSlot::B
        };

        #[cfg(feature = "defmt")]
        defmt::trace!("new: {} lines per page, active {}", pages[0].lines(), active);

        #[cfg(feature = "debug-logs")]
        println!("Eeprom: {} lines per page, active page {active}", pages[0].lines());

        Ok(Self {
            hal,
            pages,
            active,
            num_keys: config.num_keys,
            faulted: false,
        })
    }

    fn validate(config: &Config, hal: &T) -> Result<(), Error> {
        if !LINE_SIZE.is_multiple_of(T::WRITE_SIZE) || !LINE_SIZE.is_multiple_of(T::READ_SIZE) {
            return Err(Error::UnsupportedFlash);
        }

        let page_size = config.page_size;
        if page_size == 0
            || !page_size.is_multiple_of(LINE_SIZE)
            || !page_size.is_multiple_of(T::ERASE_SIZE)
        {
            return Err(Error::InvalidPageSize);
        }

        let [a, b] = config.pages.map(|address| address as usize);
        for address in [a, b] {
            if !address.is_multiple_of(T::ERASE_SIZE) {
                return Err(Error::InvalidPageAddress);
            }
            match address.checked_add(page_size) {
                Some(end) if end <= hal.capacity() && end <= u32::MAX as usize => {}
                _ => return Err(Error::InvalidPageAddress),
            }
        }
        if a < b + page_size && b < a + page_size {
            return Err(Error::InvalidPageAddress);
        }

        let lines_per_page = page_size / LINE_SIZE;
        let num_keys = config.num_keys as usize;
        if num_keys > MAX_KEYS || num_keys > lines_per_page {
            return Err(Error::TooManyKeys);
        }

        Ok(())
    }

    /// Reads the latest value of `key`. Returns `None` if the key was never written or is outside
    /// of the key space.
    pub fn get_value(&mut self, key: u16) -> Result<Option<u16>, Error> {
        let result = self.find_value(key);
        self.track_fault(result)
    }

    /// Like [`Eeprom::get_value`] but reports a missing value as [`NOT_FOUND`]. A stored value
    /// equal to [`NOT_FOUND`] can't be told apart from a missing one.
    pub fn get_value_or_sentinel(&mut self, key: u16) -> Result<u16, Error> {
        Ok(self.get_value(key)?.unwrap_or(NOT_FOUND))
    }

    /// Get a value converted to `R`.
    ///
    /// Supported types are bool, u8, i8, u16, i16, u32, u64 and usize. Narrowing conversions
    /// truncate, widening ones zero-extend.
    pub fn get<R>(&mut self, key: u16) -> Result<Option<R>, Error>
    where
        Eeprom<T>: Get<R>,
    {
        let result = Get::get(self, key);
        self.track_fault(result)
    }

    /// Assigns the stored value to `value` if there is one and returns whether it did so.
    /// `value` is left untouched otherwise.
    pub fn read_value_if_available<R>(&mut self, key: u16, value: &mut R) -> Result<bool, Error>
    where
        Eeprom<T>: Get<R>,
    {
        match self.get::<R>(key)? {
            Some(found) => {
                *value = found;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Writes a value to the flash. Nothing is written if the key already holds `value`.
    pub fn set_value(&mut self, key: u16, value: u16) -> Result<(), Error> {
        self.set(key, value)
    }

    /// Set a value and write it to the flash
    ///
    /// Type support: bool, u8, i8, u16 and i16. Signed values are sign-extended to 16 bit.
    pub fn set<R>(&mut self, key: u16, value: R) -> Result<(), Error>
    where
        Eeprom<T>: Set<R>,
    {
        if self.faulted {
            return Err(Error::FlashError);
        }

        let result = Set::set(self, key, value);
        self.track_fault(result)
    }

    /// Appends all entries in order. If the active page runs full, the pages are switched and the
    /// remaining entries are written to the new page. Fails with [`Error::FlashFull`] if they
    /// don't fit there either.
    ///
    /// All keys are checked upfront, an invalid key rejects the whole batch without writing.
    pub fn store_batch(&mut self, entries: &[(u16, u16)]) -> Result<(), Error> {
        if self.faulted {
            return Err(Error::FlashError);
        }

        let result = self.store_entries(entries);
        self.track_fault(result)
    }

    /// Erases both pages. Page A becomes the active page.
    ///
    /// This also clears a previous flash fault.
    pub fn format(&mut self) -> Result<(), Error> {
        let result = self.format_pages();
        self.track_fault(result)?;
        self.faulted = false;
        Ok(())
    }

    /// Number of lines that can still be appended before the next page switch.
    pub fn num_entries_left_on_active_page(&mut self) -> Result<usize, Error> {
        let page = self.current_page();
        let result = page
            .find_free_line(&mut self.hal)
            .map(|free| free.map_or(0, |index| page.lines() - index));
        self.track_fault(result)
    }

    /// Calls `visitor` for every written line of the active page, oldest first. A key may be
    /// reported several times, the last call carries its current value.
    pub fn visit_entries<F>(&mut self, visitor: F) -> Result<(), Error>
    where
        F: FnMut(u16, u16),
    {
        let result = self.visit_lines(visitor);
        self.track_fault(result)
    }

    /// The page currently receiving writes.
    pub fn active_page(&self) -> PageSlot {
        self.active
    }

    /// Returns usage statistics of the active page
    pub fn statistics(&mut self) -> Result<Statistics, Error> {
        let result = self.collect_statistics();
        self.track_fault(result)
    }

    fn track_fault<R>(&mut self, result: Result<R, Error>) -> Result<R, Error> {
        if let Err(Error::FlashError) = result {
            self.faulted = true;
        }
        result
    }
}
