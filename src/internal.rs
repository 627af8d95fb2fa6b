use crate::bitmap::KeyBitmap;
use crate::error::Error;
use crate::platform::{Platform, Unlocked};
use crate::raw::{LINE_SIZE, LogLine};
use crate::{Eeprom, PageSlot, Statistics};
#[cfg(feature = "defmt")]
use defmt::trace;
#[cfg(feature = "defmt")]
use defmt::warn;

/// A page of flash seen as a sequence of lines. Writing is append only: lines are programmed once
/// after an erase and never overwritten.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Page {
    pub(crate) address: u32,
    size: usize,
}

impl Page {
    pub(crate) fn new(address: u32, size: usize) -> Self {
        Self { address, size }
    }

    pub(crate) fn lines(&self) -> usize {
        self.size / LINE_SIZE
    }

    fn line_address(&self, index: usize) -> u32 {
        assert!(index < self.lines(), "line index {index} out of bounds");
        self.address + (index * LINE_SIZE) as u32
    }

    pub(crate) fn read_line<T: Platform>(&self, hal: &mut T, index: usize) -> Result<LogLine, Error> {
        let mut buf = [0u8; LINE_SIZE];
        hal.read(self.line_address(index), &mut buf)
            .map_err(|_| Error::FlashError)?;
        Ok(LogLine::from_bytes(buf))
    }

    /// The caller has to make sure the line is still free.
    pub(crate) fn write_line<T: Platform>(
        &self,
        hal: &mut T,
        index: usize,
        line: LogLine,
    ) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("write_line: @{:#08x}[{}] {}", self.address, index, line);

        #[cfg(feature = "debug-logs")]
        println!("  Page: write_line @{:#08x}[{index}] {line:?}", self.address);

        hal.write(self.line_address(index), &line.to_bytes())
            .map_err(|_| Error::FlashError)
    }

    pub(crate) fn erase<T: Platform>(&self, hal: &mut T) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("erase: @{:#08x}", self.address);

        #[cfg(feature = "debug-logs")]
        println!("  Page: erase @{:#08x}", self.address);

        hal.erase(self.address, self.address + self.size as u32)
            .map_err(|_| Error::FlashError)
    }

    /// A page counts as empty if its first line is free. This holds for every page this crate
    /// erased, so it is enough to tell the active page apart when opening.
    pub(crate) fn is_empty<T: Platform>(&self, hal: &mut T) -> Result<bool, Error> {
        Ok(self.read_line(hal, 0)?.is_free())
    }

    /// Checks every line. Foreign content may hide behind a free first line.
    pub(crate) fn is_erased<T: Platform>(&self, hal: &mut T) -> Result<bool, Error> {
        for index in 0..self.lines() {
            if !self.read_line(hal, index)?.is_free() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub(crate) fn find_free_line<T: Platform>(&self, hal: &mut T) -> Result<Option<usize>, Error> {
        for index in 0..self.lines() {
            if self.read_line(hal, index)?.is_free() {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Writes entries into the free lines starting at the first free one, until either all
    /// entries are written, the page is full or a programmed line follows. Returns the number of
    /// written entries.
    ///
    /// The flash has to be unlocked by the caller.
    pub(crate) fn append<T: Platform>(
        &self,
        hal: &mut T,
        entries: &[(u16, u16)],
    ) -> Result<usize, Error> {
        let Some(first_free) = self.find_free_line(hal)? else {
            return Ok(0);
        };

        let mut written = 0;
        for (index, &(key, value)) in (first_free..self.lines()).zip(entries) {
            // foreign pages may continue with data after a gap
            if index > first_free && !self.read_line(hal, index)?.is_free() {
                #[cfg(feature = "defmt")]
                warn!("append: programmed line @{:#08x}[{}]", self.address, index);
                break;
            }
            self.write_line(hal, index, LogLine::new(key, value))?;
            written += 1;
        }

        Ok(written)
    }
}

impl<T: Platform> Eeprom<T> {
    pub(crate) fn current_page(&self) -> Page {
        self.pages[self.active as usize]
    }

    /// Scans the whole active page front to back. Lines are only ever appended, so the last match
    /// is the latest write.
    pub(crate) fn find_value(&mut self, key: u16) -> Result<Option<u16>, Error> {
        #[cfg(feature = "defmt")]
        trace!("find_value: {}", key);

        if key >= self.num_keys {
            return Ok(None);
        }

        let page = self.current_page();
        let mut found = None;
        for index in 0..page.lines() {
            let line = page.read_line(&mut self.hal, index)?;
            if !line.is_free() && line.key() == key {
                found = Some(line.value());
            }
        }

        Ok(found)
    }

    pub(crate) fn set_value_internal(&mut self, key: u16, value: u16) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("set_value_internal: {} = {:#x}", key, value);

        #[cfg(feature = "debug-logs")]
        println!("internal: set_value {key} = {value:#06x}");

        if key >= self.num_keys {
            return Err(Error::InvalidKey);
        }

        if self.find_value(key)? == Some(value) {
            return Ok(());
        }

        self.store_entries(&[(key, value)])
    }

    pub(crate) fn store_entries(&mut self, entries: &[(u16, u16)]) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("store_entries: {} entries", entries.len());

        if entries.iter().any(|&(key, _)| key >= self.num_keys) {
            return Err(Error::InvalidKey);
        }
        if entries.is_empty() {
            return Ok(());
        }

        let page = self.current_page();
        let written = page.append(&mut *Unlocked::new(&mut self.hal), entries)?;
        if written == entries.len() {
            return Ok(());
        }

        self.switch_pages(&entries[written..])
    }

    /// Moves the latest value of every key to the inactive page, erases the active page and
    /// promotes the inactive one. Keys contained in `pending` are not carried over, the pending
    /// entries are appended to the new page afterward instead.
    ///
    /// The active page is walked backward: the first line seen for a key is its latest value, and
    /// every older line of that key can be skipped.
    fn switch_pages(&mut self, pending: &[(u16, u16)]) -> Result<(), Error> {
        let source = self.current_page();
        let target_slot = self.active.other();
        let target = self.pages[target_slot as usize];

        #[cfg(feature = "defmt")]
        trace!("switch_pages: {} -> {}", self.active, target_slot);

        #[cfg(feature = "debug-logs")]
        println!("internal: switch_pages {} -> {target_slot}", self.active);

        let mut hal = Unlocked::new(&mut self.hal);

        if !target.is_erased(&mut *hal)? {
            #[cfg(feature = "defmt")]
            warn!("switch_pages: inactive page @{:#08x} not empty", target.address);

            target.erase(&mut *hal)?;
        }

        let mut seen = KeyBitmap::new();
        let mut next_free = 0;
        for index in (0..source.lines()).rev() {
            if next_free == target.lines() {
                break;
            }

            let line = source.read_line(&mut *hal, index)?;
            if line.is_free() {
                continue;
            }

            let key = line.key();
            if key >= self.num_keys {
                #[cfg(feature = "defmt")]
                warn!("switch_pages: dropping line with invalid key {}", key);
                continue;
            }
            if seen.is_set(key as usize) || pending.iter().any(|&(it, _)| it == key) {
                continue;
            }

            target.write_line(&mut *hal, next_free, line)?;
            seen.set(key as usize);
            next_free += 1;
        }

        source.erase(&mut *hal)?;
        self.active = target_slot;

        let written = target.append(&mut *hal, pending)?;
        if written < pending.len() {
            return Err(Error::FlashFull);
        }

        Ok(())
    }

    pub(crate) fn format_pages(&mut self) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("format_pages");

        let mut hal = Unlocked::new(&mut self.hal);
        for page in &self.pages {
            page.erase(&mut *hal)?;
        }
        self.active = PageSlot::A;

        Ok(())
    }

    pub(crate) fn visit_lines<F>(&mut self, mut visitor: F) -> Result<(), Error>
    where
        F: FnMut(u16, u16),
    {
        let page = self.current_page();
        for index in 0..page.lines() {
            let line = page.read_line(&mut self.hal, index)?;
            if !line.is_free() {
                visitor(line.key(), line.value());
            }
        }

        Ok(())
    }

    pub(crate) fn collect_statistics(&mut self) -> Result<Statistics, Error> {
        let num_keys = self.num_keys;
        let mut live = KeyBitmap::new();
        let mut live_keys = 0u16;
        let mut written = 0u32;

        self.visit_lines(|key, _| {
            written += 1;
            if key < num_keys && !live.is_set(key as usize) {
                live.set(key as usize);
                live_keys += 1;
            }
        })?;

        Ok(Statistics {
            active: self.active,
            written,
            empty: self.current_page().lines() as u32 - written,
            live_keys,
        })
    }
}
