#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};
use flash_eeprom::Config;
use flash_eeprom::platform::WriteProtect;

pub const PAGE_SIZE: usize = 1024;
pub const WORD_SIZE: usize = 4;
pub const LINES_PER_PAGE: usize = PAGE_SIZE / WORD_SIZE;

pub const CONFIG: Config = Config::new(0, PAGE_SIZE as u32);

pub struct Flash {
    pub buf: Vec<u8>,
    pub fail_after_operation: usize,
    pub operations: Vec<Operation>,
    /// Nesting depth of `unlock()` calls, zero means write protected.
    pub unlocked: usize,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
    Erase { offset: u32, len: usize },
}

impl Flash {
    pub fn new(pages: usize) -> Self {
        Self::new_filled(pages, 0xFF)
    }

    /// Flash holding foreign content, e.g. zeroed on delivery.
    pub fn new_filled(pages: usize, fill: u8) -> Self {
        Self {
            buf: vec![fill; PAGE_SIZE * pages],
            fail_after_operation: usize::MAX,
            operations: vec![],
            unlocked: 0,
        }
    }

    pub fn new_with_fault(pages: usize, fail_after_operation: usize) -> Self {
        Self {
            fail_after_operation,
            ..Self::new(pages)
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn page(&self, index: usize) -> &[u8] {
        &self.buf[index * PAGE_SIZE..(index + 1) * PAGE_SIZE]
    }

    pub fn page_is_erased(&self, index: usize) -> bool {
        self.page(index).iter().all(|&byte| byte == 0xFF)
    }

    /// Programs a raw little endian line, bypassing the write protection.
    pub fn put_line(&mut self, page: usize, line: usize, word: u32) {
        let offset = page * PAGE_SIZE + line * WORD_SIZE;
        self.buf[offset..offset + WORD_SIZE].copy_from_slice(&word.to_le_bytes());
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
    }

    pub fn erases(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Erase { .. }))
            .count()
    }

    pub fn writes(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Write { .. }))
            .count()
    }

    pub fn dump_operations(&self) {
        println!("Operations:");
        for op in &self.operations {
            println!("  {:?}", op);
        }
    }

    fn record(&mut self, operation: Operation) -> Result<(), FlashError> {
        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            return Err(FlashError);
        }
        self.operations.push(operation);
        Ok(())
    }
}

#[derive(Debug)]
pub struct FlashError;

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

impl ErrorType for Flash {
    type Error = FlashError;
}

impl ReadNorFlash for Flash {
    const READ_SIZE: usize = WORD_SIZE;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::READ_SIZE as _));

        self.record(Operation::Read {
            offset,
            len: bytes.len(),
        })?;

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl NorFlash for Flash {
    const WRITE_SIZE: usize = WORD_SIZE;

    const ERASE_SIZE: usize = PAGE_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        assert!(from.is_multiple_of(Self::ERASE_SIZE as _));
        assert!(to.is_multiple_of(Self::ERASE_SIZE as _));
        assert!(self.unlocked > 0, "erase while write protected");

        println!(
            "    flash: erase: {from:04X} - {to:04X} #{:>2}",
            self.operations.len()
        );

        self.record(Operation::Erase {
            offset: from,
            len: (to - from) as usize,
        })?;

        for addr in from..to {
            self.buf[addr as usize] = 0xff;
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::WRITE_SIZE as _));
        assert!(bytes.len().is_multiple_of(Self::WRITE_SIZE as _));
        assert!(self.unlocked > 0, "write while write protected");

        println!(
            "    flash: write: 0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );

        self.record(Operation::Write {
            offset,
            len: bytes.len(),
        })?;

        let offset = offset as usize;
        // appending must never hit a line that was already programmed
        assert!(
            self.buf[offset..offset + bytes.len()]
                .iter()
                .all(|&byte| byte == 0xFF),
            "write to programmed line at 0x{offset:04X}"
        );
        for (i, &val) in bytes.iter().enumerate() {
            // flash can only flip bits from 1 to 0
            self.buf[offset + i] &= val;
        }
        Ok(())
    }
}

impl WriteProtect for Flash {
    fn unlock(&mut self) {
        self.unlocked += 1;
    }

    fn lock(&mut self) {
        assert!(self.unlocked > 0, "unbalanced lock");
        self.unlocked -= 1;
    }
}
