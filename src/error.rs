use thiserror::Error;

/// Errors that can occur while using the emulated EEPROM. Marked as non-exhaustive to allow for
/// future additions without breaking the API. A caller would likely only need to handle
/// InvalidKey and FlashFull at runtime, the configuration errors are static.
#[derive(Error, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// Page offsets have to be aligned to the erase size of the flash and must not overlap.
    #[error("invalid page address")]
    InvalidPageAddress,

    /// The page size has to be a non-zero multiple of both the erase size and the line size.
    #[error("invalid page size")]
    InvalidPageSize,

    /// Lines are programmed and read one 32 bit word at a time, the flash has to support that.
    #[error("unsupported flash")]
    UnsupportedFlash,

    /// The key space is limited to 256 keys and must fit onto a single page, otherwise a
    /// page switch could not retain every live key.
    #[error("too many keys")]
    TooManyKeys,

    /// The internal error value is returned from the provided flash driver. Once this happened
    /// all further writes are rejected until the storage is constructed again.
    #[error("internal flash error")]
    FlashError,

    /// The key is outside of the configured key space.
    #[error("invalid key")]
    InvalidKey,

    /// The batch did not fit onto the active page even after switching pages.
    #[error("flash full")]
    FlashFull,
}
