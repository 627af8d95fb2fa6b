use core::ops::{Deref, DerefMut};
use embedded_storage::nor_flash::NorFlash;

/// See README.md for an example implementation.
pub trait Platform: WriteProtect + NorFlash {}

impl<T: WriteProtect + NorFlash> Platform for T {}

/// Toggles the programming lock of the flash controller.
///
/// Implementations have to tolerate nested calls: a page switch keeps the flash unlocked while
/// it copies the surviving lines and appends the pending ones.
pub trait WriteProtect {
    fn unlock(&mut self);
    fn lock(&mut self);
}

impl<T: WriteProtect> WriteProtect for &mut T {
    fn unlock(&mut self) {
        (**self).unlock()
    }

    fn lock(&mut self) {
        (**self).lock()
    }
}

/// Keeps the flash unlocked for as long as it is alive. The lock is restored on drop, so every
/// exit path of a mutating operation leaves the flash write protected.
pub(crate) struct Unlocked<'a, T: Platform> {
    hal: &'a mut T,
}

impl<'a, T: Platform> Unlocked<'a, T> {
    pub(crate) fn new(hal: &'a mut T) -> Self {
        hal.unlock();
        Self { hal }
    }
}

impl<T: Platform> Deref for Unlocked<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.hal
    }
}

impl<T: Platform> DerefMut for Unlocked<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.hal
    }
}

impl<T: Platform> Drop for Unlocked<'_, T> {
    fn drop(&mut self) {
        self.hal.lock();
    }
}

#[cfg(any(
    feature = "esp32",
    feature = "esp32s2",
    feature = "esp32s3",
    feature = "esp32c2",
    feature = "esp32c3",
    feature = "esp32c6",
    feature = "esp32h2",
))]
mod chip {
    use esp_storage::FlashStorage;

    use crate::platform::WriteProtect;

    // esp-storage unlocks the SPI flash for every single operation on its own.
    impl WriteProtect for FlashStorage<'_> {
        fn unlock(&mut self) {}

        fn lock(&mut self) {}
    }
}
