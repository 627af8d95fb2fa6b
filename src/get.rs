//! The `Get<T>` trait and its implementation in this module allows providing a single generic,
//! overloaded function `get<T>()` for all supported types of the driver. Every value is stored as
//! u16 and converted with plain `as` semantics.

use crate::Eeprom;
use crate::error::Error;
use crate::platform::Platform;

pub trait Get<T> {
    fn get(&mut self, key: u16) -> Result<Option<T>, Error>;
}

impl<T, G: Get<T>> Get<T> for &mut G {
    fn get(&mut self, key: u16) -> Result<Option<T>, Error> {
        (*self).get(key)
    }
}

impl<T: Platform> Get<u16> for Eeprom<T> {
    fn get(&mut self, key: u16) -> Result<Option<u16>, Error> {
        self.find_value(key)
    }
}

impl<T: Platform> Get<bool> for Eeprom<T> {
    fn get(&mut self, key: u16) -> Result<Option<bool>, Error> {
        let value = self.find_value(key)?;
        Ok(value.map(|value| value != 0))
    }
}

impl<T: Platform> Get<u8> for Eeprom<T> {
    fn get(&mut self, key: u16) -> Result<Option<u8>, Error> {
        let value = self.find_value(key)?;
        Ok(value.map(|value| value as u8))
    }
}

impl<T: Platform> Get<i8> for Eeprom<T> {
    fn get(&mut self, key: u16) -> Result<Option<i8>, Error> {
        let value = self.find_value(key)?;
        Ok(value.map(|value| value as i8))
    }
}

impl<T: Platform> Get<i16> for Eeprom<T> {
    fn get(&mut self, key: u16) -> Result<Option<i16>, Error> {
        let value = self.find_value(key)?;
        Ok(value.map(u16::cast_signed))
    }
}

impl<T: Platform> Get<u32> for Eeprom<T> {
    fn get(&mut self, key: u16) -> Result<Option<u32>, Error> {
        let value = self.find_value(key)?;
        Ok(value.map(u32::from))
    }
}

impl<T: Platform> Get<u64> for Eeprom<T> {
    fn get(&mut self, key: u16) -> Result<Option<u64>, Error> {
        let value = self.find_value(key)?;
        Ok(value.map(u64::from))
    }
}

impl<T: Platform> Get<usize> for Eeprom<T> {
    fn get(&mut self, key: u16) -> Result<Option<usize>, Error> {
        let value = self.find_value(key)?;
        Ok(value.map(usize::from))
    }
}
