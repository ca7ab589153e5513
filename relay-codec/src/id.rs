//! 128-bit random identifiers with a custom base-16 textual form.

use crate::buffer::Buffer;
use crate::error::{PackError, ParseIdError, UnpackError};
use crate::validate::FieldError;
use crate::wire::Wire;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The 16-symbol alphabet of the textual form.
const ALPHABET: [u8; 16] = *b"abcdefghij123456";

/// A 16-byte identifier.
///
/// Each byte renders as two characters: the high nibble lowercase, the
/// low nibble uppercase (digits are unchanged by case). Parsing is
/// case-insensitive but keeps the high-then-low positional order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id128([u8; 16]);

impl Id128 {
    pub const ZERO: Id128 = Id128([0; 16]);

    /// Draws a fresh identifier from the operating system's
    /// cryptographic random source.
    pub fn generate() -> Id128 {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        Id128(bytes)
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Id128 {
        Id128(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Id128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            let high = ALPHABET[(byte >> 4) as usize] as char;
            let low = ALPHABET[(byte & 0x0f) as usize].to_ascii_uppercase() as char;
            write!(f, "{high}{low}")?;
        }
        Ok(())
    }
}

fn nibble(symbol: u8) -> Option<u8> {
    match symbol.to_ascii_lowercase() {
        c @ b'a'..=b'j' => Some(c - b'a'),
        c @ b'1'..=b'6' => Some(c - b'1' + 10),
        _ => None,
    }
}

impl FromStr for Id128 {
    type Err = ParseIdError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let symbols = text.as_bytes();
        if symbols.len() != 32 {
            return Err(ParseIdError::WrongLength(symbols.len()));
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let high = nibble(symbols[2 * i])
                .ok_or(ParseIdError::InvalidCharacter(symbols[2 * i] as char))?;
            let low = nibble(symbols[2 * i + 1])
                .ok_or(ParseIdError::InvalidCharacter(symbols[2 * i + 1] as char))?;
            *byte = (high << 4) | low;
        }
        Ok(Id128(bytes))
    }
}

impl Serialize for Id128 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Id128 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // JSON null decodes to the zero identifier without error.
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(Id128::ZERO),
            Some(text) => text.parse().map_err(D::Error::custom),
        }
    }
}

impl Wire for Id128 {
    const PLAIN: bool = true;
    const LABEL: &'static str = "id128";

    fn default_value() -> Self {
        Id128::ZERO
    }

    fn is_default(&self) -> bool {
        self.is_zero()
    }

    fn pack(&self, buf: &mut Buffer) -> Result<(), PackError> {
        buf.put_slice(&self.0);
        Ok(())
    }

    fn unpack(buf: &mut Buffer) -> Result<Self, UnpackError> {
        let position = buf.position();
        let bytes = buf
            .take_array()
            .ok_or_else(|| UnpackError::eof(position, "id128"))?;
        Ok(Id128(bytes))
    }

    fn collect_missing(&self, _prefix: &str, _errors: &mut Vec<FieldError>) {}
}
