//! Wire tokens and the set of field kinds the binary codec supports.

use crate::buffer::Buffer;
use crate::error::{PackError, UnpackError};
use crate::validate::FieldError;
use num_complex::{Complex32, Complex64};

/// One-byte discriminators in the encoded stream. Byte `0` is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Token {
    FieldId = 1,
    End = 2,
    ArrayIndex = 3,
    ArraySize = 4,
}

impl Token {
    pub fn from_byte(byte: u8) -> Option<Token> {
        match byte {
            1 => Some(Token::FieldId),
            2 => Some(Token::End),
            3 => Some(Token::ArrayIndex),
            4 => Some(Token::ArraySize),
            _ => None,
        }
    }
}

/// Reads and validates the next token byte.
pub fn read_token(buf: &mut Buffer) -> Result<Token, UnpackError> {
    let position = buf.position();
    let [byte] = buf
        .take_array()
        .ok_or_else(|| UnpackError::eof(position, "token"))?;
    Token::from_byte(byte)
        .ok_or_else(|| UnpackError::new(position, format!("invalid token byte {byte}")))
}

/// A value that can appear as a record field on the wire.
///
/// Primitive images use host byte order; the encoded form is a private
/// on-disk format, not a cross-platform one. Pointer-width integers
/// (`usize`/`isize`) deliberately have no implementation: the codec
/// requires exact widths.
pub trait Wire: Sized + 'static {
    /// Width-fixed kinds are stored contiguously inside arrays and
    /// sequences instead of as index-tagged elements.
    const PLAIN: bool = false;

    /// Short name used in schema documentation and validation prefixes.
    const LABEL: &'static str;

    /// The value a decoded field holds when it is absent from the stream.
    fn default_value() -> Self;

    /// Whether the value equals [`default_value`](Self::default_value);
    /// such fields are skipped entirely when encoding.
    fn is_default(&self) -> bool;

    /// Encodes the field body (without the field-id prefix).
    fn pack(&self, buf: &mut Buffer) -> Result<(), PackError>;

    /// Decodes the field body.
    fn unpack(buf: &mut Buffer) -> Result<Self, UnpackError>;

    /// Recurses into nested records and sequences collecting
    /// missing-required-field errors. Scalar kinds have nothing to add.
    fn collect_missing(&self, _prefix: &str, _errors: &mut Vec<FieldError>) {}

    /// Renders the type for schema documentation.
    fn describe(out: &mut String, _indent: usize) {
        out.push_str("<b>");
        out.push_str(Self::LABEL);
        out.push_str("</b>");
    }
}

macro_rules! wire_numeric {
    ($($ty:ty => $label:literal),* $(,)?) => {$(
        impl Wire for $ty {
            const PLAIN: bool = true;
            const LABEL: &'static str = $label;

            fn default_value() -> Self {
                0 as $ty
            }

            fn is_default(&self) -> bool {
                *self == Self::default_value()
            }

            fn pack(&self, buf: &mut Buffer) -> Result<(), PackError> {
                buf.put_slice(&self.to_ne_bytes());
                Ok(())
            }

            fn unpack(buf: &mut Buffer) -> Result<Self, UnpackError> {
                let position = buf.position();
                let bytes = buf
                    .take_array()
                    .ok_or_else(|| UnpackError::eof(position, $label))?;
                Ok(<$ty>::from_ne_bytes(bytes))
            }
        }
    )*};
}

wire_numeric! {
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    f32 => "f32",
    f64 => "f64",
}

impl Wire for bool {
    const PLAIN: bool = true;
    const LABEL: &'static str = "bool";

    fn default_value() -> Self {
        false
    }

    fn is_default(&self) -> bool {
        !*self
    }

    fn pack(&self, buf: &mut Buffer) -> Result<(), PackError> {
        buf.put_slice(&[u8::from(*self)]);
        Ok(())
    }

    fn unpack(buf: &mut Buffer) -> Result<Self, UnpackError> {
        let position = buf.position();
        let [byte] = buf
            .take_array()
            .ok_or_else(|| UnpackError::eof(position, "bool"))?;
        Ok(byte != 0)
    }
}

macro_rules! wire_complex {
    ($($ty:ty, $part:ty => $label:literal),* $(,)?) => {$(
        impl Wire for $ty {
            const PLAIN: bool = true;
            const LABEL: &'static str = $label;

            fn default_value() -> Self {
                <$ty>::new(0.0, 0.0)
            }

            fn is_default(&self) -> bool {
                *self == Self::default_value()
            }

            fn pack(&self, buf: &mut Buffer) -> Result<(), PackError> {
                buf.put_slice(&self.re.to_ne_bytes());
                buf.put_slice(&self.im.to_ne_bytes());
                Ok(())
            }

            fn unpack(buf: &mut Buffer) -> Result<Self, UnpackError> {
                let re = <$part as Wire>::unpack(buf)?;
                let im = <$part as Wire>::unpack(buf)?;
                Ok(<$ty>::new(re, im))
            }
        }
    )*};
}

wire_complex! {
    Complex32, f32 => "complex32",
    Complex64, f64 => "complex64",
}

impl Wire for String {
    const LABEL: &'static str = "string";

    fn default_value() -> Self {
        String::new()
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }

    fn pack(&self, buf: &mut Buffer) -> Result<(), PackError> {
        if self.len() > u32::MAX as usize {
            return Err(PackError::StringTooLong { len: self.len() });
        }
        buf.put_slice(&(self.len() as u32).to_ne_bytes());
        buf.put_slice(self.as_bytes());
        Ok(())
    }

    fn unpack(buf: &mut Buffer) -> Result<Self, UnpackError> {
        let position = buf.position();
        let len_bytes = buf
            .take_array()
            .ok_or_else(|| UnpackError::eof(position, "string length"))?;
        let len = u32::from_ne_bytes(len_bytes) as usize;
        let position = buf.position();
        let bytes = buf
            .take(len)
            .ok_or_else(|| UnpackError::eof(position, "string bytes"))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| UnpackError::new(position, "string is not valid UTF-8"))
    }
}

impl<W: Wire> Wire for Vec<W> {
    const LABEL: &'static str = W::LABEL;

    fn default_value() -> Self {
        Vec::new()
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }

    fn pack(&self, buf: &mut Buffer) -> Result<(), PackError> {
        if self.len() > u32::MAX as usize {
            return Err(PackError::SequenceTooLong { len: self.len() });
        }
        buf.put_slice(&[Token::ArraySize as u8]);
        buf.put_slice(&(self.len() as u32).to_ne_bytes());
        pack_elements(self, buf)
    }

    fn unpack(buf: &mut Buffer) -> Result<Self, UnpackError> {
        let position = buf.position();
        let token = read_token(buf)?;
        if token != Token::ArraySize {
            return Err(UnpackError::new(
                position,
                format!("expected ARRAY_SIZE token, got {token:?}"),
            ));
        }
        let position = buf.position();
        let len_bytes = buf
            .take_array()
            .ok_or_else(|| UnpackError::eof(position, "sequence length"))?;
        let len = u32::from_ne_bytes(len_bytes) as usize;
        let mut items: Vec<W> = (0..len).map(|_| W::default_value()).collect();
        unpack_elements(&mut items, buf)?;
        Ok(items)
    }

    fn collect_missing(&self, prefix: &str, errors: &mut Vec<FieldError>) {
        for (index, item) in self.iter().enumerate() {
            let elem_prefix = format!("{prefix}{}[{index}]/", W::LABEL);
            item.collect_missing(&elem_prefix, errors);
        }
    }

    fn describe(out: &mut String, indent: usize) {
        describe_sequence::<W>(out, indent);
    }
}

impl<W: Wire, const N: usize> Wire for [W; N] {
    const LABEL: &'static str = W::LABEL;

    fn default_value() -> Self {
        core::array::from_fn(|_| W::default_value())
    }

    fn is_default(&self) -> bool {
        self.iter().all(Wire::is_default)
    }

    fn pack(&self, buf: &mut Buffer) -> Result<(), PackError> {
        pack_elements(self, buf)
    }

    fn unpack(buf: &mut Buffer) -> Result<Self, UnpackError> {
        let mut items = Self::default_value();
        unpack_elements(&mut items, buf)?;
        Ok(items)
    }

    fn collect_missing(&self, prefix: &str, errors: &mut Vec<FieldError>) {
        for (index, item) in self.iter().enumerate() {
            let elem_prefix = format!("{prefix}{}[{index}]/", W::LABEL);
            item.collect_missing(&elem_prefix, errors);
        }
    }

    fn describe(out: &mut String, indent: usize) {
        describe_sequence::<W>(out, indent);
    }
}

/// Encodes array/sequence elements: contiguous images for plain kinds,
/// index-tagged non-default elements terminated by END otherwise.
fn pack_elements<W: Wire>(items: &[W], buf: &mut Buffer) -> Result<(), PackError> {
    if W::PLAIN {
        for item in items {
            item.pack(buf)?;
        }
        return Ok(());
    }
    for (index, item) in items.iter().enumerate() {
        if item.is_default() {
            continue;
        }
        buf.put_slice(&[Token::ArrayIndex as u8]);
        buf.put_slice(&(index as u32).to_ne_bytes());
        item.pack(buf)?;
    }
    buf.put_slice(&[Token::End as u8]);
    Ok(())
}

/// Decodes array/sequence elements into pre-sized storage.
fn unpack_elements<W: Wire>(items: &mut [W], buf: &mut Buffer) -> Result<(), UnpackError> {
    if W::PLAIN {
        for slot in items.iter_mut() {
            *slot = W::unpack(buf)?;
        }
        return Ok(());
    }
    loop {
        let position = buf.position();
        match read_token(buf)? {
            Token::End => return Ok(()),
            Token::ArrayIndex => {}
            other => {
                return Err(UnpackError::new(
                    position,
                    format!("expected ARRAY_INDEX or END token, got {other:?}"),
                ));
            }
        }
        let position = buf.position();
        let index_bytes = buf
            .take_array()
            .ok_or_else(|| UnpackError::eof(position, "element index"))?;
        let index = u32::from_ne_bytes(index_bytes) as usize;
        if index >= items.len() {
            return Err(UnpackError::new(
                position,
                format!(
                    "element index {index} is outside of bounds ({})",
                    items.len()
                ),
            ));
        }
        items[index] = W::unpack(buf)?;
    }
}

fn describe_sequence<W: Wire>(out: &mut String, indent: usize) {
    out.push_str("[\n");
    for _ in 0..indent + 4 {
        out.push(' ');
    }
    W::describe(out, indent + 4);
    out.push('\n');
    for _ in 0..indent {
        out.push(' ');
    }
    out.push(']');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_byte() {
        assert_eq!(Token::from_byte(1), Some(Token::FieldId));
        assert_eq!(Token::from_byte(2), Some(Token::End));
        assert_eq!(Token::from_byte(3), Some(Token::ArrayIndex));
        assert_eq!(Token::from_byte(4), Some(Token::ArraySize));
        assert_eq!(Token::from_byte(0), None);
        assert_eq!(Token::from_byte(5), None);
    }

    fn roundtrip<W: Wire + PartialEq + std::fmt::Debug>(value: W) -> W {
        let mut buf = Buffer::new();
        value.pack(&mut buf).unwrap();
        let mut read = Buffer::from_slice(&buf.into_vec());
        W::unpack(&mut read).unwrap()
    }

    #[test]
    fn test_numeric_roundtrip() {
        assert_eq!(roundtrip(-7i8), -7);
        assert_eq!(roundtrip(61i32), 61);
        assert_eq!(roundtrip(u64::MAX), u64::MAX);
        assert_eq!(roundtrip(444.5f64), 444.5);
        assert_eq!(roundtrip(true), true);
    }

    #[test]
    fn test_complex_roundtrip() {
        let value = Complex64::new(1.5, -2.25);
        assert_eq!(roundtrip(value), value);
        assert!(Complex32::new(0.0, 0.0).is_default());
        assert!(!Complex32::new(0.0, 1.0).is_default());
    }

    #[test]
    fn test_string_roundtrip() {
        assert_eq!(roundtrip("abc".to_string()), "abc");
        // Zero-length strings are valid on both sides.
        assert_eq!(roundtrip(String::new()), "");
    }

    #[test]
    fn test_string_invalid_utf8() {
        let mut buf = Buffer::new();
        buf.put_slice(&2u32.to_ne_bytes());
        buf.put_slice(&[0xff, 0xfe]);
        let mut read = Buffer::from_slice(&buf.into_vec());
        let err = String::unpack(&mut read).unwrap_err();
        assert!(err.message.contains("UTF-8"));
    }

    #[test]
    fn test_plain_sequence_roundtrip() {
        let values = vec![1u16, 0, 3];
        assert_eq!(roundtrip(values.clone()), values);
    }

    #[test]
    fn test_sparse_sequence_skips_defaults() {
        let values = vec!["a".to_string(), String::new(), "c".to_string()];
        let mut buf = Buffer::new();
        values.pack(&mut buf).unwrap();
        let encoded = buf.into_vec();
        // ARRAY_SIZE + count, then one entry each for "a" and "c"
        // (token + index + length prefix + one byte), then END.
        assert_eq!(encoded[0], Token::ArraySize as u8);
        assert_eq!(encoded[5], Token::ArrayIndex as u8);
        assert_eq!(encoded.len(), 5 + 2 * (1 + 4 + 4 + 1) + 1);

        let mut read = Buffer::from_slice(&encoded);
        assert_eq!(Vec::<String>::unpack(&mut read).unwrap(), values);
    }

    #[test]
    fn test_fixed_array_roundtrip() {
        let plain: [u8; 4] = [9, 0, 0, 2];
        assert_eq!(roundtrip(plain), plain);

        let sparse: [String; 2] = ["x".to_string(), String::new()];
        assert_eq!(roundtrip(sparse.clone()), sparse);
    }

    #[test]
    fn test_sequence_index_out_of_bounds() {
        let mut buf = Buffer::new();
        buf.put_slice(&[Token::ArraySize as u8]);
        buf.put_slice(&1u32.to_ne_bytes());
        buf.put_slice(&[Token::ArrayIndex as u8]);
        buf.put_slice(&9u32.to_ne_bytes());
        let mut read = Buffer::from_slice(&buf.into_vec());
        let err = Vec::<String>::unpack(&mut read).unwrap_err();
        assert!(err.message.contains("outside of bounds"));
    }

    #[test]
    fn test_truncated_primitive() {
        let mut read = Buffer::from_slice(&[1, 2]);
        let err = u32::unpack(&mut read).unwrap_err();
        assert!(err.message.contains("end of input"));
    }
}
