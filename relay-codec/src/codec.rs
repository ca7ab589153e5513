//! Record encoding and decoding.
//!
//! Encoded records are self-describing: each non-default field emits a
//! FIELD_ID token, its 16-bit identifier, and the field body, and the
//! record closes with an END token. Fields absent from the stream decode
//! to their default values, which is what keeps the format forward and
//! backward compatible as identifiers are added over time.

use crate::buffer::Buffer;
use crate::error::{PackError, UnpackError};
use crate::record::{schema_of, Record};
use crate::wire::{read_token, Token};

/// Encodes a record into a fresh byte vector.
pub fn pack<T: Record>(value: &T) -> Result<Vec<u8>, PackError> {
    let mut buf = Buffer::new();
    pack_into(value, &mut buf)?;
    Ok(buf.into_vec())
}

/// Encodes a record body (fields plus the closing END token) into `buf`.
pub fn pack_into<T: Record>(value: &T, buf: &mut Buffer) -> Result<(), PackError> {
    let schema = schema_of::<T>();
    for field in &schema.fields {
        if field.id == 0 || field.matches_default(value) {
            continue;
        }
        buf.put_slice(&[Token::FieldId as u8]);
        buf.put_slice(&field.id.to_ne_bytes());
        field.pack_value(value, buf)?;
    }
    buf.put_slice(&[Token::End as u8]);
    Ok(())
}

/// Decodes a record from an encoded byte slice.
pub fn unpack<T: Record>(data: &[u8]) -> Result<T, UnpackError> {
    let mut buf = Buffer::from_slice(data);
    unpack_from(&mut buf)
}

/// Decodes a record body from `buf`, stopping at its END token.
///
/// Unknown field identifiers are rejected: a stream that names a field
/// the schema does not know cannot be decoded safely.
pub fn unpack_from<T: Record>(buf: &mut Buffer) -> Result<T, UnpackError> {
    let schema = schema_of::<T>();
    let mut value = T::default();
    loop {
        let position = buf.position();
        match read_token(buf)? {
            Token::End => break,
            Token::FieldId => {}
            other => {
                return Err(UnpackError::new(
                    position,
                    format!("expected FIELD_ID or END token, got {other:?}"),
                ));
            }
        }

        let position = buf.position();
        let id_bytes = buf
            .take_array()
            .ok_or_else(|| UnpackError::eof(position, "field id"))?;
        let id = u16::from_ne_bytes(id_bytes);
        if id == 0 {
            return Err(UnpackError::new(position, "field id is zero"));
        }
        let field = schema.field_by_id(id).ok_or_else(|| {
            UnpackError::new(
                position,
                format!("record {} has no field with id {id}", schema.name),
            )
        })?;
        field.unpack_value(&mut value, buf)?;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Id128;
    use crate::record::Schema;
    use crate::wire_record;

    #[derive(Debug, Default, PartialEq, Clone)]
    struct Inner {
        d: f64,
        e: f32,
    }

    impl Record for Inner {
        const NAME: &'static str = "Inner";

        fn build_schema() -> Schema<Self> {
            Schema::builder("Inner")
                .field(1, "D", |v: &Inner| &v.d, |v: &mut Inner| &mut v.d)
                .field(2, "E", |v: &Inner| &v.e, |v: &mut Inner| &mut v.e)
                .finish()
        }
    }

    wire_record!(Inner);

    #[derive(Debug, Default, PartialEq)]
    struct Sample {
        age: i32,
        dead: bool,
        some_string: String,
        sub: Inner,
        names: Vec<String>,
        counts: Vec<u16>,
        id: Id128,
        ignored: u64,
    }

    impl Record for Sample {
        const NAME: &'static str = "Sample";

        fn build_schema() -> Schema<Self> {
            Schema::builder("Sample")
                .field(1, "Age", |v: &Sample| &v.age, |v: &mut Sample| &mut v.age)
                .field(2, "Dead", |v: &Sample| &v.dead, |v: &mut Sample| &mut v.dead)
                .field(
                    3,
                    "SomeString",
                    |v: &Sample| &v.some_string,
                    |v: &mut Sample| &mut v.some_string,
                )
                .field(4, "Sub", |v: &Sample| &v.sub, |v: &mut Sample| &mut v.sub)
                .field(
                    5,
                    "Names",
                    |v: &Sample| &v.names,
                    |v: &mut Sample| &mut v.names,
                )
                .field(
                    6,
                    "Counts",
                    |v: &Sample| &v.counts,
                    |v: &mut Sample| &mut v.counts,
                )
                .field(7, "ID", |v: &Sample| &v.id, |v: &mut Sample| &mut v.id)
                .field(
                    0,
                    "Ignored",
                    |v: &Sample| &v.ignored,
                    |v: &mut Sample| &mut v.ignored,
                )
                .finish()
        }
    }

    wire_record!(Sample);

    #[test]
    fn test_roundtrip_nonzero_fields() {
        let value = Sample {
            age: 61,
            dead: true,
            some_string: "abc".to_string(),
            sub: Inner { d: 444.5, e: 0.0 },
            names: vec!["one".to_string(), "two".to_string()],
            counts: vec![7, 0, 9],
            id: Id128::generate(),
            ignored: 0,
        };
        let bytes = pack(&value).unwrap();
        let decoded: Sample = unpack(&bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_default_fields_are_absent_from_stream() {
        let value = Sample {
            age: 61,
            ..Sample::default()
        };
        let bytes = pack(&value).unwrap();
        // FIELD_ID + id + i32 body + END.
        assert_eq!(bytes.len(), 1 + 2 + 4 + 1);
        let decoded: Sample = unpack(&bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_empty_record_is_just_end() {
        let bytes = pack(&Sample::default()).unwrap();
        assert_eq!(bytes, vec![Token::End as u8]);
        let decoded: Sample = unpack(&bytes).unwrap();
        assert_eq!(decoded, Sample::default());
    }

    #[test]
    fn test_fields_without_id_are_not_encoded() {
        let value = Sample {
            ignored: 99,
            ..Sample::default()
        };
        let bytes = pack(&value).unwrap();
        assert_eq!(bytes, vec![Token::End as u8]);
        let decoded: Sample = unpack(&bytes).unwrap();
        assert_eq!(decoded.ignored, 0);
    }

    #[test]
    fn test_unknown_field_id_rejected() {
        let mut buf = Buffer::new();
        buf.put_slice(&[Token::FieldId as u8]);
        buf.put_slice(&99u16.to_ne_bytes());
        buf.put_slice(&5i32.to_ne_bytes());
        buf.put_slice(&[Token::End as u8]);

        let err = unpack::<Sample>(&buf.into_vec()).unwrap_err();
        assert!(err.message.contains("no field with id 99"));
    }

    #[test]
    fn test_zero_field_id_rejected() {
        let mut buf = Buffer::new();
        buf.put_slice(&[Token::FieldId as u8]);
        buf.put_slice(&0u16.to_ne_bytes());

        let err = unpack::<Sample>(&buf.into_vec()).unwrap_err();
        assert!(err.message.contains("field id is zero"));
    }

    #[test]
    fn test_truncated_input_rejected() {
        let value = Sample {
            some_string: "hello".to_string(),
            ..Sample::default()
        };
        let bytes = pack(&value).unwrap();
        let err = unpack::<Sample>(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(err.message.contains("end of input"));
    }

    #[test]
    fn test_unexpected_token_rejected() {
        let bytes = vec![Token::ArraySize as u8];
        let err = unpack::<Sample>(&bytes).unwrap_err();
        assert!(err.message.contains("expected FIELD_ID or END"));
        assert_eq!(err.position, 0);
    }

    #[test]
    fn test_nested_record_roundtrip() {
        let value = Sample {
            sub: Inner { d: 1.25, e: -3.5 },
            ..Sample::default()
        };
        let bytes = pack(&value).unwrap();
        let decoded: Sample = unpack(&bytes).unwrap();
        assert_eq!(decoded.sub, value.sub);
        assert_eq!(decoded.age, 0);
    }

    #[test]
    fn test_empty_string_field_roundtrip() {
        // An explicitly encoded empty string decodes back to empty.
        let mut buf = Buffer::new();
        buf.put_slice(&[Token::FieldId as u8]);
        buf.put_slice(&3u16.to_ne_bytes());
        buf.put_slice(&0u32.to_ne_bytes());
        buf.put_slice(&[Token::End as u8]);

        let decoded: Sample = unpack(&buf.into_vec()).unwrap();
        assert_eq!(decoded.some_string, "");
    }
}
