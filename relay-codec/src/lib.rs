//! # relay-codec
//!
//! Schema-tagged binary codec for relay.
//!
//! This crate provides:
//! - A growable byte buffer with raw copy-in/copy-out primitives
//! - 128-bit identifiers with a custom base-16 textual form
//! - A per-record schema registry built with explicit builders
//! - The self-describing `pack`/`unpack` wire format
//! - Required-field validation driven by the same schema
//! - Pseudo-JSON schema rendering for generated documentation

pub mod buffer;
pub mod codec;
pub mod error;
pub mod id;
pub mod record;
pub mod validate;
pub mod wire;

pub use buffer::Buffer;
pub use codec::{pack, pack_into, unpack, unpack_from};
pub use error::{PackError, ParseIdError, UnpackError};
pub use id::Id128;
pub use record::{describe, describe_record, schema_of, FieldSpec, Record, Schema, SchemaBuilder};
pub use validate::{validate, FieldError};
pub use wire::{Token, Wire};
