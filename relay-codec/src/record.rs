//! Record schemas: per-type field metadata built with explicit builders.
//!
//! Each record type registers, per field, a numeric identifier for the
//! binary codec (0 keeps the field out of the codec), its declared and
//! JSON names, the `required` flag, a documentation description, and a
//! vtable of monomorphized encode/decode/validate/describe functions.
//! Schemas are built once per type and published through a process-wide
//! cache keyed by type identity.

use crate::buffer::Buffer;
use crate::error::{PackError, UnpackError};
use crate::validate::FieldError;
use crate::wire::Wire;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::OnceLock;

type IsDefaultFn<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;
type PackFn<T> = Box<dyn Fn(&T, &mut Buffer) -> Result<(), PackError> + Send + Sync>;
type UnpackFn<T> = Box<dyn Fn(&mut T, &mut Buffer) -> Result<(), UnpackError> + Send + Sync>;
type WalkFn<T> = Box<dyn Fn(&T, &str, &mut Vec<FieldError>) + Send + Sync>;
type DescribeFn = fn(&mut String, usize);

/// Metadata and function records for a single field.
pub struct FieldSpec<T: 'static> {
    /// Binary codec identifier; 0 means JSON/documentation only.
    pub id: u16,
    /// Declared field name, used for validation prefixes.
    pub name: &'static str,
    /// JSON name override.
    pub json: Option<&'static str>,
    pub required: bool,
    pub description: &'static str,
    is_default: IsDefaultFn<T>,
    pack: PackFn<T>,
    unpack: UnpackFn<T>,
    walk: WalkFn<T>,
    describe: DescribeFn,
}

impl<T: 'static> FieldSpec<T> {
    /// Name preference for validation errors and documentation: the
    /// JSON name when present, the declared name otherwise.
    pub fn doc_name(&self) -> &'static str {
        self.json.unwrap_or(self.name)
    }

    pub fn matches_default(&self, value: &T) -> bool {
        (self.is_default)(value)
    }

    pub fn pack_value(&self, value: &T, buf: &mut Buffer) -> Result<(), PackError> {
        (self.pack)(value, buf)
    }

    pub fn unpack_value(&self, value: &mut T, buf: &mut Buffer) -> Result<(), UnpackError> {
        (self.unpack)(value, buf)
    }

    pub fn walk_value(&self, value: &T, prefix: &str, errors: &mut Vec<FieldError>) {
        (self.walk)(value, prefix, errors)
    }

    pub fn describe_type(&self, out: &mut String, indent: usize) {
        (self.describe)(out, indent)
    }
}

/// The preprocessed shape of a record type.
pub struct Schema<T: 'static> {
    pub name: &'static str,
    pub fields: Vec<FieldSpec<T>>,
    by_id: HashMap<u16, usize>,
}

impl<T: 'static> Schema<T> {
    pub fn builder(name: &'static str) -> SchemaBuilder<T> {
        SchemaBuilder {
            name,
            fields: Vec::new(),
        }
    }

    pub fn field_by_id(&self, id: u16) -> Option<&FieldSpec<T>> {
        self.by_id.get(&id).map(|&index| &self.fields[index])
    }
}

/// Builds a [`Schema`]. Field options apply to the most recently added
/// field. Finishing the schema validates field-id uniqueness; a
/// duplicate id is a programmer error and aborts the process.
pub struct SchemaBuilder<T: 'static> {
    name: &'static str,
    fields: Vec<FieldSpec<T>>,
}

impl<T: 'static> SchemaBuilder<T> {
    pub fn field<W: Wire>(
        mut self,
        id: u16,
        name: &'static str,
        get: fn(&T) -> &W,
        get_mut: fn(&mut T) -> &mut W,
    ) -> Self {
        self.fields.push(FieldSpec {
            id,
            name,
            json: None,
            required: false,
            description: "",
            is_default: Box::new(move |value| get(value).is_default()),
            pack: Box::new(move |value, buf| get(value).pack(buf)),
            unpack: Box::new(move |value, buf| {
                *get_mut(value) = W::unpack(buf)?;
                Ok(())
            }),
            walk: Box::new(move |value, prefix, errors| {
                get(value).collect_missing(prefix, errors)
            }),
            describe: W::describe,
        });
        self
    }

    pub fn required(mut self) -> Self {
        self.last_field().required = true;
        self
    }

    pub fn json(mut self, name: &'static str) -> Self {
        self.last_field().json = Some(name);
        self
    }

    pub fn description(mut self, text: &'static str) -> Self {
        self.last_field().description = text;
        self
    }

    fn last_field(&mut self) -> &mut FieldSpec<T> {
        self.fields
            .last_mut()
            .expect("field option applied before any field was added")
    }

    pub fn finish(self) -> Schema<T> {
        let mut by_id = HashMap::new();
        for (index, field) in self.fields.iter().enumerate() {
            if field.id == 0 {
                continue;
            }
            if by_id.insert(field.id, index).is_some() {
                panic!(
                    "record {}: field id {} assigned to more than one field",
                    self.name, field.id
                );
            }
        }
        Schema {
            name: self.name,
            fields: self.fields,
            by_id,
        }
    }
}

/// A record type known to the codec, validation walk, and documentation
/// renderer.
pub trait Record: Default + Sized + 'static {
    /// Type name shown in validation prefixes and documentation.
    const NAME: &'static str;

    /// Describes the record's fields. Called at most once per process;
    /// use [`schema_of`] to read the cached result.
    fn build_schema() -> Schema<Self>;
}

type CachedSchema = &'static (dyn Any + Send + Sync);

/// Returns the process-wide schema for `T`, building it on first use.
/// Entries are immutable once published.
pub fn schema_of<T: Record>() -> &'static Schema<T> {
    static CACHE: OnceLock<RwLock<HashMap<TypeId, CachedSchema>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| RwLock::new(HashMap::new()));
    let key = TypeId::of::<T>();

    {
        let entries = cache.read();
        if let Some(&entry) = entries.get(&key) {
            return entry
                .downcast_ref::<Schema<T>>()
                .expect("schema cache holds a foreign type");
        }
    }

    // Built outside the lock so nested schemas cannot deadlock; a
    // concurrent duplicate build loses the race and its leak is dropped
    // on the floor.
    let built: &'static Schema<T> = Box::leak(Box::new(T::build_schema()));
    let mut entries = cache.write();
    let entry: CachedSchema = *entries.entry(key).or_insert(built);
    drop(entries);
    entry
        .downcast_ref::<Schema<T>>()
        .expect("schema cache holds a foreign type")
}

/// Renders the record's schema as indented pseudo-JSON.
pub fn describe_record<T: Record>(out: &mut String, indent: usize) {
    let schema = schema_of::<T>();
    out.push_str("{\n");
    for field in &schema.fields {
        let inner = indent + 4;
        for _ in 0..inner {
            out.push(' ');
        }
        out.push_str(field.doc_name());
        out.push_str(": ");
        field.describe_type(out, inner);
        if field.required {
            out.push_str(" (required)");
        }
        if !field.description.is_empty() {
            out.push_str(" // ");
            out.push_str(field.description);
        }
        out.push('\n');
    }
    for _ in 0..indent {
        out.push(' ');
    }
    out.push('}');
}

/// Standalone schema rendering, trailing newline included.
pub fn describe<T: Record>() -> String {
    let mut out = String::new();
    describe_record::<T>(&mut out, 0);
    out.push('\n');
    out
}

/// Implements [`Wire`] for a [`Record`] type so it can nest inside
/// other records, arrays, and sequences.
#[macro_export]
macro_rules! wire_record {
    ($ty:ty) => {
        impl $crate::wire::Wire for $ty {
            const LABEL: &'static str = <$ty as $crate::record::Record>::NAME;

            fn default_value() -> Self {
                <$ty as ::std::default::Default>::default()
            }

            fn is_default(&self) -> bool {
                $crate::record::schema_of::<$ty>()
                    .fields
                    .iter()
                    .all(|field| field.matches_default(self))
            }

            fn pack(
                &self,
                buf: &mut $crate::buffer::Buffer,
            ) -> ::std::result::Result<(), $crate::error::PackError> {
                $crate::codec::pack_into(self, buf)
            }

            fn unpack(
                buf: &mut $crate::buffer::Buffer,
            ) -> ::std::result::Result<Self, $crate::error::UnpackError> {
                $crate::codec::unpack_from(buf)
            }

            fn collect_missing(
                &self,
                prefix: &str,
                errors: &mut ::std::vec::Vec<$crate::validate::FieldError>,
            ) {
                $crate::validate::walk_record(self, prefix, errors)
            }

            fn describe(out: &mut ::std::string::String, indent: usize) {
                $crate::record::describe_record::<$ty>(out, indent)
            }
        }
    };
}
