//! Record operations layered on the embedded store.
//!
//! Records are `pack`-encoded blobs keyed by the raw 16 bytes of their
//! identifier, addressed within named buckets. The engine's transaction
//! semantics carry the consistency guarantees; this module only adds
//! typed encode/decode and the cursor iteration family.

use crate::error::StoreError;
use redb::{Database, ReadTransaction, ReadableTable, Table, TableDefinition, WriteTransaction};
use relay_codec::{pack, unpack, Id128, Record};
use std::path::Path;

/// Table definition for a named bucket. Keys are raw identifier bytes,
/// values are encoded records.
pub fn bucket(name: &str) -> TableDefinition<'_, &'static [u8], &'static [u8]> {
    TableDefinition::new(name)
}

/// A single-file embedded record store.
pub struct Store {
    db: Database,
}

impl Store {
    /// Opens the store at `path`, creating the file if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Store, StoreError> {
        let db = Database::create(path)?;
        Ok(Store { db })
    }

    /// Creates the named bucket if it does not exist. Idempotent.
    pub fn ensure_bucket(&self, name: &str) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        txn.open_table(bucket(name))?;
        txn.commit()?;
        tracing::debug!("bucket ready: {}", name);
        Ok(())
    }

    /// Reads a record by identifier. A missing bucket or key yields
    /// `Ok(None)`; a stored value that fails to decode is a distinct
    /// corruption error, never silently treated as absent.
    pub fn get<R: Record>(&self, name: &str, id: Id128) -> Result<Option<R>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(bucket(name)) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(other) => return Err(other.into()),
        };
        let Some(guard) = table.get(id.as_bytes().as_slice())? else {
            return Ok(None);
        };
        match unpack::<R>(guard.value()) {
            Ok(value) => Ok(Some(value)),
            Err(source) => {
                tracing::error!("decode failed for record {} in {}: {}", id, name, source);
                Err(StoreError::Corrupt {
                    id: id.to_string(),
                    source,
                })
            }
        }
    }

    /// Writes a record under the given identifier, replacing any
    /// existing value.
    pub fn insert<R: Record>(&self, name: &str, id: Id128, value: &R) -> Result<(), StoreError> {
        let encoded = pack(value)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(bucket(name))?;
            table.insert(id.as_bytes().as_slice(), encoded.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Opens a read transaction. The caller drops it to release the
    /// snapshot.
    pub fn read_txn(&self) -> Result<ReadTransaction, StoreError> {
        Ok(self.db.begin_read()?)
    }

    /// Opens a write transaction. The caller must commit explicitly;
    /// dropping the transaction aborts it.
    pub fn write_txn(&self) -> Result<WriteTransaction, StoreError> {
        Ok(self.db.begin_write()?)
    }
}

fn decode_entry<R: Record>(key: &[u8], value: &[u8]) -> Result<(Id128, R), StoreError> {
    let bytes: [u8; 16] = key
        .try_into()
        .map_err(|_| StoreError::BadKey { len: key.len() })?;
    let id = Id128::from_bytes(bytes);
    let record = unpack::<R>(value).map_err(|source| StoreError::Corrupt {
        id: id.to_string(),
        source,
    })?;
    Ok((id, record))
}

/// Walks a bucket from first to last key. The visitor returns `true` to
/// continue and `false` to stop.
pub fn iterate<R, T, F>(table: &T, mut visit: F) -> Result<(), StoreError>
where
    R: Record,
    T: ReadableTable<&'static [u8], &'static [u8]>,
    F: FnMut(Id128, &R) -> bool,
{
    for entry in table.iter()? {
        let (key, value) = entry?;
        let (id, record) = decode_entry::<R>(key.value(), value.value())?;
        if !visit(id, &record) {
            break;
        }
    }
    Ok(())
}

/// Like [`iterate`], additionally accumulating each visited record for
/// as long as the predicate keeps returning `true`.
pub fn iterate_collect<R, T, F>(table: &T, mut keep: F) -> Result<Vec<R>, StoreError>
where
    R: Record,
    T: ReadableTable<&'static [u8], &'static [u8]>,
    F: FnMut(Id128, &R) -> bool,
{
    let mut collected = Vec::new();
    for entry in table.iter()? {
        let (key, value) = entry?;
        let (id, record) = decode_entry::<R>(key.value(), value.value())?;
        if !keep(id, &record) {
            break;
        }
        collected.push(record);
    }
    Ok(collected)
}

/// Collects every record in the bucket.
pub fn iterate_collect_all<R, T>(table: &T) -> Result<Vec<R>, StoreError>
where
    R: Record,
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    iterate_collect(table, |_, _: &R| true)
}

/// Stops at the first record the predicate matches and copies it out.
pub fn iterate_find<R, T, F>(table: &T, mut matches: F) -> Result<Option<R>, StoreError>
where
    R: Record,
    T: ReadableTable<&'static [u8], &'static [u8]>,
    F: FnMut(Id128, &R) -> bool,
{
    for entry in table.iter()? {
        let (key, value) = entry?;
        let (id, record) = decode_entry::<R>(key.value(), value.value())?;
        if matches(id, &record) {
            return Ok(Some(record));
        }
    }
    Ok(None)
}

/// Deletes every record the predicate matches, returning how many were
/// removed. Deletions are applied after the cursor walk completes.
pub fn iterate_remove<R, F>(
    table: &mut Table<'_, &'static [u8], &'static [u8]>,
    mut doomed: F,
) -> Result<usize, StoreError>
where
    R: Record,
    F: FnMut(Id128, &R) -> bool,
{
    let mut keys = Vec::new();
    for entry in table.iter()? {
        let (key, value) = entry?;
        let (id, record) = decode_entry::<R>(key.value(), value.value())?;
        if doomed(id, &record) {
            keys.push(*id.as_bytes());
        }
    }
    for key in &keys {
        table.remove(key.as_slice())?;
    }
    Ok(keys.len())
}
