//! # relay-store
//!
//! Typed key/value record layer for relay.
//!
//! This crate provides:
//! - A single-file embedded store with named buckets
//! - Typed get/insert keyed by 128-bit identifiers
//! - Cursor iteration with predicates, collection, and removal
//! - Thin read/write transaction passthroughs

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::{
    bucket, iterate, iterate_collect, iterate_collect_all, iterate_find, iterate_remove, Store,
};

pub use redb::{ReadTransaction, ReadableTable, Table, WriteTransaction};
