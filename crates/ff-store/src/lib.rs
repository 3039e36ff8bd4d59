//! Persistence gateway for the fastfind search system.
//!
//! The core never talks to a concrete database; it persists through the
//! [`StoreGateway`] trait - batched upserts and deletes, a transactional
//! bracket, and full-snapshot load for startup hydration. This crate
//! provides the contract, an in-process [`MemoryStore`] implementation, and
//! the [`BatchWriter`] thread that serializes commits with retry and
//! backoff.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod gateway;
pub mod memory;
pub mod writer;

pub use error::StoreError;
pub use gateway::{StoreGateway, SCHEMA_VERSION};
pub use memory::MemoryStore;
pub use writer::{BatchWriter, WriteOp};
