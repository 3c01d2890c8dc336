//! Storage abstraction and implementations for goal tracking.
//!
//! This crate provides a trait-based storage interface with a JSON file
//! implementation and an in-memory one.

#![warn(missing_docs)]

pub mod trait_;
pub mod adapter;
pub mod json_storage;
pub mod memory;

pub use trait_::{Storage, StorageError, Result};
pub use json_storage::JsonStorage;
pub use memory::MemoryStorage;
