#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod control;

mod error;

mod group;

/// A HashMap implementation using Robin Hood hashing.
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a standard key-value map interface with configurable hashers.
pub mod hash_map;

/// A hash set implementation using Robin Hood hashing.
///
/// This module provides a `HashSet` that wraps the `HashTable` and provides
/// a standard set interface with configurable hashers.
pub mod hash_set;

pub mod hash_table;

pub mod layout;

mod slot;

/// Probe-length and memory statistics for tuning.
#[cfg(any(test, feature = "stats"))]
pub mod stats;

#[cfg(test)]
mod proptests;

pub use error::TryReserveError;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::HashTable;
pub use layout::{Compact, Indirect, Inline, SlotLayout};

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used when none is specified.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used when none is specified.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// Placeholder hasher builder when neither `foldhash` nor `std` is
        /// enabled. It cannot be constructed, so a hasher must be supplied
        /// with `with_hasher`.
        #[derive(Clone, Copy, Debug)]
        pub enum DefaultHashBuilder {}
    }
}
