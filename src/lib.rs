#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod containers;
mod mix;
mod pool;

pub mod hash_map;
pub mod hash_set;
pub mod hash_table;
pub mod robin_map;
pub mod robin_set;
pub mod robin_table;

pub use containers::BufferAllocationError;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::HashTable;
pub use hash_table::SentinelKey;
pub use robin_map::RobinMap;
pub use robin_set::RobinSet;
pub use robin_table::RobinTable;
