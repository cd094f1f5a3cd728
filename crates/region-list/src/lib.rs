//! Allocation-free sequence container for protocol state.
//!
//! Protocol handlers keep small ordered collections (extensions, cipher
//! suites, key shares) whose maximum size is known when the handshake state
//! is set up. [`List`] stores such a collection in memory carved from a
//! caller-supplied [`Region`]; it never allocates and never grows.
//!
//! Failures are returned as typed errors and also recorded in the calling
//! thread's error context (see [`tls_error::context`]).
//!
//! # Example
//!
//! ```
//! use dataview::PodMethods as _;
//! use region_list::{List, Region};
//!
//! let mut backing = [0_u64; 8];
//! let mut region = Region::new(backing.as_bytes_mut());
//! let mut suites = List::<u16>::new(&mut region, 4).unwrap();
//!
//! *suites.push_back().unwrap() = 0x1302;
//! *suites.push_front().unwrap() = 0x1301;
//! assert_eq!(suites.as_slice(), [0x1301, 0x1302]);
//!
//! suites.swap(0, 1).unwrap();
//! assert_eq!(suites[0], 0x1302);
//! ```

#![cfg_attr(not(test), no_std)]

pub mod list;
pub mod region;

pub use self::{
    list::{End, List, ListError},
    region::{Region, RegionError},
};
