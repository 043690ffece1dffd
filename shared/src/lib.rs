//! Shared utilities and self-contained helpers
//!
//! This crate contains the boot payload registry and everything it needs that
//! can run without an OS: physical address types, the registry itself, and a
//! log sink for whatever console the loader has. Unit testing is a big
//! motivation for this crate.
//!
#![deny(unsafe_op_in_unsafe_fn)]
#![cfg_attr(not(test), no_std)]

#[cfg(test)]
extern crate std;

pub mod images;
pub mod log;
pub mod memory;
