//! Common test infrastructure
//!
//! Fixtures write small CSV exports into a temporary directory and point a warehouse
//! database file next to them. Tests should only import from this module.

#![allow(dead_code)]

mod constants;
mod fixtures;

#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{fixed_timestamp, TestSources};
