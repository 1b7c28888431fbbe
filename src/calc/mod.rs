//! Pure calculators. No I/O, no clocks, no randomness: identical inputs
//! always produce identical outputs.

pub mod effectiveness;
pub mod modifier;
pub mod population;
pub mod production;
