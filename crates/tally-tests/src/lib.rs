//! Integration test crate for Tally.
//!
//! The tests live under `tests/`; [`helpers`] holds shared fixtures.

pub mod helpers;
