//! Integration tests for the WAL engine.
//!
//! These tests exercise the engine through its public API across full
//! open → write → truncate → close → reopen cycles, including simulated
//! crashes that leave torn records on disk.
//!
//! Unit tests in crates/durability/src/ cover the codec, header format,
//! single-segment truncation cases, and bootstrap in isolation.

#[path = "../common/mod.rs"]
mod common;

mod batch_durability;
mod properties;
mod segment_roll;
mod truncation;
