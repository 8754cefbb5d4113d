//! Network module tests
//!
//! Tests for the dual-network probe, the failover proxy and request types

pub mod probe_tests;
pub mod types_tests;
