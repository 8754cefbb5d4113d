//! Adapter tests: envelope normalization, derived stats, validation and cancellation

pub mod admin_log_tests;
