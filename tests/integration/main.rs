//! Integration test harness

mod api_tests;
mod sweeper_tests;
