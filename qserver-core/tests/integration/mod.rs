//! Integration test modules

mod collection_cycle_tests;
mod scheduler_tests;
