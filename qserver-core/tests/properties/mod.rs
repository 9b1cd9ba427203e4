//! Property test modules

mod config_tests;
mod parser_tests;
