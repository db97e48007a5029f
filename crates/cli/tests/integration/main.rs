mod clean_tests;
mod common;
mod run_tests;
mod status_tests;
