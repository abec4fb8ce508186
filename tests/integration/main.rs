//! Integration tests for robocop
//!
//! Each submodule starts its own wiremock server.

mod crawl_tests;
