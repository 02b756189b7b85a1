//! Integration test crate for the price feed workspace.
//!
//! This crate has no library code. Its tests drive whole flows across
//! crates: votes through the keeper into relay payloads, and the
//! submission client against an in-process chain.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p pricefeed-integration-tests
//! ```
