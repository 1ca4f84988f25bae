//! Integration tests

mod common;
mod e2e_test;
mod feed_test;
mod market_test;
mod properties_test;
mod scenarios_test;
