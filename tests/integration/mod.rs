//! Integration tests for the remote query engine

mod concurrency;
mod map_data;
