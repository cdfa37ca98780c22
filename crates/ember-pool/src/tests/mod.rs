//! Test suite for the dispatch pool.

mod behaviour;
mod support;
