//! Test suite for the wire encoder.

mod unit;
