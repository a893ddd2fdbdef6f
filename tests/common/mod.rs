// Common constants for the integration tests.

#![allow(dead_code)]

pub const ITEMS_LOW: usize = 100;
pub const ITEMS_MEDIUM: usize = 1_000;
pub const ITEMS_HIGH: usize = 10_000;
