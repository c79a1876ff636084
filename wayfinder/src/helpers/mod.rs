//! Helpers shared by pattern compilation, matching and the query codec.

pub mod percent;
