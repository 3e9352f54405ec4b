//! Fragmentation - splitting payloads into MTU-sized fragments and
//! joining them back.

mod joiner;
mod splitter;

pub use joiner::Joiner;
pub use splitter::{Splitter, MIN_MTU};
