//! Memory management: handle tables, the record type, and the collector.

pub mod arena;
pub mod gc;
pub mod object;

pub use arena::{Handle, Slots};
pub use gc::{Heap, HeapStats, Rendered, SweepStats, ZString};
pub use object::{AttrKey, Object};
