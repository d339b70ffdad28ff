//! Queue items, loop modes and the per-room queue store.

mod item;
mod loop_mode;
mod store;

pub use item::QueueItem;
pub use loop_mode::LoopMode;
pub use store::{QueuePlacement, QueueStore};
