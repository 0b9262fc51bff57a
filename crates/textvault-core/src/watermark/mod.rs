//! Per-kind, per-direction synchronization watermarks.

mod model;
mod repository;

pub use model::{EPOCH, SyncDirection, WatermarkStore};
pub use repository::WatermarkRepository;
