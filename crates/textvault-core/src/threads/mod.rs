//! Conversation-thread identity resolution.

mod registry;
mod repository;
mod resolver;

pub use registry::{ThreadError, ThreadRegistry};
pub use repository::ThreadRepository;
pub use resolver::{THREAD_CACHE_CAPACITY, ThreadResolver};
