pub mod kv;
pub mod sessions;

#[cfg(test)]
pub use kv::MemoryStore;
pub use sessions::{title_from_message, ChatStore};
