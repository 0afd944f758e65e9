//! Tag reading and merging

pub mod store;
pub mod writer;

pub use store::{LoftyTagStore, TagStore};
pub use writer::merge_tags;
