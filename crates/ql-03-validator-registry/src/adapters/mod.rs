//! Registry persistence adapters.

mod json_file;
mod memory;

pub use json_file::JsonFileRegistryStore;
pub use memory::InMemoryRegistryStore;
