//! Storage Backends
//!
//! StorageLocation トレイトの実装とスキームレジストリ

pub mod crypt;
pub mod local;
pub mod memory;
pub mod registry;

pub use crypt::CryptLocation;
pub use local::LocalLocation;
pub use memory::MemoryLocation;
pub use registry::{BackendOptions, LocationRegistry};
