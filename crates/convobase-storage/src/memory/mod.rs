mod blob;
mod kv;

pub use blob::MemoryBlobStore;
pub use kv::MemoryKvStore;
