// Storage layer module
pub mod digest_store;

pub use digest_store::{DigestInfo, DigestStore, StoreStats};
