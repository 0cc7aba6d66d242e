// crates/trellis-store/src/lib.rs
//
// trellis-store: Storage and network layer for the Trellis web of trust.
//
// Provides RocksDB-backed graph persistence, an in-memory persistence for
// tests, the IPFS client that identities are published through, and an
// in-memory content network.

pub mod ipfs;
pub mod memory;
pub mod network;
pub mod rocks;

// Re-export key types for ergonomic access from downstream crates.
pub use ipfs::IpfsClient;
pub use memory::MemoryStore;
pub use network::InMemoryNetwork;
pub use rocks::RocksStore;
