// Ledger module
//
// This module contains the core ledger/validation engine:
// - Ledger entry model and canonical hashing
// - Chain placement (branch selection and bifurcation)
// - Replay-based balance derivation
// - A -> B -> C validation state machine with toy proof-of-work
// - Cryptography utilities (secp256k1 + base58)
// - The Node owning ledger and mempool behind one critical section

pub mod balance;
pub mod crypto;
pub mod entry;
pub mod node;
pub mod placement;
pub mod validation;

// Re-export main components for easier access
pub use crypto::Keypair;
pub use entry::{EntryState, LedgerEntry};
pub use node::{Node, NodeError};
