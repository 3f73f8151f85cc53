use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use std::fmt;

use super::validation::DIFFICULTY_PREFIX;

/// Synthetic address used by the genesis entry and its bootstrap transaction.
pub const GENESIS_ADDRESS: &str = "GENESIS";

/// Validation state of a ledger entry.
///
/// Transitions are monotonic: A → B → C. An entry reaches the ledger
/// exactly once, when it is finalized at C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum EntryState {
    /// Created and signed, not yet validating anything
    A,
    /// Carries a proof-of-work over some other pending entry
    B,
    /// Finalized: validated by a third party and committed to the ledger
    C,
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryState::A => write!(f, "A"),
            EntryState::B => write!(f, "B"),
            EntryState::C => write!(f, "C"),
        }
    }
}

/// One transaction record in the DAG-shaped ledger.
///
/// The same type serves all three validation states; the state tag plus the
/// optional validation fields describe how far the entry has progressed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LedgerEntry {
    /// Sender's address (base58 public key, or the synthetic genesis address)
    pub sender_address: String,

    /// Receiver's address
    pub receiver_address: String,

    /// Amount being transferred
    pub amount: f64,

    /// Creation time, milliseconds since epoch
    pub timestamp: i64,

    /// Id of the predecessor entry this one attaches to
    pub predecessor_id: String,

    /// Content hash of the predecessor entry
    pub predecessor_hash: String,

    /// Branch level; increases only on bifurcation
    pub level: u32,

    /// Sender balance immediately before this entry (creation-time snapshot)
    pub sender_balance_before: f64,

    /// Sender balance immediately after this entry
    pub sender_balance_after: f64,

    /// Receiver balance immediately before this entry
    pub receiver_balance_before: f64,

    /// Receiver balance immediately after this entry
    pub receiver_balance_after: f64,

    /// Minted (positive) or burned (negative) amount attached to this entry
    pub mint_amount: f64,

    /// Running average transaction size at creation time
    pub average_tx_size: f64,

    /// Number of leading zeros required from the proof-of-work hash
    pub required_difficulty: u32,

    /// Storage requirement placeholder (unused in this prototype)
    pub storage_requirement: u64,

    /// Id of the entry this one validated to reach state B
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated_block_id: Option<String>,

    /// Proof-of-work hash found over the validated entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated_block_hash: Option<String>,

    /// Address of the validator that finalized this entry (state C)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator_address: Option<String>,

    /// Winning proof-of-work nonce (state C)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,

    /// Final content hash (state C)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,

    /// Validation state tag
    pub state: EntryState,

    /// Detached signature over the canonical transaction message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl LedgerEntry {
    /// Builds the canonical signing message for a transaction.
    ///
    /// The message is the concatenation, in fixed order, of sender address,
    /// receiver address, the amount with 8 fractional digits, and the
    /// timestamp as a decimal integer. Any change here breaks signature
    /// compatibility with previously signed entries.
    pub fn signing_message(sender: &str, receiver: &str, amount: f64, timestamp: i64) -> String {
        format!("{}{}{:.8}{}", sender, receiver, amount, timestamp)
    }

    /// The canonical signing message of this entry.
    pub fn canonical_message(&self) -> String {
        Self::signing_message(
            &self.sender_address,
            &self.receiver_address,
            self.amount,
            self.timestamp,
        )
    }

    /// Serializes the entry's canonical content: every field except the
    /// entry's own `block_hash` and `nonce`, in fixed order.
    ///
    /// Both the content hash and the proof-of-work search operate on this
    /// string, so the hash is never self-referential.
    pub fn canonical_content(&self) -> String {
        let data = serde_json::json!({
            "sender_address": self.sender_address,
            "receiver_address": self.receiver_address,
            "amount": self.amount,
            "timestamp": self.timestamp,
            "predecessor_id": self.predecessor_id,
            "predecessor_hash": self.predecessor_hash,
            "level": self.level,
            "sender_balance_before": self.sender_balance_before,
            "sender_balance_after": self.sender_balance_after,
            "receiver_balance_before": self.receiver_balance_before,
            "receiver_balance_after": self.receiver_balance_after,
            "mint_amount": self.mint_amount,
            "average_tx_size": self.average_tx_size,
            "required_difficulty": self.required_difficulty,
            "storage_requirement": self.storage_requirement,
            "validated_block_id": self.validated_block_id,
            "validated_block_hash": self.validated_block_hash,
            "validator_address": self.validator_address,
            "state": self.state,
            "signature": self.signature,
        });

        data.to_string()
    }

    /// Computes the entry's content hash as a hex SHA-256 digest of the
    /// canonical content.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_content().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// The entry's identity: its committed hash, or the content hash while
    /// the entry is still pending.
    pub fn id(&self) -> String {
        match &self.block_hash {
            Some(hash) => hash.clone(),
            None => self.compute_hash(),
        }
    }

    /// Creates the pre-finalized genesis entry.
    ///
    /// Genesis is its own predecessor and enters the ledger directly at
    /// state C; it is the only entry that never passes through the mempool.
    pub fn genesis() -> Self {
        let mut genesis = LedgerEntry {
            sender_address: GENESIS_ADDRESS.to_string(),
            receiver_address: GENESIS_ADDRESS.to_string(),
            amount: 0.0,
            timestamp: Utc::now().timestamp_millis(),
            predecessor_id: GENESIS_ADDRESS.to_string(),
            predecessor_hash: "0".to_string(),
            level: 0,
            sender_balance_before: 0.0,
            sender_balance_after: 0.0,
            receiver_balance_before: 0.0,
            receiver_balance_after: 0.0,
            mint_amount: 0.0,
            average_tx_size: 0.0,
            required_difficulty: DIFFICULTY_PREFIX.len() as u32,
            storage_requirement: 0,
            validated_block_id: None,
            validated_block_hash: None,
            validator_address: None,
            nonce: None,
            block_hash: None,
            state: EntryState::C,
            signature: None,
        };

        genesis.block_hash = Some(genesis.compute_hash());
        genesis
    }

    /// Creates the bootstrap transaction seeded into the mempool at state B.
    ///
    /// Its validated-entry fields point at the genesis hash, so the first
    /// real cross-validation always has a target.
    pub fn genesis_bootstrap(genesis_hash: &str) -> Self {
        LedgerEntry {
            sender_address: GENESIS_ADDRESS.to_string(),
            receiver_address: GENESIS_ADDRESS.to_string(),
            amount: 0.0,
            timestamp: Utc::now().timestamp_millis(),
            predecessor_id: genesis_hash.to_string(),
            predecessor_hash: genesis_hash.to_string(),
            level: 0,
            sender_balance_before: 0.0,
            sender_balance_after: 0.0,
            receiver_balance_before: 0.0,
            receiver_balance_after: 0.0,
            mint_amount: 0.0,
            average_tx_size: 0.0,
            required_difficulty: DIFFICULTY_PREFIX.len() as u32,
            storage_requirement: 0,
            validated_block_id: Some(genesis_hash.to_string()),
            validated_block_hash: Some(genesis_hash.to_string()),
            validator_address: None,
            nonce: None,
            block_hash: None,
            state: EntryState::B,
            signature: None,
        }
    }

    /// Whether this entry is the synthetic genesis/bootstrap kind.
    pub fn is_genesis(&self) -> bool {
        self.sender_address == GENESIS_ADDRESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_entry() {
        let genesis = LedgerEntry::genesis();

        assert_eq!(genesis.sender_address, GENESIS_ADDRESS);
        assert_eq!(genesis.receiver_address, GENESIS_ADDRESS);
        assert_eq!(genesis.amount, 0.0);
        assert_eq!(genesis.level, 0);
        assert_eq!(genesis.state, EntryState::C);
        assert_eq!(genesis.block_hash, Some(genesis.compute_hash()));
    }

    #[test]
    fn test_bootstrap_points_at_genesis() {
        let genesis = LedgerEntry::genesis();
        let genesis_hash = genesis.block_hash.clone().unwrap();
        let bootstrap = LedgerEntry::genesis_bootstrap(&genesis_hash);

        assert_eq!(bootstrap.state, EntryState::B);
        assert_eq!(bootstrap.validated_block_id, Some(genesis_hash.clone()));
        assert_eq!(bootstrap.validated_block_hash, Some(genesis_hash));
    }

    #[test]
    fn test_hash_excludes_own_hash_and_nonce() {
        let mut entry = LedgerEntry::genesis();
        let original = entry.compute_hash();

        entry.block_hash = Some("something else".to_string());
        entry.nonce = Some(42);
        assert_eq!(entry.compute_hash(), original);

        // Any canonical field does change the hash
        entry.amount = 1.0;
        assert_ne!(entry.compute_hash(), original);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let entry = LedgerEntry::genesis();
        assert_eq!(entry.compute_hash(), entry.compute_hash());
        assert_eq!(entry.compute_hash().len(), 64); // SHA-256 hex
    }

    #[test]
    fn test_signing_message_format() {
        let message = LedgerEntry::signing_message("alice", "bob", 12.5, 1700000000000);
        assert_eq!(message, "alicebob12.500000001700000000000");
    }

    #[test]
    fn test_id_falls_back_to_content_hash() {
        let genesis = LedgerEntry::genesis();
        let bootstrap = LedgerEntry::genesis_bootstrap(genesis.block_hash.as_ref().unwrap());

        // Pending entries have no committed hash yet
        assert_eq!(bootstrap.id(), bootstrap.compute_hash());
        // Committed entries answer with their stored hash
        assert_eq!(genesis.id(), genesis.block_hash.clone().unwrap());
    }
}
