use chrono::Utc;
use log::info;
use thiserror::Error;

use std::sync::Mutex;
use std::time::Duration;

use super::balance::balance_of;
use super::crypto::{self, CryptoError};
use super::entry::{EntryState, LedgerEntry, GENESIS_ADDRESS};
use super::placement;
use super::validation::{self, ValidationError, DIFFICULTY_PREFIX};

/// Amount minted when a zero-value transaction is submitted.
pub const ZERO_VALUE_MINT: f64 = 10.0;

/// Default upper bound for one proof-of-work search.
pub const DEFAULT_POW_DEADLINE: Duration = Duration::from_secs(30);

/// Errors that can occur during node operations
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: f64, available: f64 },

    #[error("Unknown entry: no pending entry at index {0}")]
    UnknownEntry(usize),

    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Ledger and pending set, only ever touched under the node's lock.
struct NodeState {
    ledger: Vec<LedgerEntry>,
    mempool: Vec<LedgerEntry>,
}

/// In-memory ledger node.
///
/// Owns the ledger and the pending set and serializes every mutation and
/// multi-field read through a single critical section. Callers only ever
/// receive copies, never live references into the shared state.
pub struct Node {
    state: Mutex<NodeState>,
    pow_deadline: Option<Duration>,
}

impl Node {
    /// Creates a node with the genesis entry committed and the State-B
    /// bootstrap transaction waiting in the mempool.
    pub fn new() -> Self {
        let genesis = LedgerEntry::genesis();
        let genesis_hash = genesis
            .block_hash
            .clone()
            .expect("genesis entry carries its hash");
        let bootstrap = LedgerEntry::genesis_bootstrap(&genesis_hash);

        info!("Node initialized with genesis entry {}", genesis_hash);

        Node {
            state: Mutex::new(NodeState {
                ledger: vec![genesis],
                mempool: vec![bootstrap],
            }),
            pow_deadline: Some(DEFAULT_POW_DEADLINE),
        }
    }

    /// Replaces the proof-of-work deadline; `None` lets the search run
    /// unbounded.
    pub fn with_pow_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.pow_deadline = deadline;
        self
    }

    /// Returns a copy of the committed ledger, in commit order.
    pub fn get_blockchain(&self) -> Vec<LedgerEntry> {
        self.state.lock().unwrap().ledger.clone()
    }

    /// Returns a copy of the pending set, in creation order.
    pub fn get_mempool(&self) -> Vec<LedgerEntry> {
        self.state.lock().unwrap().mempool.clone()
    }

    /// Derives an address's balance from the committed ledger.
    pub fn balance(&self, address: &str) -> f64 {
        balance_of(address, &self.state.lock().unwrap().ledger)
    }

    /// Running average transaction size over all non-genesis entries,
    /// committed and pending.
    pub fn average_amount(&self) -> f64 {
        let state = self.state.lock().unwrap();
        let amounts: Vec<f64> = state
            .ledger
            .iter()
            .chain(state.mempool.iter())
            .filter(|entry| !entry.is_genesis())
            .map(|entry| entry.amount)
            .collect();

        if amounts.is_empty() {
            0.0
        } else {
            amounts.iter().sum::<f64>() / amounts.len() as f64
        }
    }

    /// Creates an unsigned State-A transaction and appends it to the mempool.
    ///
    /// A zero amount takes the mint path: the transferred amount becomes
    /// [`ZERO_VALUE_MINT`] and the entry records it as minted, so the sender
    /// is not debited.
    pub fn create_transaction(
        &self,
        sender: &str,
        receiver: &str,
        amount: f64,
    ) -> Result<LedgerEntry, NodeError> {
        self.admit_transaction(sender, receiver, amount, None)
    }

    /// Creates a signed State-A transaction.
    ///
    /// The canonical message is signed with `private_key` and verified
    /// against the sender address (the base58 public key) before the entry
    /// is admitted; a signature that does not verify refuses the
    /// transaction.
    pub fn create_signed_transaction(
        &self,
        sender: &str,
        receiver: &str,
        amount: f64,
        private_key: &str,
    ) -> Result<LedgerEntry, NodeError> {
        self.admit_transaction(sender, receiver, amount, Some(private_key))
    }

    fn admit_transaction(
        &self,
        sender: &str,
        receiver: &str,
        amount: f64,
        private_key: Option<&str>,
    ) -> Result<LedgerEntry, NodeError> {
        if sender.is_empty() {
            return Err(NodeError::InvalidInput("sender address is empty".to_string()));
        }
        if receiver.is_empty() {
            return Err(NodeError::InvalidInput(
                "receiver address is empty".to_string(),
            ));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(NodeError::InvalidInput(format!(
                "amount must be a non-negative number, got {}",
                amount
            )));
        }

        let mut state = self.state.lock().unwrap();

        // Zero-value transactions mint instead of transferring
        let (amount, mint_amount) = if amount == 0.0 {
            (ZERO_VALUE_MINT, ZERO_VALUE_MINT)
        } else {
            (amount, 0.0)
        };

        let sender_balance_before = balance_of(sender, &state.ledger);
        let sender_balance_after = sender_balance_before - amount + mint_amount;

        // Funds already promised to pending entries are not spendable again,
        // or two full-balance spends would both commit and drive the
        // committed balance negative.
        let pending_debit: f64 = state
            .mempool
            .iter()
            .filter(|entry| entry.sender_address == sender)
            .map(|entry| entry.amount - entry.mint_amount)
            .sum();
        let available = sender_balance_before - pending_debit;
        if sender != GENESIS_ADDRESS && available - amount + mint_amount < 0.0 {
            return Err(NodeError::InsufficientBalance {
                required: amount - mint_amount,
                available,
            });
        }

        let receiver_balance_before = balance_of(receiver, &state.ledger);
        let receiver_balance_after = receiver_balance_before + amount;

        let average_tx_size = {
            let mut total = amount;
            let mut count = 1usize;
            for entry in state.ledger.iter().chain(state.mempool.iter()) {
                if !entry.is_genesis() {
                    total += entry.amount;
                    count += 1;
                }
            }
            total / count as f64
        };

        let attachment = placement::place(&state.ledger, &state.mempool)
            .expect("ledger always contains genesis");

        let timestamp = Utc::now().timestamp_millis();

        let signature = match private_key {
            Some(key) => {
                let message = LedgerEntry::signing_message(sender, receiver, amount, timestamp);
                let signature = crypto::sign(key, &message)?;
                if !crypto::verify(sender, &message, &signature) {
                    return Err(NodeError::SignatureVerificationFailed);
                }
                Some(signature)
            }
            None => None,
        };

        let entry = LedgerEntry {
            sender_address: sender.to_string(),
            receiver_address: receiver.to_string(),
            amount,
            timestamp,
            predecessor_id: attachment.predecessor_id,
            predecessor_hash: attachment.predecessor_hash,
            level: attachment.level,
            sender_balance_before,
            sender_balance_after,
            receiver_balance_before,
            receiver_balance_after,
            mint_amount,
            average_tx_size,
            required_difficulty: DIFFICULTY_PREFIX.len() as u32,
            storage_requirement: 0,
            validated_block_id: None,
            validated_block_hash: None,
            validator_address: None,
            nonce: None,
            block_hash: None,
            state: EntryState::A,
            signature,
        };

        info!(
            "State A entry created: {} -> {} amount {} level {}",
            sender, receiver, amount, entry.level
        );

        state.mempool.push(entry.clone());
        Ok(entry)
    }

    /// Advances the pending entry at `own_index` to State B by
    /// cross-validating the pending entry at `target_index`.
    pub fn advance_b(
        &self,
        own_index: usize,
        target_index: usize,
    ) -> Result<LedgerEntry, NodeError> {
        let mut state = self.state.lock().unwrap();

        let target = state
            .mempool
            .get(target_index)
            .cloned()
            .ok_or(NodeError::UnknownEntry(target_index))?;
        let own = state
            .mempool
            .get_mut(own_index)
            .ok_or(NodeError::UnknownEntry(own_index))?;

        validation::advance_to_b(own, &target, self.pow_deadline)?;

        info!(
            "Entry {} advanced to State B validating entry {}",
            own_index, target_index
        );

        Ok(own.clone())
    }

    /// Finalizes the pending entry at `target_index` to State C and commits
    /// it to the ledger.
    pub fn advance_c(
        &self,
        target_index: usize,
        validator_address: &str,
    ) -> Result<LedgerEntry, NodeError> {
        if validator_address.is_empty() {
            return Err(NodeError::InvalidInput(
                "validator address is empty".to_string(),
            ));
        }

        let mut state = self.state.lock().unwrap();

        // Finalize a copy first so a failed proof-of-work leaves the
        // pending set unchanged.
        let mut target = state
            .mempool
            .get(target_index)
            .cloned()
            .ok_or(NodeError::UnknownEntry(target_index))?;

        validation::advance_to_c(&mut target, validator_address, self.pow_deadline)?;

        state.mempool.remove(target_index);
        state.ledger.push(target.clone());

        info!(
            "Entry finalized to State C by {} and committed as {}",
            validator_address,
            target.block_hash.as_deref().unwrap_or_default()
        );

        Ok(target)
    }
}

impl Default for Node {
    fn default() -> Self {
        Node::new()
    }
}
