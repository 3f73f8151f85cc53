use sha2::{Digest, Sha256};
use thiserror::Error;

use std::time::{Duration, Instant};

use super::entry::{EntryState, LedgerEntry};

/// Required leading prefix of a valid proof-of-work hash.
///
/// A difficulty gate for demonstration, not a security mechanism.
pub const DIFFICULTY_PREFIX: &str = "0000";

/// How many nonces to try between deadline checks.
const DEADLINE_CHECK_INTERVAL: u64 = 4096;

/// Errors raised by the validation state machine
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid state transition: entry is in state {found}, expected state {expected}")]
    InvalidStateTransition {
        expected: EntryState,
        found: EntryState,
    },

    #[error("Proof-of-work search exceeded its deadline")]
    ProofOfWorkTimeout,
}

/// Searches for a nonce such that `sha256(content || nonce)` carries the
/// required number of leading zeros.
///
/// The search starts at nonce 0 and increases by one, so the result is
/// deterministic for identical content and difficulty. An optional deadline
/// bounds the search in a service context; exceeding it fails with
/// [`ValidationError::ProofOfWorkTimeout`].
pub fn mine(
    content: &str,
    difficulty: u32,
    deadline: Option<Duration>,
) -> Result<(u64, String), ValidationError> {
    let prefix = "0".repeat(difficulty as usize);
    let started = Instant::now();
    let mut nonce: u64 = 0;

    loop {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hasher.update(nonce.to_string().as_bytes());
        let hash = hex::encode(hasher.finalize());

        if hash.starts_with(&prefix) {
            return Ok((nonce, hash));
        }

        if nonce % DEADLINE_CHECK_INTERVAL == 0 {
            if let Some(limit) = deadline {
                if started.elapsed() > limit {
                    return Err(ValidationError::ProofOfWorkTimeout);
                }
            }
        }

        nonce += 1;
    }
}

/// Advances `own` from state A to state B by cross-validating `target`.
///
/// The proof-of-work runs over the target's canonical content; the found
/// hash and the target's id are embedded into `own`. The target itself is
/// not touched. `own` is only mutated once the whole transition succeeds.
pub fn advance_to_b(
    own: &mut LedgerEntry,
    target: &LedgerEntry,
    deadline: Option<Duration>,
) -> Result<(), ValidationError> {
    if own.state != EntryState::A {
        return Err(ValidationError::InvalidStateTransition {
            expected: EntryState::A,
            found: own.state,
        });
    }

    let (_, hash) = mine(&target.canonical_content(), target.required_difficulty, deadline)?;

    own.validated_block_id = Some(target.id());
    own.validated_block_hash = Some(hash);
    own.state = EntryState::B;
    Ok(())
}

/// Finalizes `target` from state B to state C.
///
/// The proof-of-work runs over the target's own canonical content; the
/// winning nonce and hash become the entry's final hash, and the validator
/// is recorded. The caller is responsible for moving the entry from the
/// pending set into the ledger.
pub fn advance_to_c(
    target: &mut LedgerEntry,
    validator_address: &str,
    deadline: Option<Duration>,
) -> Result<(), ValidationError> {
    if target.state != EntryState::B {
        return Err(ValidationError::InvalidStateTransition {
            expected: EntryState::B,
            found: target.state,
        });
    }

    let (nonce, hash) = mine(&target.canonical_content(), target.required_difficulty, deadline)?;

    target.validator_address = Some(validator_address.to_string());
    target.nonce = Some(nonce);
    target.block_hash = Some(hash);
    target.state = EntryState::C;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_state_a() -> LedgerEntry {
        let genesis = LedgerEntry::genesis();
        let mut entry = LedgerEntry::genesis_bootstrap(genesis.block_hash.as_ref().unwrap());
        entry.state = EntryState::A;
        entry.validated_block_id = None;
        entry.validated_block_hash = None;
        entry
    }

    #[test]
    fn test_mine_finds_prefixed_hash() {
        let (nonce, hash) = mine("some content", 1, None).unwrap();
        assert!(hash.starts_with('0'));

        // Deterministic: same content, same result
        let (nonce_again, hash_again) = mine("some content", 1, None).unwrap();
        assert_eq!(nonce, nonce_again);
        assert_eq!(hash, hash_again);
    }

    #[test]
    fn test_mine_zero_difficulty_takes_first_nonce() {
        let (nonce, _) = mine("anything", 0, None).unwrap();
        assert_eq!(nonce, 0);
    }

    #[test]
    fn test_mine_times_out() {
        // An unreachable difficulty with an expired deadline
        let result = mine("content", 64, Some(Duration::ZERO));
        assert!(matches!(result, Err(ValidationError::ProofOfWorkTimeout)));
    }

    #[test]
    fn test_advance_to_b_embeds_proof() {
        let mut own = pending_state_a();
        let target = pending_state_a();

        advance_to_b(&mut own, &target, None).unwrap();

        assert_eq!(own.state, EntryState::B);
        assert_eq!(own.validated_block_id, Some(target.id()));
        let proof = own.validated_block_hash.unwrap();
        assert!(proof.starts_with(DIFFICULTY_PREFIX));
    }

    #[test]
    fn test_advance_to_b_requires_state_a() {
        let mut own = pending_state_a();
        own.state = EntryState::B;
        let target = pending_state_a();

        let err = advance_to_b(&mut own, &target, None).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidStateTransition {
                expected: EntryState::A,
                found: EntryState::B,
            }
        ));
    }

    #[test]
    fn test_advance_to_c_finalizes() {
        let genesis = LedgerEntry::genesis();
        let mut target = LedgerEntry::genesis_bootstrap(genesis.block_hash.as_ref().unwrap());

        advance_to_c(&mut target, "VALIDATOR1", None).unwrap();

        assert_eq!(target.state, EntryState::C);
        assert_eq!(target.validator_address.as_deref(), Some("VALIDATOR1"));
        assert!(target.nonce.is_some());
        assert!(target.block_hash.unwrap().starts_with(DIFFICULTY_PREFIX));
    }

    #[test]
    fn test_advance_to_c_requires_state_b() {
        let mut target = pending_state_a();

        let err = advance_to_c(&mut target, "VALIDATOR1", None).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidStateTransition {
                expected: EntryState::B,
                found: EntryState::A,
            }
        ));
    }

    #[test]
    fn test_failed_transition_leaves_entry_untouched() {
        let mut own = pending_state_a();
        own.state = EntryState::C;
        let before = own.clone();
        let target = pending_state_a();

        let _ = advance_to_b(&mut own, &target, None);

        assert_eq!(own.state, before.state);
        assert_eq!(own.validated_block_id, before.validated_block_id);
        assert_eq!(own.validated_block_hash, before.validated_block_hash);
    }
}
