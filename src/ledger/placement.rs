use super::entry::LedgerEntry;

/// Maximum number of pending entries that may claim one ledger entry as
/// their predecessor before placement must look elsewhere.
pub const MAX_CLAIMS_PER_ENTRY: usize = 2;

/// Where a new entry attaches to the existing ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Id of the predecessor ledger entry
    pub predecessor_id: String,

    /// Committed hash of the predecessor ledger entry
    pub predecessor_hash: String,

    /// Branch level of the new entry
    pub level: u32,
}

/// Computes where a new entry attaches to the ledger.
///
/// Chain ends (ledger entries not referenced as any other ledger entry's
/// predecessor) are preferred, lowest branch level first, ties broken by
/// earliest ledger position. Ends already claimed by a pending entry are
/// skipped. When every end is claimed, the ledger is walked backwards from
/// its newest entry and the first entry with fewer than
/// [`MAX_CLAIMS_PER_ENTRY`] pending claims becomes the predecessor of a new
/// branch, one level deeper.
///
/// Returns `None` only for an empty ledger, which is the genesis case.
pub fn place(ledger: &[LedgerEntry], mempool: &[LedgerEntry]) -> Option<Placement> {
    if ledger.is_empty() {
        return None;
    }

    let mut best: Option<&LedgerEntry> = None;
    for entry in chain_ends(ledger) {
        if claim_count(mempool, &entry.id()) > 0 {
            continue;
        }
        // Strict comparison keeps the earliest entry on level ties
        if best.map_or(true, |current| entry.level < current.level) {
            best = Some(entry);
        }
    }

    if let Some(end) = best {
        return Some(Placement {
            predecessor_id: end.id(),
            predecessor_hash: end.id(),
            level: end.level,
        });
    }

    // Every free end is spoken for: bifurcate from the most recent entry
    // that still has room for another branch.
    for entry in ledger.iter().rev() {
        if claim_count(mempool, &entry.id()) < MAX_CLAIMS_PER_ENTRY {
            return Some(Placement {
                predecessor_id: entry.id(),
                predecessor_hash: entry.id(),
                level: entry.level + 1,
            });
        }
    }

    // Fully saturated ledger; attach to the newest entry anyway rather than
    // refuse the transaction.
    let last = ledger.last().expect("ledger is non-empty");
    Some(Placement {
        predecessor_id: last.id(),
        predecessor_hash: last.id(),
        level: last.level + 1,
    })
}

/// Ledger entries not referenced as a predecessor by any other ledger entry.
fn chain_ends(ledger: &[LedgerEntry]) -> impl Iterator<Item = &LedgerEntry> {
    ledger.iter().filter(move |candidate| {
        let id = candidate.id();
        !ledger.iter().any(|other| other.predecessor_id == id)
    })
}

/// Number of pending entries claiming `id` as their predecessor.
fn claim_count(mempool: &[LedgerEntry], id: &str) -> usize {
    mempool
        .iter()
        .filter(|pending| pending.predecessor_id == id)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::entry::EntryState;

    /// Committed entry with a fixed hash, predecessor and level.
    fn committed(hash: &str, predecessor_id: &str, level: u32) -> LedgerEntry {
        let mut entry = LedgerEntry::genesis();
        entry.predecessor_id = predecessor_id.to_string();
        entry.predecessor_hash = predecessor_id.to_string();
        entry.level = level;
        entry.block_hash = Some(hash.to_string());
        entry
    }

    /// Pending entry claiming `predecessor_id`.
    fn pending(predecessor_id: &str, level: u32) -> LedgerEntry {
        let mut entry = LedgerEntry::genesis_bootstrap(predecessor_id);
        entry.level = level;
        entry.state = EntryState::A;
        entry
    }

    #[test]
    fn test_empty_ledger_is_genesis_case() {
        assert_eq!(place(&[], &[]), None);
    }

    #[test]
    fn test_single_entry_is_the_end() {
        let ledger = vec![committed("g", "GENESIS", 0)];

        let placement = place(&ledger, &[]).unwrap();
        assert_eq!(placement.predecessor_id, "g");
        assert_eq!(placement.predecessor_hash, "g");
        assert_eq!(placement.level, 0);
    }

    #[test]
    fn test_prefers_lowest_level_end() {
        // g <- a (level 0, end), g <- b (level 1, end)
        let ledger = vec![
            committed("g", "GENESIS", 0),
            committed("a", "g", 0),
            committed("b", "g", 1),
        ];

        let placement = place(&ledger, &[]).unwrap();
        assert_eq!(placement.predecessor_id, "a");
        assert_eq!(placement.level, 0);
    }

    #[test]
    fn test_level_tie_takes_earliest_ledger_entry() {
        let ledger = vec![
            committed("g", "GENESIS", 0),
            committed("a", "g", 0),
            committed("b", "g", 0),
        ];

        let placement = place(&ledger, &[]).unwrap();
        assert_eq!(placement.predecessor_id, "a");
    }

    #[test]
    fn test_claimed_end_is_skipped() {
        let ledger = vec![committed("g", "GENESIS", 0), committed("a", "g", 0)];
        let mempool = vec![pending("a", 0)];

        // The only end is claimed, so placement bifurcates from the newest
        // entry with room, one level deeper.
        let placement = place(&ledger, &mempool).unwrap();
        assert_eq!(placement.predecessor_id, "a");
        assert_eq!(placement.level, 1);
    }

    #[test]
    fn test_bifurcation_walks_back_past_full_entries() {
        let ledger = vec![committed("g", "GENESIS", 0), committed("a", "g", 0)];
        // "a" is saturated with two claims; the walk-back lands on "g".
        let mempool = vec![pending("a", 0), pending("a", 1)];

        let placement = place(&ledger, &mempool).unwrap();
        assert_eq!(placement.predecessor_id, "g");
        assert_eq!(placement.level, 1);
    }

    #[test]
    fn test_no_entry_collects_more_than_two_claims() {
        let ledger = vec![committed("g", "GENESIS", 0), committed("a", "g", 0)];
        let mut mempool = Vec::new();

        // Two ledger entries give room for four pending claims. Keep placing
        // without committing; no entry may exceed two claims while any entry
        // still has capacity.
        for _ in 0..(2 * MAX_CLAIMS_PER_ENTRY) {
            let placement = place(&ledger, &mempool).unwrap();
            mempool.push(pending(&placement.predecessor_id, placement.level));

            for entry in &ledger {
                assert!(claim_count(&mempool, &entry.id()) <= MAX_CLAIMS_PER_ENTRY);
            }
        }
    }
}
