//! Optimistic display overlay.
//!
//! A submitted contribution is staged here so a UI can show the bounty it will
//! produce before the chain confirms it. The persisted total is never touched
//! by this module: the displayed value is `confirmed + pending`, and a pending
//! entry is either settled (after reconciliation) or rolled back (failure,
//! cancellation).

use std::collections::HashMap;

use bos_types::{Decimal, RecordId, Signature};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingEntry {
    pub record: RecordId,
    pub amount: Decimal,
}

#[derive(Debug, Default)]
pub struct PendingBounties {
    entries: HashMap<Signature, PendingEntry>,
}

impl PendingBounties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an optimistic contribution keyed by its transaction signature.
    /// Staging the same signature twice keeps the first entry.
    pub fn stage(&mut self, signature: Signature, record: RecordId, amount: Decimal) {
        self.entries
            .entry(signature)
            .or_insert(PendingEntry { record, amount });
    }

    /// The contribution was reconciled; its amount is now part of the
    /// persisted total.
    pub fn settle(&mut self, signature: &Signature) -> Option<PendingEntry> {
        self.entries.remove(signature)
    }

    /// The contribution will not land; drop it from the display.
    pub fn roll_back(&mut self, signature: &Signature) -> Option<PendingEntry> {
        self.entries.remove(signature)
    }

    pub fn get(&self, signature: &Signature) -> Option<&PendingEntry> {
        self.entries.get(signature)
    }

    pub fn pending_total(&self, record: &RecordId) -> Decimal {
        self.entries
            .values()
            .filter(|e| &e.record == record)
            .map(|e| e.amount)
            .sum()
    }

    /// What to show for `record`: the persisted total plus anything in flight.
    pub fn display_total(&self, record: &RecordId, confirmed: Decimal) -> Decimal {
        confirmed + self.pending_total(record)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(s: &str) -> RecordId {
        RecordId::new(s).unwrap()
    }

    #[test]
    fn display_merges_pending_with_confirmed() {
        let mut overlay = PendingBounties::new();
        overlay.stage(Signature::new([1u8; 64]), rid("a"), Decimal::new(25, 1));
        overlay.stage(Signature::new([2u8; 64]), rid("a"), Decimal::ONE);
        overlay.stage(Signature::new([3u8; 64]), rid("b"), Decimal::TEN);

        assert_eq!(overlay.display_total(&rid("a"), Decimal::TEN), Decimal::new(135, 1));
        assert_eq!(overlay.pending_total(&rid("c")), Decimal::ZERO);
    }

    #[test]
    fn settle_and_roll_back_remove_entries() {
        let mut overlay = PendingBounties::new();
        let s1 = Signature::new([1u8; 64]);
        let s2 = Signature::new([2u8; 64]);
        overlay.stage(s1, rid("a"), Decimal::ONE);
        overlay.stage(s2, rid("a"), Decimal::TWO);

        assert_eq!(overlay.settle(&s1).unwrap().amount, Decimal::ONE);
        assert_eq!(overlay.roll_back(&s2).unwrap().amount, Decimal::TWO);
        assert!(overlay.is_empty());
        assert_eq!(overlay.settle(&s1), None);
    }

    #[test]
    fn restaging_keeps_first_entry() {
        let mut overlay = PendingBounties::new();
        let s = Signature::new([1u8; 64]);
        overlay.stage(s, rid("a"), Decimal::ONE);
        overlay.stage(s, rid("a"), Decimal::TEN);
        assert_eq!(overlay.len(), 1);
        assert_eq!(overlay.pending_total(&rid("a")), Decimal::ONE);
    }
}
