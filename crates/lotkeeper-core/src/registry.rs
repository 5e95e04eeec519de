//! Slot inventory and occupancy

use lotkeeper_api::{OccupancySummary, Slot};
use lotkeeper_store::{Store, StoreTx};
use lotkeeper_util::{LotError, Result, SlotCode};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Owns the slot inventory and the occupied flag of every slot.
///
/// Each public operation runs in its own transaction. The `*_in` helpers
/// work inside a caller's transaction so the engine can combine them with
/// ledger steps.
#[derive(Clone)]
pub struct SlotRegistry {
    store: Arc<dyn Store>,
}

impl SlotRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Take the free slot with the smallest (row, number) and mark it
    /// occupied. `None` when every slot is taken.
    pub fn allocate_next_free_slot(&self) -> Result<Option<Slot>> {
        let tx = self.store.begin()?;
        let slot = Self::allocate_in(&*tx)?;
        tx.commit()?;
        Ok(slot)
    }

    pub(crate) fn allocate_in(tx: &dyn StoreTx) -> Result<Option<Slot>> {
        let Some(code) = tx.first_free_slot()? else {
            debug!("No free slot");
            return Ok(None);
        };

        if !tx.mark_occupied(&code)? {
            return Err(invariant_violation(format!(
                "slot {} was listed free but could not be occupied",
                code
            )));
        }

        debug!(slot = %code, "Slot allocated");
        Ok(Some(Slot {
            code,
            occupied: true,
        }))
    }

    /// Mark an occupied slot free again
    pub fn release_slot(&self, code: &SlotCode) -> Result<()> {
        let tx = self.store.begin()?;
        Self::release_in(&*tx, code)?;
        tx.commit()?;
        Ok(())
    }

    pub(crate) fn release_in(tx: &dyn StoreTx, code: &SlotCode) -> Result<()> {
        if tx.mark_free(code)? {
            debug!(slot = %code, "Slot released");
            return Ok(());
        }

        match tx.get_slot(code)? {
            None => Err(LotError::not_found(format!("slot {}", code))),
            Some(_) => Err(invariant_violation(format!(
                "slot {} released while already free",
                code
            ))),
        }
    }

    /// All slots in (row, number) order
    pub fn list_slots(&self) -> Result<Vec<Slot>> {
        let tx = self.store.begin()?;
        Ok(tx.list_slots()?)
    }

    /// Create the missing slots `<row>01..<row>NN` for each row. Existing
    /// codes are left untouched. Returns the codes that were added.
    pub fn provision(&self, rows: &[String], per_row: u32) -> Result<Vec<SlotCode>> {
        if per_row == 0 {
            return Err(LotError::invalid_request("slots per row must be at least 1"));
        }

        let mut codes = Vec::with_capacity(rows.len() * per_row as usize);
        for row in rows {
            for number in 1..=per_row {
                codes.push(SlotCode::new(row.clone(), number)?);
            }
        }

        let tx = self.store.begin()?;
        let mut added = Vec::new();
        for code in codes {
            if tx.insert_slot(&code)? {
                added.push(code);
            }
        }
        tx.commit()?;

        info!(
            rows = rows.len(),
            per_row,
            added = added.len(),
            "Slots provisioned"
        );
        Ok(added)
    }

    /// Delete a free slot
    pub fn remove_slot(&self, code: &SlotCode) -> Result<()> {
        let tx = self.store.begin()?;
        match tx.get_slot(code)? {
            None => return Err(LotError::not_found(format!("slot {}", code))),
            Some(slot) if slot.occupied => return Err(LotError::SlotOccupied(code.clone())),
            Some(_) => {}
        }
        tx.delete_slot(code)?;
        tx.commit()?;

        info!(slot = %code, "Slot removed");
        Ok(())
    }

    /// Total, occupied and free counts, lot-wide and per row
    pub fn summary(&self) -> Result<OccupancySummary> {
        Ok(OccupancySummary::from_slots(&self.list_slots()?))
    }
}

pub(crate) fn invariant_violation(msg: String) -> LotError {
    error!(violation = %msg, "Invariant violated");
    LotError::invalid_state(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lotkeeper_store::SqliteStore;

    fn registry() -> SlotRegistry {
        SlotRegistry::new(Arc::new(SqliteStore::in_memory().unwrap()))
    }

    fn code(s: &str) -> SlotCode {
        s.parse().unwrap()
    }

    fn rows(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn allocates_smallest_free_slot() {
        let registry = registry();
        registry.provision(&rows(&["B"]), 1).unwrap();
        registry.provision(&rows(&["A"]), 2).unwrap();

        // Free: B01, A02, A01
        let slot = registry.allocate_next_free_slot().unwrap().unwrap();
        assert_eq!(slot.code, code("A01"));
        assert!(slot.occupied);

        let slot = registry.allocate_next_free_slot().unwrap().unwrap();
        assert_eq!(slot.code, code("A02"));
        let slot = registry.allocate_next_free_slot().unwrap().unwrap();
        assert_eq!(slot.code, code("B01"));

        assert!(registry.allocate_next_free_slot().unwrap().is_none());
    }

    #[test]
    fn numbers_compare_numerically() {
        let registry = registry();
        registry.provision(&rows(&["A"]), 10).unwrap();
        for n in 3..=9 {
            registry.remove_slot(&code(&format!("A{:02}", n))).unwrap();
        }
        registry.remove_slot(&code("A01")).unwrap();

        // Left: A02, A10
        let slot = registry.allocate_next_free_slot().unwrap().unwrap();
        assert_eq!(slot.code, code("A02"));
        let slot = registry.allocate_next_free_slot().unwrap().unwrap();
        assert_eq!(slot.code, code("A10"));
    }

    #[test]
    fn release_frees_the_slot() {
        let registry = registry();
        registry.provision(&rows(&["A"]), 1).unwrap();

        let slot = registry.allocate_next_free_slot().unwrap().unwrap();
        registry.release_slot(&slot.code).unwrap();

        let slots = registry.list_slots().unwrap();
        assert!(!slots[0].occupied);
    }

    #[test]
    fn double_release_is_invalid_state() {
        let registry = registry();
        registry.provision(&rows(&["A"]), 1).unwrap();

        let slot = registry.allocate_next_free_slot().unwrap().unwrap();
        registry.release_slot(&slot.code).unwrap();

        let err = registry.release_slot(&slot.code).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn release_unknown_slot_is_not_found() {
        let registry = registry();
        assert!(matches!(
            registry.release_slot(&code("Z01")),
            Err(LotError::NotFound(_))
        ));
    }

    #[test]
    fn provision_skips_existing_codes() {
        let registry = registry();
        let added = registry.provision(&rows(&["A"]), 2).unwrap();
        assert_eq!(added, vec![code("A01"), code("A02")]);

        let added = registry.provision(&rows(&["A", "B"]), 3).unwrap();
        assert_eq!(added, vec![code("A03"), code("B01"), code("B02"), code("B03")]);
        assert_eq!(registry.list_slots().unwrap().len(), 6);
    }

    #[test]
    fn provision_rejects_bad_input() {
        let registry = registry();
        assert!(matches!(
            registry.provision(&rows(&["a"]), 2),
            Err(LotError::InvalidRequest(_))
        ));
        assert!(matches!(
            registry.provision(&rows(&["A"]), 0),
            Err(LotError::InvalidRequest(_))
        ));
        assert!(registry.list_slots().unwrap().is_empty());
    }

    #[test]
    fn remove_slot_refuses_occupied() {
        let registry = registry();
        registry.provision(&rows(&["A"]), 2).unwrap();
        registry.allocate_next_free_slot().unwrap();

        assert!(matches!(
            registry.remove_slot(&code("A01")),
            Err(LotError::SlotOccupied(_))
        ));
        assert!(matches!(
            registry.remove_slot(&code("C07")),
            Err(LotError::NotFound(_))
        ));

        registry.remove_slot(&code("A02")).unwrap();
        assert_eq!(registry.list_slots().unwrap().len(), 1);
    }

    #[test]
    fn summary_counts_per_row() {
        let registry = registry();
        registry.provision(&rows(&["A", "B"]), 2).unwrap();
        registry.allocate_next_free_slot().unwrap();

        let summary = registry.summary().unwrap();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.occupied, 1);
        assert_eq!(summary.free, 3);
        assert_eq!(summary.rows[0].row, "A");
        assert_eq!(summary.rows[0].occupied, 1);
        assert_eq!(summary.rows[1].occupied, 0);
    }
}
