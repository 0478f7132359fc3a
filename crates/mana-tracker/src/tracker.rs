// crates/mana-tracker/src/tracker.rs
//
// ManaTracker: registry of per-identity balances.
//
// Each balance sits behind its own mutex, held for the whole of
// `add_transfer` and for every read, so no caller sees a partially
// rolled-back history. A corrupted history panics inside the lock; the
// poisoned mutex then keeps that identity out of service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use mana_balance::{Balance, BalanceSnapshot, RetentionPolicy, TransferReceipt};
use mana_core::{IdentityId, ManaCalculator, ManaError, Mana, Timestamp, Transfer};

use crate::config::ManaConfig;
use crate::events::{BalanceEvent, BalanceEvents};

/// Mana balances for all tracked identities.
pub struct ManaTracker {
    calculator: Arc<dyn ManaCalculator>,
    retention: RetentionPolicy,
    balances: RwLock<HashMap<IdentityId, Arc<Mutex<Balance>>>>,
    events: BalanceEvents,
}

impl ManaTracker {
    pub fn new(calculator: Arc<dyn ManaCalculator>, retention: RetentionPolicy) -> Self {
        Self {
            calculator,
            retention,
            balances: RwLock::new(HashMap::new()),
            events: BalanceEvents::new(),
        }
    }

    /// Build a tracker with the half-life calculator and retention from config.
    pub fn from_config(config: &ManaConfig) -> Result<Self, ManaError> {
        config.validate()?;
        let calculator = config.build_calculator()?;
        tracing::info!(
            "Mana tracker: half_life={:?}, rate={}/{}, retention={:?}",
            config.calculator.half_life,
            config.calculator.generation_numerator,
            config.calculator.generation_denominator,
            config.retention_policy()
        );
        Ok(Self::new(Arc::new(calculator), config.retention_policy()))
    }

    pub fn events(&self) -> &BalanceEvents {
        &self.events
    }

    /// Book a transfer to `identity`, creating its balance on first use.
    ///
    /// # Errors
    /// `ManaError::BeyondRetention` if the transfer is older than the
    /// identity's checkpoint, `ManaError::Poisoned` if an earlier call hit a
    /// corrupted history for this identity.
    pub fn book_transfer(
        &self,
        identity: IdentityId,
        transfer: Transfer,
    ) -> Result<TransferReceipt, ManaError> {
        let balance = self.balance_or_insert(identity);
        let (receipt, value, last_erosion, checkpoint) = {
            let mut guard = lock_balance(&balance, &identity)?;
            let receipt = guard.add_transfer(Arc::new(transfer))?;
            (receipt, guard.value(), guard.last_erosion(), guard.checkpoint())
        };

        tracing::debug!(
            "Booked transfer for {}: value={}, rolled_back={}",
            identity.short(),
            value,
            receipt.rolled_back
        );

        self.events.publish(&BalanceEvent::Updated {
            identity,
            value,
            last_erosion,
            rolled_back: receipt.rolled_back,
        });
        if receipt.pruned > 0 {
            if let Some(checkpoint) = checkpoint {
                self.events.publish(&BalanceEvent::Pruned {
                    identity,
                    dropped: receipt.pruned,
                    checkpoint_time: checkpoint.spent_time,
                });
            }
        }

        Ok(receipt)
    }

    /// Current mana of `identity`; 0 if it was never seen.
    pub fn value_of(&self, identity: &IdentityId) -> Result<Mana, ManaError> {
        self.read_balance(identity, |balance| balance.value())
            .map(|value| value.unwrap_or(0))
    }

    /// Last erosion time of `identity`; 0 if it was never seen.
    pub fn last_erosion_of(&self, identity: &IdentityId) -> Result<Timestamp, ManaError> {
        self.read_balance(identity, |balance| balance.last_erosion())
            .map(|time| time.unwrap_or(0))
    }

    pub fn snapshot(&self, identity: &IdentityId) -> Result<Option<BalanceSnapshot>, ManaError> {
        self.read_balance(identity, |balance| balance.snapshot())
    }

    /// Snapshot as a JSON string, `None` for an unknown identity.
    pub fn snapshot_json(&self, identity: &IdentityId) -> Result<Option<String>, ManaError> {
        match self.snapshot(identity)? {
            Some(snapshot) => Ok(Some(serde_json::to_string(&snapshot)?)),
            None => Ok(None),
        }
    }

    /// All tracked identities, sorted.
    pub fn identities(&self) -> Vec<IdentityId> {
        let balances = self
            .balances
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut ids: Vec<IdentityId> = balances.keys().copied().collect();
        ids.sort();
        ids
    }

    fn balance_or_insert(&self, identity: IdentityId) -> Arc<Mutex<Balance>> {
        if let Some(balance) = self.lookup(&identity) {
            return balance;
        }
        let mut balances = self
            .balances
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let balance = balances.entry(identity).or_insert_with(|| {
            tracing::debug!("Tracking new identity {}", identity.short());
            Arc::new(Mutex::new(Balance::with_retention(
                Arc::clone(&self.calculator),
                self.retention,
            )))
        });
        Arc::clone(balance)
    }

    fn lookup(&self, identity: &IdentityId) -> Option<Arc<Mutex<Balance>>> {
        self.balances
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(identity)
            .cloned()
    }

    fn read_balance<T>(
        &self,
        identity: &IdentityId,
        read: impl FnOnce(&Balance) -> T,
    ) -> Result<Option<T>, ManaError> {
        match self.lookup(identity) {
            Some(balance) => {
                let guard = lock_balance(&balance, identity)?;
                Ok(Some(read(&guard)))
            }
            None => Ok(None),
        }
    }
}

fn lock_balance<'a>(
    balance: &'a Mutex<Balance>,
    identity: &IdentityId,
) -> Result<MutexGuard<'a, Balance>, ManaError> {
    balance.lock().map_err(|_| {
        tracing::error!("Balance for {} is poisoned", identity);
        ManaError::Poisoned(identity.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mana_balance::HalfLifeCalculator;
    use mana_core::RoundingError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn id(byte: u8) -> IdentityId {
        IdentityId::new([byte; 32])
    }

    fn tracker() -> ManaTracker {
        let calc = HalfLifeCalculator::new(None, 1, 1).unwrap();
        ManaTracker::new(Arc::new(calc), RetentionPolicy::Unbounded)
    }

    /// Generates mana normally but panics if asked to erode anything.
    struct PanicOnErode;

    impl ManaCalculator for PanicOnErode {
        fn erode_mana(&self, _balance: Mana, _elapsed: u64) -> (Mana, RoundingError) {
            panic!("erosion requested");
        }

        fn generate_mana(&self, moved_coins: u64, held_time: u64) -> (Mana, RoundingError) {
            (moved_coins * held_time, 0)
        }
    }

    #[test]
    fn test_unknown_identity_defaults() {
        let tracker = tracker();
        assert_eq!(tracker.value_of(&id(1)).unwrap(), 0);
        assert_eq!(tracker.last_erosion_of(&id(1)).unwrap(), 0);
        assert!(tracker.snapshot(&id(1)).unwrap().is_none());
        assert!(tracker.identities().is_empty());
    }

    #[test]
    fn test_book_transfer_per_identity() {
        let tracker = tracker();
        tracker
            .book_transfer(id(1), Transfer::new(5, 0, 10).unwrap())
            .unwrap();
        tracker
            .book_transfer(id(2), Transfer::new(1, 0, 3).unwrap())
            .unwrap();

        assert_eq!(tracker.value_of(&id(1)).unwrap(), 50);
        assert_eq!(tracker.value_of(&id(2)).unwrap(), 3);
        assert_eq!(tracker.identities(), vec![id(1), id(2)]);
    }

    #[test]
    fn test_events_published() {
        let tracker = tracker();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            tracker
                .events()
                .subscribe(move |event| seen.lock().unwrap().push(event.clone()));
        }

        tracker
            .book_transfer(id(1), Transfer::new(5, 0, 10).unwrap())
            .unwrap();
        tracker
            .book_transfer(id(1), Transfer::new(2, 0, 5).unwrap())
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[1],
            BalanceEvent::Updated {
                identity: id(1),
                value: 60,
                last_erosion: 10,
                rolled_back: 1,
            }
        );
    }

    #[test]
    fn test_pruned_event() {
        let calc = HalfLifeCalculator::new(None, 1, 1).unwrap();
        let tracker = ManaTracker::new(Arc::new(calc), RetentionPolicy::Horizon(10));
        let pruned = Arc::new(AtomicUsize::new(0));
        {
            let pruned = Arc::clone(&pruned);
            tracker.events().subscribe(move |event| {
                if let BalanceEvent::Pruned { dropped, .. } = event {
                    pruned.fetch_add(*dropped, Ordering::SeqCst);
                }
            });
        }

        tracker
            .book_transfer(id(1), Transfer::new(1, 0, 1).unwrap())
            .unwrap();
        tracker
            .book_transfer(id(1), Transfer::new(1, 0, 50).unwrap())
            .unwrap();
        assert_eq!(pruned.load(Ordering::SeqCst), 1);

        let err = tracker
            .book_transfer(id(1), Transfer::new(1, 0, 1).unwrap())
            .unwrap_err();
        assert!(matches!(err, ManaError::BeyondRetention { .. }));
    }

    #[test]
    fn test_panic_poisons_only_that_identity() {
        let tracker = ManaTracker::new(Arc::new(PanicOnErode), RetentionPolicy::Unbounded);
        tracker
            .book_transfer(id(1), Transfer::new(1, 0, 1).unwrap())
            .unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tracker.book_transfer(id(1), Transfer::new(1, 0, 2).unwrap())
        }));
        assert!(result.is_err());

        assert!(matches!(
            tracker.value_of(&id(1)),
            Err(ManaError::Poisoned(_))
        ));
        tracker
            .book_transfer(id(2), Transfer::new(2, 0, 2).unwrap())
            .unwrap();
        assert_eq!(tracker.value_of(&id(2)).unwrap(), 4);
    }

    #[test]
    fn test_snapshot_json() {
        let tracker = tracker();
        tracker
            .book_transfer(id(7), Transfer::new(5, 0, 10).unwrap())
            .unwrap();
        let json = tracker.snapshot_json(&id(7)).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["value"], 50);
        assert_eq!(value["last_erosion"], 10);
        assert_eq!(value["history"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_from_config() {
        let config = ManaConfig::from_toml_str("[retention]\nhorizon = 5\n").unwrap();
        let tracker = ManaTracker::from_config(&config).unwrap();
        tracker
            .book_transfer(id(1), Transfer::new(2, 0, 4).unwrap())
            .unwrap();
        assert_eq!(tracker.value_of(&id(1)).unwrap(), 8);
    }
}
