//! Unit-of-Work
//!
//! Wraps one store transaction for the lifetime of a command. The unit is
//! open until `commit` or `rollback`; any later use fails with a
//! [`TxAction::Reuse`] transaction error. Dropping an open unit drops the
//! store transaction, which discards its writes.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{DomainError, DomainResult, TxAction};
use crate::store::{Store, StoreTx};

pub struct UnitOfWork {
    tx: Option<Box<dyn StoreTx>>,
    deadline: Option<Instant>,
}

impl UnitOfWork {
    pub async fn begin(store: &dyn Store, timeout: Option<Duration>) -> DomainResult<Self> {
        let tx = store
            .begin()
            .await
            .map_err(|source| DomainError::Transaction {
                action: TxAction::Begin,
                source,
            })?;
        Ok(Self {
            tx: Some(tx),
            deadline: timeout.map(|t| Instant::now() + t),
        })
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_open(&self) -> bool {
        self.tx.is_some()
    }

    pub fn tx(&mut self) -> DomainResult<&mut (dyn StoreTx + 'static)> {
        match self.tx.as_deref_mut() {
            Some(tx) => Ok(tx),
            None => Err(DomainError::closed()),
        }
    }

    pub async fn commit(&mut self) -> DomainResult<()> {
        let tx = self.tx.take().ok_or_else(DomainError::closed)?;

        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            if let Err(source) = tx.rollback().await {
                tracing::warn!(error = %source, "Rollback after deadline failed");
            }
            return Err(DomainError::DeadlineExceeded { op: "commit" });
        }

        tx.commit()
            .await
            .map_err(|source| DomainError::Transaction {
                action: TxAction::Commit,
                source,
            })
    }

    pub async fn rollback(&mut self) -> DomainResult<()> {
        let tx = self.tx.take().ok_or_else(DomainError::closed)?;
        tx.rollback()
            .await
            .map_err(|source| DomainError::Transaction {
                action: TxAction::Rollback,
                source,
            })
    }

    /// Pass `Ok` through; on `Err` roll back an open unit first.
    ///
    /// If the rollback fails too, both errors are returned together.
    pub async fn settle<T>(&mut self, result: DomainResult<T>) -> DomainResult<T> {
        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !self.is_open() {
            return Err(err);
        }
        match self.rollback().await {
            Ok(()) => Err(err),
            Err(rollback) => Err(DomainError::RollbackFailed {
                original: Box::new(err),
                rollback: Box::new(rollback),
            }),
        }
    }
}

/// Run `fut` until `deadline`, if there is one
pub async fn with_deadline<T, F>(
    deadline: Option<Instant>,
    op: &'static str,
    fut: F,
) -> DomainResult<T>
where
    F: Future<Output = DomainResult<T>>,
{
    match deadline {
        Some(at) => tokio::time::timeout_at(at, fut)
            .await
            .unwrap_or(Err(DomainError::DeadlineExceeded { op })),
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FailPoint, MemoryStore, ReadOptions};
    use shared::Identity;
    use shared::models::{Audit, FishSpecies};
    use shared::util::{new_id, now};

    fn species() -> FishSpecies {
        FishSpecies {
            id: new_id(),
            name: "Nila".into(),
            audit: Audit::created(&Identity::anonymous(), now()),
        }
    }

    async fn species_exists(store: &MemoryStore, id: uuid::Uuid) -> bool {
        let mut tx = store.begin().await.unwrap();
        tx.find_fish_species(id, ReadOptions::ACTIVE)
            .await
            .unwrap()
            .is_some()
    }

    #[tokio::test]
    async fn test_commit_closes_unit() {
        let store = MemoryStore::new();
        let row = species();

        let mut uow = UnitOfWork::begin(&store, None).await.unwrap();
        uow.tx().unwrap().insert_fish_species(&row).await.unwrap();
        uow.commit().await.unwrap();

        assert!(!uow.is_open());
        assert!(matches!(
            uow.tx(),
            Err(DomainError::Transaction {
                action: TxAction::Reuse,
                ..
            })
        ));
        assert!(uow.commit().await.is_err());
        assert!(uow.rollback().await.is_err());
        assert!(species_exists(&store, row.id).await);
    }

    #[tokio::test]
    async fn test_drop_discards() {
        let store = MemoryStore::new();
        let row = species();
        {
            let mut uow = UnitOfWork::begin(&store, None).await.unwrap();
            uow.tx().unwrap().insert_fish_species(&row).await.unwrap();
        }
        assert!(!species_exists(&store, row.id).await);
    }

    #[tokio::test]
    async fn test_settle_rolls_back_on_error() {
        let store = MemoryStore::new();
        let row = species();

        let mut uow = UnitOfWork::begin(&store, None).await.unwrap();
        uow.tx().unwrap().insert_fish_species(&row).await.unwrap();
        let result: DomainResult<()> = Err(DomainError::DeadlineExceeded { op: "test" });
        let err = uow.settle(result).await.unwrap_err();

        assert!(matches!(err, DomainError::DeadlineExceeded { op: "test" }));
        assert!(!uow.is_open());
        assert!(!species_exists(&store, row.id).await);
    }

    #[tokio::test]
    async fn test_failed_rollback_keeps_both_errors() {
        let store = MemoryStore::new();
        let mut uow = UnitOfWork::begin(&store, None).await.unwrap();
        store.fail_next(FailPoint::Rollback);

        let result: DomainResult<()> = Err(DomainError::DeadlineExceeded { op: "test" });
        let err = uow.settle(result).await.unwrap_err();
        match &err {
            DomainError::RollbackFailed { original, rollback } => {
                assert!(matches!(**original, DomainError::DeadlineExceeded { .. }));
                assert!(matches!(
                    **rollback,
                    DomainError::Transaction {
                        action: TxAction::Rollback,
                        ..
                    }
                ));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(err.primary(), DomainError::DeadlineExceeded { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_deadline_blocks_commit() {
        let store = MemoryStore::new();
        let row = species();

        let mut uow = UnitOfWork::begin(&store, Some(Duration::from_millis(50)))
            .await
            .unwrap();
        uow.tx().unwrap().insert_fish_species(&row).await.unwrap();
        tokio::time::advance(Duration::from_millis(60)).await;

        let err = uow.commit().await.unwrap_err();
        assert!(matches!(err, DomainError::DeadlineExceeded { op: "commit" }));
        assert!(!species_exists(&store, row.id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_deadline_times_out() {
        let deadline = Some(Instant::now() + Duration::from_millis(10));
        let result = with_deadline(deadline, "slow", async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(DomainError::DeadlineExceeded { op: "slow" })));

        let result = with_deadline(None, "fast", async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
