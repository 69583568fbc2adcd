mod common;

use std::time::Duration;

use common::{
    Fixture, active_pond, budidaya_input, fish_species, pond_input, pricelist_input, seed_date,
    sell, stocked_budidaya,
};
use efish_domain::store::FailPoint;
use efish_domain::uow::UnitOfWork;
use efish_domain::{Conflict, Domain, DomainError, DomainResult};
use shared::error::ErrorCode;
use shared::models::{BudidayaStatus, CreateOrderInput, PondFilter, UpdateBudidayaSoldQtyInput};
use shared::{Identity, PaginationQuery};
use uuid::Uuid;

#[tokio::test]
async fn test_failed_pricelist_insert_rolls_back_everything() {
    let fx = Fixture::new();
    let id = stocked_budidaya(&fx, 100, 0).await.unwrap();
    fx.store.fail_next(FailPoint::InsertPricelist);

    let mut cmd = fx.domain.budidaya().new_command(fx.identity.clone()).await.unwrap();
    let err = cmd
        .create_multiple_pricelist(&pricelist_input(id, seed_date()))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Persistence { .. }));
    assert!(!err.is_rejection());

    let mut query = fx.domain.budidaya().new_query();
    assert!(query.list_pricelists(id).await.unwrap().is_empty());
    assert_eq!(query.find_by_id(id).await.unwrap().status, BudidayaStatus::Benih);
}

#[tokio::test]
async fn test_failed_status_write_discards_pricelists() {
    let fx = Fixture::new();
    let id = stocked_budidaya(&fx, 100, 0).await.unwrap();
    fx.store.fail_next(FailPoint::UpdateBudidaya);

    let mut cmd = fx.domain.budidaya().new_command(fx.identity.clone()).await.unwrap();
    let err = cmd
        .create_multiple_pricelist(&pricelist_input(id, seed_date()))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::DatabaseError);

    let mut query = fx.domain.budidaya().new_query();
    assert!(query.list_pricelists(id).await.unwrap().is_empty());
    assert_eq!(query.find_by_id(id).await.unwrap().status, BudidayaStatus::Benih);
}

#[tokio::test]
async fn test_failed_pool_insert_leaves_no_pond() {
    let fx = Fixture::new();
    fx.store.fail_next(FailPoint::SavePool);

    let mut cmd = fx.domain.pond().new_command(fx.identity.clone()).await.unwrap();
    assert!(cmd.create_pond(&pond_input("Kolam Harapan", 2)).await.is_err());

    let page = fx
        .domain
        .pond()
        .new_query()
        .list(&PondFilter::default(), &PaginationQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_failed_order_insert_releases_reservation() {
    let fx = Fixture::new();
    let id = stocked_budidaya(&fx, 100, 0).await.unwrap();
    fx.store.fail_next(FailPoint::InsertOrder);

    let mut cmd = fx.domain.order().new_command(fx.identity.clone()).await.unwrap();
    let err = cmd
        .create_order(&CreateOrderInput {
            budidaya_id: id,
            pricelist_id: None,
            qty: 10,
            booking_date: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Persistence { .. }));
    assert_eq!(fx.domain.budidaya().new_query().find_by_id(id).await.unwrap().sold, 0);
}

#[tokio::test]
async fn test_failed_commit_is_reported() {
    let fx = Fixture::new();
    let id = stocked_budidaya(&fx, 100, 0).await.unwrap();
    fx.store.fail_next(FailPoint::Commit);

    let err = sell(&fx, id, 10, false).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::TransactionFailed);
    assert_eq!(fx.domain.budidaya().new_query().find_by_id(id).await.unwrap().sold, 0);
}

#[tokio::test]
async fn test_failed_rollback_keeps_original_error() {
    let fx = Fixture::new();
    let id = stocked_budidaya(&fx, 100, 0).await.unwrap();
    fx.store.fail_next(FailPoint::Rollback);

    let err = sell(&fx, id, 500, false).await.unwrap_err();
    assert!(matches!(err, DomainError::RollbackFailed { .. }));
    assert!(matches!(
        err.primary(),
        DomainError::Conflict(Conflict::Oversell { .. })
    ));
    assert!(err.is_rejection());
}

#[tokio::test]
async fn test_unit_is_single_use() {
    let fx = Fixture::new();
    let id = stocked_budidaya(&fx, 100, 0).await.unwrap();

    let mut cmd = fx.domain.budidaya().new_command(fx.identity.clone()).await.unwrap();
    let input = UpdateBudidayaSoldQtyInput {
        id,
        qty: 5,
        is_cancel: false,
    };
    cmd.update_sold_qty(&input).await.unwrap();
    cmd.commit().await.unwrap();

    let err = cmd.update_sold_qty(&input).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::TransactionFailed);
    assert!(cmd.commit().await.is_err());
    assert!(cmd.rollback().await.is_err());
    assert!(cmd.query().is_err());

    assert_eq!(fx.domain.budidaya().new_query().find_by_id(id).await.unwrap().sold, 5);
}

#[tokio::test]
async fn test_dropped_command_discards_writes() {
    let fx = Fixture::new();
    let id = stocked_budidaya(&fx, 100, 0).await.unwrap();

    {
        let mut cmd = fx.domain.budidaya().new_command(fx.identity.clone()).await.unwrap();
        cmd.update_sold_qty(&UpdateBudidayaSoldQtyInput {
            id,
            qty: 40,
            is_cancel: false,
        })
        .await
        .unwrap();
    }

    assert_eq!(fx.domain.budidaya().new_query().find_by_id(id).await.unwrap().sold, 0);
    // the row lock went with it
    sell(&fx, id, 40, false).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_commit_after_deadline_is_refused() {
    let fx = Fixture::with_timeout(Some(Duration::from_secs(5)));
    let id = stocked_budidaya(&fx, 100, 0).await.unwrap();

    let mut cmd = fx.domain.budidaya().new_command(fx.identity.clone()).await.unwrap();
    cmd.update_sold_qty(&UpdateBudidayaSoldQtyInput {
        id,
        qty: 10,
        is_cancel: false,
    })
    .await
    .unwrap();
    tokio::time::advance(Duration::from_secs(6)).await;

    let err = cmd.commit().await.unwrap_err();
    assert!(matches!(err, DomainError::DeadlineExceeded { op: "commit" }));
    assert_eq!(fx.domain.budidaya().new_query().find_by_id(id).await.unwrap().sold, 0);
}

#[tokio::test(start_paused = true)]
async fn test_operation_blocked_past_deadline() {
    let fx = Fixture::with_timeout(Some(Duration::from_secs(5)));
    let id = stocked_budidaya(&fx, 100, 0).await.unwrap();

    // holds the row lock and never commits in time
    let mut holder = fx.domain.budidaya().new_command(fx.identity.clone()).await.unwrap();
    holder
        .update_sold_qty(&UpdateBudidayaSoldQtyInput {
            id,
            qty: 1,
            is_cancel: false,
        })
        .await
        .unwrap();

    let mut waiter = fx.domain.budidaya().new_command(fx.identity.clone()).await.unwrap();
    let err = waiter
        .update_sold_qty(&UpdateBudidayaSoldQtyInput {
            id,
            qty: 1,
            is_cancel: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::DeadlineExceeded { .. }));
    assert_eq!(err.error_code(), ErrorCode::TimeoutError);
    holder.rollback().await.unwrap();
}

async fn reserve(domain: &Domain, identity: Identity, id: Uuid, qty: i64) -> DomainResult<()> {
    let mut cmd = domain.budidaya().new_command(identity).await?;
    cmd.update_sold_qty(&UpdateBudidayaSoldQtyInput {
        id,
        qty,
        is_cancel: false,
    })
    .await?;
    cmd.commit().await
}

#[tokio::test]
async fn test_concurrent_reservations_never_oversell() {
    let fx = Fixture::new();
    let id = stocked_budidaya(&fx, 100, 0).await.unwrap();

    let tasks: Vec<_> = (0..5)
        .map(|_| {
            let domain = fx.domain.clone();
            let identity = fx.identity.clone();
            tokio::spawn(async move { reserve(&domain, identity, id, 30).await })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, 3);
    assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| matches!(
        e,
        DomainError::Conflict(Conflict::Oversell { .. })
    )));
    assert_eq!(fx.domain.budidaya().new_query().find_by_id(id).await.unwrap().sold, 90);
}

#[tokio::test]
async fn test_racing_cycles_in_one_pool() {
    let fx = Fixture::new();
    let (pond_id, pools) = active_pond(&fx, "Kolam Harapan", 1).await.unwrap();
    let species = fish_species(&fx, "Lele").await.unwrap();
    let input = budidaya_input(pond_id, pools[0], species, 100);

    // both pass the active-cycle lookup before either commits
    let mut first = fx.domain.budidaya().new_command(fx.identity.clone()).await.unwrap();
    let mut second = fx.domain.budidaya().new_command(fx.identity.clone()).await.unwrap();
    first.create_budidaya(&input).await.unwrap();
    let err = second.create_budidaya(&input).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(Conflict::ActiveCycleExists { .. })
    ));
    first.commit().await.unwrap();

    let page = fx
        .domain
        .budidaya()
        .new_query()
        .list_by_pond(pond_id, &PaginationQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_unit_of_work_directly() {
    let fx = Fixture::new();
    let mut uow = UnitOfWork::begin(&fx.store, None).await.unwrap();
    assert!(uow.is_open());
    uow.rollback().await.unwrap();
    assert!(!uow.is_open());
    assert!(uow.tx().is_err());
}
