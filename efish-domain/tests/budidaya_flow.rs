mod common;

use chrono::Duration;
use common::{
    Fixture, active_pond, budidaya_input, fish_species, pricelist_input, seed_date, sell,
    start_budidaya, stocked_budidaya, submit_pond,
};
use efish_domain::{Conflict, DomainError, DomainResult, Resource};
use rust_decimal::Decimal;
use shared::PaginationQuery;
use shared::models::{
    BudidayaStatus, UpdateBudidayaStatusInput, UpdateBudidayaWithPricelistInput,
    UpdatePricelistInput,
};
use uuid::Uuid;

#[tokio::test]
async fn test_create_on_inactive_pond_is_rejected() {
    let fx = Fixture::new();
    let pond_id = submit_pond(&fx, "Kolam Harapan", 1).await.unwrap();
    let pool_id = fx.domain.pond().new_query().find_by_id(pond_id).await.unwrap().pools[0].id;
    let species = fish_species(&fx, "Lele").await.unwrap();

    let err = start_budidaya(&fx, &budidaya_input(pond_id, pool_id, species, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PondNotActive { .. }));

    let page = fx
        .domain
        .budidaya()
        .new_query()
        .list_by_pond(pond_id, &PaginationQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_create_on_missing_pond() {
    let fx = Fixture::new();
    let err = start_budidaya(
        &fx,
        &budidaya_input(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 10),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        DomainError::NotFound {
            resource: Resource::Pond,
            ..
        }
    ));
}

#[tokio::test]
async fn test_second_active_cycle_in_pool_conflicts() {
    let fx = Fixture::new();
    let (pond_id, pools) = active_pond(&fx, "Kolam Harapan", 1).await.unwrap();
    let species = fish_species(&fx, "Lele").await.unwrap();
    let input = budidaya_input(pond_id, pools[0], species, 100);

    let first = start_budidaya(&fx, &input).await.unwrap();
    let err = start_budidaya(&fx, &input).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(Conflict::ActiveCycleExists { pool_id }) if pool_id == pools[0]
    ));

    let page = fx
        .domain
        .budidaya()
        .new_query()
        .list_by_pond(pond_id, &PaginationQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].id, first);

    let active = fx
        .domain
        .budidaya()
        .new_query()
        .find_active_by_pool(pools[0])
        .await
        .unwrap();
    assert_eq!(active.map(|b| b.id), Some(first));
}

#[tokio::test]
async fn test_harvest_frees_the_pool() {
    let fx = Fixture::new();
    let (pond_id, pools) = active_pond(&fx, "Kolam Harapan", 1).await.unwrap();
    let species = fish_species(&fx, "Lele").await.unwrap();
    let input = budidaya_input(pond_id, pools[0], species, 100);
    let first = start_budidaya(&fx, &input).await.unwrap();

    let mut cmd = fx.domain.budidaya().new_command(fx.identity.clone()).await.unwrap();
    cmd.create_multiple_pricelist(&pricelist_input(first, seed_date() + Duration::days(90)))
        .await
        .unwrap();
    cmd.commit().await.unwrap();

    let second = start_budidaya(&fx, &input).await.unwrap();
    assert_ne!(first, second);
    let first = fx.domain.budidaya().new_query().find_by_id(first).await.unwrap();
    let second = fx.domain.budidaya().new_query().find_by_id(second).await.unwrap();
    // the harvested cycle keeps its code, the new one takes the next free one
    assert_eq!(first.code, "KH-0001");
    assert_eq!(second.code, "KH-0002");
}

#[tokio::test]
async fn test_codes_are_generated_per_pond() {
    let fx = Fixture::new();
    let (pond_id, pools) = active_pond(&fx, "Kolam Harapan", 3).await.unwrap();
    let species = fish_species(&fx, "Nila").await.unwrap();

    let a = start_budidaya(&fx, &budidaya_input(pond_id, pools[0], species, 10))
        .await
        .unwrap();
    let b = start_budidaya(&fx, &budidaya_input(pond_id, pools[1], species, 10))
        .await
        .unwrap();
    let mut manual = budidaya_input(pond_id, pools[2], species, 10);
    manual.code = "  LELE-A1 ".into();
    let c = start_budidaya(&fx, &manual).await.unwrap();

    let mut query = fx.domain.budidaya().new_query();
    assert_eq!(query.find_by_id(a).await.unwrap().code, "KH-0001");
    assert_eq!(query.find_by_id(b).await.unwrap().code, "KH-0002");
    assert_eq!(query.find_by_id(c).await.unwrap().code, "LELE-A1");
}

#[tokio::test]
async fn test_concurrent_generated_codes_do_not_collide() {
    let fx = Fixture::new();
    let (pond_id, pools) = active_pond(&fx, "Kolam Harapan", 2).await.unwrap();
    let species = fish_species(&fx, "Nila").await.unwrap();

    // both commands derive KH-0001 before either commits
    let mut first = fx.domain.budidaya().new_command(fx.identity.clone()).await.unwrap();
    let a = first
        .create_budidaya(&budidaya_input(pond_id, pools[0], species, 10))
        .await
        .unwrap();
    let mut second = fx.domain.budidaya().new_command(fx.identity.clone()).await.unwrap();
    let b = second
        .create_budidaya(&budidaya_input(pond_id, pools[1], species, 10))
        .await
        .unwrap();
    second.commit().await.unwrap();
    first.commit().await.unwrap();

    let mut query = fx.domain.budidaya().new_query();
    assert_eq!(query.find_by_id(a).await.unwrap().code, "KH-0001");
    assert_eq!(query.find_by_id(b).await.unwrap().code, "KH-0002");
}

#[tokio::test]
async fn test_manual_code_must_be_unique() {
    let fx = Fixture::new();
    let (pond_id, pools) = active_pond(&fx, "Kolam Harapan", 2).await.unwrap();
    let species = fish_species(&fx, "Nila").await.unwrap();

    let mut input = budidaya_input(pond_id, pools[0], species, 10);
    input.code = "NILA-01".into();
    start_budidaya(&fx, &input).await.unwrap();

    input.pool_id = pools[1];
    let err = start_budidaya(&fx, &input).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(Conflict::DuplicateCode { ref code }) if code == "NILA-01"
    ));
}

#[tokio::test]
async fn test_pool_of_another_pond_is_rejected() {
    let fx = Fixture::new();
    let (pond_id, _) = active_pond(&fx, "Kolam Harapan", 1).await.unwrap();
    let (_, other_pools) = active_pond(&fx, "Kolam Lain", 1).await.unwrap();
    let species = fish_species(&fx, "Nila").await.unwrap();

    let err = start_budidaya(&fx, &budidaya_input(pond_id, other_pools[0], species, 10))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::NotFound {
            resource: Resource::Pool,
            ..
        }
    ));
}

#[tokio::test]
async fn test_unknown_species_is_rejected() {
    let fx = Fixture::new();
    let (pond_id, pools) = active_pond(&fx, "Kolam Harapan", 1).await.unwrap();

    let err = start_budidaya(&fx, &budidaya_input(pond_id, pools[0], Uuid::new_v4(), 10))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::NotFound {
            resource: Resource::FishSpecies,
            ..
        }
    ));
}

#[tokio::test]
async fn test_sold_qty_reserve_and_release() {
    let fx = Fixture::new();
    let id = stocked_budidaya(&fx, 100, 20).await.unwrap();

    sell(&fx, id, 50, false).await.unwrap();
    let b = fx.domain.budidaya().new_query().find_by_id(id).await.unwrap();
    assert_eq!(b.sold, 70);

    let err = sell(&fx, id, 31, false).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(Conflict::Oversell {
            requested: 31,
            remaining: 30,
            ..
        })
    ));
    assert_eq!(
        fx.domain.budidaya().new_query().find_by_id(id).await.unwrap().sold,
        70
    );

    sell(&fx, id, 30, true).await.unwrap();
    assert_eq!(
        fx.domain.budidaya().new_query().find_by_id(id).await.unwrap().sold,
        40
    );

    let err = sell(&fx, id, 41, true).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(Conflict::SoldUnderflow { sold: 40, .. })
    ));
}

#[tokio::test]
async fn test_oversell_leaves_sold_unchanged() {
    let fx = Fixture::new();
    let id = stocked_budidaya(&fx, 100, 20).await.unwrap();

    let err = sell(&fx, id, 90, false).await.unwrap_err();
    assert!(err.is_rejection());
    assert_eq!(
        err.to_string(),
        "Order Estimate Exceeded Capacity: requested 90, remaining 80"
    );
    assert_eq!(
        fx.domain.budidaya().new_query().find_by_id(id).await.unwrap().sold,
        20
    );
}

#[tokio::test]
async fn test_zero_qty_is_invalid() {
    let fx = Fixture::new();
    let id = stocked_budidaya(&fx, 100, 0).await.unwrap();
    let err = sell(&fx, id, 0, false).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(ref e) if e.has_field("qty")));
}

#[tokio::test]
async fn test_pricelist_before_seeding_writes_nothing() {
    let fx = Fixture::new();
    let id = stocked_budidaya(&fx, 100, 0).await.unwrap();

    let mut cmd = fx.domain.budidaya().new_command(fx.identity.clone()).await.unwrap();
    let err = cmd
        .create_multiple_pricelist(&pricelist_input(id, seed_date() - Duration::days(1)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(Conflict::HarvestBeforeSeeding { .. })
    ));

    let mut query = fx.domain.budidaya().new_query();
    assert!(query.list_pricelists(id).await.unwrap().is_empty());
    let b = query.find_by_id(id).await.unwrap();
    assert_eq!(b.status, BudidayaStatus::Benih);
    assert_eq!(b.estimated_panen_date, None);
}

#[tokio::test]
async fn test_pricelist_harvests_the_cycle() {
    let fx = Fixture::new();
    let id = stocked_budidaya(&fx, 100, 0).await.unwrap();
    let estimate = seed_date() + Duration::days(120);

    let mut cmd = fx.domain.budidaya().new_command(fx.identity.clone()).await.unwrap();
    let ids = cmd
        .create_multiple_pricelist(&pricelist_input(id, estimate))
        .await
        .unwrap();
    cmd.commit().await.unwrap();
    assert_eq!(ids.len(), 2);

    let mut query = fx.domain.budidaya().new_query();
    let rows = query.list_pricelists(id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|p| p.budidaya_id == id));

    let b = query.find_by_id(id).await.unwrap();
    assert_eq!(b.status, BudidayaStatus::Panen);
    assert_eq!(b.estimated_panen_date, Some(estimate));
    assert_eq!(b.estimated_tonase, Some(1.5));
    assert!(!b.is_active());
}

async fn update_status(fx: &Fixture, input: UpdateBudidayaStatusInput) -> DomainResult<()> {
    let mut cmd = fx.domain.budidaya().new_command(fx.identity.clone()).await?;
    cmd.update_status(&input).await?;
    cmd.commit().await
}

#[tokio::test]
async fn test_status_update_rules() {
    let fx = Fixture::new();
    let id = stocked_budidaya(&fx, 100, 60).await.unwrap();

    let err = update_status(&fx, UpdateBudidayaStatusInput {
        id,
        stock: Some(50),
        ..Default::default()
    })
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(Conflict::StockBelowSold {
            stock: 50,
            sold: 60,
            ..
        })
    ));

    update_status(&fx, UpdateBudidayaStatusInput {
        id,
        status: Some(BudidayaStatus::Pembesaran),
        stock: Some(150),
        ..Default::default()
    })
    .await
    .unwrap();
    let b = fx.domain.budidaya().new_query().find_by_id(id).await.unwrap();
    assert_eq!(b.status, BudidayaStatus::Pembesaran);
    assert_eq!(b.stock, 150);

    update_status(&fx, UpdateBudidayaStatusInput {
        id,
        status: Some(BudidayaStatus::Panen),
        ..Default::default()
    })
    .await
    .unwrap();
    let err = update_status(&fx, UpdateBudidayaStatusInput {
        id,
        status: Some(BudidayaStatus::Benih),
        ..Default::default()
    })
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(Conflict::TerminalStatus { .. })
    ));
}

#[tokio::test]
async fn test_status_update_with_pricelist_upserts() {
    let fx = Fixture::new();
    let id = stocked_budidaya(&fx, 100, 0).await.unwrap();

    let mut cmd = fx.domain.budidaya().new_command(fx.identity.clone()).await.unwrap();
    let created = cmd
        .create_multiple_pricelist(&pricelist_input(id, seed_date() + Duration::days(60)))
        .await
        .unwrap();
    cmd.commit().await.unwrap();

    let input = UpdateBudidayaWithPricelistInput {
        budidaya: UpdateBudidayaStatusInput {
            id,
            estimated_tonase: Some(2.0),
            ..Default::default()
        },
        pricelists: vec![
            UpdatePricelistInput {
                id: created[0],
                limit: "5-7 ekor/kg".into(),
                price: Decimal::new(37_500, 0),
            },
            UpdatePricelistInput {
                id: Uuid::nil(),
                limit: "11-15 ekor/kg".into(),
                price: Decimal::new(25_000, 0),
            },
        ],
    };
    let mut cmd = fx.domain.budidaya().new_command(fx.identity.clone()).await.unwrap();
    cmd.update_status_with_pricelist(&input).await.unwrap();
    cmd.commit().await.unwrap();

    let mut query = fx.domain.budidaya().new_query();
    assert_eq!(query.list_pricelists(id).await.unwrap().len(), 3);
    let updated = query.find_pricelist(created[0]).await.unwrap();
    assert_eq!(updated.price, Decimal::new(37_500, 0));
    assert_eq!(query.find_by_id(id).await.unwrap().estimated_tonase, Some(2.0));
}

#[tokio::test]
async fn test_fish_species_catalogue() {
    let fx = Fixture::new();
    let lele = fish_species(&fx, "  Lele ").await.unwrap();
    fish_species(&fx, "Nila").await.unwrap();

    let mut query = fx.domain.budidaya().new_query();
    assert_eq!(query.find_fish_species(lele).await.unwrap().name, "Lele");
    assert_eq!(query.list_fish_species().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_latest_active_code() {
    let fx = Fixture::new();
    let (pond_id, pools) = active_pond(&fx, "Mina Jaya", 2).await.unwrap();
    let species = fish_species(&fx, "Nila").await.unwrap();

    let mut query = fx.domain.budidaya().new_query();
    assert_eq!(query.latest_active_code(pond_id).await.unwrap(), None);

    start_budidaya(&fx, &budidaya_input(pond_id, pools[0], species, 10))
        .await
        .unwrap();
    assert_eq!(
        query.latest_active_code(pond_id).await.unwrap().as_deref(),
        Some("MJ-0001")
    );
}
