//! Fixtures shared by the integration tests

#![allow(dead_code)]

use chrono::NaiveDate;
use efish_domain::store::MemoryStore;
use efish_domain::{Domain, DomainResult};
use rust_decimal::Decimal;
use shared::Identity;
use shared::models::{
    CreateBerkasInput, CreateBudidayaInput, CreateFishSpeciesInput, CreateMultiplePricelistInput,
    CreatePondInput, CreatePoolInput, CreatePricelistInput, PondProfile, PondStatus,
    UpdateBudidayaSoldQtyInput, UpdatePondStatusInput,
};
use uuid::Uuid;

pub struct Fixture {
    pub store: MemoryStore,
    pub domain: Domain,
    pub identity: Identity,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    pub fn with_timeout(timeout: Option<std::time::Duration>) -> Self {
        let store = MemoryStore::new();
        Self {
            domain: Domain::in_memory(store.clone(), timeout),
            store,
            identity: Identity::user(Uuid::new_v4()),
        }
    }
}

pub fn seed_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

pub fn profile(name: &str) -> PondProfile {
    PondProfile {
        name: name.into(),
        country_id: Uuid::new_v4(),
        province_id: Uuid::new_v4(),
        city_id: Uuid::new_v4(),
        district_id: Uuid::new_v4(),
        detail_address: "Jl. Tambak 12".into(),
        note_address: String::new(),
        pond_type: "individu".into(),
        latitude: -6.2,
        longitude: 106.8,
        image: "https://img.example/pond.png".into(),
    }
}

pub fn pool_input(name: &str) -> CreatePoolInput {
    CreatePoolInput {
        name: name.into(),
        long: 10.0,
        wide: 5.0,
        image: "https://img.example/pool.png".into(),
    }
}

pub fn pond_input(name: &str, pools: usize) -> CreatePondInput {
    CreatePondInput {
        profile: profile(name),
        pools: (1..=pools).map(|i| pool_input(&format!("Kolam {i}"))).collect(),
        berkas: vec![CreateBerkasInput {
            name: "SIUP".into(),
            file: "https://files.example/siup.pdf".into(),
        }],
    }
}

/// Submitted pond, not yet reviewed
pub async fn submit_pond(fx: &Fixture, name: &str, pools: usize) -> DomainResult<Uuid> {
    let mut cmd = fx.domain.pond().new_command(fx.identity.clone()).await?;
    let id = cmd.create_pond(&pond_input(name, pools)).await?;
    cmd.commit().await?;
    Ok(id)
}

/// Approved pond and the ids of its pools
pub async fn active_pond(fx: &Fixture, name: &str, pools: usize) -> DomainResult<(Uuid, Vec<Uuid>)> {
    let pond_id = submit_pond(fx, name, pools).await?;

    let mut cmd = fx.domain.pond().new_command(fx.identity.clone()).await?;
    cmd.update_pond_status(&UpdatePondStatusInput {
        pond_id,
        status: Some(PondStatus::Actived),
        reasons: None,
    })
    .await?;
    cmd.commit().await?;

    let pond = fx.domain.pond().new_query().find_by_id(pond_id).await?;
    Ok((pond_id, pond.pools.iter().map(|p| p.id).collect()))
}

pub async fn fish_species(fx: &Fixture, name: &str) -> DomainResult<Uuid> {
    let mut cmd = fx.domain.budidaya().new_command(fx.identity.clone()).await?;
    let id = cmd
        .create_fish_species(&CreateFishSpeciesInput { name: name.into() })
        .await?;
    cmd.commit().await?;
    Ok(id)
}

pub fn budidaya_input(pond_id: Uuid, pool_id: Uuid, species_id: Uuid, stock: i64) -> CreateBudidayaInput {
    CreateBudidayaInput {
        pond_id,
        pool_id,
        fish_species_id: species_id,
        code: String::new(),
        date_of_seed: Some(seed_date()),
        status: None,
        stock,
    }
}

pub async fn start_budidaya(fx: &Fixture, input: &CreateBudidayaInput) -> DomainResult<Uuid> {
    let mut cmd = fx.domain.budidaya().new_command(fx.identity.clone()).await?;
    let id = cmd.create_budidaya(input).await?;
    cmd.commit().await?;
    Ok(id)
}

/// Active pond with one pool running a cycle of `stock` of which `sold`
/// is already reserved
pub async fn stocked_budidaya(fx: &Fixture, stock: i64, sold: i64) -> DomainResult<Uuid> {
    let (pond_id, pools) = active_pond(fx, "Kolam Harapan", 1).await?;
    let species = fish_species(fx, "Lele").await?;
    let id = start_budidaya(fx, &budidaya_input(pond_id, pools[0], species, stock)).await?;
    if sold > 0 {
        sell(fx, id, sold, false).await?;
    }
    Ok(id)
}

pub async fn sell(fx: &Fixture, budidaya_id: Uuid, qty: i64, is_cancel: bool) -> DomainResult<()> {
    let mut cmd = fx.domain.budidaya().new_command(fx.identity.clone()).await?;
    cmd.update_sold_qty(&UpdateBudidayaSoldQtyInput {
        id: budidaya_id,
        qty,
        is_cancel,
    })
    .await?;
    cmd.commit().await
}

pub fn pricelist_input(budidaya_id: Uuid, estimate_date: NaiveDate) -> CreateMultiplePricelistInput {
    CreateMultiplePricelistInput {
        budidaya_id,
        estimate_date: Some(estimate_date),
        estimated_tonase: Some(1.5),
        pricelists: vec![
            CreatePricelistInput {
                limit: "5-7 ekor/kg".into(),
                price: Decimal::new(35_000, 0),
            },
            CreatePricelistInput {
                limit: "8-10 ekor/kg".into(),
                price: Decimal::new(30_000, 0),
            },
        ],
    }
}
