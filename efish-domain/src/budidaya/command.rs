//! Budidaya writes

use chrono::{DateTime, Utc};
use shared::Identity;
use shared::models::{
    Audit, Budidaya, BudidayaStatus, CreateBudidayaInput, CreateFishSpeciesInput,
    CreateMultiplePricelistInput, FishSpecies, PondStatus, Pricelist, UpdateBudidayaSoldQtyInput,
    UpdateBudidayaStatusInput, UpdateBudidayaWithPricelistInput, UpdatePricelistInput,
};
use shared::util::{new_id, now};
use uuid::Uuid;

use super::code;
use super::query::BudidayaQuery;
use crate::error::{Conflict, DomainError, DomainResult, Resource, StoreResultExt};
use crate::reader::Reader;
use crate::store::{ACTIVE_POOL_INDEX, BUDIDAYA_CODE_INDEX, ReadOptions, StoreError, StoreTx};
use crate::uow::{UnitOfWork, with_deadline};

/// Generated codes already in use are skipped this many times before the
/// insert is left to the unique index
const MAX_CODE_ATTEMPTS: usize = 100;

/// Inserts with a generated code that lose a race for it move on to the
/// next code this many times
const MAX_CODE_RETRIES: usize = 10;

const CODE_SAVEPOINT: &str = "budidaya_code";

/// Budidaya commands, all on one transaction
pub struct BudidayaCommand {
    uow: UnitOfWork,
    identity: Identity,
}

impl BudidayaCommand {
    pub(crate) fn new(uow: UnitOfWork, identity: Identity) -> Self {
        Self { uow, identity }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Start a cultivation cycle in a pool of an active pond
    pub async fn create_budidaya(&mut self, input: &CreateBudidayaInput) -> DomainResult<Uuid> {
        let deadline = self.uow.deadline();
        let tx = self.uow.tx()?;
        let result = with_deadline(
            deadline,
            "create_budidaya",
            create_budidaya(tx, &self.identity, input),
        )
        .await;
        self.finish("create_budidaya", result).await
    }

    pub async fn create_fish_species(
        &mut self,
        input: &CreateFishSpeciesInput,
    ) -> DomainResult<Uuid> {
        let deadline = self.uow.deadline();
        let tx = self.uow.tx()?;
        let result = with_deadline(
            deadline,
            "create_fish_species",
            create_fish_species(tx, &self.identity, input),
        )
        .await;
        self.finish("create_fish_species", result).await
    }

    /// Insert the harvest pricelist and move the cycle to PANEN, atomically.
    /// Returns the pricelist ids in input order.
    pub async fn create_multiple_pricelist(
        &mut self,
        input: &CreateMultiplePricelistInput,
    ) -> DomainResult<Vec<Uuid>> {
        let deadline = self.uow.deadline();
        let tx = self.uow.tx()?;
        let result = with_deadline(
            deadline,
            "create_multiple_pricelist",
            create_multiple_pricelist(tx, &self.identity, input),
        )
        .await;
        self.finish("create_multiple_pricelist", result).await
    }

    pub async fn update_status(
        &mut self,
        input: &UpdateBudidayaStatusInput,
    ) -> DomainResult<Uuid> {
        let deadline = self.uow.deadline();
        let tx = self.uow.tx()?;
        let result = with_deadline(
            deadline,
            "update_budidaya_status",
            update_status(tx, &self.identity, input),
        )
        .await;
        self.finish("update_budidaya_status", result).await
    }

    /// Status update plus pricelist upsert
    pub async fn update_status_with_pricelist(
        &mut self,
        input: &UpdateBudidayaWithPricelistInput,
    ) -> DomainResult<Uuid> {
        let deadline = self.uow.deadline();
        let tx = self.uow.tx()?;
        let result = with_deadline(
            deadline,
            "update_budidaya_with_pricelist",
            update_status_with_pricelist(tx, &self.identity, input),
        )
        .await;
        self.finish("update_budidaya_with_pricelist", result).await
    }

    /// Reserve or release sold quantity under a row lock held until the
    /// command commits or rolls back
    pub async fn update_sold_qty(
        &mut self,
        input: &UpdateBudidayaSoldQtyInput,
    ) -> DomainResult<Uuid> {
        let deadline = self.uow.deadline();
        let tx = self.uow.tx()?;
        let result = with_deadline(
            deadline,
            "update_sold_qty",
            update_sold_qty(tx, &self.identity, input),
        )
        .await;
        self.finish("update_sold_qty", result).await
    }

    /// Query bound to this command's transaction
    pub fn query(&mut self) -> DomainResult<BudidayaQuery<'_>> {
        Ok(BudidayaQuery::new(Reader::bound(self.uow.tx()?)))
    }

    pub async fn commit(&mut self) -> DomainResult<()> {
        self.uow.commit().await
    }

    pub async fn rollback(&mut self) -> DomainResult<()> {
        self.uow.rollback().await
    }

    async fn finish<T>(&mut self, op: &'static str, result: DomainResult<T>) -> DomainResult<T> {
        let result = self.uow.settle(result).await;
        if let Err(err) = &result {
            err.trace(op);
        }
        result
    }
}

/// Map unique-index violations of a budidaya write onto conflicts
fn budidaya_write_error(
    op: &'static str,
    budidaya: &Budidaya,
    source: StoreError,
) -> DomainError {
    if source.is_unique_violation(ACTIVE_POOL_INDEX) {
        Conflict::ActiveCycleExists {
            pool_id: budidaya.pool_id,
        }
        .into()
    } else if source.is_unique_violation(BUDIDAYA_CODE_INDEX) {
        Conflict::DuplicateCode {
            code: budidaya.code.clone(),
        }
        .into()
    } else {
        DomainError::Persistence { op, source }
    }
}

async fn find_budidaya_locked(tx: &mut dyn StoreTx, id: Uuid) -> DomainResult<Budidaya> {
    tx.find_budidaya(id, ReadOptions::LOCKED)
        .await
        .op("find_budidaya")?
        .ok_or(DomainError::not_found(Resource::Budidaya, id))
}

async fn save_budidaya(tx: &mut dyn StoreTx, budidaya: &Budidaya) -> DomainResult<()> {
    tx.update_budidaya(budidaya)
        .await
        .map_err(|source| budidaya_write_error("update_budidaya", budidaya, source))
}

async fn generate_code(
    tx: &mut dyn StoreTx,
    pond_id: Uuid,
    pond_name: &str,
) -> DomainResult<String> {
    let latest = tx
        .find_latest_active_code(pond_id)
        .await
        .op("find_latest_active_code")?;
    let mut code = code::next_code(pond_name, latest.as_deref());
    for _ in 0..MAX_CODE_ATTEMPTS {
        if !tx.code_taken(&code).await.op("code_taken")? {
            break;
        }
        code = code::successor(&code);
    }
    Ok(code)
}

/// A concurrent transaction can take the generated code between the lookup
/// and the insert. The insert runs under a savepoint so the transaction
/// survives the unique violation, then retries with the next code.
async fn insert_with_generated_code(
    tx: &mut dyn StoreTx,
    budidaya: &mut Budidaya,
) -> DomainResult<()> {
    for _ in 0..MAX_CODE_RETRIES {
        tx.savepoint(CODE_SAVEPOINT).await.op("savepoint")?;
        match tx.insert_budidaya(budidaya).await {
            Ok(()) => return Ok(()),
            Err(source) if source.is_unique_violation(BUDIDAYA_CODE_INDEX) => {
                tx.rollback_to_savepoint(CODE_SAVEPOINT)
                    .await
                    .op("rollback_to_savepoint")?;
                tracing::debug!(code = %budidaya.code, "Generated code taken, trying the next");
                budidaya.code = code::successor(&budidaya.code);
            }
            Err(source) => return Err(budidaya_write_error("insert_budidaya", budidaya, source)),
        }
    }
    tx.insert_budidaya(budidaya)
        .await
        .map_err(|source| budidaya_write_error("insert_budidaya", budidaya, source))
}

async fn create_budidaya(
    tx: &mut dyn StoreTx,
    identity: &Identity,
    input: &CreateBudidayaInput,
) -> DomainResult<Uuid> {
    let pond = tx
        .find_pond(input.pond_id, ReadOptions::ACTIVE)
        .await
        .op("find_pond")?
        .ok_or(DomainError::not_found(Resource::Pond, input.pond_id))?;
    if pond.status != PondStatus::Actived {
        return Err(DomainError::PondNotActive {
            pond_id: pond.id,
            status: pond.status,
        });
    }

    input.validate()?;

    tx.find_pool(input.pool_id, ReadOptions::ACTIVE)
        .await
        .op("find_pool")?
        .filter(|pool| pool.pond_id == pond.id)
        .ok_or(DomainError::not_found(Resource::Pool, input.pool_id))?;
    tx.find_fish_species(input.fish_species_id, ReadOptions::ACTIVE)
        .await
        .op("find_fish_species")?
        .ok_or(DomainError::not_found(
            Resource::FishSpecies,
            input.fish_species_id,
        ))?;

    if let Some(existing) = tx
        .find_active_budidaya_by_pool(input.pool_id, ReadOptions::ACTIVE)
        .await
        .op("find_active_budidaya_by_pool")?
    {
        return Err(Conflict::ActiveCycleExists {
            pool_id: existing.pool_id,
        }
        .into());
    }

    let generated = input.code.trim().is_empty();
    let code = match input.code.trim() {
        "" => generate_code(tx, pond.id, &pond.name).await?,
        given => given.to_string(),
    };

    let mut budidaya = Budidaya {
        id: new_id(),
        pond_id: pond.id,
        pool_id: input.pool_id,
        fish_species_id: input.fish_species_id,
        code,
        // validated above
        date_of_seed: input.date_of_seed.unwrap_or_default(),
        estimated_panen_date: None,
        estimated_tonase: None,
        status: input.status.unwrap_or_default(),
        stock: input.stock,
        sold: 0,
        audit: Audit::created(identity, now()),
    };
    if generated {
        insert_with_generated_code(tx, &mut budidaya).await?;
    } else {
        tx.insert_budidaya(&budidaya)
            .await
            .map_err(|source| budidaya_write_error("insert_budidaya", &budidaya, source))?;
    }

    tracing::info!(
        budidaya_id = %budidaya.id,
        pool_id = %budidaya.pool_id,
        code = %budidaya.code,
        "Budidaya started"
    );
    Ok(budidaya.id)
}

async fn create_fish_species(
    tx: &mut dyn StoreTx,
    identity: &Identity,
    input: &CreateFishSpeciesInput,
) -> DomainResult<Uuid> {
    input.validate()?;

    let species = FishSpecies {
        id: new_id(),
        name: input.name.trim().to_string(),
        audit: Audit::created(identity, now()),
    };
    tx.insert_fish_species(&species)
        .await
        .op("insert_fish_species")?;

    tracing::info!(fish_species_id = %species.id, name = %species.name, "Fish species created");
    Ok(species.id)
}

async fn create_multiple_pricelist(
    tx: &mut dyn StoreTx,
    identity: &Identity,
    input: &CreateMultiplePricelistInput,
) -> DomainResult<Vec<Uuid>> {
    input.validate()?;

    let mut budidaya = find_budidaya_locked(tx, input.budidaya_id).await?;
    let estimate_date = input.estimate_date.unwrap_or(budidaya.date_of_seed);
    if estimate_date < budidaya.date_of_seed {
        return Err(Conflict::HarvestBeforeSeeding {
            date_of_seed: budidaya.date_of_seed,
            estimate_date,
        }
        .into());
    }

    let at = now();
    let mut ids = Vec::with_capacity(input.pricelists.len());
    for item in &input.pricelists {
        let pricelist = Pricelist {
            id: new_id(),
            budidaya_id: budidaya.id,
            limit: item.limit.trim().to_string(),
            price: item.price,
            audit: Audit::created(identity, at),
        };
        tx.save_pricelist(&pricelist).await.op("insert_pricelist")?;
        ids.push(pricelist.id);
    }

    budidaya.status = BudidayaStatus::Panen;
    budidaya.estimated_panen_date = Some(estimate_date);
    if input.estimated_tonase.is_some() {
        budidaya.estimated_tonase = input.estimated_tonase;
    }
    budidaya.audit.touch(identity, at);
    save_budidaya(tx, &budidaya).await?;

    tracing::info!(
        budidaya_id = %budidaya.id,
        pricelists = ids.len(),
        %estimate_date,
        "Budidaya harvested"
    );
    Ok(ids)
}

/// Apply a status / estimate / stock update to a loaded cycle
fn apply_status_update(
    budidaya: &mut Budidaya,
    input: &UpdateBudidayaStatusInput,
    identity: &Identity,
    at: DateTime<Utc>,
) -> DomainResult<()> {
    if let Some(status) = input.status {
        if budidaya.status == BudidayaStatus::Panen && status != BudidayaStatus::Panen {
            return Err(Conflict::TerminalStatus {
                budidaya_id: budidaya.id,
            }
            .into());
        }
        budidaya.status = status;
    }

    if let Some(estimate_date) = input.estimate_date {
        if estimate_date < budidaya.date_of_seed {
            return Err(Conflict::HarvestBeforeSeeding {
                date_of_seed: budidaya.date_of_seed,
                estimate_date,
            }
            .into());
        }
        budidaya.estimated_panen_date = Some(estimate_date);
    }

    if input.estimated_tonase.is_some() {
        budidaya.estimated_tonase = input.estimated_tonase;
    }

    if let Some(stock) = input.stock {
        if stock < budidaya.sold {
            return Err(Conflict::StockBelowSold {
                budidaya_id: budidaya.id,
                stock,
                sold: budidaya.sold,
            }
            .into());
        }
        budidaya.stock = stock;
    }

    budidaya.audit.touch(identity, at);
    Ok(())
}

async fn update_status(
    tx: &mut dyn StoreTx,
    identity: &Identity,
    input: &UpdateBudidayaStatusInput,
) -> DomainResult<Uuid> {
    input.validate()?;

    let mut budidaya = find_budidaya_locked(tx, input.id).await?;
    apply_status_update(&mut budidaya, input, identity, now())?;
    save_budidaya(tx, &budidaya).await?;

    tracing::info!(budidaya_id = %budidaya.id, status = %budidaya.status, "Budidaya updated");
    Ok(budidaya.id)
}

async fn update_status_with_pricelist(
    tx: &mut dyn StoreTx,
    identity: &Identity,
    input: &UpdateBudidayaWithPricelistInput,
) -> DomainResult<Uuid> {
    input.validate()?;

    let at = now();
    let mut budidaya = find_budidaya_locked(tx, input.budidaya.id).await?;
    apply_status_update(&mut budidaya, &input.budidaya, identity, at)?;
    save_budidaya(tx, &budidaya).await?;

    for item in &input.pricelists {
        upsert_pricelist(tx, identity, budidaya.id, item, at).await?;
    }

    tracing::info!(
        budidaya_id = %budidaya.id,
        status = %budidaya.status,
        pricelists = input.pricelists.len(),
        "Budidaya updated with pricelist"
    );
    Ok(budidaya.id)
}

async fn upsert_pricelist(
    tx: &mut dyn StoreTx,
    identity: &Identity,
    budidaya_id: Uuid,
    item: &UpdatePricelistInput,
    at: DateTime<Utc>,
) -> DomainResult<()> {
    let pricelist = if item.id.is_nil() {
        Pricelist {
            id: new_id(),
            budidaya_id,
            limit: item.limit.trim().to_string(),
            price: item.price,
            audit: Audit::created(identity, at),
        }
    } else {
        let mut existing = tx
            .find_pricelist(item.id, ReadOptions::LOCKED)
            .await
            .op("find_pricelist")?
            .filter(|p| p.budidaya_id == budidaya_id)
            .ok_or(DomainError::not_found(Resource::Pricelist, item.id))?;
        existing.limit = item.limit.trim().to_string();
        existing.price = item.price;
        existing.audit.touch(identity, at);
        existing
    };
    tx.save_pricelist(&pricelist).await.op("save_pricelist")
}

async fn update_sold_qty(
    tx: &mut dyn StoreTx,
    identity: &Identity,
    input: &UpdateBudidayaSoldQtyInput,
) -> DomainResult<Uuid> {
    input.validate()?;
    let budidaya = apply_sold_qty(tx, identity, input.id, input.qty, input.is_cancel).await?;
    Ok(budidaya.id)
}

/// Lock the cycle and move `qty` into (or, when cancelling, out of) `sold`.
///
/// Shared with the order commands so an order and its reservation commit
/// together.
pub(crate) async fn apply_sold_qty(
    tx: &mut dyn StoreTx,
    identity: &Identity,
    budidaya_id: Uuid,
    qty: i64,
    is_cancel: bool,
) -> DomainResult<Budidaya> {
    let mut budidaya = find_budidaya_locked(tx, budidaya_id).await?;

    if is_cancel {
        if qty > budidaya.sold {
            return Err(Conflict::SoldUnderflow {
                budidaya_id,
                requested: qty,
                sold: budidaya.sold,
            }
            .into());
        }
        budidaya.sold -= qty;
    } else {
        let remaining = budidaya.remaining();
        if qty > remaining {
            return Err(Conflict::Oversell {
                budidaya_id,
                requested: qty,
                remaining,
            }
            .into());
        }
        budidaya.sold += qty;
    }

    budidaya.audit.touch(identity, now());
    save_budidaya(tx, &budidaya).await?;

    tracing::info!(
        %budidaya_id,
        qty,
        is_cancel,
        sold = budidaya.sold,
        stock = budidaya.stock,
        "Sold quantity updated"
    );
    Ok(budidaya)
}
