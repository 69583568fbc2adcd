//! Pond writes

use chrono::{DateTime, Utc};
use shared::Identity;
use shared::models::{
    Audit, Berkas, CreatePondInput, Pond, PondProfile, PondStatus, Pool, ResubmitPondInput,
    UpdateBerkasInput, UpdatePondInput, UpdatePondStatusInput, UpdatePoolInput,
};
use shared::util::{new_id, now};
use uuid::Uuid;

use super::query::PondQuery;
use crate::error::{DomainError, DomainResult, Resource, StoreResultExt};
use crate::reader::Reader;
use crate::store::{ReadOptions, StoreTx};
use crate::uow::{UnitOfWork, with_deadline};

const LOCKED_ANY: ReadOptions = ReadOptions {
    include_deleted: true,
    lock: true,
};

/// Pond commands, all on one transaction
pub struct PondCommand {
    uow: UnitOfWork,
    identity: Identity,
}

impl PondCommand {
    pub(crate) fn new(uow: UnitOfWork, identity: Identity) -> Self {
        Self { uow, identity }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Validate and insert a pond with its pools and berkas. Status starts
    /// at SUBMISION.
    pub async fn create_pond(&mut self, input: &CreatePondInput) -> DomainResult<Uuid> {
        let deadline = self.uow.deadline();
        let tx = self.uow.tx()?;
        let result = with_deadline(
            deadline,
            "create_pond",
            create_pond(tx, &self.identity, input),
        )
        .await;
        self.finish("create_pond", result).await
    }

    /// Writes only the profile fields the input carries; status is untouched
    pub async fn update_pond(
        &mut self,
        pond_id: Uuid,
        input: &UpdatePondInput,
    ) -> DomainResult<Uuid> {
        let deadline = self.uow.deadline();
        let tx = self.uow.tx()?;
        let result = with_deadline(
            deadline,
            "update_pond",
            update_pond(tx, &self.identity, pond_id, input),
        )
        .await;
        self.finish("update_pond", result).await
    }

    pub async fn update_pond_status(
        &mut self,
        input: &UpdatePondStatusInput,
    ) -> DomainResult<Uuid> {
        let deadline = self.uow.deadline();
        let tx = self.uow.tx()?;
        let result = with_deadline(
            deadline,
            "update_pond_status",
            update_pond_status(tx, &self.identity, input),
        )
        .await;
        self.finish("update_pond_status", result).await
    }

    /// Replace the profile, merge the pool and berkas lists and send the
    /// pond back to review
    pub async fn resubmit_pond(
        &mut self,
        pond_id: Uuid,
        input: &ResubmitPondInput,
    ) -> DomainResult<Uuid> {
        let deadline = self.uow.deadline();
        let tx = self.uow.tx()?;
        let result = with_deadline(
            deadline,
            "resubmit_pond",
            resubmit_pond(tx, &self.identity, pond_id, input),
        )
        .await;
        self.finish("resubmit_pond", result).await
    }

    /// Query bound to this command's transaction
    pub fn query(&mut self) -> DomainResult<PondQuery<'_>> {
        Ok(PondQuery::new(Reader::bound(self.uow.tx()?)))
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

fn new_pond(identity: &Identity, profile: &PondProfile, at: DateTime<Utc>) -> Pond {
    let mut pond = Pond {
        id: new_id(),
        user_id: identity.user_id(),
        name: String::new(),
        country_id: Uuid::nil(),
        province_id: Uuid::nil(),
        city_id: Uuid::nil(),
        district_id: Uuid::nil(),
        detail_address: String::new(),
        note_address: String::new(),
        pond_type: Default::default(),
        latitude: 0.0,
        longitude: 0.0,
        image: String::new(),
        status: PondStatus::Submision,
        reasons: None,
        audit: Audit::created(identity, at),
        pools: Vec::new(),
        berkas: Vec::new(),
    };
    pond.apply_profile(profile);
    pond
}

async fn find_pond_locked(tx: &mut dyn StoreTx, pond_id: Uuid) -> DomainResult<Pond> {
    tx.find_pond(pond_id, ReadOptions::LOCKED)
        .await
        .op("find_pond")?
        .ok_or(DomainError::not_found(Resource::Pond, pond_id))
}

async fn create_pond(
    tx: &mut dyn StoreTx,
    identity: &Identity,
    input: &CreatePondInput,
) -> DomainResult<Uuid> {
    input.validate()?;

    let at = now();
    let pond = new_pond(identity, &input.profile, at);
    tx.insert_pond(&pond).await.op("insert_pond")?;

    for item in &input.pools {
        let pool = Pool {
            id: new_id(),
            pond_id: pond.id,
            name: item.name.clone(),
            long: item.long,
            wide: item.wide,
            image: item.image.clone(),
            audit: Audit::created(identity, at),
        };
        tx.save_pool(&pool).await.op("insert_pool")?;
    }

    for item in &input.berkas {
        let berkas = Berkas {
            id: new_id(),
            pond_id: pond.id,
            name: item.name.clone(),
            file: item.file.clone(),
            audit: Audit::created(identity, at),
        };
        tx.save_berkas(&berkas).await.op("insert_berkas")?;
    }

    tracing::info!(
        pond_id = %pond.id,
        pools = input.pools.len(),
        berkas = input.berkas.len(),
        "Pond submitted"
    );
    Ok(pond.id)
}

async fn update_pond(
    tx: &mut dyn StoreTx,
    identity: &Identity,
    pond_id: Uuid,
    input: &UpdatePondInput,
) -> DomainResult<Uuid> {
    input.validate()?;

    let mut pond = find_pond_locked(tx, pond_id).await?;
    pond.apply_update(input);
    pond.audit.touch(identity, now());
    tx.update_pond(&pond).await.op("update_pond")?;

    tracing::info!(pond_id = %pond.id, "Pond updated");
    Ok(pond.id)
}

async fn update_pond_status(
    tx: &mut dyn StoreTx,
    identity: &Identity,
    input: &UpdatePondStatusInput,
) -> DomainResult<Uuid> {
    input.validate()?;

    let mut pond = find_pond_locked(tx, input.pond_id).await?;
    pond.status = input.status.unwrap_or(pond.status);
    pond.reasons = input
        .reasons
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);
    pond.audit.touch(identity, now());
    tx.update_pond(&pond).await.op("update_pond_status")?;

    tracing::info!(pond_id = %pond.id, status = %pond.status, "Pond status changed");
    Ok(pond.id)
}

async fn resubmit_pond(
    tx: &mut dyn StoreTx,
    identity: &Identity,
    pond_id: Uuid,
    input: &ResubmitPondInput,
) -> DomainResult<Uuid> {
    input.validate()?;

    let at = now();
    let mut pond = find_pond_locked(tx, pond_id).await?;
    pond.apply_profile(&input.profile);
    pond.status = PondStatus::Submision;
    pond.reasons = None;
    pond.audit.touch(identity, at);
    tx.update_pond(&pond).await.op("update_pond")?;

    for item in &input.pools {
        merge_pool(tx, identity, pond_id, item, at).await?;
    }
    for item in &input.berkas {
        merge_berkas(tx, identity, pond_id, item, at).await?;
    }

    tracing::info!(pond_id = %pond.id, "Pond resubmitted");
    Ok(pond.id)
}

/// Nil id inserts, `is_deleted` soft-deletes, anything else updates in place
/// and revives a previously deleted row
async fn merge_pool(
    tx: &mut dyn StoreTx,
    identity: &Identity,
    pond_id: Uuid,
    item: &UpdatePoolInput,
    at: DateTime<Utc>,
) -> DomainResult<()> {
    if item.id.is_nil() {
        if item.is_deleted {
            return Ok(());
        }
        let pool = Pool {
            id: new_id(),
            pond_id,
            name: item.name.clone(),
            long: item.long,
            wide: item.wide,
            image: item.image.clone(),
            audit: Audit::created(identity, at),
        };
        return tx.save_pool(&pool).await.op("insert_pool");
    }

    let mut pool = tx
        .find_pool(item.id, LOCKED_ANY)
        .await
        .op("find_pool")?
        .filter(|p| p.pond_id == pond_id)
        .ok_or(DomainError::not_found(Resource::Pool, item.id))?;
    pool.name = item.name.clone();
    pool.long = item.long;
    pool.wide = item.wide;
    pool.image = item.image.clone();
    if item.is_deleted {
        pool.audit.soft_delete(identity, at);
    } else {
        pool.audit.restore(identity, at);
    }
    tx.save_pool(&pool).await.op("update_pool")
}

async fn merge_berkas(
    tx: &mut dyn StoreTx,
    identity: &Identity,
    pond_id: Uuid,
    item: &UpdateBerkasInput,
    at: DateTime<Utc>,
) -> DomainResult<()> {
    if item.id.is_nil() {
        if item.is_deleted {
            return Ok(());
        }
        let berkas = Berkas {
            id: new_id(),
            pond_id,
            name: item.name.clone(),
            file: item.file.clone(),
            audit: Audit::created(identity, at),
        };
        return tx.save_berkas(&berkas).await.op("insert_berkas");
    }

    let mut berkas = tx
        .find_berkas(item.id, LOCKED_ANY)
        .await
        .op("find_berkas")?
        .filter(|b| b.pond_id == pond_id)
        .ok_or(DomainError::not_found(Resource::Berkas, item.id))?;
    berkas.name = item.name.clone();
    berkas.file = item.file.clone();
    if item.is_deleted {
        berkas.audit.soft_delete(identity, at);
    } else {
        berkas.audit.restore(identity, at);
    }
    tx.save_berkas(&berkas).await.op("update_berkas")
}
