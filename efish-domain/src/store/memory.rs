//! In-process store
//!
//! Committed rows live in one `RwLock<Tables>`. Each transaction buffers its
//! writes in a private overlay that is merged on commit and discarded on
//! rollback or drop. Row locks are per-id tokio mutexes held until the
//! transaction ends, so a locked read waits exactly like `FOR UPDATE`. A
//! mutex leaves the lock table once no transaction holds or awaits it.
//!
//! The two budidaya unique indexes are enforced against committed rows,
//! the transaction's own overlay and keys claimed by other open
//! transactions. A conflicting insert fails immediately instead of waiting
//! for the other transaction to finish.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use shared::models::{
    Audit, Berkas, Budidaya, FishSpecies, Order, OrderStatus, Pond, PondFilter, Pool, Pricelist,
};
use shared::request::PaginationQuery;
use tokio::sync::{Mutex as RowMutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    ACTIVE_POOL_INDEX, BUDIDAYA_CODE_INDEX, ReadOptions, Store, StoreError, StoreResult, StoreTx,
};

/// Store calls that can be made to fail once, for exercising rollback paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    SavePool,
    UpdateBudidaya,
    InsertPricelist,
    InsertOrder,
    Commit,
    Rollback,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    ponds: HashMap<Uuid, Pond>,
    pools: HashMap<Uuid, Pool>,
    berkas: HashMap<Uuid, Berkas>,
    budidaya: HashMap<Uuid, Budidaya>,
    pricelists: HashMap<Uuid, Pricelist>,
    fish_species: HashMap<Uuid, FishSpecies>,
    orders: HashMap<Uuid, Order>,
}

impl Tables {
    fn merge(&mut self, other: Tables) {
        self.ponds.extend(other.ponds);
        self.pools.extend(other.pools);
        self.berkas.extend(other.berkas);
        self.budidaya.extend(other.budidaya);
        self.pricelists.extend(other.pricelists);
        self.fish_species.extend(other.fish_species);
        self.orders.extend(other.orders);
    }
}

trait Row: Clone + Send + Sync + 'static {
    const PKEY: &'static str;
    fn id(&self) -> Uuid;
    fn audit(&self) -> &Audit;
    fn table(tables: &Tables) -> &HashMap<Uuid, Self>;
    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self>;
}

macro_rules! impl_row {
    ($($ty:ty => $field:ident, $pkey:literal;)*) => {
        $(
            impl Row for $ty {
                const PKEY: &'static str = $pkey;

                fn id(&self) -> Uuid {
                    self.id
                }

                fn audit(&self) -> &Audit {
                    &self.audit
                }

                fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
                    &tables.$field
                }

                fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
                    &mut tables.$field
                }
            }
        )*
    };
}

impl_row! {
    Pond => ponds, "ponds_pkey";
    Pool => pools, "pools_pkey";
    Berkas => berkas, "berkas_pkey";
    Budidaya => budidaya, "budidaya_pkey";
    Pricelist => pricelists, "pricelists_pkey";
    FishSpecies => fish_species, "fish_species_pkey";
    Order => orders, "orders_pkey";
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum UniqueKey {
    ActivePool(Uuid),
    Code(String),
}

impl UniqueKey {
    fn index(&self) -> &'static str {
        match self {
            Self::ActivePool(_) => ACTIVE_POOL_INDEX,
            Self::Code(_) => BUDIDAYA_CODE_INDEX,
        }
    }

    /// Keys a row occupies in the partial unique indexes
    fn of(budidaya: &Budidaya) -> Vec<UniqueKey> {
        if budidaya.audit.is_deleted() {
            return Vec::new();
        }
        let mut keys = Vec::with_capacity(2);
        if budidaya.status.is_active() {
            keys.push(Self::ActivePool(budidaya.pool_id));
        }
        keys.push(Self::Code(budidaya.code.clone()));
        keys
    }
}

#[derive(Default)]
struct Inner {
    committed: RwLock<Tables>,
    row_locks: DashMap<Uuid, Arc<RowMutex<()>>>,
    /// Unique keys written by open transactions, with the owning tx id
    claims: Mutex<HashMap<UniqueKey, u64>>,
    fail_points: Mutex<HashSet<FailPoint>>,
    next_tx: AtomicU64,
}

impl Inner {
    fn check_fail(&self, point: FailPoint) -> StoreResult<()> {
        if self.fail_points.lock().remove(&point) {
            return Err(StoreError::Database(format!(
                "injected failure at {point:?}"
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call at `point` fail with a database error
    pub fn fail_next(&self, point: FailPoint) {
        self.inner.fail_points.lock().insert(point);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let id = self.inner.next_tx.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MemoryTx {
            id,
            inner: self.inner.clone(),
            overlay: Tables::default(),
            locks: HashMap::new(),
            savepoints: HashMap::new(),
        }))
    }
}

/// Overlay and own claims as they were at `SAVEPOINT`
struct Savepoint {
    overlay: Tables,
    claims: HashSet<UniqueKey>,
}

pub struct MemoryTx {
    id: u64,
    inner: Arc<Inner>,
    overlay: Tables,
    locks: HashMap<Uuid, OwnedMutexGuard<()>>,
    savepoints: HashMap<&'static str, Savepoint>,
}

impl MemoryTx {
    async fn lock(&mut self, id: Uuid) {
        if self.locks.contains_key(&id) {
            return;
        }
        let mutex = self.inner.row_locks.entry(id).or_default().clone();
        let guard = mutex.lock_owned().await;
        self.locks.insert(id, guard);
    }

    fn visible<T: Row>(&self, id: Uuid, include_deleted: bool) -> Option<T> {
        let row = match T::table(&self.overlay).get(&id) {
            Some(row) => Some(row.clone()),
            None => T::table(&self.inner.committed.read()).get(&id).cloned(),
        };
        row.filter(|r| include_deleted || !r.audit().is_deleted())
    }

    /// Committed rows overlaid with this transaction's writes, oldest first
    fn scan<T: Row>(&self, include_deleted: bool, pred: impl Fn(&T) -> bool) -> Vec<T> {
        let committed = self.inner.committed.read();
        let overlay = T::table(&self.overlay);
        let mut rows: Vec<T> = T::table(&committed)
            .values()
            .filter(|r| !overlay.contains_key(&r.id()))
            .chain(overlay.values())
            .filter(|r| include_deleted || !r.audit().is_deleted())
            .filter(|r| pred(r))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.audit().created_at, r.id()));
        rows
    }

    async fn find<T: Row>(&mut self, id: Uuid, opts: ReadOptions) -> Option<T> {
        if opts.lock {
            self.lock(id).await;
        }
        self.visible(id, opts.include_deleted)
    }

    /// Scan, locking every matching row when asked
    async fn select<T: Row>(
        &mut self,
        opts: ReadOptions,
        pred: impl Fn(&T) -> bool + Send + Sync,
    ) -> Vec<T> {
        let rows = self.scan(opts.include_deleted, &pred);
        if !opts.lock {
            return rows;
        }
        for row in &rows {
            self.lock(row.id()).await;
        }
        // re-read: a row may have changed while we waited
        self.scan(opts.include_deleted, &pred)
    }

    async fn insert<T: Row>(&mut self, row: T) -> StoreResult<()> {
        if self.visible::<T>(row.id(), true).is_some() {
            return Err(StoreError::UniqueViolation {
                constraint: T::PKEY.to_string(),
            });
        }
        self.write(row).await;
        Ok(())
    }

    /// UPDATE semantics: a missing row is left alone
    async fn update<T: Row>(&mut self, row: T) {
        if self.visible::<T>(row.id(), true).is_some() {
            self.write(row).await;
        }
    }

    async fn upsert<T: Row>(&mut self, row: T) {
        self.write(row).await;
    }

    async fn write<T: Row>(&mut self, row: T) {
        self.lock(row.id()).await;
        T::table_mut(&mut self.overlay).insert(row.id(), row);
    }

    fn check_budidaya(&self, budidaya: &Budidaya) -> StoreResult<()> {
        if budidaya.sold < 0 || budidaya.sold > budidaya.stock {
            return Err(StoreError::Database(
                "new row violates check constraint \"budidaya_sold_range\"".into(),
            ));
        }

        let keys = UniqueKey::of(budidaya);
        if keys.is_empty() {
            return Ok(());
        }

        let mut claims = self.inner.claims.lock();
        for key in &keys {
            let claimed_elsewhere = claims.get(key).is_some_and(|owner| *owner != self.id);
            let taken = claimed_elsewhere
                || !self
                    .scan::<Budidaya>(false, |other| {
                        other.id != budidaya.id && UniqueKey::of(other).contains(key)
                    })
                    .is_empty();
            if taken {
                return Err(StoreError::UniqueViolation {
                    constraint: key.index().to_string(),
                });
            }
        }
        for key in keys {
            claims.insert(key, self.id);
        }
        Ok(())
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        let id = self.id;
        self.inner.claims.lock().retain(|_, owner| *owner != id);
        for (row_id, guard) in self.locks.drain() {
            drop(guard);
            // a waiter still holds its own clone of the mutex
            self.inner
                .row_locks
                .remove_if(&row_id, |_, mutex| Arc::strong_count(mutex) == 1);
        }
    }
}

fn paginate<T>(mut rows: Vec<T>, page: &PaginationQuery) -> (Vec<T>, u64) {
    let total = rows.len() as u64;
    // newest first, matching the SQL listings
    rows.reverse();
    let rows = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    (rows, total)
}

#[async_trait]
impl StoreTx for MemoryTx {
    // ── Pond ──

    async fn insert_pond(&mut self, pond: &Pond) -> StoreResult<()> {
        let mut row = pond.clone();
        row.pools.clear();
        row.berkas.clear();
        self.insert(row).await
    }

    async fn update_pond(&mut self, pond: &Pond) -> StoreResult<()> {
        let mut row = pond.clone();
        row.pools.clear();
        row.berkas.clear();
        self.update(row).await;
        Ok(())
    }

    async fn find_pond(&mut self, id: Uuid, opts: ReadOptions) -> StoreResult<Option<Pond>> {
        Ok(self.find(id, opts).await)
    }

    async fn find_pond_by_user(
        &mut self,
        user_id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Option<Pond>> {
        let ponds = self
            .select::<Pond>(opts, |p| p.user_id == Some(user_id))
            .await;
        Ok(ponds.into_iter().last())
    }

    async fn list_ponds(
        &mut self,
        filter: &PondFilter,
        page: &PaginationQuery,
    ) -> StoreResult<(Vec<Pond>, u64)> {
        let rows = self.scan::<Pond>(false, |p| {
            filter.status.is_none_or(|s| p.status == s)
                && filter.user_id.is_none_or(|u| p.user_id == Some(u))
        });
        Ok(paginate(rows, page))
    }

    async fn save_pool(&mut self, pool: &Pool) -> StoreResult<()> {
        self.inner.check_fail(FailPoint::SavePool)?;
        self.upsert(pool.clone()).await;
        Ok(())
    }

    async fn find_pool(&mut self, id: Uuid, opts: ReadOptions) -> StoreResult<Option<Pool>> {
        Ok(self.find(id, opts).await)
    }

    async fn list_pools(&mut self, pond_id: Uuid, opts: ReadOptions) -> StoreResult<Vec<Pool>> {
        Ok(self.select::<Pool>(opts, |p| p.pond_id == pond_id).await)
    }

    async fn save_berkas(&mut self, berkas: &Berkas) -> StoreResult<()> {
        self.upsert(berkas.clone()).await;
        Ok(())
    }

    async fn find_berkas(&mut self, id: Uuid, opts: ReadOptions) -> StoreResult<Option<Berkas>> {
        Ok(self.find(id, opts).await)
    }

    async fn list_berkas(
        &mut self,
        pond_id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Vec<Berkas>> {
        Ok(self.select::<Berkas>(opts, |b| b.pond_id == pond_id).await)
    }

    // ── Budidaya ──

    async fn insert_budidaya(&mut self, budidaya: &Budidaya) -> StoreResult<()> {
        self.lock(budidaya.id).await;
        if self.visible::<Budidaya>(budidaya.id, true).is_some() {
            return Err(StoreError::UniqueViolation {
                constraint: Budidaya::PKEY.to_string(),
            });
        }
        self.check_budidaya(budidaya)?;
        self.write(budidaya.clone()).await;
        Ok(())
    }

    async fn update_budidaya(&mut self, budidaya: &Budidaya) -> StoreResult<()> {
        self.inner.check_fail(FailPoint::UpdateBudidaya)?;
        self.lock(budidaya.id).await;
        if self.visible::<Budidaya>(budidaya.id, true).is_none() {
            return Ok(());
        }
        self.check_budidaya(budidaya)?;
        self.write(budidaya.clone()).await;
        Ok(())
    }

    async fn find_budidaya(
        &mut self,
        id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Option<Budidaya>> {
        Ok(self.find(id, opts).await)
    }

    async fn find_active_budidaya_by_pool(
        &mut self,
        pool_id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Option<Budidaya>> {
        let opts = ReadOptions {
            include_deleted: false,
            ..opts
        };
        let rows = self
            .select::<Budidaya>(opts, |b| b.pool_id == pool_id && b.status.is_active())
            .await;
        Ok(rows.into_iter().last())
    }

    async fn find_latest_active_code(&mut self, pond_id: Uuid) -> StoreResult<Option<String>> {
        let latest = self
            .scan::<Budidaya>(false, |b| b.pond_id == pond_id && b.status.is_active())
            .into_iter()
            .max_by(|a, b| {
                (a.audit.created_at, &a.code).cmp(&(b.audit.created_at, &b.code))
            });
        Ok(latest.map(|b| b.code))
    }

    async fn code_taken(&mut self, code: &str) -> StoreResult<bool> {
        Ok(!self.scan::<Budidaya>(false, |b| b.code == code).is_empty())
    }

    async fn list_budidaya(
        &mut self,
        pond_id: Uuid,
        page: &PaginationQuery,
    ) -> StoreResult<(Vec<Budidaya>, u64)> {
        let rows = self.scan::<Budidaya>(false, |b| b.pond_id == pond_id);
        Ok(paginate(rows, page))
    }

    async fn save_pricelist(&mut self, pricelist: &Pricelist) -> StoreResult<()> {
        self.inner.check_fail(FailPoint::InsertPricelist)?;
        self.upsert(pricelist.clone()).await;
        Ok(())
    }

    async fn find_pricelist(
        &mut self,
        id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Option<Pricelist>> {
        Ok(self.find(id, opts).await)
    }

    async fn list_pricelists(
        &mut self,
        budidaya_id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Vec<Pricelist>> {
        Ok(self
            .select::<Pricelist>(opts, |p| p.budidaya_id == budidaya_id)
            .await)
    }

    async fn insert_fish_species(&mut self, species: &FishSpecies) -> StoreResult<()> {
        self.insert(species.clone()).await
    }

    async fn find_fish_species(
        &mut self,
        id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Option<FishSpecies>> {
        Ok(self.find(id, opts).await)
    }

    async fn list_fish_species(&mut self) -> StoreResult<Vec<FishSpecies>> {
        let mut rows = self.scan::<FishSpecies>(false, |_| true);
        rows.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));
        Ok(rows)
    }

    // ── Order ──

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        self.inner.check_fail(FailPoint::InsertOrder)?;
        self.insert(order.clone()).await
    }

    async fn update_order(&mut self, order: &Order) -> StoreResult<()> {
        self.update(order.clone()).await;
        Ok(())
    }

    async fn find_order(&mut self, id: Uuid, opts: ReadOptions) -> StoreResult<Option<Order>> {
        Ok(self.find(id, opts).await)
    }

    async fn list_orders(
        &mut self,
        status: Option<OrderStatus>,
        page: &PaginationQuery,
    ) -> StoreResult<(Vec<Order>, u64)> {
        let rows = self.scan::<Order>(false, |o| status.is_none_or(|s| o.status == s));
        Ok(paginate(rows, page))
    }

    async fn list_active_orders(&mut self) -> StoreResult<Vec<Order>> {
        Ok(self.scan::<Order>(false, |o| o.status == OrderStatus::Pending))
    }

    // ── Transaction control ──

    async fn savepoint(&mut self, name: &'static str) -> StoreResult<()> {
        let claims = self
            .inner
            .claims
            .lock()
            .iter()
            .filter(|(_, owner)| **owner == self.id)
            .map(|(key, _)| key.clone())
            .collect();
        self.savepoints.insert(
            name,
            Savepoint {
                overlay: self.overlay.clone(),
                claims,
            },
        );
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self, name: &'static str) -> StoreResult<()> {
        let Some(savepoint) = self.savepoints.get(name) else {
            return Err(StoreError::Database(format!(
                "savepoint \"{name}\" does not exist"
            )));
        };
        self.overlay = savepoint.overlay.clone();
        let id = self.id;
        self.inner
            .claims
            .lock()
            .retain(|key, owner| *owner != id || savepoint.claims.contains(key));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut tx = *self;
        tx.inner.check_fail(FailPoint::Commit)?;
        let overlay = std::mem::take(&mut tx.overlay);
        tx.inner.committed.write().merge(overlay);
        // claims and row locks are released when `tx` drops
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.inner.check_fail(FailPoint::Rollback)
    }
}
