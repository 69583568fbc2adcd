//! Store abstraction
//!
//! A [`Store`] hands out transactions; every row read or write of a command
//! goes through one [`StoreTx`]. Two backends implement it:
//!
//! - [`PgStore`]: PostgreSQL through sqlx, schema in `migrations/`
//! - [`MemoryStore`]: in-process tables with the same row-lock and unique-index
//!   behaviour, used by tests and local tooling
//!
//! Reads exclude soft-deleted rows unless [`ReadOptions::include_deleted`] is
//! set. A read with [`ReadOptions::lock`] holds an exclusive row lock until the
//! transaction ends.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use shared::models::{
    Berkas, Budidaya, FishSpecies, Order, OrderStatus, Pond, PondFilter, Pool, Pricelist,
};
use shared::request::PaginationQuery;
use thiserror::Error;
use uuid::Uuid;

pub use memory::{FailPoint, MemoryStore};
pub use postgres::PgStore;

/// Partial unique index: one non-deleted, non-PANEN budidaya per pool
pub const ACTIVE_POOL_INDEX: &str = "budidaya_active_pool_uidx";
/// Unique index on non-deleted budidaya codes
pub const BUDIDAYA_CODE_INDEX: &str = "budidaya_code_uidx";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("database error: {0}")]
    Database(String),

    #[error("transaction already closed")]
    Closed,
}

impl StoreError {
    pub fn is_unique_violation(&self, index: &str) -> bool {
        matches!(self, Self::UniqueViolation { constraint } if constraint == index)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub include_deleted: bool,
    /// `SELECT ... FOR UPDATE`
    pub lock: bool,
}

impl ReadOptions {
    pub const ACTIVE: ReadOptions = ReadOptions {
        include_deleted: false,
        lock: false,
    };

    pub const LOCKED: ReadOptions = ReadOptions {
        include_deleted: false,
        lock: true,
    };
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;
}

/// One open transaction. Dropping it without `commit` discards its writes.
#[async_trait]
pub trait StoreTx: Send {
    // ── Pond ──
    async fn insert_pond(&mut self, pond: &Pond) -> StoreResult<()>;
    async fn update_pond(&mut self, pond: &Pond) -> StoreResult<()>;
    async fn find_pond(&mut self, id: Uuid, opts: ReadOptions) -> StoreResult<Option<Pond>>;
    async fn find_pond_by_user(
        &mut self,
        user_id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Option<Pond>>;
    async fn list_ponds(
        &mut self,
        filter: &PondFilter,
        page: &PaginationQuery,
    ) -> StoreResult<(Vec<Pond>, u64)>;

    /// Insert or overwrite by id
    async fn save_pool(&mut self, pool: &Pool) -> StoreResult<()>;
    async fn find_pool(&mut self, id: Uuid, opts: ReadOptions) -> StoreResult<Option<Pool>>;
    async fn list_pools(&mut self, pond_id: Uuid, opts: ReadOptions) -> StoreResult<Vec<Pool>>;

    /// Insert or overwrite by id
    async fn save_berkas(&mut self, berkas: &Berkas) -> StoreResult<()>;
    async fn find_berkas(&mut self, id: Uuid, opts: ReadOptions) -> StoreResult<Option<Berkas>>;
    async fn list_berkas(&mut self, pond_id: Uuid, opts: ReadOptions)
    -> StoreResult<Vec<Berkas>>;

    // ── Budidaya ──
    async fn insert_budidaya(&mut self, budidaya: &Budidaya) -> StoreResult<()>;
    async fn update_budidaya(&mut self, budidaya: &Budidaya) -> StoreResult<()>;
    async fn find_budidaya(
        &mut self,
        id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Option<Budidaya>>;
    async fn find_active_budidaya_by_pool(
        &mut self,
        pool_id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Option<Budidaya>>;
    /// Code of the most recently created active budidaya in the pond
    async fn find_latest_active_code(&mut self, pond_id: Uuid) -> StoreResult<Option<String>>;
    /// Whether a non-deleted budidaya already uses `code`
    async fn code_taken(&mut self, code: &str) -> StoreResult<bool>;
    async fn list_budidaya(
        &mut self,
        pond_id: Uuid,
        page: &PaginationQuery,
    ) -> StoreResult<(Vec<Budidaya>, u64)>;

    /// Insert or overwrite by id
    async fn save_pricelist(&mut self, pricelist: &Pricelist) -> StoreResult<()>;
    async fn find_pricelist(
        &mut self,
        id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Option<Pricelist>>;
    async fn list_pricelists(
        &mut self,
        budidaya_id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Vec<Pricelist>>;

    async fn insert_fish_species(&mut self, species: &FishSpecies) -> StoreResult<()>;
    async fn find_fish_species(
        &mut self,
        id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Option<FishSpecies>>;
    async fn list_fish_species(&mut self) -> StoreResult<Vec<FishSpecies>>;

    // ── Order ──
    async fn insert_order(&mut self, order: &Order) -> StoreResult<()>;
    async fn update_order(&mut self, order: &Order) -> StoreResult<()>;
    async fn find_order(&mut self, id: Uuid, opts: ReadOptions) -> StoreResult<Option<Order>>;
    async fn list_orders(
        &mut self,
        status: Option<OrderStatus>,
        page: &PaginationQuery,
    ) -> StoreResult<(Vec<Order>, u64)>;
    /// Pending, non-deleted orders
    async fn list_active_orders(&mut self) -> StoreResult<Vec<Order>>;

    // ── Transaction control ──
    /// `SAVEPOINT name`
    async fn savepoint(&mut self, name: &'static str) -> StoreResult<()>;
    /// `ROLLBACK TO SAVEPOINT name`: undo the writes made since the savepoint
    /// and keep the transaction usable
    async fn rollback_to_savepoint(&mut self, name: &'static str) -> StoreResult<()>;
    async fn commit(self: Box<Self>) -> StoreResult<()>;
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
