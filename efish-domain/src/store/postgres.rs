//! PostgreSQL backend
//!
//! One sqlx transaction per [`StoreTx`]. Locked reads append `FOR UPDATE`;
//! unique-index violations (SQLSTATE 23505) surface as
//! [`StoreError::UniqueViolation`] carrying the index name.

use async_trait::async_trait;
use shared::models::{
    Berkas, Budidaya, FishSpecies, Order, OrderStatus, Pond, PondFilter, Pool, Pricelist,
};
use shared::request::PaginationQuery;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::{ReadOptions, Store, StoreError, StoreResult, StoreTx};

const POND_COLUMNS: &str = r#"id, user_id, name, country_id, province_id, city_id, district_id,
    detail_address, note_address, "type", latitude, longitude, image, status, reasons,
    created_at, created_by, updated_at, updated_by, deleted_at, deleted_by"#;

const POOL_COLUMNS: &str = "id, pond_id, name, long, wide, image, \
    created_at, created_by, updated_at, updated_by, deleted_at, deleted_by";

const BERKAS_COLUMNS: &str = "id, pond_id, name, file, \
    created_at, created_by, updated_at, updated_by, deleted_at, deleted_by";

const BUDIDAYA_COLUMNS: &str = "id, pond_id, pool_id, fish_species_id, code, date_of_seed, \
    estimated_panen_date, estimated_tonase, status, stock, sold, \
    created_at, created_by, updated_at, updated_by, deleted_at, deleted_by";

const PRICELIST_COLUMNS: &str = r#"id, budidaya_id, "limit", price,
    created_at, created_by, updated_at, updated_by, deleted_at, deleted_by"#;

const FISH_SPECIES_COLUMNS: &str =
    "id, name, created_at, created_by, updated_at, updated_by, deleted_at, deleted_by";

const ORDER_COLUMNS: &str = "id, budidaya_id, pricelist_id, user_id, qty, status, booking_date, \
    created_at, created_by, updated_at, updated_by, deleted_at, deleted_by";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err
            && db.is_unique_violation()
        {
            return StoreError::UniqueViolation {
                constraint: db.constraint().unwrap_or_default().to_string(),
            };
        }
        StoreError::Database(err.to_string())
    }
}

/// `SELECT <columns> FROM <table> WHERE <filter>` plus the soft-delete
/// filter, ordering and row lock requested by `opts`
fn select(
    columns: &str,
    table: &str,
    filter: &str,
    order_by: Option<&str>,
    opts: ReadOptions,
) -> String {
    let mut sql = format!("SELECT {columns} FROM {table} WHERE {filter}");
    if !opts.include_deleted {
        sql.push_str(" AND deleted_at IS NULL");
    }
    if let Some(order) = order_by {
        sql.push_str(" ORDER BY ");
        sql.push_str(order);
    }
    if opts.lock {
        sql.push_str(" FOR UPDATE");
    }
    sql
}

fn page_bounds(page: &PaginationQuery) -> (i64, i64) {
    (page.limit() as i64, page.offset() as i64)
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Apply pending migrations from `migrations/`
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    // ── Pond ──

    async fn insert_pond(&mut self, pond: &Pond) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ponds (
                id, user_id, name, country_id, province_id, city_id, district_id,
                detail_address, note_address, "type", latitude, longitude, image,
                status, reasons, created_at, created_by, updated_at, updated_by,
                deleted_at, deleted_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(pond.id)
        .bind(pond.user_id)
        .bind(&pond.name)
        .bind(pond.country_id)
        .bind(pond.province_id)
        .bind(pond.city_id)
        .bind(pond.district_id)
        .bind(&pond.detail_address)
        .bind(&pond.note_address)
        .bind(pond.pond_type)
        .bind(pond.latitude)
        .bind(pond.longitude)
        .bind(&pond.image)
        .bind(pond.status)
        .bind(&pond.reasons)
        .bind(pond.audit.created_at)
        .bind(pond.audit.created_by)
        .bind(pond.audit.updated_at)
        .bind(pond.audit.updated_by)
        .bind(pond.audit.deleted_at)
        .bind(pond.audit.deleted_by)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_pond(&mut self, pond: &Pond) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE ponds SET
                name = $2, country_id = $3, province_id = $4, city_id = $5,
                district_id = $6, detail_address = $7, note_address = $8, "type" = $9,
                latitude = $10, longitude = $11, image = $12, status = $13, reasons = $14,
                updated_at = $15, updated_by = $16, deleted_at = $17, deleted_by = $18
            WHERE id = $1
            "#,
        )
        .bind(pond.id)
        .bind(&pond.name)
        .bind(pond.country_id)
        .bind(pond.province_id)
        .bind(pond.city_id)
        .bind(pond.district_id)
        .bind(&pond.detail_address)
        .bind(&pond.note_address)
        .bind(pond.pond_type)
        .bind(pond.latitude)
        .bind(pond.longitude)
        .bind(&pond.image)
        .bind(pond.status)
        .bind(&pond.reasons)
        .bind(pond.audit.updated_at)
        .bind(pond.audit.updated_by)
        .bind(pond.audit.deleted_at)
        .bind(pond.audit.deleted_by)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_pond(&mut self, id: Uuid, opts: ReadOptions) -> StoreResult<Option<Pond>> {
        let sql = select(POND_COLUMNS, "ponds", "id = $1", None, opts);
        let row = sqlx::query_as::<_, Pond>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn find_pond_by_user(
        &mut self,
        user_id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Option<Pond>> {
        let sql = select(
            POND_COLUMNS,
            "ponds",
            "user_id = $1",
            Some("created_at DESC LIMIT 1"),
            opts,
        );
        let row = sqlx::query_as::<_, Pond>(&sql)
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn list_ponds(
        &mut self,
        filter: &PondFilter,
        page: &PaginationQuery,
    ) -> StoreResult<(Vec<Pond>, u64)> {
        let (limit, offset) = page_bounds(page);
        let condition = "deleted_at IS NULL
            AND ($1::pond_status IS NULL OR status = $1)
            AND ($2::uuid IS NULL OR user_id = $2)";

        let (total,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM ponds WHERE {condition}"
        ))
        .bind(filter.status)
        .bind(filter.user_id)
        .fetch_one(&mut *self.tx)
        .await?;

        let rows = sqlx::query_as::<_, Pond>(&format!(
            "SELECT {POND_COLUMNS} FROM ponds WHERE {condition} \
             ORDER BY created_at DESC, id LIMIT $3 OFFSET $4"
        ))
        .bind(filter.status)
        .bind(filter.user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok((rows, total.max(0) as u64))
    }

    async fn save_pool(&mut self, pool: &Pool) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pools (
                id, pond_id, name, long, wide, image,
                created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name, long = EXCLUDED.long, wide = EXCLUDED.wide,
                image = EXCLUDED.image,
                updated_at = EXCLUDED.updated_at, updated_by = EXCLUDED.updated_by,
                deleted_at = EXCLUDED.deleted_at, deleted_by = EXCLUDED.deleted_by
            "#,
        )
        .bind(pool.id)
        .bind(pool.pond_id)
        .bind(&pool.name)
        .bind(pool.long)
        .bind(pool.wide)
        .bind(&pool.image)
        .bind(pool.audit.created_at)
        .bind(pool.audit.created_by)
        .bind(pool.audit.updated_at)
        .bind(pool.audit.updated_by)
        .bind(pool.audit.deleted_at)
        .bind(pool.audit.deleted_by)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_pool(&mut self, id: Uuid, opts: ReadOptions) -> StoreResult<Option<Pool>> {
        let sql = select(POOL_COLUMNS, "pools", "id = $1", None, opts);
        let row = sqlx::query_as::<_, Pool>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn list_pools(&mut self, pond_id: Uuid, opts: ReadOptions) -> StoreResult<Vec<Pool>> {
        let sql = select(
            POOL_COLUMNS,
            "pools",
            "pond_id = $1",
            Some("created_at, id"),
            opts,
        );
        let rows = sqlx::query_as::<_, Pool>(&sql)
            .bind(pond_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    async fn save_berkas(&mut self, berkas: &Berkas) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO berkas (
                id, pond_id, name, file,
                created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name, file = EXCLUDED.file,
                updated_at = EXCLUDED.updated_at, updated_by = EXCLUDED.updated_by,
                deleted_at = EXCLUDED.deleted_at, deleted_by = EXCLUDED.deleted_by
            "#,
        )
        .bind(berkas.id)
        .bind(berkas.pond_id)
        .bind(&berkas.name)
        .bind(&berkas.file)
        .bind(berkas.audit.created_at)
        .bind(berkas.audit.created_by)
        .bind(berkas.audit.updated_at)
        .bind(berkas.audit.updated_by)
        .bind(berkas.audit.deleted_at)
        .bind(berkas.audit.deleted_by)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_berkas(&mut self, id: Uuid, opts: ReadOptions) -> StoreResult<Option<Berkas>> {
        let sql = select(BERKAS_COLUMNS, "berkas", "id = $1", None, opts);
        let row = sqlx::query_as::<_, Berkas>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn list_berkas(
        &mut self,
        pond_id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Vec<Berkas>> {
        let sql = select(
            BERKAS_COLUMNS,
            "berkas",
            "pond_id = $1",
            Some("created_at, id"),
            opts,
        );
        let rows = sqlx::query_as::<_, Berkas>(&sql)
            .bind(pond_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    // ── Budidaya ──

    async fn insert_budidaya(&mut self, budidaya: &Budidaya) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO budidaya (
                id, pond_id, pool_id, fish_species_id, code, date_of_seed,
                estimated_panen_date, estimated_tonase, status, stock, sold,
                created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(budidaya.id)
        .bind(budidaya.pond_id)
        .bind(budidaya.pool_id)
        .bind(budidaya.fish_species_id)
        .bind(&budidaya.code)
        .bind(budidaya.date_of_seed)
        .bind(budidaya.estimated_panen_date)
        .bind(budidaya.estimated_tonase)
        .bind(budidaya.status)
        .bind(budidaya.stock)
        .bind(budidaya.sold)
        .bind(budidaya.audit.created_at)
        .bind(budidaya.audit.created_by)
        .bind(budidaya.audit.updated_at)
        .bind(budidaya.audit.updated_by)
        .bind(budidaya.audit.deleted_at)
        .bind(budidaya.audit.deleted_by)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_budidaya(&mut self, budidaya: &Budidaya) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE budidaya SET
                fish_species_id = $2, code = $3, date_of_seed = $4,
                estimated_panen_date = $5, estimated_tonase = $6, status = $7,
                stock = $8, sold = $9,
                updated_at = $10, updated_by = $11, deleted_at = $12, deleted_by = $13
            WHERE id = $1
            "#,
        )
        .bind(budidaya.id)
        .bind(budidaya.fish_species_id)
        .bind(&budidaya.code)
        .bind(budidaya.date_of_seed)
        .bind(budidaya.estimated_panen_date)
        .bind(budidaya.estimated_tonase)
        .bind(budidaya.status)
        .bind(budidaya.stock)
        .bind(budidaya.sold)
        .bind(budidaya.audit.updated_at)
        .bind(budidaya.audit.updated_by)
        .bind(budidaya.audit.deleted_at)
        .bind(budidaya.audit.deleted_by)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_budidaya(
        &mut self,
        id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Option<Budidaya>> {
        let sql = select(BUDIDAYA_COLUMNS, "budidaya", "id = $1", None, opts);
        let row = sqlx::query_as::<_, Budidaya>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
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
        let sql = select(
            BUDIDAYA_COLUMNS,
            "budidaya",
            "pool_id = $1 AND status <> 'PANEN'",
            Some("created_at DESC LIMIT 1"),
            opts,
        );
        let row = sqlx::query_as::<_, Budidaya>(&sql)
            .bind(pool_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn find_latest_active_code(&mut self, pond_id: Uuid) -> StoreResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT code FROM budidaya
            WHERE pond_id = $1 AND deleted_at IS NULL AND status <> 'PANEN'
            ORDER BY created_at DESC, code DESC
            LIMIT 1
            "#,
        )
        .bind(pond_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(|(code,)| code))
    }

    async fn code_taken(&mut self, code: &str) -> StoreResult<bool> {
        let (taken,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM budidaya WHERE code = $1 AND deleted_at IS NULL)",
        )
        .bind(code)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(taken)
    }

    async fn list_budidaya(
        &mut self,
        pond_id: Uuid,
        page: &PaginationQuery,
    ) -> StoreResult<(Vec<Budidaya>, u64)> {
        let (limit, offset) = page_bounds(page);

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM budidaya WHERE pond_id = $1 AND deleted_at IS NULL",
        )
        .bind(pond_id)
        .fetch_one(&mut *self.tx)
        .await?;

        let rows = sqlx::query_as::<_, Budidaya>(&format!(
            "SELECT {BUDIDAYA_COLUMNS} FROM budidaya \
             WHERE pond_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC, id LIMIT $2 OFFSET $3"
        ))
        .bind(pond_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok((rows, total.max(0) as u64))
    }

    async fn save_pricelist(&mut self, pricelist: &Pricelist) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pricelists (
                id, budidaya_id, "limit", price,
                created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                "limit" = EXCLUDED."limit", price = EXCLUDED.price,
                updated_at = EXCLUDED.updated_at, updated_by = EXCLUDED.updated_by,
                deleted_at = EXCLUDED.deleted_at, deleted_by = EXCLUDED.deleted_by
            "#,
        )
        .bind(pricelist.id)
        .bind(pricelist.budidaya_id)
        .bind(&pricelist.limit)
        .bind(pricelist.price)
        .bind(pricelist.audit.created_at)
        .bind(pricelist.audit.created_by)
        .bind(pricelist.audit.updated_at)
        .bind(pricelist.audit.updated_by)
        .bind(pricelist.audit.deleted_at)
        .bind(pricelist.audit.deleted_by)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_pricelist(
        &mut self,
        id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Option<Pricelist>> {
        let sql = select(PRICELIST_COLUMNS, "pricelists", "id = $1", None, opts);
        let row = sqlx::query_as::<_, Pricelist>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn list_pricelists(
        &mut self,
        budidaya_id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Vec<Pricelist>> {
        let sql = select(
            PRICELIST_COLUMNS,
            "pricelists",
            "budidaya_id = $1",
            Some("created_at, id"),
            opts,
        );
        let rows = sqlx::query_as::<_, Pricelist>(&sql)
            .bind(budidaya_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    async fn insert_fish_species(&mut self, species: &FishSpecies) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO fish_species (
                id, name, created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(species.id)
        .bind(&species.name)
        .bind(species.audit.created_at)
        .bind(species.audit.created_by)
        .bind(species.audit.updated_at)
        .bind(species.audit.updated_by)
        .bind(species.audit.deleted_at)
        .bind(species.audit.deleted_by)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_fish_species(
        &mut self,
        id: Uuid,
        opts: ReadOptions,
    ) -> StoreResult<Option<FishSpecies>> {
        let sql = select(FISH_SPECIES_COLUMNS, "fish_species", "id = $1", None, opts);
        let row = sqlx::query_as::<_, FishSpecies>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn list_fish_species(&mut self) -> StoreResult<Vec<FishSpecies>> {
        let rows = sqlx::query_as::<_, FishSpecies>(&format!(
            "SELECT {FISH_SPECIES_COLUMNS} FROM fish_species \
             WHERE deleted_at IS NULL ORDER BY name, id"
        ))
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    // ── Order ──

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, budidaya_id, pricelist_id, user_id, qty, status, booking_date,
                created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(order.id)
        .bind(order.budidaya_id)
        .bind(order.pricelist_id)
        .bind(order.user_id)
        .bind(order.qty)
        .bind(order.status)
        .bind(order.booking_date)
        .bind(order.audit.created_at)
        .bind(order.audit.created_by)
        .bind(order.audit.updated_at)
        .bind(order.audit.updated_by)
        .bind(order.audit.deleted_at)
        .bind(order.audit.deleted_by)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE orders SET
                status = $2, qty = $3,
                updated_at = $4, updated_by = $5, deleted_at = $6, deleted_by = $7
            WHERE id = $1
            "#,
        )
        .bind(order.id)
        .bind(order.status)
        .bind(order.qty)
        .bind(order.audit.updated_at)
        .bind(order.audit.updated_by)
        .bind(order.audit.deleted_at)
        .bind(order.audit.deleted_by)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_order(&mut self, id: Uuid, opts: ReadOptions) -> StoreResult<Option<Order>> {
        let sql = select(ORDER_COLUMNS, "orders", "id = $1", None, opts);
        let row = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn list_orders(
        &mut self,
        status: Option<OrderStatus>,
        page: &PaginationQuery,
    ) -> StoreResult<(Vec<Order>, u64)> {
        let (limit, offset) = page_bounds(page);
        let condition = "deleted_at IS NULL AND ($1::order_status IS NULL OR status = $1)";

        let (total,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM orders WHERE {condition}"
        ))
        .bind(status)
        .fetch_one(&mut *self.tx)
        .await?;

        let rows = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {condition} \
             ORDER BY created_at DESC, id LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok((rows, total.max(0) as u64))
    }

    async fn list_active_orders(&mut self) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE deleted_at IS NULL AND status = 'pending' \
             ORDER BY created_at, id"
        ))
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    // ── Transaction control ──

    async fn savepoint(&mut self, name: &'static str) -> StoreResult<()> {
        let sql = format!("SAVEPOINT {name}");
        sqlx::query(&sql).execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self, name: &'static str) -> StoreResult<()> {
        let sql = format!("ROLLBACK TO SAVEPOINT {name}");
        sqlx::query(&sql).execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_builder() {
        let sql = select("id", "ponds", "id = $1", None, ReadOptions::ACTIVE);
        assert_eq!(sql, "SELECT id FROM ponds WHERE id = $1 AND deleted_at IS NULL");

        let sql = select(
            "id",
            "budidaya",
            "id = $1",
            None,
            ReadOptions {
                include_deleted: true,
                lock: true,
            },
        );
        assert_eq!(sql, "SELECT id FROM budidaya WHERE id = $1 FOR UPDATE");

        let sql = select("id", "pools", "pond_id = $1", Some("created_at, id"), ReadOptions::LOCKED);
        assert!(sql.ends_with("deleted_at IS NULL ORDER BY created_at, id FOR UPDATE"));
    }

    #[test]
    fn test_page_bounds() {
        assert_eq!(page_bounds(&PaginationQuery::new(2, 25)), (25, 25));
    }
}
