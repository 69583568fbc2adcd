//! Pond reads

use shared::models::{Berkas, Pond, PondFilter, PondStatus, Pool};
use shared::request::{PaginatedResponse, PaginationQuery};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult, Resource, StoreResultExt};
use crate::reader::Reader;
use crate::store::{ReadOptions, StoreTx};

/// Pond with its pools and berkas. Children follow the soft-delete mode of
/// `opts`; only the pond row is locked.
async fn load_pond(tx: &mut dyn StoreTx, id: Uuid, opts: ReadOptions) -> DomainResult<Pond> {
    let mut pond = tx
        .find_pond(id, opts)
        .await
        .op("find_pond")?
        .ok_or(DomainError::not_found(Resource::Pond, id))?;
    attach_children(tx, &mut pond, opts.include_deleted).await?;
    Ok(pond)
}

async fn load_pond_of_user(
    tx: &mut dyn StoreTx,
    user_id: Uuid,
    opts: ReadOptions,
) -> DomainResult<Pond> {
    let mut pond = tx
        .find_pond_by_user(user_id, opts)
        .await
        .op("find_pond_by_user")?
        .ok_or(DomainError::not_found(Resource::Pond, user_id))?;
    attach_children(tx, &mut pond, opts.include_deleted).await?;
    Ok(pond)
}

async fn attach_children(
    tx: &mut dyn StoreTx,
    pond: &mut Pond,
    include_deleted: bool,
) -> DomainResult<()> {
    let opts = ReadOptions {
        include_deleted,
        lock: false,
    };
    pond.pools = tx.list_pools(pond.id, opts).await.op("list_pools")?;
    pond.berkas = tx.list_berkas(pond.id, opts).await.op("list_berkas")?;
    Ok(())
}

/// Pond reads. Soft-deleted rows are hidden unless
/// [`include_deleted`](Self::include_deleted) is called.
pub struct PondQuery<'a> {
    reader: Reader<'a>,
}

impl<'a> PondQuery<'a> {
    pub(crate) fn new(reader: Reader<'a>) -> Self {
        Self { reader }
    }

    /// Take an exclusive row lock on the next read
    pub fn lock(mut self) -> Self {
        self.reader.lock();
        self
    }

    pub fn include_deleted(mut self) -> Self {
        self.reader.include_deleted();
        self
    }

    /// Pond with pools and berkas
    pub async fn find_by_id(&mut self, id: Uuid) -> DomainResult<Pond> {
        let opts = self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = load_pond(scope.tx(), id, opts).await;
        scope.finish(result).await
    }

    /// Most recent pond owned by `user_id`, with pools and berkas
    pub async fn find_by_user(&mut self, user_id: Uuid) -> DomainResult<Pond> {
        let opts = self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = load_pond_of_user(scope.tx(), user_id, opts).await;
        scope.finish(result).await
    }

    /// Ponds without their children, newest first
    pub async fn list(
        &mut self,
        filter: &PondFilter,
        page: &PaginationQuery,
    ) -> DomainResult<PaginatedResponse<Pond>> {
        self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = scope
            .tx()
            .list_ponds(filter, page)
            .await
            .op("list_ponds")
            .map(|(rows, total)| PaginatedResponse::new(rows, total, page));
        scope.finish(result).await
    }

    /// Ponds waiting for review
    pub async fn list_submissions(
        &mut self,
        page: &PaginationQuery,
    ) -> DomainResult<PaginatedResponse<Pond>> {
        let filter = PondFilter {
            status: Some(PondStatus::Submision),
            user_id: None,
        };
        self.list(&filter, page).await
    }

    pub async fn list_pools(&mut self, pond_id: Uuid) -> DomainResult<Vec<Pool>> {
        let opts = self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = scope.tx().list_pools(pond_id, opts).await.op("list_pools");
        scope.finish(result).await
    }

    pub async fn find_pool(&mut self, id: Uuid) -> DomainResult<Pool> {
        let opts = self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = scope
            .tx()
            .find_pool(id, opts)
            .await
            .op("find_pool")
            .and_then(|row| row.ok_or(DomainError::not_found(Resource::Pool, id)));
        scope.finish(result).await
    }

    pub async fn list_berkas(&mut self, pond_id: Uuid) -> DomainResult<Vec<Berkas>> {
        let opts = self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = scope.tx().list_berkas(pond_id, opts).await.op("list_berkas");
        scope.finish(result).await
    }

    pub async fn find_berkas(&mut self, id: Uuid) -> DomainResult<Berkas> {
        let opts = self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = scope
            .tx()
            .find_berkas(id, opts)
            .await
            .op("find_berkas")
            .and_then(|row| row.ok_or(DomainError::not_found(Resource::Berkas, id)));
        scope.finish(result).await
    }
}
