//! Budidaya reads

use shared::models::{Budidaya, FishSpecies, Pricelist};
use shared::request::{PaginatedResponse, PaginationQuery};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult, Resource, StoreResultExt};
use crate::reader::Reader;

/// Budidaya, pricelist and fish species reads
pub struct BudidayaQuery<'a> {
    reader: Reader<'a>,
}

impl<'a> BudidayaQuery<'a> {
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

    pub async fn find_by_id(&mut self, id: Uuid) -> DomainResult<Budidaya> {
        let opts = self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = scope
            .tx()
            .find_budidaya(id, opts)
            .await
            .op("find_budidaya")
            .and_then(|row| row.ok_or(DomainError::not_found(Resource::Budidaya, id)));
        scope.finish(result).await
    }

    /// The pool's cycle that is neither deleted nor harvested
    pub async fn find_active_by_pool(&mut self, pool_id: Uuid) -> DomainResult<Option<Budidaya>> {
        let opts = self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = scope
            .tx()
            .find_active_budidaya_by_pool(pool_id, opts)
            .await
            .op("find_active_budidaya_by_pool");
        scope.finish(result).await
    }

    /// Code of the pond's most recently started active cycle
    pub async fn latest_active_code(&mut self, pond_id: Uuid) -> DomainResult<Option<String>> {
        self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = scope
            .tx()
            .find_latest_active_code(pond_id)
            .await
            .op("find_latest_active_code");
        scope.finish(result).await
    }

    /// Cycles of a pond, newest first
    pub async fn list_by_pond(
        &mut self,
        pond_id: Uuid,
        page: &PaginationQuery,
    ) -> DomainResult<PaginatedResponse<Budidaya>> {
        self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = scope
            .tx()
            .list_budidaya(pond_id, page)
            .await
            .op("list_budidaya")
            .map(|(rows, total)| PaginatedResponse::new(rows, total, page));
        scope.finish(result).await
    }

    pub async fn list_pricelists(&mut self, budidaya_id: Uuid) -> DomainResult<Vec<Pricelist>> {
        let opts = self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = scope
            .tx()
            .list_pricelists(budidaya_id, opts)
            .await
            .op("list_pricelists");
        scope.finish(result).await
    }

    pub async fn find_pricelist(&mut self, id: Uuid) -> DomainResult<Pricelist> {
        let opts = self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = scope
            .tx()
            .find_pricelist(id, opts)
            .await
            .op("find_pricelist")
            .and_then(|row| row.ok_or(DomainError::not_found(Resource::Pricelist, id)));
        scope.finish(result).await
    }

    /// All species, by name
    pub async fn list_fish_species(&mut self) -> DomainResult<Vec<FishSpecies>> {
        self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = scope
            .tx()
            .list_fish_species()
            .await
            .op("list_fish_species");
        scope.finish(result).await
    }

    pub async fn find_fish_species(&mut self, id: Uuid) -> DomainResult<FishSpecies> {
        let opts = self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = scope
            .tx()
            .find_fish_species(id, opts)
            .await
            .op("find_fish_species")
            .and_then(|row| row.ok_or(DomainError::not_found(Resource::FishSpecies, id)));
        scope.finish(result).await
    }
}
