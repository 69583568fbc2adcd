//! Order reads

use shared::models::{Order, OrderStatus};
use shared::request::{PaginatedResponse, PaginationQuery};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult, Resource, StoreResultExt};
use crate::reader::Reader;

pub struct OrderQuery<'a> {
    reader: Reader<'a>,
}

impl<'a> OrderQuery<'a> {
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

    pub async fn find_by_id(&mut self, id: Uuid) -> DomainResult<Order> {
        let opts = self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = scope
            .tx()
            .find_order(id, opts)
            .await
            .op("find_order")
            .and_then(|row| row.ok_or(DomainError::not_found(Resource::Order, id)));
        scope.finish(result).await
    }

    /// All orders, newest first
    pub async fn list(&mut self, page: &PaginationQuery) -> DomainResult<PaginatedResponse<Order>> {
        self.fetch_page(None, page).await
    }

    pub async fn list_by_status(
        &mut self,
        status: OrderStatus,
        page: &PaginationQuery,
    ) -> DomainResult<PaginatedResponse<Order>> {
        self.fetch_page(Some(status), page).await
    }

    /// Pending orders, oldest first
    pub async fn list_active(&mut self) -> DomainResult<Vec<Order>> {
        self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = scope
            .tx()
            .list_active_orders()
            .await
            .op("list_active_orders");
        scope.finish(result).await
    }

    async fn fetch_page(
        &mut self,
        status: Option<OrderStatus>,
        page: &PaginationQuery,
    ) -> DomainResult<PaginatedResponse<Order>> {
        self.reader.options();
        let mut scope = self.reader.scope().await?;
        let result = scope
            .tx()
            .list_orders(status, page)
            .await
            .op("list_orders")
            .map(|(rows, total)| PaginatedResponse::new(rows, total, page));
        scope.finish(result).await
    }
}
