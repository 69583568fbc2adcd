//! Order writes

use shared::Identity;
use shared::models::{Audit, CreateOrderInput, Order, OrderStatus};
use shared::util::{new_id, now};
use uuid::Uuid;

use super::query::OrderQuery;
use crate::budidaya::apply_sold_qty;
use crate::error::{Conflict, DomainError, DomainResult, Resource, StoreResultExt};
use crate::reader::Reader;
use crate::store::{ReadOptions, StoreTx};
use crate::uow::{UnitOfWork, with_deadline};

/// Order commands, all on one transaction
pub struct OrderCommand {
    uow: UnitOfWork,
    identity: Identity,
}

impl OrderCommand {
    pub(crate) fn new(uow: UnitOfWork, identity: Identity) -> Self {
        Self { uow, identity }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Place a pending order and reserve its quantity on the budidaya
    pub async fn create_order(&mut self, input: &CreateOrderInput) -> DomainResult<Uuid> {
        let deadline = self.uow.deadline();
        let tx = self.uow.tx()?;
        let result = with_deadline(
            deadline,
            "create_order",
            create_order(tx, &self.identity, input),
        )
        .await;
        self.finish("create_order", result).await
    }

    /// pending -> cancelled, releasing the reserved quantity
    pub async fn update_cancel_order(&mut self, order_id: Uuid) -> DomainResult<Uuid> {
        let deadline = self.uow.deadline();
        let tx = self.uow.tx()?;
        let result = with_deadline(
            deadline,
            "cancel_order",
            transition(tx, &self.identity, order_id, OrderStatus::Cancelled),
        )
        .await;
        self.finish("cancel_order", result).await
    }

    /// pending -> success. The reservation stays in `sold`.
    pub async fn update_success_order(&mut self, order_id: Uuid) -> DomainResult<Uuid> {
        let deadline = self.uow.deadline();
        let tx = self.uow.tx()?;
        let result = with_deadline(
            deadline,
            "complete_order",
            transition(tx, &self.identity, order_id, OrderStatus::Success),
        )
        .await;
        self.finish("complete_order", result).await
    }

    /// Query bound to this command's transaction
    pub fn query(&mut self) -> DomainResult<OrderQuery<'_>> {
        Ok(OrderQuery::new(Reader::bound(self.uow.tx()?)))
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

async fn create_order(
    tx: &mut dyn StoreTx,
    identity: &Identity,
    input: &CreateOrderInput,
) -> DomainResult<Uuid> {
    input.validate()?;

    if let Some(pricelist_id) = input.pricelist_id {
        tx.find_pricelist(pricelist_id, ReadOptions::ACTIVE)
            .await
            .op("find_pricelist")?
            .filter(|p| p.budidaya_id == input.budidaya_id)
            .ok_or(DomainError::not_found(Resource::Pricelist, pricelist_id))?;
    }

    apply_sold_qty(tx, identity, input.budidaya_id, input.qty, false).await?;

    let at = now();
    let order = Order {
        id: new_id(),
        budidaya_id: input.budidaya_id,
        pricelist_id: input.pricelist_id,
        user_id: identity.user_id(),
        qty: input.qty,
        status: OrderStatus::Pending,
        booking_date: input.booking_date.unwrap_or_else(|| at.date_naive()),
        audit: Audit::created(identity, at),
    };
    tx.insert_order(&order).await.op("insert_order")?;

    tracing::info!(
        order_id = %order.id,
        budidaya_id = %order.budidaya_id,
        qty = order.qty,
        "Order placed"
    );
    Ok(order.id)
}

async fn transition(
    tx: &mut dyn StoreTx,
    identity: &Identity,
    order_id: Uuid,
    next: OrderStatus,
) -> DomainResult<Uuid> {
    let mut order = tx
        .find_order(order_id, ReadOptions::LOCKED)
        .await
        .op("find_order")?
        .ok_or(DomainError::not_found(Resource::Order, order_id))?;

    if !order.status.can_transition_to(next) {
        return Err(Conflict::InvalidOrderTransition {
            order_id,
            from: order.status,
            to: next,
        }
        .into());
    }

    if next == OrderStatus::Cancelled {
        apply_sold_qty(tx, identity, order.budidaya_id, order.qty, true).await?;
    }

    order.status = next;
    order.audit.touch(identity, now());
    tx.update_order(&order).await.op("update_order")?;

    tracing::info!(order_id = %order.id, status = %order.status, "Order status changed");
    Ok(order.id)
}
