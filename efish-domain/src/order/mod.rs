//! Orders
//!
//! An order reserves quantity of one budidaya when placed and releases it
//! when cancelled; both happen in the order command's transaction.

mod command;
mod query;

use std::sync::Arc;
use std::time::Duration;

use shared::Identity;

pub use command::OrderCommand;
pub use query::OrderQuery;

use crate::error::DomainResult;
use crate::reader::Reader;
use crate::store::Store;
use crate::uow::UnitOfWork;

#[derive(Clone)]
pub struct OrderRepo {
    store: Arc<dyn Store>,
    timeout: Option<Duration>,
}

impl OrderRepo {
    pub fn new(store: Arc<dyn Store>, timeout: Option<Duration>) -> Self {
        Self { store, timeout }
    }

    pub async fn new_command(&self, identity: Identity) -> DomainResult<OrderCommand> {
        let uow = UnitOfWork::begin(self.store.as_ref(), self.timeout).await?;
        Ok(OrderCommand::new(uow, identity))
    }

    pub fn new_query(&self) -> OrderQuery<'static> {
        OrderQuery::new(Reader::detached(self.store.clone()))
    }
}
