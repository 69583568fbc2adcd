//! Cultivation cycles
//!
//! A budidaya runs inside one pool from seeding (BENIH) through grow-out
//! (PEMBESARAN) to harvest (PANEN). A pool has at most one cycle that is
//! neither deleted nor harvested. `sold` never leaves `0..=stock`.

pub mod code;
mod command;
mod query;

use std::sync::Arc;
use std::time::Duration;

use shared::Identity;

pub use command::BudidayaCommand;
pub(crate) use command::apply_sold_qty;
pub use query::BudidayaQuery;

use crate::error::DomainResult;
use crate::reader::Reader;
use crate::store::Store;
use crate::uow::UnitOfWork;

#[derive(Clone)]
pub struct BudidayaRepo {
    store: Arc<dyn Store>,
    timeout: Option<Duration>,
}

impl BudidayaRepo {
    pub fn new(store: Arc<dyn Store>, timeout: Option<Duration>) -> Self {
        Self { store, timeout }
    }

    pub async fn new_command(&self, identity: Identity) -> DomainResult<BudidayaCommand> {
        let uow = UnitOfWork::begin(self.store.as_ref(), self.timeout).await?;
        Ok(BudidayaCommand::new(uow, identity))
    }

    pub fn new_query(&self) -> BudidayaQuery<'static> {
        BudidayaQuery::new(Reader::detached(self.store.clone()))
    }
}
