//! Pond lifecycle
//!
//! Ponds are submitted with at least one pool and one berkas, reviewed
//! (ACTIVED or DISABLED with reasons) and may be resubmitted with merged
//! pool and berkas lists.

mod command;
mod query;

use std::sync::Arc;
use std::time::Duration;

use shared::Identity;

pub use command::PondCommand;
pub use query::PondQuery;

use crate::error::DomainResult;
use crate::reader::Reader;
use crate::store::Store;
use crate::uow::UnitOfWork;

#[derive(Clone)]
pub struct PondRepo {
    store: Arc<dyn Store>,
    timeout: Option<Duration>,
}

impl PondRepo {
    pub fn new(store: Arc<dyn Store>, timeout: Option<Duration>) -> Self {
        Self { store, timeout }
    }

    /// Open a transaction for a batch of pond commands
    pub async fn new_command(&self, identity: Identity) -> DomainResult<PondCommand> {
        let uow = UnitOfWork::begin(self.store.as_ref(), self.timeout).await?;
        Ok(PondCommand::new(uow, identity))
    }

    pub fn new_query(&self) -> PondQuery<'static> {
        PondQuery::new(Reader::detached(self.store.clone()))
    }
}
