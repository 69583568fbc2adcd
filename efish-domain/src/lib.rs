//! e-fish domain core
//!
//! Transactional domain services for the e-fish aquaculture marketplace:
//! pond registration and review, cultivation cycles (budidaya) with their
//! price lists, and orders that reserve harvested stock.
//!
//! # Module layout
//!
//! ```text
//! efish-domain/src/
//! ├── store/      # Store traits, PostgreSQL and in-memory backends
//! ├── uow.rs      # Unit of work: one transaction per command object
//! ├── pond/       # Pond, pool and berkas lifecycle
//! ├── budidaya/   # Cycles, price lists, fish species, sold quantity
//! ├── order/      # Order state machine
//! ├── error.rs    # Domain errors and their mapping to AppError
//! ├── config.rs   # Environment configuration
//! └── logger.rs   # tracing setup
//! ```
//!
//! Every repo hands out commands and queries. A command owns one
//! transaction; nothing it writes is visible until [`commit`] and a failed
//! operation rolls the whole transaction back. A query built from a repo
//! runs each read in its own short transaction; one built from a command
//! reads through the command's transaction.
//!
//! [`commit`]: pond::PondCommand::commit

pub mod budidaya;
pub mod config;
pub mod error;
pub mod logger;
pub mod order;
pub mod pond;
pub mod store;
pub mod uow;

mod reader;

use std::sync::Arc;
use std::time::Duration;

pub use budidaya::{BudidayaCommand, BudidayaQuery, BudidayaRepo};
pub use config::Config;
pub use error::{Conflict, DomainError, DomainResult, Resource};
pub use logger::{init_logger, init_logger_with_file};
pub use order::{OrderCommand, OrderQuery, OrderRepo};
pub use pond::{PondCommand, PondQuery, PondRepo};
pub use store::{MemoryStore, PgStore, Store, StoreTx};
pub use uow::UnitOfWork;

/// Entry point holding one repo per aggregate over a shared store
#[derive(Clone)]
pub struct Domain {
    pond: PondRepo,
    budidaya: BudidayaRepo,
    order: OrderRepo,
}

impl Domain {
    pub fn new(store: Arc<dyn Store>, timeout: Option<Duration>) -> Self {
        Self {
            pond: PondRepo::new(store.clone(), timeout),
            budidaya: BudidayaRepo::new(store.clone(), timeout),
            order: OrderRepo::new(store, timeout),
        }
    }

    /// Connect to PostgreSQL and apply pending migrations
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let store = PgStore::connect(&config.database_url, config.db_max_connections).await?;
        store.migrate().await?;
        Ok(Self::new(Arc::new(store), config.operation_timeout))
    }

    /// In-memory backend, for tests and local experiments
    pub fn in_memory(store: MemoryStore, timeout: Option<Duration>) -> Self {
        Self::new(Arc::new(store), timeout)
    }

    pub fn pond(&self) -> &PondRepo {
        &self.pond
    }

    pub fn budidaya(&self) -> &BudidayaRepo {
        &self.budidaya
    }

    pub fn order(&self) -> &OrderRepo {
        &self.order
    }
}
