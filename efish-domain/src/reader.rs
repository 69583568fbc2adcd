//! Read access shared by the query types
//!
//! A query either owns a handle to the store and opens a short read
//! transaction per call, or borrows the transaction of the command that
//! created it and sees that command's uncommitted writes.

use std::sync::Arc;

use crate::error::{DomainError, DomainResult, TxAction};
use crate::store::{ReadOptions, Store, StoreTx};

enum Source<'a> {
    Detached(Arc<dyn Store>),
    Bound(&'a mut (dyn StoreTx + 'static)),
}

pub(crate) struct Reader<'a> {
    source: Source<'a>,
    include_deleted: bool,
    lock: bool,
}

impl Reader<'static> {
    pub(crate) fn detached(store: Arc<dyn Store>) -> Self {
        Self {
            source: Source::Detached(store),
            include_deleted: false,
            lock: false,
        }
    }
}

impl<'a> Reader<'a> {
    pub(crate) fn bound(tx: &'a mut (dyn StoreTx + 'static)) -> Self {
        Self {
            source: Source::Bound(tx),
            include_deleted: false,
            lock: false,
        }
    }

    pub(crate) fn include_deleted(&mut self) {
        self.include_deleted = true;
    }

    /// Lock the rows returned by the next read. On a detached reader the
    /// lock only lasts for that read.
    pub(crate) fn lock(&mut self) {
        self.lock = true;
    }

    /// Options for the next read. The lock request is consumed.
    pub(crate) fn options(&mut self) -> ReadOptions {
        let opts = ReadOptions {
            include_deleted: self.include_deleted,
            lock: self.lock,
        };
        self.lock = false;
        opts
    }

    pub(crate) async fn scope(&mut self) -> DomainResult<ReadScope<'_>> {
        match &mut self.source {
            Source::Detached(store) => store.begin().await.map(ReadScope::Owned).map_err(
                |source| DomainError::Transaction {
                    action: TxAction::Begin,
                    source,
                },
            ),
            Source::Bound(tx) => Ok(ReadScope::Borrowed(&mut **tx)),
        }
    }
}

pub(crate) enum ReadScope<'a> {
    Owned(Box<dyn StoreTx>),
    Borrowed(&'a mut (dyn StoreTx + 'static)),
}

impl ReadScope<'_> {
    pub(crate) fn tx(&mut self) -> &mut (dyn StoreTx + 'static) {
        match self {
            Self::Owned(tx) => tx.as_mut(),
            Self::Borrowed(tx) => &mut **tx,
        }
    }

    /// End the scope and hand back `result`. An owned read transaction is
    /// rolled back; a borrowed one stays open for its command.
    pub(crate) async fn finish<T>(self, result: DomainResult<T>) -> DomainResult<T> {
        if let Self::Owned(tx) = self
            && let Err(error) = tx.rollback().await
        {
            tracing::debug!(%error, "Closing read transaction failed");
        }
        result
    }
}
