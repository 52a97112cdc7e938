//! Transaction boundaries around write-path calls.
//!
//! The projector performs no I/O and never rolls anything back itself. The
//! caller supplies a [`TransactionBoundary`] and runs write-path work inside
//! [`in_transaction`], which commits on success and rolls back on any error.

use recmold_core::Result;

/// Begin/commit/rollback hooks provided by the persistence layer.
pub trait TransactionBoundary {
    fn begin(&self) -> Result<()>;
    fn commit(&self) -> Result<()>;
    fn rollback(&self) -> Result<()>;
}

/// A boundary that does nothing, for callers managing transactions elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransaction;

impl TransactionBoundary for NoTransaction {
    fn begin(&self) -> Result<()> {
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        Ok(())
    }
}

/// Run `work` inside a transaction.
///
/// Commits when `work` succeeds. When it fails the transaction is rolled back
/// and the original error is returned; a failing rollback is logged, not
/// substituted for the original error.
pub fn in_transaction<B, T, F>(boundary: &B, work: F) -> Result<T>
where
    B: TransactionBoundary + ?Sized,
    F: FnOnce() -> Result<T>,
{
    boundary.begin()?;
    match work() {
        Ok(value) => {
            boundary.commit()?;
            Ok(value)
        }
        Err(err) => {
            tracing::warn!(error = %err, "rolling back transaction");
            if let Err(rollback_err) = boundary.rollback() {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
