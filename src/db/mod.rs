//! Store capability: the collection traits every feature depends on, and the
//! Postgres / in-memory implementations behind them.
use std::future::Future;
use std::time::Duration;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::UserRepo;
use crate::budgets::repo::BudgetRepo;
use crate::couples::repo::CoupleRepo;
use crate::expenses::repo::ExpenseRepo;
use crate::settings::repo::SettingsRepo;
use crate::templates::repo::TemplateRepo;
use crate::transfers::repo::TransferRepo;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store call timed out")]
    Timeout,
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            // No pooled connection within `acquire_timeout`.
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            e => StoreError::Database(e),
        }
    }
}

/// Everything the application needs from persistence.
pub trait Store:
    UserRepo + CoupleRepo + ExpenseRepo + TransferRepo + SettingsRepo + BudgetRepo + TemplateRepo
{
}

impl<T> Store for T where
    T: UserRepo
        + CoupleRepo
        + ExpenseRepo
        + TransferRepo
        + SettingsRepo
        + BudgetRepo
        + TemplateRepo
{
}

/// Which ledger rows a caller may see: their own, plus their couple's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub user_id: Option<Uuid>,
    pub couple_id: Option<Uuid>,
}

impl Scope {
    pub fn for_user(user_id: Uuid, couple_id: Option<Uuid>) -> Self {
        Self {
            user_id: Some(user_id),
            couple_id,
        }
    }

    pub fn couple(couple_id: Uuid) -> Self {
        Self {
            user_id: None,
            couple_id: Some(couple_id),
        }
    }

    pub fn contains(&self, owner: Uuid, couple_id: Option<Uuid>) -> bool {
        self.user_id == Some(owner) || (couple_id.is_some() && self.couple_id == couple_id)
    }
}

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl Window {
    pub fn contains(&self, at: OffsetDateTime) -> bool {
        at >= self.start && at < self.end
    }
}

/// Bounds a store call; an elapsed deadline surfaces as `StoreError::Timeout`.
pub(crate) async fn timed<T, E, F>(limit: Duration, fut: F) -> StoreResult<T>
where
    F: Future<Output = Result<T, E>>,
    StoreError: From<E>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res.map_err(StoreError::from),
        Err(_) => Err(StoreError::Timeout),
    }
}

pub(crate) fn map_unique(e: sqlx::Error, what: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("{what} already exists"))
        }
        _ => StoreError::from(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_matches_owner_or_couple() {
        let user = Uuid::new_v4();
        let couple = Uuid::new_v4();
        let scope = Scope::for_user(user, Some(couple));
        assert!(scope.contains(user, None));
        assert!(scope.contains(Uuid::new_v4(), Some(couple)));
        assert!(!scope.contains(Uuid::new_v4(), None));
        assert!(!Scope::for_user(user, None).contains(Uuid::new_v4(), None));
    }

    #[test]
    fn pool_exhaustion_is_a_timeout() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Timeout
        ));
        assert!(matches!(
            map_unique(sqlx::Error::PoolTimedOut, "user"),
            StoreError::Timeout
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }

    #[tokio::test]
    async fn timed_reports_elapsed_deadline() {
        let res: StoreResult<()> = timed(Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<(), StoreError>(())
        })
        .await;
        assert!(matches!(res, Err(StoreError::Timeout)));
    }
}
