use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::dto::TransferRequest;
use super::repo_types::{Transfer, TransferDraft};
use crate::couples::services::{active_couple_id, ledger_scope};
use crate::db::Store;
use crate::error::AppError;
use crate::expenses::services::check_money;

pub fn validate(req: &TransferRequest) -> Result<TransferDraft, AppError> {
    let amount = check_money(req.amount, "amount")?;
    if amount <= Decimal::ZERO {
        return Err(AppError::invalid("amount must be greater than 0"));
    }
    if req.from_user == req.to_user {
        return Err(AppError::invalid("from_user and to_user must be different"));
    }
    Ok(TransferDraft {
        amount,
        from_user: req.from_user,
        to_user: req.to_user,
        description: req.description.trim().to_string(),
    })
}

pub async fn list(store: &dyn Store, user_id: Uuid) -> Result<Vec<Transfer>, AppError> {
    let scope = ledger_scope(store, user_id).await?;
    Ok(store.list_transfers(scope).await?)
}

pub async fn create(
    store: &dyn Store,
    user_id: Uuid,
    req: &TransferRequest,
    now: OffsetDateTime,
) -> Result<Transfer, AppError> {
    let draft = validate(req)?;
    let couple_id = active_couple_id(store, user_id).await?;
    let transfer = Transfer::new(user_id, couple_id, draft, now);
    store.insert_transfer(&transfer).await?;
    info!(transfer_id = %transfer.id, %user_id, "transfer created");
    Ok(transfer)
}

pub async fn update(
    store: &dyn Store,
    user_id: Uuid,
    id: Uuid,
    req: &TransferRequest,
    now: OffsetDateTime,
) -> Result<Transfer, AppError> {
    let draft = validate(req)?;
    let scope = ledger_scope(store, user_id).await?;
    store
        .update_transfer(id, scope, &draft, now)
        .await?
        .ok_or_else(|| AppError::not_found("Transfer not found"))
}

pub async fn delete(store: &dyn Store, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let scope = ledger_scope(store, user_id).await?;
    if !store.delete_transfer(id, scope).await? {
        return Err(AppError::not_found("Transfer not found"));
    }
    info!(transfer_id = %id, %user_id, "transfer deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::couples::services::fixtures::{pair, user};
    use crate::db::MemoryStore;
    use crate::expenses::repo_types::PartyTag;

    fn req(amount: i64, from: PartyTag, to: PartyTag) -> TransferRequest {
        TransferRequest {
            amount: Decimal::from(amount),
            from_user: from,
            to_user: to,
            description: " settle ".into(),
        }
    }

    #[test]
    fn transfer_sides_must_differ() {
        let err = validate(&req(10, PartyTag::Person1, PartyTag::Person1)).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        let ok = validate(&req(10, PartyTag::Person2, PartyTag::Person1)).unwrap();
        assert_eq!(ok.description, "settle");
    }

    #[test]
    fn transfer_amount_must_be_positive() {
        assert!(validate(&req(0, PartyTag::Person2, PartyTag::Person1)).is_err());
        assert!(validate(&req(-3, PartyTag::Person2, PartyTag::Person1)).is_err());
    }

    #[tokio::test]
    async fn transfers_are_shared_with_the_partner() {
        let store = MemoryStore::new();
        let (ann, bob, couple) = pair(&store).await;
        let now = OffsetDateTime::now_utc();

        let created = create(&store, bob.id, &req(40, PartyTag::Person2, PartyTag::Person1), now)
            .await
            .unwrap();
        assert_eq!(created.couple_id, Some(couple.id));
        assert_eq!(created.description, "settle");

        let edited = update(&store, ann.id, created.id, &req(45, PartyTag::Person2, PartyTag::Person1), now)
            .await
            .unwrap();
        assert_eq!(edited.amount, Decimal::from(45));
        assert_eq!(list(&store, bob.id).await.unwrap(), vec![edited]);

        delete(&store, ann.id, created.id).await.unwrap();
        assert!(list(&store, bob.id).await.unwrap().is_empty());
        assert!(matches!(
            delete(&store, bob.id, created.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn transfers_outside_scope_are_not_found() {
        let store = MemoryStore::new();
        let (ann, _, _) = pair(&store).await;
        let eve = user(&store, "eve@example.com").await;
        let now = OffsetDateTime::now_utc();
        let transfer = create(&store, ann.id, &req(5, PartyTag::Person1, PartyTag::Person2), now)
            .await
            .unwrap();

        assert!(matches!(
            update(&store, eve.id, transfer.id, &req(1, PartyTag::Person1, PartyTag::Person2), now).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            delete(&store, eve.id, transfer.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(list(&store, eve.id).await.unwrap().is_empty());
        assert_eq!(list(&store, ann.id).await.unwrap()[0].amount, Decimal::from(5));
    }

    #[tokio::test]
    async fn invalid_transfer_is_not_stored() {
        let store = MemoryStore::new();
        let eve = user(&store, "eve@example.com").await;
        let bad = req(5, PartyTag::Person1, PartyTag::Person1);
        assert!(create(&store, eve.id, &bad, OffsetDateTime::now_utc()).await.is_err());
        assert!(list(&store, eve.id).await.unwrap().is_empty());
    }
}
