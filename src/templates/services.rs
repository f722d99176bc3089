use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::dto::TemplateRequest;
use super::repo_types::{ExpenseTemplate, TemplateDraft};
use crate::couples::services::{active_couple_id, ledger_scope};
use crate::db::Store;
use crate::error::AppError;
use crate::expenses::services::{required_text, validate_split};

fn draft(req: &TemplateRequest) -> Result<TemplateDraft, AppError> {
    Ok(TemplateDraft {
        name: required_text(&req.name, "name")?,
        description: req.description.trim().to_string(),
        category: required_text(&req.category, "category")?,
        split: validate_split(&req.split)?,
    })
}

pub async fn list(store: &dyn Store, user_id: Uuid) -> Result<Vec<ExpenseTemplate>, AppError> {
    let scope = ledger_scope(store, user_id).await?;
    Ok(store.list_templates(scope).await?)
}

pub async fn create(
    store: &dyn Store,
    user_id: Uuid,
    req: &TemplateRequest,
    now: OffsetDateTime,
) -> Result<ExpenseTemplate, AppError> {
    let draft = draft(req)?;
    let couple_id = active_couple_id(store, user_id).await?;
    let template = ExpenseTemplate::new(user_id, couple_id, draft, now);
    store.insert_template(&template).await?;
    info!(template_id = %template.id, %user_id, "template created");
    Ok(template)
}

pub async fn update(
    store: &dyn Store,
    user_id: Uuid,
    id: Uuid,
    req: &TemplateRequest,
    now: OffsetDateTime,
) -> Result<ExpenseTemplate, AppError> {
    let draft = draft(req)?;
    let scope = ledger_scope(store, user_id).await?;
    store
        .update_template(id, scope, &draft, now)
        .await?
        .ok_or_else(|| AppError::not_found("Template not found"))
}

pub async fn delete(store: &dyn Store, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let scope = ledger_scope(store, user_id).await?;
    if !store.delete_template(id, scope).await? {
        return Err(AppError::not_found("Template not found"));
    }
    info!(template_id = %id, %user_id, "template deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::couples::services::fixtures::{pair, user};
    use crate::db::MemoryStore;
    use crate::expenses::dto::SplitInput;
    use crate::expenses::repo_types::{PartyTag, SplitType};
    use rust_decimal::Decimal;

    fn request(name: &str, total: i64, split_type: SplitType, shares: Option<(i64, i64)>) -> TemplateRequest {
        TemplateRequest {
            name: name.into(),
            description: " monthly ".into(),
            category: "Bills".into(),
            split: SplitInput {
                total_amount: Decimal::from(total),
                paid_by: PartyTag::Person1,
                split_type,
                person1_share: shares.map(|s| Decimal::from(s.0)),
                person2_share: shares.map(|s| Decimal::from(s.1)),
            },
        }
    }

    #[tokio::test]
    async fn templates_are_visible_to_both_partners_sorted_by_name() {
        let store = MemoryStore::new();
        let (ann, bob, couple) = pair(&store).await;
        let now = OffsetDateTime::now_utc();

        let rent = create(&store, ann.id, &request("Rent", 1000, SplitType::Ratio, Some((600, 400))), now)
            .await
            .unwrap();
        let internet = create(&store, bob.id, &request("Internet", 50, SplitType::Equal, None), now)
            .await
            .unwrap();
        assert_eq!(rent.couple_id, Some(couple.id));
        assert_eq!(rent.description, "monthly");
        assert_eq!(internet.person1_share, Decimal::from(25));

        let names: Vec<String> = list(&store, ann.id).await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Internet".to_string(), "Rent".to_string()]);
        assert_eq!(list(&store, bob.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn template_split_is_validated() {
        let store = MemoryStore::new();
        let ann = user(&store, "ann@example.com").await;
        let now = OffsetDateTime::now_utc();
        assert!(matches!(
            create(&store, ann.id, &request("Rent", 1000, SplitType::Exact, Some((600, 300))), now).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            create(&store, ann.id, &request(" ", 10, SplitType::Equal, None), now).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(list(&store, ann.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_respect_scope() {
        let store = MemoryStore::new();
        let (ann, bob, _) = pair(&store).await;
        let eve = user(&store, "eve@example.com").await;
        let now = OffsetDateTime::now_utc();
        let template = create(&store, ann.id, &request("Rent", 1000, SplitType::Equal, None), now)
            .await
            .unwrap();

        let renamed = request("Rent (new flat)", 1200, SplitType::Equal, None);
        assert!(matches!(
            update(&store, eve.id, template.id, &renamed, now).await,
            Err(AppError::NotFound(_))
        ));
        let updated = update(&store, bob.id, template.id, &renamed, now).await.unwrap();
        assert_eq!(updated.name, "Rent (new flat)");
        assert_eq!(updated.person2_share, Decimal::from(600));

        assert!(matches!(
            delete(&store, eve.id, template.id).await,
            Err(AppError::NotFound(_))
        ));
        delete(&store, ann.id, template.id).await.unwrap();
        assert!(list(&store, bob.id).await.unwrap().is_empty());
    }
}
