use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::UserRepo;
use crate::auth::repo_types::{Profile, User};
use crate::budgets::repo::BudgetRepo;
use crate::budgets::repo_types::{Budget, BudgetKey};
use crate::config::AppConfig;
use crate::couples::repo::CoupleRepo;
use crate::couples::repo_types::{
    AcceptOutcome, Couple, CoupleStatus, Invitation, InvitationStatus,
};
use crate::db::{map_unique, timed, Scope, StoreError, StoreResult, Window};
use crate::expenses::repo::ExpenseRepo;
use crate::expenses::repo_types::{CategoryTotal, Expense, ExpenseComment, ExpenseDraft};
use crate::settings::repo::SettingsRepo;
use crate::settings::repo_types::{Preferences, Settings};
use crate::templates::repo::TemplateRepo;
use crate::templates::repo_types::{ExpenseTemplate, TemplateDraft};
use crate::transfers::repo::TransferRepo;
use crate::transfers::repo_types::{Transfer, TransferDraft};

const USER_COLS: &str = "id, external_uid, email, name, auth_provider, email_verified, \
    profile_picture, payment_handle, created_at, updated_at";
const COUPLE_COLS: &str = "id, user1_id, user2_id, status, created_at, updated_at";
const INVITATION_COLS: &str =
    "id, couple_id, inviter_id, invitee_email, token, expires_at, status, created_at, updated_at";
const EXPENSE_COLS: &str = "id, user_id, couple_id, description, total_amount, category, paid_by, \
    split_type, person1_share, person2_share, notes, comments, created_at, updated_at";
const TRANSFER_COLS: &str =
    "id, user_id, couple_id, amount, from_user, to_user, description, created_at, updated_at";
const SETTINGS_COLS: &str =
    "id, user_id, couple_id, theme, currency, notifications, created_at, updated_at";
const BUDGET_COLS: &str =
    "id, couple_id, category, amount, month, year, alert_percent, created_at, updated_at";
const TEMPLATE_COLS: &str = "id, user_id, couple_id, name, description, total_amount, category, \
    paid_by, split_type, person1_share, person2_share, created_at, updated_at";

/// Postgres-backed store. Every call is bounded by `timeout`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgStore {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.store_timeout())
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self::new(pool, config.store_timeout()))
    }

    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Locks the given user rows in id order so concurrent transitions can't deadlock.
async fn lock_users(tx: &mut Transaction<'_, Postgres>, ids: &[Uuid]) -> StoreResult<()> {
    let mut ids = ids.to_vec();
    ids.sort();
    ids.dedup();
    sqlx::query("SELECT id FROM users WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(&ids)
        .fetch_all(&mut **tx)
        .await?;
    Ok(())
}

async fn has_active_couple(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> StoreResult<bool> {
    let found: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM couples
            WHERE status = 'active' AND (user1_id = $1 OR user2_id = $1)
        )
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(found)
}

async fn link_settings(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    couple_id: Uuid,
    now: OffsetDateTime,
) -> StoreResult<()> {
    let defaults = Settings::defaults(user_id, now);
    sqlx::query(
        r#"
        INSERT INTO settings (id, user_id, couple_id, theme, currency, notifications, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        ON CONFLICT (user_id) DO UPDATE
            SET couple_id = EXCLUDED.couple_id, updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(defaults.id)
    .bind(user_id)
    .bind(couple_id)
    .bind(defaults.theme)
    .bind(&defaults.currency)
    .bind(defaults.notifications)
    .bind(now)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl UserRepo for PgStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLS} FROM users WHERE id = $1");
        timed(
            self.timeout,
            sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_user_by_external_uid(&self, uid: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLS} FROM users WHERE external_uid = $1");
        timed(
            self.timeout,
            sqlx::query_as::<_, User>(&sql).bind(uid).fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLS} FROM users WHERE email = $1");
        timed(
            self.timeout,
            sqlx::query_as::<_, User>(&sql).bind(email).fetch_optional(&self.pool),
        )
        .await
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        timed(self.timeout, async {
            sqlx::query(
                r#"
                INSERT INTO users (id, external_uid, email, name, auth_provider, email_verified,
                                   profile_picture, payment_handle, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(user.id)
            .bind(&user.external_uid)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.auth_provider)
            .bind(user.email_verified)
            .bind(&user.profile_picture)
            .bind(&user.payment_handle)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique(e, "user"))?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn update_user_profile(
        &self,
        id: Uuid,
        profile: &Profile,
        now: OffsetDateTime,
    ) -> StoreResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
            SET name = $2, auth_provider = $3, email_verified = $4, profile_picture = $5, updated_at = $6
            WHERE id = $1
            RETURNING {USER_COLS}
            "#
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, User>(&sql)
                .bind(id)
                .bind(&profile.name)
                .bind(&profile.auth_provider)
                .bind(profile.email_verified)
                .bind(&profile.profile_picture)
                .bind(now)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn set_payment_handle(
        &self,
        id: Uuid,
        handle: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET payment_handle = $2, updated_at = $3 WHERE id = $1 RETURNING {USER_COLS}"
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, User>(&sql)
                .bind(id)
                .bind(handle)
                .bind(now)
                .fetch_optional(&self.pool),
        )
        .await
    }
}

#[async_trait]
impl CoupleRepo for PgStore {
    async fn find_couple(&self, id: Uuid) -> StoreResult<Option<Couple>> {
        let sql = format!("SELECT {COUPLE_COLS} FROM couples WHERE id = $1");
        timed(
            self.timeout,
            sqlx::query_as::<_, Couple>(&sql).bind(id).fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_active_couple(&self, user_id: Uuid) -> StoreResult<Option<Couple>> {
        let sql = format!(
            r#"
            SELECT {COUPLE_COLS} FROM couples
            WHERE status = 'active' AND (user1_id = $1 OR user2_id = $1)
            LIMIT 1
            "#
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, Couple>(&sql).bind(user_id).fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_pending_couple_by_inviter(&self, user_id: Uuid) -> StoreResult<Option<Couple>> {
        let sql = format!(
            r#"
            SELECT {COUPLE_COLS} FROM couples
            WHERE status = 'pending' AND user1_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, Couple>(&sql).bind(user_id).fetch_optional(&self.pool),
        )
        .await
    }

    async fn insert_couple(&self, couple: &Couple) -> StoreResult<()> {
        timed(self.timeout, async {
            sqlx::query(
                r#"
                INSERT INTO couples (id, user1_id, user2_id, status, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(couple.id)
            .bind(couple.user1_id)
            .bind(couple.user2_id)
            .bind(couple.status)
            .bind(couple.created_at)
            .bind(couple.updated_at)
            .execute(&self.pool)
            .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn delete_couple(&self, id: Uuid) -> StoreResult<bool> {
        timed(self.timeout, async {
            let res = sqlx::query("DELETE FROM couples WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            Ok::<_, StoreError>(res.rows_affected() > 0)
        })
        .await
    }

    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()> {
        timed(self.timeout, async {
            sqlx::query(
                r#"
                INSERT INTO invitations (id, couple_id, inviter_id, invitee_email, token,
                                         expires_at, status, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(invitation.id)
            .bind(invitation.couple_id)
            .bind(invitation.inviter_id)
            .bind(&invitation.invitee_email)
            .bind(&invitation.token)
            .bind(invitation.expires_at)
            .bind(invitation.status)
            .bind(invitation.created_at)
            .bind(invitation.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique(e, "invitation"))?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn find_invitation_by_token(&self, token: &str) -> StoreResult<Option<Invitation>> {
        let sql = format!("SELECT {INVITATION_COLS} FROM invitations WHERE token = $1");
        timed(
            self.timeout,
            sqlx::query_as::<_, Invitation>(&sql).bind(token).fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_pending_invitation_for_couple(
        &self,
        couple_id: Uuid,
    ) -> StoreResult<Option<Invitation>> {
        let sql = format!(
            r#"
            SELECT {INVITATION_COLS} FROM invitations
            WHERE couple_id = $1 AND status = 'pending'
            ORDER BY created_at DESC
            LIMIT 1
            "#
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, Invitation>(&sql)
                .bind(couple_id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn expire_invitation(&self, id: Uuid, now: OffsetDateTime) -> StoreResult<bool> {
        timed(self.timeout, async {
            let res = sqlx::query(
                "UPDATE invitations SET status = $2, updated_at = $3 WHERE id = $1 AND status = 'pending'",
            )
            .bind(id)
            .bind(InvitationStatus::Expired)
            .bind(now)
            .execute(&self.pool)
            .await?;
            Ok::<_, StoreError>(res.rows_affected() > 0)
        })
        .await
    }

    async fn accept_invitation(
        &self,
        invitation: &Invitation,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> StoreResult<AcceptOutcome> {
        timed(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            let inv_sql =
                format!("SELECT {INVITATION_COLS} FROM invitations WHERE id = $1 FOR UPDATE");
            let current = sqlx::query_as::<_, Invitation>(&inv_sql)
                .bind(invitation.id)
                .fetch_optional(&mut *tx)
                .await?;
            match current {
                Some(inv) if inv.status == InvitationStatus::Pending && !inv.is_expired(now) => {}
                _ => return Ok(AcceptOutcome::InvitationNotPending),
            }

            let couple_sql = format!("SELECT {COUPLE_COLS} FROM couples WHERE id = $1 FOR UPDATE");
            let couple = match sqlx::query_as::<_, Couple>(&couple_sql)
                .bind(invitation.couple_id)
                .fetch_optional(&mut *tx)
                .await?
            {
                Some(c) if c.status == CoupleStatus::Pending => c,
                _ => return Ok(AcceptOutcome::CoupleNotPending),
            };

            lock_users(&mut tx, &[couple.user1_id, user_id]).await?;
            for member in [couple.user1_id, user_id] {
                if has_active_couple(&mut tx, member).await? {
                    return Ok(AcceptOutcome::AlreadyCoupled(member));
                }
            }

            let activate_sql = format!(
                r#"
                UPDATE couples SET user2_id = $2, status = $3, updated_at = $4
                WHERE id = $1
                RETURNING {COUPLE_COLS}
                "#
            );
            let activated = sqlx::query_as::<_, Couple>(&activate_sql)
                .bind(couple.id)
                .bind(user_id)
                .bind(CoupleStatus::Active)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?;

            sqlx::query("UPDATE invitations SET status = $2, updated_at = $3 WHERE id = $1")
                .bind(invitation.id)
                .bind(InvitationStatus::Accepted)
                .bind(now)
                .execute(&mut *tx)
                .await?;

            link_settings(&mut tx, activated.user1_id, activated.id, now).await?;
            link_settings(&mut tx, user_id, activated.id, now).await?;

            tx.commit().await?;
            Ok::<_, StoreError>(AcceptOutcome::Accepted(activated))
        })
        .await
    }

    async fn reject_invitation(
        &self,
        invitation: &Invitation,
        now: OffsetDateTime,
    ) -> StoreResult<bool> {
        timed(self.timeout, async {
            let mut tx = self.pool.begin().await?;
            let res = sqlx::query(
                "UPDATE invitations SET status = $2, updated_at = $3 WHERE id = $1 AND status = 'pending'",
            )
            .bind(invitation.id)
            .bind(InvitationStatus::Rejected)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            if res.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(false);
            }
            sqlx::query("DELETE FROM couples WHERE id = $1 AND status = 'pending'")
                .bind(invitation.couple_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok::<_, StoreError>(true)
        })
        .await
    }

    async fn deactivate_active_couple(
        &self,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Couple>> {
        timed(self.timeout, async {
            let mut tx = self.pool.begin().await?;
            lock_users(&mut tx, &[user_id]).await?;
            let sql = format!(
                r#"
                UPDATE couples SET status = $2, updated_at = $3
                WHERE status = 'active' AND (user1_id = $1 OR user2_id = $1)
                RETURNING {COUPLE_COLS}
                "#
            );
            let couple = sqlx::query_as::<_, Couple>(&sql)
                .bind(user_id)
                .bind(CoupleStatus::Inactive)
                .bind(now)
                .fetch_optional(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok::<_, StoreError>(couple)
        })
        .await
    }
}

#[async_trait]
impl ExpenseRepo for PgStore {
    async fn list_expenses(&self, scope: Scope) -> StoreResult<Vec<Expense>> {
        let sql = format!(
            r#"
            SELECT {EXPENSE_COLS} FROM expenses
            WHERE (user_id = $1 OR couple_id = $2)
            ORDER BY created_at DESC
            "#
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, Expense>(&sql)
                .bind(scope.user_id)
                .bind(scope.couple_id)
                .fetch_all(&self.pool),
        )
        .await
    }

    async fn list_expenses_between(
        &self,
        scope: Scope,
        window: Window,
    ) -> StoreResult<Vec<Expense>> {
        let sql = format!(
            r#"
            SELECT {EXPENSE_COLS} FROM expenses
            WHERE (user_id = $1 OR couple_id = $2)
              AND created_at >= $3 AND created_at < $4
            ORDER BY created_at ASC
            "#
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, Expense>(&sql)
                .bind(scope.user_id)
                .bind(scope.couple_id)
                .bind(window.start)
                .bind(window.end)
                .fetch_all(&self.pool),
        )
        .await
    }

    async fn insert_expense(&self, expense: &Expense) -> StoreResult<()> {
        timed(self.timeout, async {
            sqlx::query(
                r#"
                INSERT INTO expenses (id, user_id, couple_id, description, total_amount, category,
                                      paid_by, split_type, person1_share, person2_share, notes,
                                      comments, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                "#,
            )
            .bind(expense.id)
            .bind(expense.user_id)
            .bind(expense.couple_id)
            .bind(&expense.description)
            .bind(expense.total_amount)
            .bind(&expense.category)
            .bind(expense.paid_by)
            .bind(expense.split_type)
            .bind(expense.person1_share)
            .bind(expense.person2_share)
            .bind(&expense.notes)
            .bind(Json(&expense.comments))
            .bind(expense.created_at)
            .bind(expense.updated_at)
            .execute(&self.pool)
            .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn update_expense(
        &self,
        id: Uuid,
        scope: Scope,
        draft: &ExpenseDraft,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Expense>> {
        let sql = format!(
            r#"
            UPDATE expenses
            SET description = $4, category = $5, notes = $6, total_amount = $7, paid_by = $8,
                split_type = $9, person1_share = $10, person2_share = $11, updated_at = $12
            WHERE id = $1 AND (user_id = $2 OR couple_id = $3)
            RETURNING {EXPENSE_COLS}
            "#
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, Expense>(&sql)
                .bind(id)
                .bind(scope.user_id)
                .bind(scope.couple_id)
                .bind(&draft.description)
                .bind(&draft.category)
                .bind(&draft.notes)
                .bind(draft.split.total_amount)
                .bind(draft.split.paid_by)
                .bind(draft.split.split_type)
                .bind(draft.split.person1_share)
                .bind(draft.split.person2_share)
                .bind(now)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn delete_expense(&self, id: Uuid, scope: Scope) -> StoreResult<bool> {
        timed(self.timeout, async {
            let res = sqlx::query(
                "DELETE FROM expenses WHERE id = $1 AND (user_id = $2 OR couple_id = $3)",
            )
            .bind(id)
            .bind(scope.user_id)
            .bind(scope.couple_id)
            .execute(&self.pool)
            .await?;
            Ok::<_, StoreError>(res.rows_affected() > 0)
        })
        .await
    }

    async fn append_comment(
        &self,
        id: Uuid,
        scope: Scope,
        comment: &ExpenseComment,
    ) -> StoreResult<Option<Expense>> {
        let sql = format!(
            r#"
            UPDATE expenses
            SET comments = comments || $4, updated_at = $5
            WHERE id = $1 AND (user_id = $2 OR couple_id = $3)
            RETURNING {EXPENSE_COLS}
            "#
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, Expense>(&sql)
                .bind(id)
                .bind(scope.user_id)
                .bind(scope.couple_id)
                .bind(Json([comment]))
                .bind(comment.created_at)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn category_totals(
        &self,
        scope: Scope,
        window: Window,
    ) -> StoreResult<Vec<CategoryTotal>> {
        timed(
            self.timeout,
            sqlx::query_as::<_, CategoryTotal>(
                r#"
                SELECT category, SUM(total_amount) AS total, COUNT(*) AS count
                FROM expenses
                WHERE (user_id = $1 OR couple_id = $2)
                  AND created_at >= $3 AND created_at < $4
                GROUP BY category
                ORDER BY total DESC, category ASC
                "#,
            )
            .bind(scope.user_id)
            .bind(scope.couple_id)
            .bind(window.start)
            .bind(window.end)
            .fetch_all(&self.pool),
        )
        .await
    }
}

#[async_trait]
impl TransferRepo for PgStore {
    async fn list_transfers(&self, scope: Scope) -> StoreResult<Vec<Transfer>> {
        let sql = format!(
            r#"
            SELECT {TRANSFER_COLS} FROM transfers
            WHERE (user_id = $1 OR couple_id = $2)
            ORDER BY created_at DESC
            "#
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, Transfer>(&sql)
                .bind(scope.user_id)
                .bind(scope.couple_id)
                .fetch_all(&self.pool),
        )
        .await
    }

    async fn list_transfers_between(
        &self,
        scope: Scope,
        window: Window,
    ) -> StoreResult<Vec<Transfer>> {
        let sql = format!(
            r#"
            SELECT {TRANSFER_COLS} FROM transfers
            WHERE (user_id = $1 OR couple_id = $2)
              AND created_at >= $3 AND created_at < $4
            ORDER BY created_at ASC
            "#
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, Transfer>(&sql)
                .bind(scope.user_id)
                .bind(scope.couple_id)
                .bind(window.start)
                .bind(window.end)
                .fetch_all(&self.pool),
        )
        .await
    }

    async fn insert_transfer(&self, transfer: &Transfer) -> StoreResult<()> {
        timed(self.timeout, async {
            sqlx::query(
                r#"
                INSERT INTO transfers (id, user_id, couple_id, amount, from_user, to_user,
                                       description, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(transfer.id)
            .bind(transfer.user_id)
            .bind(transfer.couple_id)
            .bind(transfer.amount)
            .bind(transfer.from_user)
            .bind(transfer.to_user)
            .bind(&transfer.description)
            .bind(transfer.created_at)
            .bind(transfer.updated_at)
            .execute(&self.pool)
            .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn update_transfer(
        &self,
        id: Uuid,
        scope: Scope,
        draft: &TransferDraft,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Transfer>> {
        let sql = format!(
            r#"
            UPDATE transfers
            SET amount = $4, from_user = $5, to_user = $6, description = $7, updated_at = $8
            WHERE id = $1 AND (user_id = $2 OR couple_id = $3)
            RETURNING {TRANSFER_COLS}
            "#
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, Transfer>(&sql)
                .bind(id)
                .bind(scope.user_id)
                .bind(scope.couple_id)
                .bind(draft.amount)
                .bind(draft.from_user)
                .bind(draft.to_user)
                .bind(&draft.description)
                .bind(now)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn delete_transfer(&self, id: Uuid, scope: Scope) -> StoreResult<bool> {
        timed(self.timeout, async {
            let res = sqlx::query(
                "DELETE FROM transfers WHERE id = $1 AND (user_id = $2 OR couple_id = $3)",
            )
            .bind(id)
            .bind(scope.user_id)
            .bind(scope.couple_id)
            .execute(&self.pool)
            .await?;
            Ok::<_, StoreError>(res.rows_affected() > 0)
        })
        .await
    }
}

#[async_trait]
impl SettingsRepo for PgStore {
    async fn find_settings(&self, user_id: Uuid) -> StoreResult<Option<Settings>> {
        let sql = format!("SELECT {SETTINGS_COLS} FROM settings WHERE user_id = $1");
        timed(
            self.timeout,
            sqlx::query_as::<_, Settings>(&sql).bind(user_id).fetch_optional(&self.pool),
        )
        .await
    }

    async fn upsert_settings(
        &self,
        user_id: Uuid,
        prefs: &Preferences,
        now: OffsetDateTime,
    ) -> StoreResult<Settings> {
        let sql = format!(
            r#"
            INSERT INTO settings (id, user_id, couple_id, theme, currency, notifications, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            ON CONFLICT (user_id) DO UPDATE
                SET theme = EXCLUDED.theme,
                    currency = EXCLUDED.currency,
                    notifications = EXCLUDED.notifications,
                    couple_id = COALESCE(EXCLUDED.couple_id, settings.couple_id),
                    updated_at = EXCLUDED.updated_at
            RETURNING {SETTINGS_COLS}
            "#
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, Settings>(&sql)
                .bind(Uuid::new_v4())
                .bind(user_id)
                .bind(prefs.couple_id)
                .bind(prefs.theme)
                .bind(&prefs.currency)
                .bind(prefs.notifications)
                .bind(now)
                .fetch_one(&self.pool),
        )
        .await
    }
}

#[async_trait]
impl BudgetRepo for PgStore {
    async fn list_budgets(
        &self,
        couple_id: Uuid,
        month: i32,
        year: i32,
    ) -> StoreResult<Vec<Budget>> {
        let sql = format!(
            r#"
            SELECT {BUDGET_COLS} FROM budgets
            WHERE couple_id = $1 AND month = $2 AND year = $3
            ORDER BY category ASC
            "#
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, Budget>(&sql)
                .bind(couple_id)
                .bind(month)
                .bind(year)
                .fetch_all(&self.pool),
        )
        .await
    }

    async fn find_budget_by_key(&self, key: &BudgetKey) -> StoreResult<Option<Budget>> {
        let sql = format!(
            r#"
            SELECT {BUDGET_COLS} FROM budgets
            WHERE couple_id = $1 AND category = $2 AND month = $3 AND year = $4
            "#
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, Budget>(&sql)
                .bind(key.couple_id)
                .bind(&key.category)
                .bind(key.month)
                .bind(key.year)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn insert_budget(&self, budget: &Budget) -> StoreResult<()> {
        timed(self.timeout, async {
            sqlx::query(
                r#"
                INSERT INTO budgets (id, couple_id, category, amount, month, year, alert_percent,
                                     created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(budget.id)
            .bind(budget.couple_id)
            .bind(&budget.category)
            .bind(budget.amount)
            .bind(budget.month)
            .bind(budget.year)
            .bind(budget.alert_percent)
            .bind(budget.created_at)
            .bind(budget.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique(e, "budget"))?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn update_budget_limits(
        &self,
        key: &BudgetKey,
        amount: Decimal,
        alert_percent: Decimal,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Budget>> {
        let sql = format!(
            r#"
            UPDATE budgets SET amount = $5, alert_percent = $6, updated_at = $7
            WHERE couple_id = $1 AND category = $2 AND month = $3 AND year = $4
            RETURNING {BUDGET_COLS}
            "#
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, Budget>(&sql)
                .bind(key.couple_id)
                .bind(&key.category)
                .bind(key.month)
                .bind(key.year)
                .bind(amount)
                .bind(alert_percent)
                .bind(now)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn delete_budget(&self, id: Uuid, couple_id: Uuid) -> StoreResult<bool> {
        timed(self.timeout, async {
            let res = sqlx::query("DELETE FROM budgets WHERE id = $1 AND couple_id = $2")
                .bind(id)
                .bind(couple_id)
                .execute(&self.pool)
                .await?;
            Ok::<_, StoreError>(res.rows_affected() > 0)
        })
        .await
    }
}

#[async_trait]
impl TemplateRepo for PgStore {
    async fn list_templates(&self, scope: Scope) -> StoreResult<Vec<ExpenseTemplate>> {
        let sql = format!(
            r#"
            SELECT {TEMPLATE_COLS} FROM expense_templates
            WHERE (user_id = $1 OR couple_id = $2)
            ORDER BY name ASC
            "#
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, ExpenseTemplate>(&sql)
                .bind(scope.user_id)
                .bind(scope.couple_id)
                .fetch_all(&self.pool),
        )
        .await
    }

    async fn insert_template(&self, template: &ExpenseTemplate) -> StoreResult<()> {
        timed(self.timeout, async {
            sqlx::query(
                r#"
                INSERT INTO expense_templates (id, user_id, couple_id, name, description,
                                               total_amount, category, paid_by, split_type,
                                               person1_share, person2_share, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(template.id)
            .bind(template.user_id)
            .bind(template.couple_id)
            .bind(&template.name)
            .bind(&template.description)
            .bind(template.total_amount)
            .bind(&template.category)
            .bind(template.paid_by)
            .bind(template.split_type)
            .bind(template.person1_share)
            .bind(template.person2_share)
            .bind(template.created_at)
            .bind(template.updated_at)
            .execute(&self.pool)
            .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn update_template(
        &self,
        id: Uuid,
        scope: Scope,
        draft: &TemplateDraft,
        now: OffsetDateTime,
    ) -> StoreResult<Option<ExpenseTemplate>> {
        let sql = format!(
            r#"
            UPDATE expense_templates
            SET name = $4, description = $5, category = $6, total_amount = $7, paid_by = $8,
                split_type = $9, person1_share = $10, person2_share = $11, updated_at = $12
            WHERE id = $1 AND (user_id = $2 OR couple_id = $3)
            RETURNING {TEMPLATE_COLS}
            "#
        );
        timed(
            self.timeout,
            sqlx::query_as::<_, ExpenseTemplate>(&sql)
                .bind(id)
                .bind(scope.user_id)
                .bind(scope.couple_id)
                .bind(&draft.name)
                .bind(&draft.description)
                .bind(&draft.category)
                .bind(draft.split.total_amount)
                .bind(draft.split.paid_by)
                .bind(draft.split.split_type)
                .bind(draft.split.person1_share)
                .bind(draft.split.person2_share)
                .bind(now)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn delete_template(&self, id: Uuid, scope: Scope) -> StoreResult<bool> {
        timed(self.timeout, async {
            let res = sqlx::query(
                "DELETE FROM expense_templates WHERE id = $1 AND (user_id = $2 OR couple_id = $3)",
            )
            .bind(id)
            .bind(scope.user_id)
            .bind(scope.couple_id)
            .execute(&self.pool)
            .await?;
            Ok::<_, StoreError>(res.rows_affected() > 0)
        })
        .await
    }
}
