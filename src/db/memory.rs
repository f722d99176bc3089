//! In-process store. Each method takes the single table lock once, so every
//! operation (including the couple transitions) is atomic.
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::UserRepo;
use crate::auth::repo_types::{Profile, User};
use crate::budgets::repo::BudgetRepo;
use crate::budgets::repo_types::{Budget, BudgetKey};
use crate::couples::repo::CoupleRepo;
use crate::couples::repo_types::{
    AcceptOutcome, Couple, CoupleStatus, Invitation, InvitationStatus,
};
use crate::db::{Scope, StoreError, StoreResult, Window};
use crate::expenses::repo::ExpenseRepo;
use crate::expenses::repo_types::{CategoryTotal, Expense, ExpenseComment, ExpenseDraft};
use crate::settings::repo::SettingsRepo;
use crate::settings::repo_types::{Preferences, Settings};
use crate::templates::repo::TemplateRepo;
use crate::templates::repo_types::{ExpenseTemplate, TemplateDraft};
use crate::transfers::repo::TransferRepo;
use crate::transfers::repo_types::{Transfer, TransferDraft};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    couples: Vec<Couple>,
    invitations: Vec<Invitation>,
    expenses: Vec<Expense>,
    transfers: Vec<Transfer>,
    settings: Vec<Settings>,
    budgets: Vec<Budget>,
    templates: Vec<ExpenseTemplate>,
    fail_invitation_inserts: bool,
}

impl Tables {
    fn active_couple_of(&self, user_id: Uuid) -> Option<&Couple> {
        self.couples
            .iter()
            .find(|c| c.status == CoupleStatus::Active && c.includes(user_id))
    }

    fn link_settings(&mut self, user_id: Uuid, couple_id: Uuid, now: OffsetDateTime) {
        match self.settings.iter_mut().find(|s| s.user_id == user_id) {
            Some(existing) => {
                existing.couple_id = Some(couple_id);
                existing.updated_at = now;
            }
            None => {
                let mut fresh = Settings::defaults(user_id, now);
                fresh.couple_id = Some(couple_id);
                self.settings.push(fresh);
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Other(anyhow::anyhow!("memory store lock poisoned")))
    }

    /// Make every following `insert_invitation` fail, to exercise the invite rollback.
    pub fn fail_invitation_inserts(&self) {
        if let Ok(mut t) = self.tables.lock() {
            t.fail_invitation_inserts = true;
        }
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_external_uid(&self, uid: &str) -> StoreResult<Option<User>> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.external_uid == uid)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut t = self.lock()?;
        if t
            .users
            .iter()
            .any(|u| u.email == user.email || u.external_uid == user.external_uid)
        {
            return Err(StoreError::Conflict("user already exists".into()));
        }
        t.users.push(user.clone());
        Ok(())
    }

    async fn update_user_profile(
        &self,
        id: Uuid,
        profile: &Profile,
        now: OffsetDateTime,
    ) -> StoreResult<Option<User>> {
        let mut t = self.lock()?;
        Ok(t.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.name = profile.name.clone();
            u.auth_provider = profile.auth_provider.clone();
            u.email_verified = profile.email_verified;
            u.profile_picture = profile.profile_picture.clone();
            u.updated_at = now;
            u.clone()
        }))
    }

    async fn set_payment_handle(
        &self,
        id: Uuid,
        handle: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Option<User>> {
        let mut t = self.lock()?;
        Ok(t.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.payment_handle = Some(handle.to_string());
            u.updated_at = now;
            u.clone()
        }))
    }
}

#[async_trait]
impl CoupleRepo for MemoryStore {
    async fn find_couple(&self, id: Uuid) -> StoreResult<Option<Couple>> {
        Ok(self.lock()?.couples.iter().find(|c| c.id == id).cloned())
    }

    async fn find_active_couple(&self, user_id: Uuid) -> StoreResult<Option<Couple>> {
        Ok(self.lock()?.active_couple_of(user_id).cloned())
    }

    async fn find_pending_couple_by_inviter(&self, user_id: Uuid) -> StoreResult<Option<Couple>> {
        Ok(self
            .lock()?
            .couples
            .iter()
            .filter(|c| c.status == CoupleStatus::Pending && c.user1_id == user_id)
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn insert_couple(&self, couple: &Couple) -> StoreResult<()> {
        self.lock()?.couples.push(couple.clone());
        Ok(())
    }

    async fn delete_couple(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.lock()?;
        let before = t.couples.len();
        t.couples.retain(|c| c.id != id);
        Ok(t.couples.len() != before)
    }

    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()> {
        let mut t = self.lock()?;
        if t.fail_invitation_inserts {
            return Err(StoreError::Other(anyhow::anyhow!("invitation insert refused")));
        }
        if t.invitations.iter().any(|i| i.token == invitation.token) {
            return Err(StoreError::Conflict("invitation token already exists".into()));
        }
        t.invitations.push(invitation.clone());
        Ok(())
    }

    async fn find_invitation_by_token(&self, token: &str) -> StoreResult<Option<Invitation>> {
        Ok(self
            .lock()?
            .invitations
            .iter()
            .find(|i| i.token == token)
            .cloned())
    }

    async fn find_pending_invitation_for_couple(
        &self,
        couple_id: Uuid,
    ) -> StoreResult<Option<Invitation>> {
        Ok(self
            .lock()?
            .invitations
            .iter()
            .find(|i| i.couple_id == couple_id && i.status == InvitationStatus::Pending)
            .cloned())
    }

    async fn expire_invitation(&self, id: Uuid, now: OffsetDateTime) -> StoreResult<bool> {
        let mut t = self.lock()?;
        match t
            .invitations
            .iter_mut()
            .find(|i| i.id == id && i.status == InvitationStatus::Pending)
        {
            Some(inv) => {
                inv.status = InvitationStatus::Expired;
                inv.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn accept_invitation(
        &self,
        invitation: &Invitation,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> StoreResult<AcceptOutcome> {
        let mut t = self.lock()?;

        let still_pending = t.invitations.iter().any(|i| {
            i.id == invitation.id && i.status == InvitationStatus::Pending && now <= i.expires_at
        });
        if !still_pending {
            return Ok(AcceptOutcome::InvitationNotPending);
        }
        let Some(couple) = t
            .couples
            .iter()
            .find(|c| c.id == invitation.couple_id && c.status == CoupleStatus::Pending)
            .cloned()
        else {
            return Ok(AcceptOutcome::CoupleNotPending);
        };
        for member in [couple.user1_id, user_id] {
            if t.active_couple_of(member).is_some() {
                return Ok(AcceptOutcome::AlreadyCoupled(member));
            }
        }

        let mut activated = couple;
        activated.user2_id = Some(user_id);
        activated.status = CoupleStatus::Active;
        activated.updated_at = now;
        if let Some(slot) = t.couples.iter_mut().find(|c| c.id == activated.id) {
            *slot = activated.clone();
        }
        if let Some(inv) = t.invitations.iter_mut().find(|i| i.id == invitation.id) {
            inv.status = InvitationStatus::Accepted;
            inv.updated_at = now;
        }
        t.link_settings(activated.user1_id, activated.id, now);
        t.link_settings(user_id, activated.id, now);

        Ok(AcceptOutcome::Accepted(activated))
    }

    async fn reject_invitation(
        &self,
        invitation: &Invitation,
        now: OffsetDateTime,
    ) -> StoreResult<bool> {
        let mut t = self.lock()?;
        let Some(inv) = t
            .invitations
            .iter_mut()
            .find(|i| i.id == invitation.id && i.status == InvitationStatus::Pending)
        else {
            return Ok(false);
        };
        inv.status = InvitationStatus::Rejected;
        inv.updated_at = now;
        t.couples
            .retain(|c| !(c.id == invitation.couple_id && c.status == CoupleStatus::Pending));
        Ok(true)
    }

    async fn deactivate_active_couple(
        &self,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Couple>> {
        let mut t = self.lock()?;
        Ok(t
            .couples
            .iter_mut()
            .find(|c| c.status == CoupleStatus::Active && c.includes(user_id))
            .map(|c| {
                c.status = CoupleStatus::Inactive;
                c.updated_at = now;
                c.clone()
            }))
    }
}

#[async_trait]
impl ExpenseRepo for MemoryStore {
    async fn list_expenses(&self, scope: Scope) -> StoreResult<Vec<Expense>> {
        let mut rows: Vec<Expense> = self
            .lock()?
            .expenses
            .iter()
            .filter(|e| scope.contains(e.user_id, e.couple_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn list_expenses_between(
        &self,
        scope: Scope,
        window: Window,
    ) -> StoreResult<Vec<Expense>> {
        let mut rows: Vec<Expense> = self
            .lock()?
            .expenses
            .iter()
            .filter(|e| scope.contains(e.user_id, e.couple_id) && window.contains(e.created_at))
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.created_at);
        Ok(rows)
    }

    async fn insert_expense(&self, expense: &Expense) -> StoreResult<()> {
        self.lock()?.expenses.push(expense.clone());
        Ok(())
    }

    async fn update_expense(
        &self,
        id: Uuid,
        scope: Scope,
        draft: &ExpenseDraft,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Expense>> {
        let mut t = self.lock()?;
        Ok(t
            .expenses
            .iter_mut()
            .find(|e| e.id == id && scope.contains(e.user_id, e.couple_id))
            .map(|e| {
                e.apply(draft.clone(), now);
                e.clone()
            }))
    }

    async fn delete_expense(&self, id: Uuid, scope: Scope) -> StoreResult<bool> {
        let mut t = self.lock()?;
        let before = t.expenses.len();
        t.expenses
            .retain(|e| !(e.id == id && scope.contains(e.user_id, e.couple_id)));
        Ok(t.expenses.len() != before)
    }

    async fn append_comment(
        &self,
        id: Uuid,
        scope: Scope,
        comment: &ExpenseComment,
    ) -> StoreResult<Option<Expense>> {
        let mut t = self.lock()?;
        Ok(t
            .expenses
            .iter_mut()
            .find(|e| e.id == id && scope.contains(e.user_id, e.couple_id))
            .map(|e| {
                e.comments.push(comment.clone());
                e.updated_at = comment.created_at;
                e.clone()
            }))
    }

    async fn category_totals(
        &self,
        scope: Scope,
        window: Window,
    ) -> StoreResult<Vec<CategoryTotal>> {
        let t = self.lock()?;
        let mut groups: HashMap<&str, (Decimal, i64)> = HashMap::new();
        for e in t
            .expenses
            .iter()
            .filter(|e| scope.contains(e.user_id, e.couple_id) && window.contains(e.created_at))
        {
            let entry = groups.entry(e.category.as_str()).or_default();
            entry.0 += e.total_amount;
            entry.1 += 1;
        }
        let mut rows: Vec<CategoryTotal> = groups
            .into_iter()
            .map(|(category, (total, count))| CategoryTotal {
                category: category.to_string(),
                total,
                count,
            })
            .collect();
        rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
        Ok(rows)
    }
}

#[async_trait]
impl TransferRepo for MemoryStore {
    async fn list_transfers(&self, scope: Scope) -> StoreResult<Vec<Transfer>> {
        let mut rows: Vec<Transfer> = self
            .lock()?
            .transfers
            .iter()
            .filter(|x| scope.contains(x.user_id, x.couple_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn list_transfers_between(
        &self,
        scope: Scope,
        window: Window,
    ) -> StoreResult<Vec<Transfer>> {
        let mut rows: Vec<Transfer> = self
            .lock()?
            .transfers
            .iter()
            .filter(|x| scope.contains(x.user_id, x.couple_id) && window.contains(x.created_at))
            .cloned()
            .collect();
        rows.sort_by_key(|x| x.created_at);
        Ok(rows)
    }

    async fn insert_transfer(&self, transfer: &Transfer) -> StoreResult<()> {
        self.lock()?.transfers.push(transfer.clone());
        Ok(())
    }

    async fn update_transfer(
        &self,
        id: Uuid,
        scope: Scope,
        draft: &TransferDraft,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Transfer>> {
        let mut t = self.lock()?;
        Ok(t
            .transfers
            .iter_mut()
            .find(|x| x.id == id && scope.contains(x.user_id, x.couple_id))
            .map(|x| {
                x.amount = draft.amount;
                x.from_user = draft.from_user;
                x.to_user = draft.to_user;
                x.description = draft.description.clone();
                x.updated_at = now;
                x.clone()
            }))
    }

    async fn delete_transfer(&self, id: Uuid, scope: Scope) -> StoreResult<bool> {
        let mut t = self.lock()?;
        let before = t.transfers.len();
        t.transfers
            .retain(|x| !(x.id == id && scope.contains(x.user_id, x.couple_id)));
        Ok(t.transfers.len() != before)
    }
}

#[async_trait]
impl SettingsRepo for MemoryStore {
    async fn find_settings(&self, user_id: Uuid) -> StoreResult<Option<Settings>> {
        Ok(self
            .lock()?
            .settings
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn upsert_settings(
        &self,
        user_id: Uuid,
        prefs: &Preferences,
        now: OffsetDateTime,
    ) -> StoreResult<Settings> {
        let mut t = self.lock()?;
        let idx = match t.settings.iter().position(|s| s.user_id == user_id) {
            Some(idx) => idx,
            None => {
                t.settings.push(Settings::defaults(user_id, now));
                t.settings.len() - 1
            }
        };
        let s = &mut t.settings[idx];
        s.theme = prefs.theme;
        s.currency = prefs.currency.clone();
        s.notifications = prefs.notifications;
        if prefs.couple_id.is_some() {
            s.couple_id = prefs.couple_id;
        }
        s.updated_at = now;
        Ok(s.clone())
    }
}

#[async_trait]
impl BudgetRepo for MemoryStore {
    async fn list_budgets(
        &self,
        couple_id: Uuid,
        month: i32,
        year: i32,
    ) -> StoreResult<Vec<Budget>> {
        let mut rows: Vec<Budget> = self
            .lock()?
            .budgets
            .iter()
            .filter(|b| b.couple_id == couple_id && b.month == month && b.year == year)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.category.cmp(&b.category));
        Ok(rows)
    }

    async fn find_budget_by_key(&self, key: &BudgetKey) -> StoreResult<Option<Budget>> {
        Ok(self
            .lock()?
            .budgets
            .iter()
            .find(|b| matches_key(b, key))
            .cloned())
    }

    async fn insert_budget(&self, budget: &Budget) -> StoreResult<()> {
        let mut t = self.lock()?;
        let key = BudgetKey {
            couple_id: budget.couple_id,
            category: budget.category.clone(),
            month: budget.month,
            year: budget.year,
        };
        if t.budgets.iter().any(|b| matches_key(b, &key)) {
            return Err(StoreError::Conflict("budget already exists".into()));
        }
        t.budgets.push(budget.clone());
        Ok(())
    }

    async fn update_budget_limits(
        &self,
        key: &BudgetKey,
        amount: Decimal,
        alert_percent: Decimal,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Budget>> {
        let mut t = self.lock()?;
        Ok(t.budgets.iter_mut().find(|b| matches_key(b, key)).map(|b| {
            b.amount = amount;
            b.alert_percent = alert_percent;
            b.updated_at = now;
            b.clone()
        }))
    }

    async fn delete_budget(&self, id: Uuid, couple_id: Uuid) -> StoreResult<bool> {
        let mut t = self.lock()?;
        let before = t.budgets.len();
        t.budgets
            .retain(|b| !(b.id == id && b.couple_id == couple_id));
        Ok(t.budgets.len() != before)
    }
}

fn matches_key(b: &Budget, key: &BudgetKey) -> bool {
    b.couple_id == key.couple_id
        && b.category == key.category
        && b.month == key.month
        && b.year == key.year
}

#[async_trait]
impl TemplateRepo for MemoryStore {
    async fn list_templates(&self, scope: Scope) -> StoreResult<Vec<ExpenseTemplate>> {
        let mut rows: Vec<ExpenseTemplate> = self
            .lock()?
            .templates
            .iter()
            .filter(|x| scope.contains(x.user_id, x.couple_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn insert_template(&self, template: &ExpenseTemplate) -> StoreResult<()> {
        self.lock()?.templates.push(template.clone());
        Ok(())
    }

    async fn update_template(
        &self,
        id: Uuid,
        scope: Scope,
        draft: &TemplateDraft,
        now: OffsetDateTime,
    ) -> StoreResult<Option<ExpenseTemplate>> {
        let mut t = self.lock()?;
        Ok(t
            .templates
            .iter_mut()
            .find(|x| x.id == id && scope.contains(x.user_id, x.couple_id))
            .map(|x| {
                x.apply(draft.clone(), now);
                x.clone()
            }))
    }

    async fn delete_template(&self, id: Uuid, scope: Scope) -> StoreResult<bool> {
        let mut t = self.lock()?;
        let before = t.templates.len();
        t.templates
            .retain(|x| !(x.id == id && scope.contains(x.user_id, x.couple_id)));
        Ok(t.templates.len() != before)
    }
}
