use time::{Date, Month, OffsetDateTime, Time};
use uuid::Uuid;

use super::balance::{self, Balance};
use super::dto::MonthlyReport;
use crate::couples::services::report_scope;
use crate::db::{Store, Window};
use crate::error::AppError;
use crate::expenses::repo_types::CategoryTotal;

pub const MIN_YEAR: i32 = 1970;
/// December of the last year still needs the following January as its end,
/// and `time` dates stop at 9999.
pub const MAX_YEAR: i32 = 9998;

/// A calendar month in UTC, `[first day, first day of next month)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub year: i32,
    pub month: Month,
}

impl MonthWindow {
    pub fn new(year: i32, month: u8) -> Result<Self, AppError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(AppError::invalid("Invalid year"));
        }
        let month = Month::try_from(month).map_err(|_| AppError::invalid("Invalid month"))?;
        Ok(Self { year, month })
    }

    pub fn containing(at: OffsetDateTime) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    fn first_day(year: i32, month: Month) -> OffsetDateTime {
        // Day 1 exists in every month; `new` keeps `year + 1` within `time`'s range.
        Date::from_calendar_date(year, month, 1)
            .map(|d| d.with_time(Time::MIDNIGHT).assume_utc())
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    pub fn window(&self) -> Window {
        let (next_year, next_month) = match self.month {
            Month::December => (self.year + 1, Month::January),
            m => (self.year, m.next()),
        };
        Window {
            start: Self::first_day(self.year, self.month),
            end: Self::first_day(next_year, next_month),
        }
    }
}

pub async fn monthly(
    store: &dyn Store,
    user_id: Uuid,
    month: MonthWindow,
) -> Result<MonthlyReport, AppError> {
    let scope = report_scope(store, user_id).await?;
    let window = month.window();
    let expenses = store.list_expenses_between(scope, window).await?;
    let transfers = store.list_transfers_between(scope, window).await?;

    let spent = balance::spending(&expenses);
    let balance: Balance = balance::calculate(&expenses, &transfers);

    Ok(MonthlyReport {
        total_spent: spent.total_spent,
        person1_paid: spent.person1_paid,
        person2_paid: spent.person2_paid,
        category_totals: spent.category_totals,
        expenses,
        transfers,
        balance,
    })
}

pub async fn categories(
    store: &dyn Store,
    user_id: Uuid,
    month: MonthWindow,
) -> Result<Vec<CategoryTotal>, AppError> {
    let scope = report_scope(store, user_id).await?;
    Ok(store.category_totals(scope, month.window()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use time::macros::datetime;

    use crate::couples::services::fixtures::{pair, user};
    use crate::couples::services::{accept, invite};
    use crate::db::MemoryStore;
    use crate::expenses::dto::{ExpenseRequest, SplitInput};
    use crate::expenses::repo_types::{PartyTag, SplitType};
    use crate::expenses::services as expenses;
    use crate::transfers::dto::TransferRequest;
    use crate::transfers::services as transfers;

    #[test]
    fn month_window_is_half_open() {
        let w = MonthWindow::new(2024, 2).unwrap().window();
        assert_eq!(w.start, datetime!(2024-02-01 0:00 UTC));
        assert_eq!(w.end, datetime!(2024-03-01 0:00 UTC));
        assert!(w.contains(datetime!(2024-02-29 23:59:59 UTC)));
        assert!(!w.contains(datetime!(2024-03-01 0:00 UTC)));
    }

    #[test]
    fn december_rolls_into_next_year() {
        let w = MonthWindow::new(2023, 12).unwrap().window();
        assert_eq!(w.end, datetime!(2024-01-01 0:00 UTC));
    }

    #[test]
    fn rejects_out_of_range_month_and_year() {
        assert!(MonthWindow::new(2024, 0).is_err());
        assert!(MonthWindow::new(2024, 13).is_err());
        assert!(MonthWindow::new(1969, 5).is_err());
        assert!(MonthWindow::new(9999, 1).is_err());
    }

    #[test]
    fn last_supported_december_has_a_real_end() {
        let w = MonthWindow::new(MAX_YEAR, 12).unwrap().window();
        assert_eq!(w.start, datetime!(9998-12-01 0:00 UTC));
        assert_eq!(w.end, datetime!(9999-01-01 0:00 UTC));
        assert!(w.start < w.end);
    }

    fn equal(total: i64, paid_by: PartyTag, category: &str) -> ExpenseRequest {
        ExpenseRequest {
            description: "Shared".into(),
            category: category.into(),
            notes: None,
            split: SplitInput {
                total_amount: Decimal::from(total),
                paid_by,
                split_type: SplitType::Equal,
                person1_share: None,
                person2_share: None,
            },
        }
    }

    #[tokio::test]
    async fn partners_see_the_same_balance() {
        let store = MemoryStore::new();
        let now = OffsetDateTime::now_utc();
        let ann = user(&store, "ann@example.com").await;
        let bob = user(&store, "bob@example.com").await;

        // Entered while still single; stays out of the couple's ledger.
        expenses::create(&store, ann.id, &equal(100, PartyTag::Person1, "Food"), now)
            .await
            .unwrap();

        let (_, invitation) = invite(&store, ann.id, &bob.email, now).await.unwrap();
        accept(&store, bob.id, &invitation.token, now).await.unwrap();
        expenses::create(&store, bob.id, &equal(60, PartyTag::Person2, "Travel"), now)
            .await
            .unwrap();

        let month = MonthWindow::containing(now);
        let for_ann = monthly(&store, ann.id, month).await.unwrap();
        let for_bob = monthly(&store, bob.id, month).await.unwrap();
        assert_eq!(for_ann.balance, for_bob.balance);
        assert_eq!(for_ann.total_spent, Decimal::from(60));
        assert_eq!(for_ann.balance.who_owes_who, "Person 1 owes Person 2");
        assert_eq!(for_ann.balance.amount_owed, Decimal::from(30));
        assert_eq!(
            categories(&store, ann.id, month).await.unwrap(),
            categories(&store, bob.id, month).await.unwrap()
        );
    }

    #[tokio::test]
    async fn single_user_reports_their_own_entries() {
        let store = MemoryStore::new();
        let now = OffsetDateTime::now_utc();
        let ann = user(&store, "ann@example.com").await;
        expenses::create(&store, ann.id, &equal(40, PartyTag::Person1, "Food"), now)
            .await
            .unwrap();

        let report = monthly(&store, ann.id, MonthWindow::containing(now)).await.unwrap();
        assert_eq!(report.expenses.len(), 1);
        assert_eq!(report.person1_paid, Decimal::from(40));
    }

    #[tokio::test]
    async fn report_keeps_to_its_month_and_sorts_categories() {
        let store = MemoryStore::new();
        let (ann, bob, _) = pair(&store).await;
        let june = datetime!(2024-06-15 12:00 UTC);

        for (who, total, category, at) in [
            (ann.id, 30, "Food", june),
            (bob.id, 120, "Rent", datetime!(2024-06-01 0:00 UTC)),
            (ann.id, 25, "Food", datetime!(2024-06-30 23:59:59 UTC)),
            (ann.id, 500, "Rent", datetime!(2024-05-31 23:59:59 UTC)),
            (bob.id, 90, "Travel", datetime!(2024-07-01 0:00 UTC)),
        ] {
            expenses::create(&store, who, &equal(total, PartyTag::Person1, category), at)
                .await
                .unwrap();
        }
        let req = TransferRequest {
            amount: Decimal::from(10),
            from_user: PartyTag::Person2,
            to_user: PartyTag::Person1,
            description: String::new(),
        };
        transfers::create(&store, bob.id, &req, june).await.unwrap();
        transfers::create(&store, bob.id, &req, datetime!(2024-07-02 9:00 UTC))
            .await
            .unwrap();

        let month = MonthWindow::new(2024, 6).unwrap();
        let report = monthly(&store, ann.id, month).await.unwrap();
        assert_eq!(report.expenses.len(), 3);
        assert_eq!(report.transfers.len(), 1);
        assert_eq!(report.total_spent, Decimal::from(175));
        assert_eq!(report.category_totals["Food"], Decimal::from(55));
        assert_eq!(report.category_totals["Rent"], Decimal::from(120));
        assert!(!report.category_totals.contains_key("Travel"));

        let totals = categories(&store, bob.id, month).await.unwrap();
        let order: Vec<_> = totals.iter().map(|t| (t.category.as_str(), t.count)).collect();
        assert_eq!(order, vec![("Rent", 1_i64), ("Food", 2_i64)]);
    }
}
