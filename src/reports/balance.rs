//! Net balance between the two parties of a couple.
//!
//! Each party's net is what they paid minus their share of the expenses.
//! A transfer counts as a late payment by the sender and a refund to the receiver.
use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::expenses::repo_types::{Expense, PartyTag};
use crate::transfers::repo_types::Transfer;

pub const SETTLED_UP: &str = "You are all settled up!";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BalanceStatus {
    Positive,
    Negative,
    Even,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Balance {
    pub person1_net: Decimal,
    pub person2_net: Decimal,
    pub who_owes_who: String,
    /// Absolute amount the debtor owes.
    pub amount_owed: Decimal,
    pub person1_status: BalanceStatus,
    pub person2_status: BalanceStatus,
}

/// Expense-only totals of a period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spending {
    pub total_spent: Decimal,
    pub person1_paid: Decimal,
    pub person2_paid: Decimal,
    pub category_totals: BTreeMap<String, Decimal>,
}

#[derive(Debug, Default)]
struct PerParty {
    person1: Decimal,
    person2: Decimal,
}

impl PerParty {
    fn add(&mut self, tag: PartyTag, amount: Decimal) {
        match tag {
            PartyTag::Person1 => self.person1 += amount,
            PartyTag::Person2 => self.person2 += amount,
        }
    }
}

pub fn spending(expenses: &[Expense]) -> Spending {
    let mut out = Spending::default();
    let mut paid = PerParty::default();
    for e in expenses {
        out.total_spent += e.total_amount;
        paid.add(e.paid_by, e.total_amount);
        *out.category_totals.entry(e.category.clone()).or_default() += e.total_amount;
    }
    out.person1_paid = paid.person1;
    out.person2_paid = paid.person2;
    out
}

pub fn calculate(expenses: &[Expense], transfers: &[Transfer]) -> Balance {
    let mut paid = PerParty::default();
    let mut owes = PerParty::default();

    for e in expenses {
        paid.add(e.paid_by, e.total_amount);
        owes.person1 += e.person1_share;
        owes.person2 += e.person2_share;
    }
    for t in transfers {
        paid.add(t.from_user, t.amount);
        paid.add(t.to_user, -t.amount);
    }

    let person1_net = paid.person1 - owes.person1;
    let person2_net = paid.person2 - owes.person2;

    let (who_owes_who, debtor_net, person1_status, person2_status) =
        match person1_net.cmp(&person2_net) {
            std::cmp::Ordering::Greater => (
                "Person 2 owes Person 1",
                person2_net,
                BalanceStatus::Positive,
                BalanceStatus::Negative,
            ),
            std::cmp::Ordering::Less => (
                "Person 1 owes Person 2",
                person1_net,
                BalanceStatus::Negative,
                BalanceStatus::Positive,
            ),
            std::cmp::Ordering::Equal => (
                SETTLED_UP,
                Decimal::ZERO,
                BalanceStatus::Even,
                BalanceStatus::Even,
            ),
        };

    Balance {
        person1_net,
        person2_net,
        who_owes_who: who_owes_who.to_string(),
        amount_owed: debtor_net.abs(),
        person1_status,
        person2_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expenses::repo_types::{ExpenseDraft, Split, SplitType};
    use crate::transfers::repo_types::TransferDraft;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn expense(total: i64, paid_by: PartyTag, p1: i64, p2: i64, category: &str) -> Expense {
        Expense::new(
            Uuid::new_v4(),
            None,
            ExpenseDraft {
                description: "x".into(),
                category: category.into(),
                notes: None,
                split: Split {
                    total_amount: Decimal::from(total),
                    paid_by,
                    split_type: SplitType::Exact,
                    person1_share: Decimal::from(p1),
                    person2_share: Decimal::from(p2),
                },
            },
            OffsetDateTime::now_utc(),
        )
    }

    fn transfer(amount: i64, from: PartyTag) -> Transfer {
        Transfer::new(
            Uuid::new_v4(),
            None,
            TransferDraft {
                amount: Decimal::from(amount),
                from_user: from,
                to_user: from.other(),
                description: String::new(),
            },
            OffsetDateTime::now_utc(),
        )
    }

    fn swapped(e: &Expense) -> Expense {
        let mut s = e.clone();
        s.paid_by = e.paid_by.other();
        s.person1_share = e.person2_share;
        s.person2_share = e.person1_share;
        s
    }

    #[test]
    fn single_equal_expense_leaves_person2_in_debt() {
        let b = calculate(&[expense(100, PartyTag::Person1, 50, 50, "Food")], &[]);
        assert_eq!(b.person1_net, Decimal::from(50));
        assert_eq!(b.person2_net, Decimal::from(-50));
        assert_eq!(b.who_owes_who, "Person 2 owes Person 1");
        assert_eq!(b.amount_owed, Decimal::from(50));
        assert_eq!(b.person1_status, BalanceStatus::Positive);
        assert_eq!(b.person2_status, BalanceStatus::Negative);
    }

    #[test]
    fn settling_transfer_evens_out() {
        let b = calculate(
            &[expense(100, PartyTag::Person1, 50, 50, "Food")],
            &[transfer(50, PartyTag::Person2)],
        );
        assert!(b.person1_net.is_zero());
        assert!(b.person2_net.is_zero());
        assert_eq!(b.who_owes_who, SETTLED_UP);
        assert!(b.amount_owed.is_zero());
        assert_eq!(b.person1_status, BalanceStatus::Even);
        assert_eq!(b.person2_status, BalanceStatus::Even);
    }

    #[test]
    fn swapping_parties_negates_nets_and_swaps_statuses() {
        let expenses = vec![
            expense(100, PartyTag::Person1, 50, 50, "Food"),
            expense(30, PartyTag::Person2, 10, 20, "Fuel"),
            expense(12, PartyTag::Person1, 12, 0, "Gifts"),
        ];
        let transfers = vec![transfer(7, PartyTag::Person2)];

        let base = calculate(&expenses, &transfers);
        let mirrored_expenses: Vec<Expense> = expenses.iter().map(swapped).collect();
        let mirrored_transfers: Vec<Transfer> = transfers
            .iter()
            .map(|t| transfer(7, t.from_user.other()))
            .collect();
        let mirrored = calculate(&mirrored_expenses, &mirrored_transfers);

        assert_eq!(mirrored.person1_net, -base.person1_net);
        assert_eq!(mirrored.person2_net, -base.person2_net);
        assert_eq!(mirrored.person1_status, base.person2_status);
        assert_eq!(mirrored.person2_status, base.person1_status);
        assert_eq!(mirrored.amount_owed, base.amount_owed);
    }

    #[test]
    fn spending_counts_expenses_only() {
        let s = spending(&[
            expense(100, PartyTag::Person1, 50, 50, "Food"),
            expense(40, PartyTag::Person2, 20, 20, "Food"),
            expense(10, PartyTag::Person2, 5, 5, "Fuel"),
        ]);
        assert_eq!(s.total_spent, Decimal::from(150));
        assert_eq!(s.person1_paid, Decimal::from(100));
        assert_eq!(s.person2_paid, Decimal::from(50));
        assert_eq!(s.category_totals["Food"], Decimal::from(140));
        assert_eq!(s.category_totals["Fuel"], Decimal::from(10));
    }

    #[test]
    fn empty_period_is_settled() {
        let b = calculate(&[], &[]);
        assert_eq!(b.who_owes_who, SETTLED_UP);
    }
}
