//! Write-time checks that keep malformed expenses and settlements out of the
//! ledger. Everything here is pure: the caller appends the returned record.
use std::collections::HashSet;

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

use crate::error::ValidationError;
use crate::schemas::{
    new_id, Amount, Category, Expense, Group, MemberId, Settlement, SplitLine,
};

/// Largest accepted gap between an expense total and the sum of its split
/// lines: one cent.
pub const SPLIT_TOLERANCE: Amount = Decimal::from_parts(1, 0, 0, false, 2);

/// Largest accepted expense total, split share or settlement: one billion.
/// Keeps every balance sum far inside the `Decimal` range.
pub const MAX_AMOUNT: Amount = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

pub const DEFAULT_SETTLEMENT_DESCRIPTION: &str = "Settlement payment";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDraft {
    pub description: String,
    pub amount: Amount,
    #[serde(default)]
    pub category: Category,
    pub split_between: Vec<SplitLine>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SettlementDraft {
    pub to: MemberId,
    pub amount: Amount,
    #[serde(default)]
    pub description: Option<String>,
}

/// Turns a draft into an [`Expense`] paid by `paid_by`.
///
/// Checks run in a fixed order and the first failure wins: positive total up
/// to [`MAX_AMOUNT`], non-empty split, split members belong to the group, no
/// member twice, every share between zero and [`MAX_AMOUNT`], shares add up to
/// the total within [`SPLIT_TOLERANCE`].
pub fn validate_expense(
    draft: ExpenseDraft,
    group: &Group,
    paid_by: &str,
) -> Result<Expense, ValidationError> {
    if draft.amount <= Decimal::ZERO || draft.amount > MAX_AMOUNT {
        return Err(ValidationError::InvalidAmount);
    }
    if draft.split_between.is_empty() {
        return Err(ValidationError::EmptySplit);
    }
    if let Some(line) = draft
        .split_between
        .iter()
        .find(|line| !group.is_member(&line.member_id))
    {
        return Err(ValidationError::NotAGroupMember(line.member_id.clone()));
    }

    let mut seen = HashSet::new();
    for line in &draft.split_between {
        if !seen.insert(line.member_id.as_str()) {
            return Err(ValidationError::DuplicateSplitEntry(line.member_id.clone()));
        }
    }
    if draft
        .split_between
        .iter()
        .any(|line| !(Decimal::ZERO..=MAX_AMOUNT).contains(&line.amount))
    {
        return Err(ValidationError::InvalidAmount);
    }

    let actual = draft
        .split_between
        .iter()
        .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line.amount))
        .ok_or(ValidationError::InvalidAmount)?;
    if (actual - draft.amount).abs() > SPLIT_TOLERANCE {
        return Err(ValidationError::SplitAmountMismatch {
            expected: draft.amount,
            actual,
        });
    }
    if draft.description.trim().is_empty() {
        return Err(ValidationError::EmptyField("description"));
    }

    Ok(Expense {
        id: new_id(),
        group_id: group.id.clone(),
        description: draft.description,
        amount: draft.amount,
        paid_by: paid_by.to_string(),
        category: draft.category,
        split_between: draft.split_between,
        created_at: Utc::now(),
    })
}

/// Splits `total` equally between `members`.
///
/// Each share is `total / N` truncated to cents. Whatever the truncation left
/// over goes to the first member, so the lines always add up to `total`
/// exactly.
pub fn equal_split(total: Amount, members: &[MemberId]) -> Vec<SplitLine> {
    if members.is_empty() {
        return Vec::new();
    }
    let count = Decimal::from(members.len());
    let share = (total / count).round_dp_with_strategy(2, RoundingStrategy::ToZero);
    let remainder = total - share * count;

    members
        .iter()
        .enumerate()
        .map(|(index, member_id)| SplitLine {
            member_id: member_id.clone(),
            amount: if index == 0 { share + remainder } else { share },
        })
        .collect()
}

/// Turns a settlement draft into a [`Settlement`] from `from` to `draft.to`.
pub fn validate_settlement(
    draft: SettlementDraft,
    group: &Group,
    from: &str,
) -> Result<Settlement, ValidationError> {
    if draft.amount <= Decimal::ZERO || draft.amount > MAX_AMOUNT {
        return Err(ValidationError::InvalidAmount);
    }
    if draft.to == from {
        return Err(ValidationError::SelfSettlement);
    }
    for party in [from, draft.to.as_str()] {
        if !group.is_member(party) {
            return Err(ValidationError::NotAGroupMember(party.to_string()));
        }
    }

    let description = draft
        .description
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SETTLEMENT_DESCRIPTION.to_string());

    Ok(Settlement {
        id: new_id(),
        group_id: group.id.clone(),
        from: from.to_string(),
        to: draft.to,
        amount: draft.amount,
        description,
        created_at: Utc::now(),
    })
}
