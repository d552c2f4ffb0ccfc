use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::error::LedgerError;
use crate::schemas::{Amount, Expense, MemberId, Settlement};
use crate::validation::SPLIT_TOLERANCE;

/// Net position per member. Positive: the group owes the member. Negative: the
/// member owes the group.
pub type Balance = HashMap<MemberId, Amount>;

pub(crate) fn overflow(member: &str) -> LedgerError {
    LedgerError::Consistency(format!("balance of `{}` overflowed", member))
}

fn credit(balance: &mut Balance, member: &MemberId, amount: Amount) -> Result<(), LedgerError> {
    let current = balance.entry(member.clone()).or_insert(Decimal::ZERO);
    *current = current.checked_add(amount).ok_or_else(|| overflow(member))?;
    Ok(())
}

fn debit(balance: &mut Balance, member: &MemberId, amount: Amount) -> Result<(), LedgerError> {
    let current = balance.entry(member.clone()).or_insert(Decimal::ZERO);
    *current = current.checked_sub(amount).ok_or_else(|| overflow(member))?;
    Ok(())
}

/// Folds a group's ledger into one net balance per member.
///
/// An expense credits its payer with the total and debits every split line.
/// A settlement credits the member who paid and debits the member who was
/// paid.
///
/// Only members that appear in some entry get a key. Entries recorded against
/// another group are skipped. The result does not depend on entry order.
/// A running balance that leaves the `Decimal` range is a
/// [`LedgerError::Consistency`].
pub fn compute_balances(
    group_id: &str,
    expenses: &[Expense],
    settlements: &[Settlement],
) -> Result<Balance, LedgerError> {
    let mut balance = Balance::new();

    for expense in expenses {
        if expense.group_id != group_id {
            tracing::warn!(
                expense = %expense.id,
                group = group_id,
                "skipping expense from another group"
            );
            continue;
        }
        credit(&mut balance, &expense.paid_by, expense.amount)?;
        for line in &expense.split_between {
            debit(&mut balance, &line.member_id, line.amount)?;
        }
    }

    for settlement in settlements {
        if settlement.group_id != group_id {
            tracing::warn!(
                settlement = %settlement.id,
                group = group_id,
                "skipping settlement from another group"
            );
            continue;
        }
        // Paying back moves the payer towards zero from below and the payee
        // towards zero from above.
        credit(&mut balance, &settlement.from, settlement.amount)?;
        debit(&mut balance, &settlement.to, settlement.amount)?;
    }

    Ok(balance)
}

/// Gives every listed member an entry, zero if they are not involved yet.
pub fn seed_members(balance: &mut Balance, members: &[MemberId]) {
    for member in members {
        balance.entry(member.clone()).or_insert(Decimal::ZERO);
    }
}

/// Checks that the balances net to zero. Every expense may leave up to one
/// [`SPLIT_TOLERANCE`] of drift behind, settlements leave none.
pub fn check_conservation(balance: &Balance, expense_count: usize) -> Result<(), LedgerError> {
    let total = balance
        .values()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(*amount))
        .ok_or_else(|| {
            LedgerError::Consistency("balances overflow when summed".to_string())
        })?;
    let allowed = SPLIT_TOLERANCE * Decimal::from(expense_count.max(1));
    if total.abs() > allowed {
        return Err(LedgerError::Consistency(format!(
            "balances sum to {} instead of zero",
            total
        )));
    }
    Ok(())
}
