use crate::balance::{compute_balances, overflow};
use crate::error::LedgerError;
use crate::schemas::{Amount, Expense, MemberId, Settlement};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::mem::swap;

#[derive(Clone, Debug)]
pub struct PersonalBalance {
    pub id: MemberId,
    pub balance: Amount,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct MemberPair {
    pub member1: MemberId,
    pub member2: MemberId,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Exchange {
    pub payer: MemberId,
    pub receiver: MemberId,
    pub amount: Amount,
}

// Records that `debtor` owes `creditor` `amount`
fn add_debt(
    balances_between_members: &mut HashMap<MemberPair, Amount>,
    creditor: &MemberId,
    debtor: &MemberId,
    amount: Amount,
) -> Result<(), LedgerError> {
    if creditor == debtor {
        return Ok(());
    }
    let mut pair = MemberPair {
        member1: creditor.clone(),
        member2: debtor.clone(),
    };
    let mut amount = amount;

    // We use alphabetical order to ensure all the debts regarding
    // the same members end up stored in the same direction
    if pair.member1 > pair.member2 {
        swap(&mut pair.member1, &mut pair.member2);
        amount = -amount;
    }

    let balance = balances_between_members
        .entry(pair)
        .or_insert(Decimal::ZERO);
    *balance = balance
        .checked_add(amount)
        .ok_or_else(|| overflow(creditor))?;
    Ok(())
}

// The exchanges that will be made if no simplification happens
fn get_naive_exchanges(
    expenses: &[Expense],
    settlements: &[Settlement],
) -> Result<Vec<Exchange>, LedgerError> {
    let mut balances_between_members: HashMap<MemberPair, Amount> = HashMap::new();

    for expense in expenses {
        for line in &expense.split_between {
            add_debt(
                &mut balances_between_members,
                &expense.paid_by,
                &line.member_id,
                line.amount,
            )?;
        }
    }
    // Paying someone back is the mirror of them lending to you
    for settlement in settlements {
        add_debt(
            &mut balances_between_members,
            &settlement.from,
            &settlement.to,
            settlement.amount,
        )?;
    }

    // Calculate exchanges, now the ones that are owed will be the receivers
    let mut exchanges = Vec::new();

    for (member_pair, balance) in balances_between_members {
        if balance.is_zero() {
            continue;
        }
        let mut payer = member_pair.member2;
        let mut receiver = member_pair.member1;
        // If the balance is smaller than zero we change the direction
        if balance < Decimal::ZERO {
            swap(&mut payer, &mut receiver);
        }

        exchanges.push(Exchange {
            payer,
            receiver,
            amount: balance.abs(),
        });
    }

    exchanges.sort_by(|a, b| (&a.payer, &a.receiver).cmp(&(&b.payer, &b.receiver)));
    Ok(exchanges)
}

fn sort_by_balance(people: &mut [PersonalBalance]) {
    people.sort_by(|a, b| {
        a.balance
            .cmp(&b.balance)
            .then_with(|| b.id.cmp(&a.id))
    });
}

// Tries to simplify the number of exchanges
fn get_simplified_exchanges(
    mut payers: Vec<PersonalBalance>,
    mut receivers: Vec<PersonalBalance>,
) -> Vec<Exchange> {
    sort_by_balance(&mut payers);
    sort_by_balance(&mut receivers);

    let mut exchanges: Vec<Exchange> = Vec::new();

    // Always match the biggest debtor with the biggest creditor
    while let (Some(payer), Some(receiver)) = (payers.last_mut(), receivers.last_mut()) {
        let amount = payer.balance.min(receiver.balance);
        exchanges.push(Exchange {
            payer: payer.id.clone(),
            receiver: receiver.id.clone(),
            amount,
        });
        payer.balance -= amount;
        receiver.balance -= amount;

        let payer_done = payer.balance.is_zero();
        let receiver_done = receiver.balance.is_zero();
        if payer_done {
            payers.pop();
        }
        if receiver_done {
            receivers.pop();
        }
    }
    exchanges
}

/// A plan of payments that brings every balance in the group to zero.
pub fn get_exchanges(
    group_id: &str,
    expenses: &[Expense],
    settlements: &[Settlement],
) -> Result<Vec<Exchange>, LedgerError> {
    let people_balances = compute_balances(group_id, expenses, settlements)?;

    // Divide people into payers and receivers
    let mut payers = Vec::new();
    let mut receivers = Vec::new();

    for (id, balance) in people_balances {
        if balance.is_zero() {
            continue;
        }
        let person = PersonalBalance {
            id,
            balance: balance.abs(),
        };
        if balance < Decimal::ZERO {
            payers.push(person);
        } else {
            receivers.push(person);
        }
    }

    let own_expenses: Vec<Expense> = expenses
        .iter()
        .filter(|e| e.group_id == group_id)
        .cloned()
        .collect();
    let own_settlements: Vec<Settlement> = settlements
        .iter()
        .filter(|s| s.group_id == group_id)
        .cloned()
        .collect();

    let naive_exchanges = get_naive_exchanges(&own_expenses, &own_settlements)?;
    let simplified_exchanges = get_simplified_exchanges(payers, receivers);

    // We ensure the simplification didn't accidentally end up being
    // more complicated than the naive exchanges
    if simplified_exchanges.len() < naive_exchanges.len() {
        Ok(simplified_exchanges)
    } else {
        Ok(naive_exchanges)
    }
}
