use rust_decimal::Decimal;
use serde::Serialize;

use crate::balance::Balance;
use crate::schemas::{Amount, Member, MemberId};

/// A non-binding proposal: pay `amount` to `payee`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub payee: MemberId,
    pub payee_name: String,
    pub amount: Amount,
    pub reason: String,
}

/// Ways for `actor` to pay down what they owe.
///
/// One suggestion per creditor, in group order, each computed against the
/// current balances. They are alternatives: after one is recorded as a
/// settlement the balances change and suggestions must be computed again.
pub fn suggest(actor: &str, balances: &Balance, members: &[Member]) -> Vec<Suggestion> {
    let actor_balance = balances.get(actor).copied().unwrap_or(Decimal::ZERO);
    if actor_balance >= Decimal::ZERO {
        return Vec::new();
    }
    let owed = -actor_balance;

    members
        .iter()
        .filter(|member| member.id != actor)
        .filter_map(|member| {
            let member_balance = balances.get(&member.id).copied()?;
            (member_balance > Decimal::ZERO).then(|| Suggestion {
                payee: member.id.clone(),
                payee_name: member.name.clone(),
                amount: owed.min(member_balance),
                reason: format!("you owe {}", member.name),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn member(id: &str) -> Member {
        Member {
            id: id.into(),
            name: id.to_uppercase(),
            email: format!("{}@example.com", id),
        }
    }

    fn balances(entries: &[(&str, Amount)]) -> Balance {
        entries.iter().map(|(id, amount)| (id.to_string(), *amount)).collect()
    }

    #[test]
    fn single_creditor() {
        let members = [member("a"), member("b"), member("c")];
        let b = balances(&[("a", dec!(30)), ("b", dec!(-10)), ("c", dec!(-20))]);

        assert_eq!(
            suggest("b", &b, &members),
            vec![Suggestion {
                payee: "a".into(),
                payee_name: "A".into(),
                amount: dec!(10),
                reason: "you owe A".into(),
            }]
        );
    }

    #[test]
    fn nothing_to_suggest_when_not_in_debt() {
        let members = [member("a"), member("b")];
        let b = balances(&[("a", dec!(30)), ("b", dec!(-30))]);
        assert!(suggest("a", &b, &members).is_empty());
        assert!(suggest("nobody", &b, &members).is_empty());
    }

    #[test]
    fn suggestions_are_independent_and_in_group_order() {
        // c comes before a in the group, and both are owed more than d owes.
        let members = [member("c"), member("d"), member("a")];
        let b = balances(&[("a", dec!(50)), ("c", dec!(5)), ("d", dec!(-55))]);
        let suggestions = suggest("d", &b, &members);

        let payees: Vec<_> = suggestions.iter().map(|s| s.payee.as_str()).collect();
        assert_eq!(payees, ["c", "a"]);
        assert_eq!(suggestions[0].amount, dec!(5));
        // Not reduced by the first suggestion.
        assert_eq!(suggestions[1].amount, dec!(50));
    }

    #[test]
    fn members_without_a_balance_are_skipped() {
        let members = [member("a"), member("b"), member("new")];
        let b = balances(&[("a", dec!(10)), ("b", dec!(-10))]);
        let suggestions = suggest("b", &b, &members);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].payee, "a");
    }
}
