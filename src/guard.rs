//! Who may do what inside a group.
//!
//! - No IO
//! - No logging
//! - The actor id is always passed in explicitly
use crate::error::LedgerError;
use crate::schemas::{Group, MemberId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    ViewGroup,
    AddExpense,
    RecordSettlement,
    AddMember,
    RemoveMember(MemberId),
    DeleteGroup,
}

pub fn can_add_expense(actor: &str, group: &Group) -> bool {
    group.is_member(actor)
}

pub fn can_delete_group(actor: &str, group: &Group) -> bool {
    actor == group.created_by
}

/// The creator can never be removed. Any other member can be removed, and the
/// actor does not need to be the creator to do it.
pub fn can_remove_member(_actor: &str, group: &Group, target: &str) -> bool {
    target != group.created_by
}

pub fn is_action_permitted(actor: &str, group: &Group, action: &Action) -> bool {
    match action {
        Action::ViewGroup | Action::RecordSettlement | Action::AddMember => group.is_member(actor),
        Action::AddExpense => can_add_expense(actor, group),
        Action::RemoveMember(target) => {
            group.is_member(actor) && can_remove_member(actor, group, target)
        }
        Action::DeleteGroup => can_delete_group(actor, group),
    }
}

/// Same as [`is_action_permitted`], as a typed `Forbidden` result.
pub fn authorize(actor: &str, group: &Group, action: &Action) -> Result<(), LedgerError> {
    if is_action_permitted(actor, group, action) {
        return Ok(());
    }
    let reason = match action {
        Action::DeleteGroup => "only the group creator can delete the group".to_string(),
        Action::RemoveMember(target) if target == &group.created_by => {
            "the group creator cannot be removed".to_string()
        }
        _ => format!("`{}` is not a member of group `{}`", actor, group.id),
    };
    Err(LedgerError::Forbidden(reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn group() -> Group {
        Group {
            id: "g".into(),
            name: "Flat".into(),
            description: String::new(),
            members: vec!["creator".into(), "b".into(), "c".into()],
            created_by: "creator".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn members_can_add_expenses() {
        let g = group();
        assert!(can_add_expense("b", &g));
        assert!(!can_add_expense("stranger", &g));
    }

    #[test]
    fn only_creator_deletes() {
        let g = group();
        assert!(can_delete_group("creator", &g));
        assert!(!can_delete_group("b", &g));
        assert!(matches!(
            authorize("b", &g, &Action::DeleteGroup),
            Err(LedgerError::Forbidden(_))
        ));
    }

    #[test]
    fn creator_is_never_removable() {
        let g = group();
        for actor in ["creator", "b", "c", "stranger"] {
            assert!(!can_remove_member(actor, &g, "creator"));
            assert!(!is_action_permitted(
                actor,
                &g,
                &Action::RemoveMember("creator".into())
            ));
        }
    }

    // Removal is not creator-only: any member may remove any non-creator.
    // This mirrors how removal behaved before it was modelled here; tighten
    // deliberately if creator-only removal becomes the rule.
    #[test]
    fn non_creator_member_may_remove_another_member() {
        let g = group();
        assert!(can_remove_member("b", &g, "c"));
        let remove_c = Action::RemoveMember("c".into());
        assert!(is_action_permitted("b", &g, &remove_c));
        let remove_self = Action::RemoveMember("b".into());
        assert!(authorize("b", &g, &remove_self).is_ok());
    }

    #[test]
    fn outsiders_cannot_act_on_the_group() {
        let g = group();
        for action in [
            Action::ViewGroup,
            Action::AddExpense,
            Action::RecordSettlement,
            Action::AddMember,
            Action::RemoveMember("c".into()),
        ] {
            let permitted = is_action_permitted("stranger", &g, &action);
            assert!(!permitted, "{:?}", action);
        }
    }
}
