use chrono::Utc;

use crate::schemas::{new_id, Group, Notification, NotificationKind};

/// One unread notification for every member of `group` except `actor`.
pub fn fan_out(
    kind: NotificationKind,
    message: &str,
    group: &Group,
    actor: &str,
) -> Vec<Notification> {
    let group_id = match kind {
        NotificationKind::GroupDeleted => None,
        _ => Some(group.id.clone()),
    };
    let created_at = Utc::now();

    group
        .members
        .iter()
        .filter(|member| *member != actor)
        .map(|recipient| Notification {
            id: new_id(),
            recipient: recipient.clone(),
            kind,
            message: message.to_string(),
            group_id: group_id.clone(),
            is_read: false,
            created_at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> Group {
        Group {
            id: "g".into(),
            name: "Trip".into(),
            description: String::new(),
            members: vec!["a".into(), "b".into(), "c".into()],
            created_by: "a".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn actor_is_not_notified() {
        let notes = fan_out(
            NotificationKind::ExpenseAdded,
            "a added Dinner",
            &group(),
            "a",
        );
        let recipients: Vec<_> = notes.iter().map(|n| n.recipient.as_str()).collect();
        assert_eq!(recipients, ["b", "c"]);
        assert!(notes
            .iter()
            .all(|n| !n.is_read && n.group_id.as_deref() == Some("g")));
    }

    #[test]
    fn deleted_groups_are_not_referenced() {
        let notes = fan_out(
            NotificationKind::GroupDeleted,
            "Trip was deleted",
            &group(),
            "a",
        );
        assert!(notes.iter().all(|n| n.group_id.is_none()));
    }
}
