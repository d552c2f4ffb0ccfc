use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type MemberId = String;
pub type GroupId = String;
pub type Amount = Decimal;

/// Generates a fresh opaque record id.
pub fn new_id() -> String {
    bson::oid::ObjectId::new().to_hex()
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    /// Membership set. Kept in insertion order, which is the order settlement
    /// suggestions are emitted in.
    pub members: Vec<MemberId>,
    pub created_by: MemberId,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn is_member(&self, id: &str) -> bool {
        self.members.iter().any(|member| member == id)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Category {
    #[default]
    General,
    Food,
    Transportation,
    Entertainment,
    Utilities,
    Shopping,
    Travel,
    /// Anything the client sends that is not one of the known categories.
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitLine {
    pub member_id: MemberId,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub group_id: GroupId,
    pub description: String,
    pub amount: Amount,
    pub paid_by: MemberId,
    pub category: Category,
    pub split_between: Vec<SplitLine>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub id: String,
    pub group_id: GroupId,
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Amount,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ExpenseAdded,
    GroupCreated,
    MemberAdded,
    MemberRemoved,
    GroupDeleted,
    SettlementAdded,
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient: MemberId,
    pub kind: NotificationKind,
    pub message: String,
    pub group_id: Option<GroupId>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
