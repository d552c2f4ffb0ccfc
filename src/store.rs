//! Where ledger entries live.
//!
//! [`LedgerStore`] is the only thing the service needs from persistence:
//! reads by group, appends, membership updates and an atomic cascading
//! delete. [`MongoStore`] is the production backend, [`MemoryStore`] keeps
//! everything in process.
use async_trait::async_trait;
use bson::doc;
use futures::TryStreamExt;
use mongodb::{Client, ClientSession, Collection, Database};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::schemas::{Expense, Group, Member, MemberId, Notification, Settlement};

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn find_group(&self, group_id: &str) -> Result<Option<Group>>;
    async fn groups_for_member(&self, member_id: &str) -> Result<Vec<Group>>;
    async fn insert_group(&self, group: &Group) -> Result<()>;
    async fn add_members(&self, group_id: &str, members: &[MemberId]) -> Result<()>;
    async fn remove_member(&self, group_id: &str, member_id: &str) -> Result<()>;
    /// Removes the group together with its expenses and settlements. Readers
    /// never observe a partial delete.
    async fn delete_group(&self, group_id: &str) -> Result<()>;

    /// Members with the given ids, in the order the ids were given. Unknown
    /// ids are left out.
    async fn find_members(&self, ids: &[MemberId]) -> Result<Vec<Member>>;
    async fn find_members_by_email(&self, emails: &[String]) -> Result<Vec<Member>>;

    async fn append_expense(&self, expense: &Expense) -> Result<()>;
    async fn append_settlement(&self, settlement: &Settlement) -> Result<()>;
    async fn expenses(&self, group_id: &str) -> Result<Vec<Expense>>;
    async fn settlements(&self, group_id: &str) -> Result<Vec<Settlement>>;

    async fn push_notifications(&self, notifications: &[Notification]) -> Result<()>;
}

fn order_like(ids: &[MemberId], mut members: Vec<Member>) -> Vec<Member> {
    members.retain(|member| ids.contains(&member.id));
    members.sort_by_key(|member| ids.iter().position(|id| id == &member.id));
    members
}

pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(database);
        Ok(Self { client, database })
    }

    fn members(&self) -> Collection<Member> {
        self.database.collection("Members")
    }

    fn groups(&self) -> Collection<Group> {
        self.database.collection("Groups")
    }

    fn expense_entries(&self) -> Collection<Expense> {
        self.database.collection("Expenses")
    }

    fn settlement_entries(&self) -> Collection<Settlement> {
        self.database.collection("Settlements")
    }

    fn notifications(&self) -> Collection<Notification> {
        self.database.collection("Notifications")
    }

    async fn delete_group_records(
        &self,
        group_id: &str,
        session: &mut ClientSession,
    ) -> Result<()> {
        let owned = doc! { "groupId": group_id };
        self.expense_entries()
            .delete_many_with_session(owned.clone(), None, session)
            .await?;
        self.settlement_entries()
            .delete_many_with_session(owned, None, session)
            .await?;
        self.groups()
            .delete_one_with_session(doc! { "id": group_id }, None, session)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MongoStore {
    async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    async fn find_group(&self, group_id: &str) -> Result<Option<Group>> {
        Ok(self.groups().find_one(doc! { "id": group_id }, None).await?)
    }

    async fn groups_for_member(&self, member_id: &str) -> Result<Vec<Group>> {
        let cursor = self.groups().find(doc! { "members": member_id }, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_group(&self, group: &Group) -> Result<()> {
        self.groups().insert_one(group, None).await?;
        Ok(())
    }

    async fn add_members(&self, group_id: &str, members: &[MemberId]) -> Result<()> {
        self.groups()
            .update_one(
                doc! { "id": group_id },
                doc! { "$addToSet": { "members": { "$each": members.to_vec() } } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn remove_member(&self, group_id: &str, member_id: &str) -> Result<()> {
        self.groups()
            .update_one(
                doc! { "id": group_id },
                doc! { "$pull": { "members": member_id } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn delete_group(&self, group_id: &str) -> Result<()> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        match self.delete_group_records(group_id, &mut session).await {
            Ok(()) => {
                session.commit_transaction().await?;
                Ok(())
            }
            Err(err) => {
                if let Err(abort) = session.abort_transaction().await {
                    tracing::error!(
                        group = group_id,
                        error = %abort,
                        "failed to abort group delete"
                    );
                }
                Err(err)
            }
        }
    }

    async fn find_members(&self, ids: &[MemberId]) -> Result<Vec<Member>> {
        let cursor = self
            .members()
            .find(doc! { "id": { "$in": ids.to_vec() } }, None)
            .await?;
        let members: Vec<Member> = cursor.try_collect().await?;
        Ok(order_like(ids, members))
    }

    async fn find_members_by_email(&self, emails: &[String]) -> Result<Vec<Member>> {
        let cursor = self
            .members()
            .find(doc! { "email": { "$in": emails.to_vec() } }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn append_expense(&self, expense: &Expense) -> Result<()> {
        self.expense_entries().insert_one(expense, None).await?;
        Ok(())
    }

    async fn append_settlement(&self, settlement: &Settlement) -> Result<()> {
        self.settlement_entries().insert_one(settlement, None).await?;
        Ok(())
    }

    async fn expenses(&self, group_id: &str) -> Result<Vec<Expense>> {
        let cursor = self
            .expense_entries()
            .find(doc! { "groupId": group_id }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn settlements(&self, group_id: &str) -> Result<Vec<Settlement>> {
        let cursor = self
            .settlement_entries()
            .find(doc! { "groupId": group_id }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn push_notifications(&self, notifications: &[Notification]) -> Result<()> {
        if notifications.is_empty() {
            return Ok(());
        }
        self.notifications().insert_many(notifications, None).await?;
        Ok(())
    }
}

#[derive(Default)]
struct MemoryState {
    members: Vec<Member>,
    groups: Vec<Group>,
    expenses: Vec<Expense>,
    settlements: Vec<Settlement>,
    notifications: Vec<Notification>,
}

/// Keeps the whole ledger behind one lock, so every write is atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a member. Members are owned by the identity side, this is
    /// how it hands them over.
    pub async fn insert_member(&self, member: Member) {
        let mut state = self.state.write().await;
        state.members.retain(|m| m.id != member.id);
        state.members.push(member);
    }

    pub async fn notifications_for(&self, member_id: &str) -> Vec<Notification> {
        let state = self.state.read().await;
        state
            .notifications
            .iter()
            .filter(|n| n.recipient == member_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn find_group(&self, group_id: &str) -> Result<Option<Group>> {
        let state = self.state.read().await;
        Ok(state.groups.iter().find(|g| g.id == group_id).cloned())
    }

    async fn groups_for_member(&self, member_id: &str) -> Result<Vec<Group>> {
        let state = self.state.read().await;
        Ok(state
            .groups
            .iter()
            .filter(|g| g.is_member(member_id))
            .cloned()
            .collect())
    }

    async fn insert_group(&self, group: &Group) -> Result<()> {
        self.state.write().await.groups.push(group.clone());
        Ok(())
    }

    async fn add_members(&self, group_id: &str, members: &[MemberId]) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(group) = state.groups.iter_mut().find(|g| g.id == group_id) {
            for member in members {
                if !group.is_member(member) {
                    group.members.push(member.clone());
                }
            }
        }
        Ok(())
    }

    async fn remove_member(&self, group_id: &str, member_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(group) = state.groups.iter_mut().find(|g| g.id == group_id) {
            group.members.retain(|m| m != member_id);
        }
        Ok(())
    }

    async fn delete_group(&self, group_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.groups.retain(|g| g.id != group_id);
        state.expenses.retain(|e| e.group_id != group_id);
        state.settlements.retain(|s| s.group_id != group_id);
        Ok(())
    }

    async fn find_members(&self, ids: &[MemberId]) -> Result<Vec<Member>> {
        let state = self.state.read().await;
        Ok(order_like(ids, state.members.clone()))
    }

    async fn find_members_by_email(&self, emails: &[String]) -> Result<Vec<Member>> {
        let state = self.state.read().await;
        Ok(state
            .members
            .iter()
            .filter(|m| emails.contains(&m.email))
            .cloned()
            .collect())
    }

    async fn append_expense(&self, expense: &Expense) -> Result<()> {
        self.state.write().await.expenses.push(expense.clone());
        Ok(())
    }

    async fn append_settlement(&self, settlement: &Settlement) -> Result<()> {
        self.state.write().await.settlements.push(settlement.clone());
        Ok(())
    }

    async fn expenses(&self, group_id: &str) -> Result<Vec<Expense>> {
        let state = self.state.read().await;
        Ok(state
            .expenses
            .iter()
            .filter(|e| e.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn settlements(&self, group_id: &str) -> Result<Vec<Settlement>> {
        let state = self.state.read().await;
        Ok(state
            .settlements
            .iter()
            .filter(|s| s.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn push_notifications(&self, notifications: &[Notification]) -> Result<()> {
        self.state
            .write()
            .await
            .notifications
            .extend_from_slice(notifications);
        Ok(())
    }
}
