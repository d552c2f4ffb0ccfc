//! Request-scoped operations over one group's ledger.
//!
//! Every call re-reads what it needs from the store and recomputes from
//! scratch; nothing is cached between requests. The authenticated actor is an
//! explicit argument of every operation.
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::balance::{check_conservation, compute_balances, seed_members, Balance};
use crate::error::{LedgerError, Result, ValidationError};
use crate::exchange::{get_exchanges, Exchange};
use crate::guard::{authorize, Action};
use crate::notifications::fan_out;
use crate::schemas::{
    new_id, Amount, Category, Expense, Group, Member, MemberId, NotificationKind, Settlement,
    SplitLine,
};
use crate::store::LedgerStore;
use crate::suggest::{suggest, Suggestion};
use crate::validation::{
    equal_split, validate_expense, validate_settlement, ExpenseDraft, SettlementDraft,
};

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitRequest {
    Exact(Vec<SplitLine>),
    Equal(Vec<MemberId>),
}

#[derive(Clone, Debug, Deserialize)]
pub struct ExpenseRequest {
    pub description: String,
    pub amount: Amount,
    #[serde(default)]
    pub category: Category,
    pub split: SplitRequest,
}

impl ExpenseRequest {
    pub fn into_draft(self) -> ExpenseDraft {
        let split_between = match self.split {
            SplitRequest::Exact(lines) => lines,
            SplitRequest::Equal(members) => equal_split(self.amount, &members),
        };
        ExpenseDraft {
            description: self.description,
            amount: self.amount,
            category: self.category,
            split_between,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub member_emails: Vec<String>,
}

/// A group with its member records resolved.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    #[serde(flatten)]
    pub group: Group,
    pub member_details: Vec<Member>,
}

pub struct Ledger {
    store: Arc<dyn LedgerStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn health(&self) -> Result<()> {
        self.store.ping().await
    }

    async fn group_for(&self, actor: &str, group_id: &str, action: &Action) -> Result<Group> {
        let group = self
            .store
            .find_group(group_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("group `{}`", group_id)))?;
        if let Err(err) = authorize(actor, &group, action) {
            warn!(actor, group = group_id, ?action, "action refused");
            return Err(err);
        }
        Ok(group)
    }

    async fn view(&self, group: Group) -> Result<GroupView> {
        let member_details = self.store.find_members(&group.members).await?;
        Ok(GroupView {
            group,
            member_details,
        })
    }

    /// Best effort: falls back to the id when the member cannot be read.
    async fn display_name(&self, member_id: &str) -> String {
        match self.store.find_members(&[member_id.to_string()]).await {
            Ok(found) => found
                .into_iter()
                .next()
                .map(|member| member.name)
                .unwrap_or_else(|| member_id.to_string()),
            Err(err) => {
                warn!(member = member_id, error = %err, "could not resolve member name");
                member_id.to_string()
            }
        }
    }

    /// Runs after the write it announces has been stored, so a failure here is
    /// logged and never reported to the caller.
    async fn notify(&self, kind: NotificationKind, message: String, group: &Group, actor: &str) {
        let notifications = fan_out(kind, &message, group, actor);
        if let Err(err) = self.store.push_notifications(&notifications).await {
            error!(
                group = %group.id,
                ?kind,
                recipients = notifications.len(),
                error = %err,
                "failed to store notifications"
            );
        }
    }

    pub async fn list_groups(&self, actor: &str) -> Result<Vec<GroupView>> {
        let groups = self.store.groups_for_member(actor).await?;
        let mut views = Vec::with_capacity(groups.len());
        for group in groups {
            views.push(self.view(group).await?);
        }
        Ok(views)
    }

    /// Creates a group from member e-mails. Unknown e-mails are ignored and the
    /// creator is always a member.
    pub async fn create_group(&self, actor: &str, request: NewGroup) -> Result<GroupView> {
        if request.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name").into());
        }
        let found = self.store.find_members_by_email(&request.member_emails).await?;
        let mut members: Vec<MemberId> = Vec::new();
        for member in found {
            if !members.contains(&member.id) {
                members.push(member.id);
            }
        }
        if !members.iter().any(|m| m == actor) {
            members.push(actor.to_string());
        }

        let group = Group {
            id: new_id(),
            name: request.name,
            description: request.description,
            members,
            created_by: actor.to_string(),
            created_at: Utc::now(),
        };
        self.store.insert_group(&group).await?;
        info!(actor, group = %group.id, members = group.members.len(), "group created");

        let name = self.display_name(actor).await;
        self.notify(
            NotificationKind::GroupCreated,
            format!("{} added you to \"{}\"", name, group.name),
            &group,
            actor,
        )
        .await;
        self.view(group).await
    }

    pub async fn add_members(
        &self,
        actor: &str,
        group_id: &str,
        emails: &[String],
    ) -> Result<GroupView> {
        let group = self.group_for(actor, group_id, &Action::AddMember).await?;
        let found = self.store.find_members_by_email(emails).await?;
        if found.is_empty() {
            return Err(LedgerError::NotFound(format!(
                "member with e-mail {}",
                emails.join(", ")
            )));
        }
        let added: Vec<MemberId> = found
            .into_iter()
            .map(|member| member.id)
            .filter(|id| !group.is_member(id))
            .collect();
        self.store.add_members(group_id, &added).await?;

        let group = self.group_for(actor, group_id, &Action::ViewGroup).await?;
        if !added.is_empty() {
            info!(
                actor,
                group = group_id,
                added = added.len(),
                "members added"
            );
            let name = self.display_name(actor).await;
            self.notify(
                NotificationKind::MemberAdded,
                format!("{} added new members to \"{}\"", name, group.name),
                &group,
                actor,
            )
            .await;
        }
        self.view(group).await
    }

    pub async fn remove_member(
        &self,
        actor: &str,
        group_id: &str,
        member_id: &str,
    ) -> Result<GroupView> {
        let action = Action::RemoveMember(member_id.to_string());
        let before = self.group_for(actor, group_id, &action).await?;
        if !before.is_member(member_id) {
            return Err(LedgerError::NotFound(format!(
                "member `{}` in group `{}`",
                member_id, group_id
            )));
        }
        self.store.remove_member(group_id, member_id).await?;
        info!(
            actor,
            group = group_id,
            removed = member_id,
            "member removed"
        );

        // The removed member still hears about it.
        let name = self.display_name(member_id).await;
        self.notify(
            NotificationKind::MemberRemoved,
            format!("{} was removed from \"{}\"", name, before.name),
            &before,
            actor,
        )
        .await;

        let group = self
            .store
            .find_group(group_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("group `{}`", group_id)))?;
        self.view(group).await
    }

    /// Deletes the group and every expense and settlement it owns.
    pub async fn delete_group(&self, actor: &str, group_id: &str) -> Result<()> {
        let group = self.group_for(actor, group_id, &Action::DeleteGroup).await?;
        self.store.delete_group(group_id).await?;

        let leftovers = self.store.expenses(group_id).await?.len()
            + self.store.settlements(group_id).await?.len();
        if leftovers > 0 {
            error!(
                group = group_id,
                leftovers,
                "group delete left ledger entries behind"
            );
            return Err(LedgerError::Consistency(format!(
                "{} entries of deleted group `{}` remain",
                leftovers, group_id
            )));
        }
        info!(actor, group = group_id, "group deleted");

        self.notify(
            NotificationKind::GroupDeleted,
            format!("\"{}\" was deleted", group.name),
            &group,
            actor,
        )
        .await;
        Ok(())
    }

    pub async fn record_expense(
        &self,
        actor: &str,
        group_id: &str,
        request: ExpenseRequest,
    ) -> Result<Expense> {
        let group = self.group_for(actor, group_id, &Action::AddExpense).await?;
        let expense = validate_expense(request.into_draft(), &group, actor).map_err(|err| {
            warn!(actor, group = group_id, error = %err, "expense rejected");
            err
        })?;
        self.store.append_expense(&expense).await?;
        info!(
            actor,
            group = group_id,
            expense = %expense.id,
            amount = %expense.amount,
            "expense recorded"
        );

        let name = self.display_name(actor).await;
        self.notify(
            NotificationKind::ExpenseAdded,
            format!(
                "{} added \"{}\" ({})",
                name, expense.description, expense.amount
            ),
            &group,
            actor,
        )
        .await;
        Ok(expense)
    }

    pub async fn record_settlement(
        &self,
        actor: &str,
        group_id: &str,
        draft: SettlementDraft,
    ) -> Result<Settlement> {
        let group = self.group_for(actor, group_id, &Action::RecordSettlement).await?;
        let settlement = validate_settlement(draft, &group, actor).map_err(|err| {
            warn!(actor, group = group_id, error = %err, "settlement rejected");
            err
        })?;
        self.store.append_settlement(&settlement).await?;
        info!(
            group = group_id,
            from = %settlement.from,
            to = %settlement.to,
            amount = %settlement.amount,
            "settlement recorded"
        );

        let name = self.display_name(actor).await;
        self.notify(
            NotificationKind::SettlementAdded,
            format!("{} paid {}", name, settlement.amount),
            &group,
            actor,
        )
        .await;
        Ok(settlement)
    }

    /// Newest first.
    pub async fn expenses(&self, actor: &str, group_id: &str) -> Result<Vec<Expense>> {
        self.group_for(actor, group_id, &Action::ViewGroup).await?;
        let mut expenses = self.store.expenses(group_id).await?;
        expenses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(expenses)
    }

    /// Newest first.
    pub async fn settlements(&self, actor: &str, group_id: &str) -> Result<Vec<Settlement>> {
        self.group_for(actor, group_id, &Action::ViewGroup).await?;
        let mut settlements = self.store.settlements(group_id).await?;
        settlements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(settlements)
    }

    async fn current_balances(&self, group: &Group) -> Result<Balance> {
        let expenses = self.store.expenses(&group.id).await?;
        let settlements = self.store.settlements(&group.id).await?;

        let balance = compute_balances(&group.id, &expenses, &settlements).and_then(|balance| {
            check_conservation(&balance, expenses.len())?;
            Ok(balance)
        });
        let mut balance = balance.map_err(|err| {
            error!(group = %group.id, error = %err, "ledger does not add up");
            err
        })?;
        seed_members(&mut balance, &group.members);
        Ok(balance)
    }

    /// Net balance of every current member, zero for members with no entries.
    pub async fn balances(&self, actor: &str, group_id: &str) -> Result<Balance> {
        let group = self.group_for(actor, group_id, &Action::ViewGroup).await?;
        self.current_balances(&group).await
    }

    pub async fn suggestions(&self, actor: &str, group_id: &str) -> Result<Vec<Suggestion>> {
        let group = self.group_for(actor, group_id, &Action::ViewGroup).await?;
        let balance = self.current_balances(&group).await?;
        let members = self.store.find_members(&group.members).await?;
        Ok(suggest(actor, &balance, &members))
    }

    pub async fn exchanges(&self, actor: &str, group_id: &str) -> Result<Vec<Exchange>> {
        let group = self.group_for(actor, group_id, &Action::ViewGroup).await?;
        let expenses = self.store.expenses(&group.id).await?;
        let settlements = self.store.settlements(&group.id).await?;
        get_exchanges(&group.id, &expenses, &settlements)
    }
}
