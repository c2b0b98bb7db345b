//! In-memory store.
//!
//! All tables sit behind one async mutex; a transaction holds the lock for
//! its whole lifetime, so commands are serialized. Writes go to a staged
//! copy of the tables which replaces the committed copy on commit.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use crm_core::{
    next_write_time, Company, Contact, CrmError, CrmResult, Deal, EntityId, EntityType,
    NewCompany, NewContact, NewDeal, NewTask, Record, Task, Timestamp,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{EntityStore, StoreOp, StoreTx};

#[derive(Debug, Clone, Copy, Default)]
struct LastIds {
    company: EntityId,
    contact: EntityId,
    deal: EntityId,
    task: EntityId,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    companies: BTreeMap<EntityId, Company>,
    contacts: BTreeMap<EntityId, Contact>,
    deals: BTreeMap<EntityId, Deal>,
    tasks: BTreeMap<EntityId, Task>,
    last_ids: LastIds,
}

impl Tables {
    fn next_id(&mut self, kind: EntityType) -> EntityId {
        let last = match kind {
            EntityType::Company => &mut self.last_ids.company,
            EntityType::Contact => &mut self.last_ids.contact,
            EntityType::Deal => &mut self.last_ids.deal,
            EntityType::Task => &mut self.last_ids.task,
        };
        *last += 1;
        *last
    }

    fn contains(&self, kind: EntityType, id: EntityId) -> bool {
        match kind {
            EntityType::Company => self.companies.contains_key(&id),
            EntityType::Contact => self.contacts.contains_key(&id),
            EntityType::Deal => self.deals.contains_key(&id),
            EntityType::Task => self.tasks.contains_key(&id),
        }
    }

    fn len(&self, kind: EntityType) -> usize {
        match kind {
            EntityType::Company => self.companies.len(),
            EntityType::Contact => self.contacts.len(),
            EntityType::Deal => self.deals.len(),
            EntityType::Task => self.tasks.len(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    tables: Tables,
    faults: HashSet<StoreOp>,
}

/// In-memory [`EntityStore`] for tests and for running the API without a
/// database.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later occurrence of `op` fail until faults are cleared.
    pub async fn fail_on(&self, op: StoreOp) {
        self.state.lock().await.faults.insert(op);
    }

    /// Remove all injected faults.
    pub async fn clear_faults(&self) {
        self.state.lock().await.faults.clear();
    }

    /// Number of committed records of `kind`.
    pub async fn count(&self, kind: EntityType) -> usize {
        self.state.lock().await.tables.len(kind)
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn begin(&self) -> CrmResult<Box<dyn StoreTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(Box::new(MemoryTx {
            guard,
            staged: None,
        }))
    }

    async fn ping(&self) -> CrmResult<()> {
        Ok(())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<State>,
    staged: Option<Tables>,
}

impl MemoryTx {
    fn read(&self) -> &Tables {
        self.staged.as_ref().unwrap_or(&self.guard.tables)
    }

    fn write(&mut self, op: StoreOp) -> CrmResult<&mut Tables> {
        if self.guard.faults.contains(&op) {
            return Err(op.fault().into());
        }
        let committed = &self.guard.tables;
        Ok(self.staged.get_or_insert_with(|| committed.clone()))
    }
}

fn save_row<R: Record>(table: &mut BTreeMap<EntityId, R>, row: &R) -> CrmResult<()> {
    match table.get_mut(&row.id()) {
        Some(slot) => {
            *slot = row.clone();
            Ok(())
        }
        None => Err(CrmError::not_found(R::ENTITY_TYPE, row.id())),
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    // === Company Operations ===

    async fn company_insert(&mut self, input: &NewCompany, now: Timestamp) -> CrmResult<Company> {
        let tables = self.write(StoreOp::Insert(EntityType::Company))?;
        let company = Company {
            id: tables.next_id(EntityType::Company),
            name: input.name.clone(),
            industry: input.industry.clone(),
            website: input.website.clone(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            address: input.address.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.companies.insert(company.id, company.clone());
        Ok(company)
    }

    async fn company_get(&mut self, id: EntityId) -> CrmResult<Option<Company>> {
        Ok(self.read().companies.get(&id).cloned())
    }

    async fn company_list(&mut self) -> CrmResult<Vec<Company>> {
        Ok(self.read().companies.values().cloned().collect())
    }

    async fn company_save(&mut self, company: &Company) -> CrmResult<()> {
        let tables = self.write(StoreOp::Save(EntityType::Company))?;
        save_row(&mut tables.companies, company)
    }

    async fn company_delete(&mut self, id: EntityId) -> CrmResult<bool> {
        let tables = self.write(StoreOp::Delete(EntityType::Company))?;
        Ok(tables.companies.remove(&id).is_some())
    }

    // === Contact Operations ===

    async fn contact_insert(&mut self, input: &NewContact, now: Timestamp) -> CrmResult<Contact> {
        let tables = self.write(StoreOp::Insert(EntityType::Contact))?;
        let contact = Contact {
            id: tables.next_id(EntityType::Contact),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            job_title: input.job_title.clone(),
            company_id: input.company_id,
            created_at: now,
            updated_at: now,
        };
        tables.contacts.insert(contact.id, contact.clone());
        Ok(contact)
    }

    async fn contact_get(&mut self, id: EntityId) -> CrmResult<Option<Contact>> {
        Ok(self.read().contacts.get(&id).cloned())
    }

    async fn contact_list(&mut self) -> CrmResult<Vec<Contact>> {
        Ok(self.read().contacts.values().cloned().collect())
    }

    async fn contact_save(&mut self, contact: &Contact) -> CrmResult<()> {
        let tables = self.write(StoreOp::Save(EntityType::Contact))?;
        save_row(&mut tables.contacts, contact)
    }

    async fn contact_delete(&mut self, id: EntityId) -> CrmResult<bool> {
        let tables = self.write(StoreOp::Delete(EntityType::Contact))?;
        Ok(tables.contacts.remove(&id).is_some())
    }

    // === Deal Operations ===

    async fn deal_insert(&mut self, input: &NewDeal, now: Timestamp) -> CrmResult<Deal> {
        let tables = self.write(StoreOp::Insert(EntityType::Deal))?;
        let deal = Deal {
            id: tables.next_id(EntityType::Deal),
            title: input.title.clone(),
            description: input.description.clone(),
            value: input.value,
            stage: input.stage,
            contact_id: input.contact_id,
            company_id: input.company_id,
            expected_close_date: input.expected_close_date,
            created_at: now,
            updated_at: now,
        };
        tables.deals.insert(deal.id, deal.clone());
        Ok(deal)
    }

    async fn deal_get(&mut self, id: EntityId) -> CrmResult<Option<Deal>> {
        Ok(self.read().deals.get(&id).cloned())
    }

    async fn deal_list(&mut self) -> CrmResult<Vec<Deal>> {
        Ok(self.read().deals.values().cloned().collect())
    }

    async fn deal_save(&mut self, deal: &Deal) -> CrmResult<()> {
        let tables = self.write(StoreOp::Save(EntityType::Deal))?;
        save_row(&mut tables.deals, deal)
    }

    async fn deal_delete(&mut self, id: EntityId) -> CrmResult<bool> {
        let tables = self.write(StoreOp::Delete(EntityType::Deal))?;
        Ok(tables.deals.remove(&id).is_some())
    }

    // === Task Operations ===

    async fn task_insert(&mut self, input: &NewTask, now: Timestamp) -> CrmResult<Task> {
        let tables = self.write(StoreOp::Insert(EntityType::Task))?;
        let task = Task {
            id: tables.next_id(EntityType::Task),
            title: input.title.clone(),
            description: input.description.clone(),
            completed: input.completed,
            due_date: input.due_date,
            contact_id: input.contact_id,
            company_id: input.company_id,
            deal_id: input.deal_id,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn task_get(&mut self, id: EntityId) -> CrmResult<Option<Task>> {
        Ok(self.read().tasks.get(&id).cloned())
    }

    async fn task_list(&mut self) -> CrmResult<Vec<Task>> {
        Ok(self.read().tasks.values().cloned().collect())
    }

    async fn task_save(&mut self, task: &Task) -> CrmResult<()> {
        let tables = self.write(StoreOp::Save(EntityType::Task))?;
        save_row(&mut tables.tasks, task)
    }

    async fn task_delete(&mut self, id: EntityId) -> CrmResult<bool> {
        let tables = self.write(StoreOp::Delete(EntityType::Task))?;
        Ok(tables.tasks.remove(&id).is_some())
    }

    // === Graph Operations ===

    async fn exists(&mut self, kind: EntityType, id: EntityId) -> CrmResult<bool> {
        Ok(self.read().contains(kind, id))
    }

    async fn task_delete_by_company(&mut self, company_id: EntityId) -> CrmResult<u64> {
        let tables = self.write(StoreOp::DeleteTasksByCompany)?;
        let deal_ids: HashSet<EntityId> = tables
            .deals
            .values()
            .filter(|deal| deal.company_id == company_id)
            .map(|deal| deal.id)
            .collect();
        let before = tables.tasks.len();
        tables.tasks.retain(|_, task| {
            task.company_id != Some(company_id)
                && !task.deal_id.is_some_and(|id| deal_ids.contains(&id))
        });
        Ok((before - tables.tasks.len()) as u64)
    }

    async fn deal_delete_by_company(&mut self, company_id: EntityId) -> CrmResult<u64> {
        let tables = self.write(StoreOp::DeleteDealsByCompany)?;
        let before = tables.deals.len();
        tables.deals.retain(|_, deal| deal.company_id != company_id);
        Ok((before - tables.deals.len()) as u64)
    }

    async fn contact_detach_company(
        &mut self,
        company_id: EntityId,
        now: Timestamp,
    ) -> CrmResult<u64> {
        let tables = self.write(StoreOp::DetachContacts)?;
        let mut detached = 0;
        for contact in tables
            .contacts
            .values_mut()
            .filter(|contact| contact.company_id == Some(company_id))
        {
            contact.company_id = None;
            contact.updated_at = next_write_time(contact.updated_at, now);
            detached += 1;
        }
        Ok(detached)
    }

    // === Lifecycle ===

    async fn commit(self: Box<Self>) -> CrmResult<()> {
        let MemoryTx { mut guard, staged } = *self;
        if guard.faults.contains(&StoreOp::Commit) {
            return Err(StoreOp::Commit.fault().into());
        }
        if let Some(tables) = staged {
            guard.tables = tables;
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> CrmResult<()> {
        if self.staged.is_some() {
            tracing::debug!("discarding staged in-memory writes");
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
