//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres, and the
//! [`PgStore`] implementation of the storage traits.
//!
//! A [`PgTx`] owns one pooled connection for its whole lifetime and wraps
//! it in `BEGIN` / `COMMIT`. A transaction dropped without finishing takes
//! its connection out of the pool and closes it, which makes the server
//! abort the open transaction.

use async_trait::async_trait;
use crm_core::{
    Company, Contact, CrmError, CrmResult, Deal, DealStage, EntityId, EntityType, NewCompany,
    NewContact, NewDeal, NewTask, StorageError, Task, Timestamp,
};
use crm_storage::{EntityStore, StoreTx};
use deadpool_postgres::{
    Config, ManagerConfig, Object, Pool, PoolConfig, PoolError, RecyclingMethod, Runtime,
};
use std::time::Duration;
use tokio_postgres::{NoTls, Row};

use crate::error::{ApiError, ApiResult};

/// Schema applied by [`PgStore::migrate`]. Every statement is idempotent.
const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// How long to wait for a pooled connection
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "crm".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    ///
    /// Reads `CRM_DB_HOST`, `CRM_DB_PORT`, `CRM_DB_NAME`, `CRM_DB_USER`,
    /// `CRM_DB_PASSWORD`, `CRM_DB_POOL_SIZE` and `CRM_DB_TIMEOUT` (seconds).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("CRM_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("CRM_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("CRM_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("CRM_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("CRM_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("CRM_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: std::env::var("CRM_DB_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

fn unavailable(err: PoolError) -> CrmError {
    StorageError::Unavailable {
        reason: err.to_string(),
    }
    .into()
}

fn tx_failed(err: tokio_postgres::Error) -> CrmError {
    StorageError::TransactionFailed {
        reason: err.to_string(),
    }
    .into()
}

fn insert_failed(entity_type: EntityType) -> impl FnOnce(tokio_postgres::Error) -> CrmError {
    move |err| {
        StorageError::InsertFailed {
            entity_type,
            reason: err.to_string(),
        }
        .into()
    }
}

fn update_failed(
    entity_type: EntityType,
    id: EntityId,
) -> impl FnOnce(tokio_postgres::Error) -> CrmError {
    move |err| {
        StorageError::UpdateFailed {
            entity_type,
            id,
            reason: err.to_string(),
        }
        .into()
    }
}

fn delete_failed(entity_type: EntityType) -> impl FnOnce(tokio_postgres::Error) -> CrmError {
    move |err| {
        StorageError::DeleteFailed {
            entity_type,
            reason: err.to_string(),
        }
        .into()
    }
}

fn corrupt(entity_type: EntityType, reason: impl ToString) -> CrmError {
    StorageError::CorruptRow {
        entity_type,
        reason: reason.to_string(),
    }
    .into()
}

// ============================================================================
// ROW MAPPING
// ============================================================================

const COMPANY_COLUMNS: &str =
    "id, name, industry, website, phone, email, address, created_at, updated_at";

const CONTACT_COLUMNS: &str =
    "id, first_name, last_name, email, phone, job_title, company_id, created_at, updated_at";

const DEAL_COLUMNS: &str = "id, title, description, value, stage::text AS stage, contact_id, \
     company_id, expected_close_date, created_at, updated_at";

const TASK_COLUMNS: &str = "id, title, description, completed, due_date, contact_id, company_id, \
     deal_id, created_at, updated_at";

fn column<'a, T>(row: &'a Row, entity_type: EntityType, name: &str) -> CrmResult<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(name)
        .map_err(|e| corrupt(entity_type, format!("column {}: {}", name, e)))
}

fn company_from_row(row: &Row) -> CrmResult<Company> {
    let kind = EntityType::Company;
    Ok(Company {
        id: column(row, kind, "id")?,
        name: column(row, kind, "name")?,
        industry: column(row, kind, "industry")?,
        website: column(row, kind, "website")?,
        phone: column(row, kind, "phone")?,
        email: column(row, kind, "email")?,
        address: column(row, kind, "address")?,
        created_at: column(row, kind, "created_at")?,
        updated_at: column(row, kind, "updated_at")?,
    })
}

fn contact_from_row(row: &Row) -> CrmResult<Contact> {
    let kind = EntityType::Contact;
    Ok(Contact {
        id: column(row, kind, "id")?,
        first_name: column(row, kind, "first_name")?,
        last_name: column(row, kind, "last_name")?,
        email: column(row, kind, "email")?,
        phone: column(row, kind, "phone")?,
        job_title: column(row, kind, "job_title")?,
        company_id: column(row, kind, "company_id")?,
        created_at: column(row, kind, "created_at")?,
        updated_at: column(row, kind, "updated_at")?,
    })
}

fn deal_from_row(row: &Row) -> CrmResult<Deal> {
    let kind = EntityType::Deal;
    let stage: String = column(row, kind, "stage")?;
    Ok(Deal {
        id: column(row, kind, "id")?,
        title: column(row, kind, "title")?,
        description: column(row, kind, "description")?,
        value: column(row, kind, "value")?,
        stage: DealStage::from_db_str(&stage).map_err(|e| corrupt(kind, e))?,
        contact_id: column(row, kind, "contact_id")?,
        company_id: column(row, kind, "company_id")?,
        expected_close_date: column(row, kind, "expected_close_date")?,
        created_at: column(row, kind, "created_at")?,
        updated_at: column(row, kind, "updated_at")?,
    })
}

fn task_from_row(row: &Row) -> CrmResult<Task> {
    let kind = EntityType::Task;
    Ok(Task {
        id: column(row, kind, "id")?,
        title: column(row, kind, "title")?,
        description: column(row, kind, "description")?,
        completed: column(row, kind, "completed")?,
        due_date: column(row, kind, "due_date")?,
        contact_id: column(row, kind, "contact_id")?,
        company_id: column(row, kind, "company_id")?,
        deal_id: column(row, kind, "deal_id")?,
        created_at: column(row, kind, "created_at")?,
        updated_at: column(row, kind, "updated_at")?,
    })
}

// ============================================================================
// POSTGRES STORE
// ============================================================================

/// [`EntityStore`] backed by a deadpool-postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl std::fmt::Debug for PgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStore")
            .field("pool_size", &self.pool.status().size)
            .finish()
    }
}

impl PgStore {
    /// Create a store over an existing pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a store from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Apply the schema.
    pub async fn migrate(&self) -> ApiResult<()> {
        let conn = self.pool.get().await?;
        conn.batch_execute(SCHEMA).await?;
        tracing::info!("database schema is up to date");
        Ok(())
    }

    /// Delete every row and restart the id sequences.
    pub async fn truncate_all(&self) -> ApiResult<()> {
        let conn = self.pool.get().await?;
        conn.batch_execute("TRUNCATE tasks, deals, contacts, companies RESTART IDENTITY")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn begin(&self) -> CrmResult<Box<dyn StoreTx>> {
        let conn = self.pool.get().await.map_err(unavailable)?;
        conn.batch_execute("BEGIN").await.map_err(tx_failed)?;
        Ok(Box::new(PgTx { conn: Some(conn) }))
    }

    async fn ping(&self) -> CrmResult<()> {
        let conn = self.pool.get().await.map_err(unavailable)?;
        conn.query_one("SELECT 1", &[]).await.map_err(tx_failed)?;
        Ok(())
    }
}

/// One open transaction on a pooled connection.
pub struct PgTx {
    conn: Option<Object>,
}

impl PgTx {
    fn conn(&self) -> CrmResult<&Object> {
        self.conn.as_ref().ok_or_else(|| {
            StorageError::TransactionFailed {
                reason: "transaction already finished".to_string(),
            }
            .into()
        })
    }

    async fn finish(mut self: Box<Self>, statement: &str) -> CrmResult<()> {
        let conn = self.conn.take().ok_or_else(|| {
            CrmError::from(StorageError::TransactionFailed {
                reason: "transaction already finished".to_string(),
            })
        })?;
        match conn.batch_execute(statement).await {
            // Connection returns to the pool
            Ok(()) => Ok(()),
            Err(e) => {
                // State unknown; never hand this connection out again
                drop(Object::take(conn));
                Err(tx_failed(e))
            }
        }
    }

    async fn delete_row(&mut self, kind: EntityType, id: EntityId) -> CrmResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table_name());
        let removed = self
            .conn()?
            .execute(sql.as_str(), &[&id])
            .await
            .map_err(delete_failed(kind))?;
        Ok(removed > 0)
    }
}

impl Drop for PgTx {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!("transaction dropped without commit or rollback; closing connection");
            drop(Object::take(conn));
        }
    }
}

#[async_trait]
impl StoreTx for PgTx {
    // === Company Operations ===

    async fn company_insert(&mut self, input: &NewCompany, now: Timestamp) -> CrmResult<Company> {
        let sql = format!(
            "INSERT INTO companies (name, industry, website, phone, email, address, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) RETURNING {}",
            COMPANY_COLUMNS
        );
        let row = self
            .conn()?
            .query_one(
                sql.as_str(),
                &[
                    &input.name,
                    &input.industry,
                    &input.website,
                    &input.phone,
                    &input.email,
                    &input.address,
                    &now,
                ],
            )
            .await
            .map_err(insert_failed(EntityType::Company))?;
        company_from_row(&row)
    }

    async fn company_get(&mut self, id: EntityId) -> CrmResult<Option<Company>> {
        let sql = format!("SELECT {} FROM companies WHERE id = $1", COMPANY_COLUMNS);
        let row = self
            .conn()?
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tx_failed)?;
        row.as_ref().map(company_from_row).transpose()
    }

    async fn company_list(&mut self) -> CrmResult<Vec<Company>> {
        let sql = format!("SELECT {} FROM companies ORDER BY id", COMPANY_COLUMNS);
        let rows = self.conn()?.query(sql.as_str(), &[]).await.map_err(tx_failed)?;
        rows.iter().map(company_from_row).collect()
    }

    async fn company_save(&mut self, company: &Company) -> CrmResult<()> {
        let updated = self
            .conn()?
            .execute(
                "UPDATE companies SET name = $2, industry = $3, website = $4, phone = $5, \
                 email = $6, address = $7, updated_at = $8 WHERE id = $1",
                &[
                    &company.id,
                    &company.name,
                    &company.industry,
                    &company.website,
                    &company.phone,
                    &company.email,
                    &company.address,
                    &company.updated_at,
                ],
            )
            .await
            .map_err(update_failed(EntityType::Company, company.id))?;
        if updated == 0 {
            return Err(CrmError::not_found(EntityType::Company, company.id));
        }
        Ok(())
    }

    async fn company_delete(&mut self, id: EntityId) -> CrmResult<bool> {
        self.delete_row(EntityType::Company, id).await
    }

    // === Contact Operations ===

    async fn contact_insert(&mut self, input: &NewContact, now: Timestamp) -> CrmResult<Contact> {
        let sql = format!(
            "INSERT INTO contacts (first_name, last_name, email, phone, job_title, company_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) RETURNING {}",
            CONTACT_COLUMNS
        );
        let row = self
            .conn()?
            .query_one(
                sql.as_str(),
                &[
                    &input.first_name,
                    &input.last_name,
                    &input.email,
                    &input.phone,
                    &input.job_title,
                    &input.company_id,
                    &now,
                ],
            )
            .await
            .map_err(insert_failed(EntityType::Contact))?;
        contact_from_row(&row)
    }

    async fn contact_get(&mut self, id: EntityId) -> CrmResult<Option<Contact>> {
        let sql = format!("SELECT {} FROM contacts WHERE id = $1", CONTACT_COLUMNS);
        let row = self
            .conn()?
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tx_failed)?;
        row.as_ref().map(contact_from_row).transpose()
    }

    async fn contact_list(&mut self) -> CrmResult<Vec<Contact>> {
        let sql = format!("SELECT {} FROM contacts ORDER BY id", CONTACT_COLUMNS);
        let rows = self.conn()?.query(sql.as_str(), &[]).await.map_err(tx_failed)?;
        rows.iter().map(contact_from_row).collect()
    }

    async fn contact_save(&mut self, contact: &Contact) -> CrmResult<()> {
        let updated = self
            .conn()?
            .execute(
                "UPDATE contacts SET first_name = $2, last_name = $3, email = $4, phone = $5, \
                 job_title = $6, company_id = $7, updated_at = $8 WHERE id = $1",
                &[
                    &contact.id,
                    &contact.first_name,
                    &contact.last_name,
                    &contact.email,
                    &contact.phone,
                    &contact.job_title,
                    &contact.company_id,
                    &contact.updated_at,
                ],
            )
            .await
            .map_err(update_failed(EntityType::Contact, contact.id))?;
        if updated == 0 {
            return Err(CrmError::not_found(EntityType::Contact, contact.id));
        }
        Ok(())
    }

    async fn contact_delete(&mut self, id: EntityId) -> CrmResult<bool> {
        self.delete_row(EntityType::Contact, id).await
    }

    // === Deal Operations ===

    async fn deal_insert(&mut self, input: &NewDeal, now: Timestamp) -> CrmResult<Deal> {
        let sql = format!(
            "INSERT INTO deals (title, description, value, stage, contact_id, company_id, expected_close_date, created_at, updated_at) \
             VALUES ($1, $2, $3, CAST($4::text AS deal_stage), $5, $6, $7, $8, $8) RETURNING {}",
            DEAL_COLUMNS
        );
        let row = self
            .conn()?
            .query_one(
                sql.as_str(),
                &[
                    &input.title,
                    &input.description,
                    &input.value,
                    &input.stage.as_db_str(),
                    &input.contact_id,
                    &input.company_id,
                    &input.expected_close_date,
                    &now,
                ],
            )
            .await
            .map_err(insert_failed(EntityType::Deal))?;
        deal_from_row(&row)
    }

    async fn deal_get(&mut self, id: EntityId) -> CrmResult<Option<Deal>> {
        let sql = format!("SELECT {} FROM deals WHERE id = $1", DEAL_COLUMNS);
        let row = self
            .conn()?
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tx_failed)?;
        row.as_ref().map(deal_from_row).transpose()
    }

    async fn deal_list(&mut self) -> CrmResult<Vec<Deal>> {
        let sql = format!("SELECT {} FROM deals ORDER BY id", DEAL_COLUMNS);
        let rows = self.conn()?.query(sql.as_str(), &[]).await.map_err(tx_failed)?;
        rows.iter().map(deal_from_row).collect()
    }

    async fn deal_save(&mut self, deal: &Deal) -> CrmResult<()> {
        let updated = self
            .conn()?
            .execute(
                "UPDATE deals SET title = $2, description = $3, value = $4, \
                 stage = CAST($5::text AS deal_stage), contact_id = $6, company_id = $7, \
                 expected_close_date = $8, updated_at = $9 WHERE id = $1",
                &[
                    &deal.id,
                    &deal.title,
                    &deal.description,
                    &deal.value,
                    &deal.stage.as_db_str(),
                    &deal.contact_id,
                    &deal.company_id,
                    &deal.expected_close_date,
                    &deal.updated_at,
                ],
            )
            .await
            .map_err(update_failed(EntityType::Deal, deal.id))?;
        if updated == 0 {
            return Err(CrmError::not_found(EntityType::Deal, deal.id));
        }
        Ok(())
    }

    async fn deal_delete(&mut self, id: EntityId) -> CrmResult<bool> {
        self.delete_row(EntityType::Deal, id).await
    }

    // === Task Operations ===

    async fn task_insert(&mut self, input: &NewTask, now: Timestamp) -> CrmResult<Task> {
        let sql = format!(
            "INSERT INTO tasks (title, description, completed, due_date, contact_id, company_id, deal_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) RETURNING {}",
            TASK_COLUMNS
        );
        let row = self
            .conn()?
            .query_one(
                sql.as_str(),
                &[
                    &input.title,
                    &input.description,
                    &input.completed,
                    &input.due_date,
                    &input.contact_id,
                    &input.company_id,
                    &input.deal_id,
                    &now,
                ],
            )
            .await
            .map_err(insert_failed(EntityType::Task))?;
        task_from_row(&row)
    }

    async fn task_get(&mut self, id: EntityId) -> CrmResult<Option<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        let row = self
            .conn()?
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tx_failed)?;
        row.as_ref().map(task_from_row).transpose()
    }

    async fn task_list(&mut self) -> CrmResult<Vec<Task>> {
        let sql = format!("SELECT {} FROM tasks ORDER BY id", TASK_COLUMNS);
        let rows = self.conn()?.query(sql.as_str(), &[]).await.map_err(tx_failed)?;
        rows.iter().map(task_from_row).collect()
    }

    async fn task_save(&mut self, task: &Task) -> CrmResult<()> {
        let updated = self
            .conn()?
            .execute(
                "UPDATE tasks SET title = $2, description = $3, completed = $4, due_date = $5, \
                 contact_id = $6, company_id = $7, deal_id = $8, updated_at = $9 WHERE id = $1",
                &[
                    &task.id,
                    &task.title,
                    &task.description,
                    &task.completed,
                    &task.due_date,
                    &task.contact_id,
                    &task.company_id,
                    &task.deal_id,
                    &task.updated_at,
                ],
            )
            .await
            .map_err(update_failed(EntityType::Task, task.id))?;
        if updated == 0 {
            return Err(CrmError::not_found(EntityType::Task, task.id));
        }
        Ok(())
    }

    async fn task_delete(&mut self, id: EntityId) -> CrmResult<bool> {
        self.delete_row(EntityType::Task, id).await
    }

    // === Graph Operations ===

    async fn exists(&mut self, kind: EntityType, id: EntityId) -> CrmResult<bool> {
        // KEY SHARE blocks a concurrent delete of the row until we finish
        let sql = format!(
            "SELECT 1 FROM {} WHERE id = $1 FOR KEY SHARE",
            kind.table_name()
        );
        let row = self
            .conn()?
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tx_failed)?;
        Ok(row.is_some())
    }

    async fn task_delete_by_company(&mut self, company_id: EntityId) -> CrmResult<u64> {
        self.conn()?
            .execute(
                "DELETE FROM tasks WHERE company_id = $1 \
                 OR deal_id IN (SELECT id FROM deals WHERE company_id = $1)",
                &[&company_id],
            )
            .await
            .map_err(delete_failed(EntityType::Task))
    }

    async fn deal_delete_by_company(&mut self, company_id: EntityId) -> CrmResult<u64> {
        self.conn()?
            .execute("DELETE FROM deals WHERE company_id = $1", &[&company_id])
            .await
            .map_err(delete_failed(EntityType::Deal))
    }

    async fn contact_detach_company(
        &mut self,
        company_id: EntityId,
        now: Timestamp,
    ) -> CrmResult<u64> {
        self.conn()?
            .execute(
                "UPDATE contacts SET company_id = NULL, \
                 updated_at = GREATEST($2, updated_at + interval '1 microsecond') \
                 WHERE company_id = $1",
                &[&company_id, &now],
            )
            .await
            .map_err(update_failed(EntityType::Contact, company_id))
    }

    // === Lifecycle ===

    async fn commit(self: Box<Self>) -> CrmResult<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(self: Box<Self>) -> CrmResult<()> {
        self.finish("ROLLBACK").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::default();
        assert_eq!(config.dbname, "crm");
        assert_eq!(config.port, 5432);
        assert_eq!(config.max_size, 16);
    }

    #[test]
    fn test_schema_declares_every_table() {
        for kind in EntityType::ALL {
            assert!(
                SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {}", kind.table_name())),
                "missing table for {}",
                kind
            );
        }
        for stage in DealStage::ALL {
            assert!(SCHEMA.contains(&format!("'{}'", stage.as_db_str())));
        }
    }

    #[test]
    fn test_only_company_references_are_constrained() {
        let constrained = SCHEMA.matches("REFERENCES").count();
        assert_eq!(constrained, 3);
        assert_eq!(SCHEMA.matches("REFERENCES companies (id)").count(), 3);
    }

    #[tokio::test]
    async fn test_create_pool_is_lazy() {
        // deadpool connects on first checkout, so building the pool needs no server
        let pool = DbConfig::default().create_pool();
        assert!(pool.is_ok());
    }
}
