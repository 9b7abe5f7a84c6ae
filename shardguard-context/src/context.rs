//! The tenant-scoped unit of work.

use crate::query::{read_rows, Query, COLUMNS};
use crate::schema_sql::{ensure_schema, json_field};
use crate::{ContextError, ContextOptions, ContextResult};
use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use shardguard_model::{DataKeyScope, Entity, EntityModel, Model};
use shardguard_types::{DataKey, DataKeyContext, EntityId};
use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of a [`TenantDbContext`].
///
/// `Created → Active → Committing → Committed | Aborted`. A committed context
/// still serves reads; an aborted one refuses everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Created,
    Active,
    Committing,
    Committed,
    Aborted,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Active => "active",
            Self::Committing => "committing",
            Self::Committed => "committed",
            Self::Aborted => "aborted",
        })
    }
}

/// A tracked write, applied at [`TenantDbContext::commit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Add(Entity),
    Update(Entity),
    Remove { entity_type: String, id: EntityId },
}

impl Change {
    pub fn entity_type(&self) -> &str {
        match self {
            Self::Add(e) | Self::Update(e) => &e.entity_type,
            Self::Remove { entity_type, .. } => entity_type,
        }
    }

    pub fn id(&self) -> EntityId {
        match self {
            Self::Add(e) | Self::Update(e) => e.id,
            Self::Remove { id, .. } => *id,
        }
    }
}

/// One unit of work against one tenant's data.
///
/// Every read is filtered to rows whose `data_key` equals the context's key,
/// and every written row is stamped with it. A context opened with
/// [`DataKeyContext::deny_all`] reads nothing and cannot commit writes.
pub struct TenantDbContext {
    conn: Connection,
    model: Arc<Model>,
    scope: DataKeyContext,
    pending: Vec<Change>,
    state: Cell<ContextState>,
}

impl TenantDbContext {
    /// Connects to the scope's shard, or to the default database when the
    /// scope carries no connection, and creates any missing tables.
    pub fn open(options: &ContextOptions, scope: DataKeyContext) -> ContextResult<Self> {
        let target = scope.connection().unwrap_or(options.default_connection());
        let conn = shardguard_db::open_connection(target)?;
        ensure_schema(&conn, options.model())?;
        debug!(
            data_key = %scope.data_key(),
            database_type = %target.database_type,
            sharded = scope.connection().is_some(),
            "Opened tenant context"
        );
        Ok(Self {
            conn,
            model: Arc::clone(options.model()),
            scope,
            pending: Vec::new(),
            state: Cell::new(ContextState::Created),
        })
    }

    pub fn state(&self) -> ContextState {
        self.state.get()
    }

    pub fn scope(&self) -> &DataKeyContext {
        &self.scope
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Changes tracked since the context was opened.
    pub fn pending(&self) -> &[Change] {
        &self.pending
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Loads one row by id, if it is visible to this context.
    pub fn find(&self, entity_type: &str, id: EntityId) -> ContextResult<Option<Entity>> {
        self.begin_read("read")?;
        let entity = self.entity_model(entity_type)?;
        let clause = entity.filter().clause(self);

        let sql = format!(
            "SELECT {COLUMNS} FROM \"{}\" WHERE id = ? AND {}",
            entity.table_name(),
            clause.sql
        );
        let mut params = vec![SqlValue::Text(id.to_string())];
        params.extend(clause.param.map(SqlValue::Text));
        Ok(read_rows(&self.conn, entity_type, &sql, &params)?.into_iter().next())
    }

    /// Starts a filtered query over one entity type.
    pub fn query(&self, entity_type: &str) -> ContextResult<Query<'_>> {
        self.begin_read("query")?;
        let entity = self.entity_model(entity_type)?;
        Ok(Query::new(self, entity))
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Tracks a new row. The data key is stamped at commit.
    pub fn add(&mut self, entity: Entity) -> ContextResult<EntityId> {
        self.begin_write("add")?;
        self.entity_model(&entity.entity_type)?;
        let id = entity.id;
        self.pending.push(Change::Add(entity));
        Ok(id)
    }

    /// Tracks a replacement payload for an existing row.
    pub fn update(&mut self, entity: Entity) -> ContextResult<()> {
        self.begin_write("update")?;
        self.entity_model(&entity.entity_type)?;
        self.pending.push(Change::Update(entity));
        Ok(())
    }

    /// Tracks a delete. Rows of child types that name this row as their
    /// parent are deleted with it.
    pub fn remove(&mut self, entity_type: &str, id: EntityId) -> ContextResult<()> {
        self.begin_write("remove")?;
        self.entity_model(entity_type)?;
        self.pending.push(Change::Remove {
            entity_type: entity_type.to_string(),
            id,
        });
        Ok(())
    }

    /// Applies every tracked change in one transaction and returns the number
    /// of rows written, including cascaded deletes.
    ///
    /// Either everything is applied or nothing is: any failure rolls the
    /// transaction back and leaves the context [`ContextState::Aborted`].
    pub fn commit(&mut self) -> ContextResult<usize> {
        match self.state.get() {
            ContextState::Created | ContextState::Active => {}
            state => {
                return Err(ContextError::InvalidState {
                    state,
                    operation: "commit",
                });
            }
        }

        let changes = std::mem::take(&mut self.pending);
        if changes.is_empty() {
            self.state.set(ContextState::Committed);
            return Ok(0);
        }

        self.state.set(ContextState::Committing);
        let count = changes.len();
        match self.apply(changes) {
            Ok(rows) => {
                self.state.set(ContextState::Committed);
                info!(data_key = %self.scope.data_key(), changes = count, rows, "Committed unit of work");
                Ok(rows)
            }
            Err(e) => {
                self.state.set(ContextState::Aborted);
                warn!(data_key = %self.scope.data_key(), error = %e, "Unit of work aborted");
                Err(e)
            }
        }
    }

    fn apply(&mut self, mut changes: Vec<Change>) -> ContextResult<usize> {
        let key = match self.scope.data_key() {
            DataKey::Key(k) => k.clone(),
            DataKey::DenyAll => {
                let (entity_type, id) = changes
                    .first()
                    .map(|c| (c.entity_type().to_string(), c.id()))
                    .unwrap_or_default();
                return Err(ContextError::IsolationViolation {
                    entity_type,
                    id,
                    reason: "context has no data key".into(),
                });
            }
        };
        let model = Arc::clone(&self.model);

        for change in &mut changes {
            if let Change::Add(entity) | Change::Update(entity) = change {
                stamp(&model, entity, &key)?;
            }
        }

        let now = Utc::now().timestamp_millis();
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut rows = 0;

        for change in &changes {
            let entity_model = lookup(&model, change.entity_type())?;
            let table = entity_model.table_name();
            match change {
                Change::Add(e) => {
                    rows += tx.execute(
                        &format!(
                            "INSERT INTO \"{table}\" (id, data_key, data, created_at, modified_at)
                             VALUES (?1, ?2, ?3, ?4, ?4)"
                        ),
                        params![e.id.to_string(), key, serde_json::to_string(&e.data)?, now],
                    )?;
                }
                Change::Update(e) => {
                    let updated = tx.execute(
                        &format!(
                            "UPDATE \"{table}\" SET data = ?1, modified_at = ?2
                             WHERE id = ?3 AND data_key = ?4"
                        ),
                        params![serde_json::to_string(&e.data)?, now, e.id.to_string(), key],
                    )?;
                    if updated == 0 {
                        return Err(not_found(change));
                    }
                    rows += updated;
                }
                Change::Remove { id, .. } => {
                    let removed = remove_row(&tx, &model, entity_model, &id.to_string(), &key)?;
                    if removed == 0 {
                        return Err(not_found(change));
                    }
                    rows += removed;
                }
            }
        }

        for change in &changes {
            if let Change::Add(e) | Change::Update(e) = change {
                check_parent(&tx, &model, e, &key)?;
            }
        }

        tx.commit()?;
        Ok(rows)
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    fn entity_model(&self, entity_type: &str) -> ContextResult<&EntityModel> {
        lookup(&self.model, entity_type)
    }

    fn begin_read(&self, operation: &'static str) -> ContextResult<()> {
        match self.state.get() {
            ContextState::Created => self.state.set(ContextState::Active),
            ContextState::Active | ContextState::Committed => {}
            state => return Err(ContextError::InvalidState { state, operation }),
        }
        Ok(())
    }

    fn begin_write(&self, operation: &'static str) -> ContextResult<()> {
        match self.state.get() {
            ContextState::Created => self.state.set(ContextState::Active),
            ContextState::Active => {}
            state => return Err(ContextError::InvalidState { state, operation }),
        }
        Ok(())
    }
}

impl DataKeyScope for TenantDbContext {
    fn data_key(&self) -> &DataKey {
        self.scope.data_key()
    }
}

impl Drop for TenantDbContext {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            debug!(changes = self.pending.len(), "Discarding uncommitted changes");
        }
    }
}

fn lookup<'m>(model: &'m Model, entity_type: &str) -> ContextResult<&'m EntityModel> {
    model
        .entity(entity_type)
        .ok_or_else(|| ContextError::UnknownEntityType(entity_type.to_string()))
}

fn not_found(change: &Change) -> ContextError {
    ContextError::NotFound {
        entity_type: change.entity_type().to_string(),
        id: change.id(),
    }
}

/// Validates the payload and sets the row's key. A row that already carries
/// another tenant's key is refused.
fn stamp(model: &Model, entity: &mut Entity, key: &str) -> ContextResult<()> {
    if let Some(existing) = entity.data_key.as_deref() {
        if existing != key {
            return Err(ContextError::IsolationViolation {
                entity_type: entity.entity_type.clone(),
                id: entity.id,
                reason: "row carries a different data key".into(),
            });
        }
    }
    lookup(model, &entity.entity_type)?.normalize(&mut entity.data)?;
    entity.data_key = Some(key.to_string());
    Ok(())
}

/// Deletes a row and, recursively, the rows of child types pointing at it.
/// Returns 0 if the row is not visible under `key`.
fn remove_row(
    tx: &Transaction<'_>,
    model: &Model,
    entity: &EntityModel,
    id: &str,
    key: &str,
) -> ContextResult<usize> {
    let mut rows = tx.execute(
        &format!("DELETE FROM \"{}\" WHERE id = ?1 AND data_key = ?2", entity.table_name()),
        params![id, key],
    )?;
    if rows == 0 {
        return Ok(0);
    }

    let children = model.entities().filter(|c| {
        c.schema()
            .parent
            .as_ref()
            .is_some_and(|p| p.entity_type == entity.entity_type())
    });
    for child in children {
        let Some(link) = child.schema().parent.as_ref() else {
            continue;
        };
        let child_ids: Vec<String> = {
            let mut stmt = tx.prepare(&format!(
                "SELECT id FROM \"{}\" WHERE data_key = ?1 AND {} = ?2",
                child.table_name(),
                json_field(&link.field)
            ))?;
            let ids = stmt.query_map(params![key, id], |row| row.get::<_, String>(0))?;
            ids.collect::<Result<_, _>>()?
        };
        for child_id in child_ids {
            rows += remove_row(tx, model, child, &child_id, key)?;
        }
    }
    Ok(rows)
}

/// A child row must point at a parent that is visible under the same key,
/// either already stored or written earlier in this transaction.
fn check_parent(tx: &Transaction<'_>, model: &Model, entity: &Entity, key: &str) -> ContextResult<()> {
    let entity_model = lookup(model, &entity.entity_type)?;
    let Some(link) = entity_model.schema().parent.as_ref() else {
        return Ok(());
    };

    // Removed again later in the same batch.
    let still_present = tx
        .query_row(
            &format!("SELECT 1 FROM \"{}\" WHERE id = ?1 AND data_key = ?2", entity_model.table_name()),
            params![entity.id.to_string(), key],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !still_present {
        return Ok(());
    }

    let violation = |reason: String| ContextError::IsolationViolation {
        entity_type: entity.entity_type.clone(),
        id: entity.id,
        reason,
    };
    let parent_id = entity
        .data
        .get(&link.field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| violation(format!("missing parent reference '{}'", link.field)))?;
    let parent = lookup(model, &link.entity_type)?;
    let visible = tx
        .query_row(
            &format!("SELECT 1 FROM \"{}\" WHERE id = ?1 AND data_key = ?2", parent.table_name()),
            params![parent_id, key],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !visible {
        return Err(violation(format!(
            "parent {} {parent_id} is not visible under this data key",
            link.entity_type
        )));
    }
    Ok(())
}
