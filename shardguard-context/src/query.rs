//! Filtered queries over one entity type.

use crate::schema_sql::json_field;
use crate::{ContextError, ContextResult, TenantDbContext};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use shardguard_model::{Entity, EntityModel, FieldType, MONEY};
use shardguard_types::EntityId;

pub(crate) const COLUMNS: &str = "id, data_key, data, created_at, modified_at";

/// Row columns that can be used in conditions and ordering besides the
/// declared fields.
const META_COLUMNS: [&str; 3] = ["id", "created_at", "modified_at"];

/// A query builder; the context's data-key filter is always applied.
///
/// ```ignore
/// let open = ctx
///     .query("invoice")?
///     .where_eq("status", "open")
///     .order_by_desc("created_at")
///     .limit(10)
///     .all()?;
/// ```
pub struct Query<'c> {
    ctx: &'c TenantDbContext,
    entity: &'c EntityModel,
    conditions: Vec<(String, Value)>,
    order: Vec<(String, bool)>,
    limit: Option<usize>,
}

impl<'c> Query<'c> {
    pub(crate) fn new(ctx: &'c TenantDbContext, entity: &'c EntityModel) -> Self {
        Self {
            ctx,
            entity,
            conditions: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Matches rows whose `field` equals `value`. `null` matches missing fields.
    #[must_use]
    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((field.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: &str) -> Self {
        self.order.push((field.to_string(), false));
        self
    }

    #[must_use]
    pub fn order_by_desc(mut self, field: &str) -> Self {
        self.order.push((field.to_string(), true));
        self
    }

    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Matching rows, ordered by the requested fields and then by id.
    pub fn all(&self) -> ContextResult<Vec<Entity>> {
        let (where_sql, params) = self.render_where()?;
        let mut sql = format!(
            "SELECT {COLUMNS} FROM \"{}\" WHERE {where_sql} ORDER BY ",
            self.entity.table_name()
        );
        for (field, desc) in &self.order {
            sql.push_str(&self.column(field)?);
            sql.push_str(if *desc { " DESC, " } else { " ASC, " });
        }
        sql.push_str("id");
        if let Some(n) = self.limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        read_rows(self.ctx.connection(), self.entity.entity_type(), &sql, &params)
    }

    pub fn first(&self) -> ContextResult<Option<Entity>> {
        let mut rows = Query {
            ctx: self.ctx,
            entity: self.entity,
            conditions: self.conditions.clone(),
            order: self.order.clone(),
            limit: Some(1),
        }
        .all()?;
        Ok(rows.pop())
    }

    /// Number of matching rows. Ordering and limit are ignored.
    pub fn count(&self) -> ContextResult<usize> {
        let (where_sql, params) = self.render_where()?;
        let sql = format!(
            "SELECT COUNT(*) FROM \"{}\" WHERE {where_sql}",
            self.entity.table_name()
        );
        let n: i64 = self
            .ctx
            .connection()
            .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
        usize::try_from(n).map_err(|_| ContextError::Corrupt(format!("negative count {n}")))
    }

    fn render_where(&self) -> ContextResult<(String, Vec<SqlValue>)> {
        let clause = self.entity.filter().clause(self.ctx);
        let mut parts = vec![clause.sql];
        let mut params: Vec<SqlValue> = clause.param.map(SqlValue::Text).into_iter().collect();

        for (field, value) in &self.conditions {
            let column = self.column(field)?;
            match self.bind(field, value)? {
                None => parts.push(format!("{column} IS NULL")),
                Some(v) => {
                    parts.push(format!("{column} = ?"));
                    params.push(v);
                }
            }
        }
        Ok((parts.join(" AND "), params))
    }

    fn column(&self, field: &str) -> ContextResult<String> {
        if META_COLUMNS.contains(&field) {
            return Ok(field.to_string());
        }
        match self.entity.schema().field_def(field) {
            Some(_) => Ok(json_field(field)),
            None => Err(ContextError::InvalidQuery(format!(
                "{} has no field '{field}'",
                self.entity.entity_type()
            ))),
        }
    }

    fn bind(&self, field: &str, value: &Value) -> ContextResult<Option<SqlValue>> {
        let decimal = self
            .entity
            .schema()
            .field_def(field)
            .filter(|f| f.field_type == FieldType::Decimal);
        let value = match decimal {
            Some(def) if !value.is_null() => def
                .decimal
                .unwrap_or(MONEY)
                .normalize(value)
                .map_err(ContextError::InvalidQuery)?,
            _ => value.clone(),
        };

        Ok(match value {
            Value::Null => None,
            Value::Bool(b) => Some(SqlValue::Integer(i64::from(b))),
            Value::String(s) => Some(SqlValue::Text(s)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(SqlValue::Integer(i)),
                None => Some(SqlValue::Real(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::Array(_) | Value::Object(_) => {
                return Err(ContextError::InvalidQuery(format!(
                    "cannot compare '{field}' with a JSON array or object"
                )));
            }
        })
    }
}

pub(crate) fn read_rows(
    conn: &Connection,
    entity_type: &str,
    sql: &str,
    params: &[SqlValue],
) -> ContextResult<Vec<Entity>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, i64>(4)?,
        ))
    })?;

    let mut entities = Vec::new();
    for row in rows {
        let (id, data_key, data, created_at, modified_at) = row?;
        let id = EntityId::parse(&id)
            .map_err(|e| ContextError::Corrupt(format!("{entity_type} has invalid id '{id}': {e}")))?;
        entities.push(Entity {
            id,
            entity_type: entity_type.to_string(),
            data_key: Some(data_key),
            data: serde_json::from_str(&data)?,
            created_at,
            modified_at,
        });
    }
    Ok(entities)
}
