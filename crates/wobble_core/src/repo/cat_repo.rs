//! Cat repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and filtered listing over the `cats` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate payloads before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::{Database, StorageError};
use crate::model::cat::{
    Cat, CatFilter, CatId, CatValidationError, CreateCatRequest, ListCatsRequest, UpdateCatRequest,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Page size used when a list request leaves `limit` at `0`.
pub const DEFAULT_LIST_LIMIT: u32 = 20;
/// Largest page size a single list call returns.
pub const MAX_LIST_LIMIT: u32 = 100;

const CAT_SELECT_SQL: &str = "SELECT
    id,
    name,
    breed,
    color,
    age,
    weight,
    is_indoor,
    is_vaccinated,
    microchip_id,
    owner_name,
    owner_email,
    notes,
    created_at,
    updated_at
FROM cats";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for cat persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(CatValidationError),
    Db(StorageError),
    NotFound(CatId),
    /// A unique column (microchip ID) already holds this value.
    Conflict(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "cat not found: {id}"),
            Self::Conflict(message) => write!(f, "conflicting cat data: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted cat data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::Conflict(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<CatValidationError> for RepoError {
    fn from(value: CatValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StorageError> for RepoError {
    fn from(value: StorageError) -> Self {
        if value.is_unique_violation() {
            return Self::Conflict(value.to_string());
        }
        Self::Db(value)
    }
}

/// Repository interface for cat CRUD operations.
pub trait CatRepository {
    fn create(&self, request: &CreateCatRequest) -> RepoResult<Cat>;
    fn get_by_id(&self, id: CatId) -> RepoResult<Option<Cat>>;
    fn update(&self, id: CatId, updates: &UpdateCatRequest) -> RepoResult<Cat>;
    fn delete(&self, id: CatId) -> RepoResult<()>;
    fn list(&self, request: &ListCatsRequest) -> RepoResult<Vec<Cat>>;
}

/// SQLite-backed cat repository.
pub struct SqliteCatRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

/// All repositories bound to one storage handle.
pub struct Repositories<'conn> {
    pub cats: SqliteCatRepository<'conn>,
}

impl<'conn> Repositories<'conn> {
    pub fn new(db: &'conn Database) -> Self {
        Self {
            cats: SqliteCatRepository::new(db.connection()),
        }
    }
}

impl CatRepository for SqliteCatRepository<'_> {
    fn create(&self, request: &CreateCatRequest) -> RepoResult<Cat> {
        request.validate()?;

        self.conn
            .execute(
                "INSERT INTO cats (
                    name,
                    breed,
                    color,
                    age,
                    weight,
                    is_indoor,
                    is_vaccinated,
                    microchip_id,
                    owner_name,
                    owner_email,
                    notes
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
                params![
                    request.name.trim(),
                    request.breed.as_deref(),
                    request.color.as_deref(),
                    request.age,
                    request.weight,
                    request.is_indoor.unwrap_or(false),
                    request.is_vaccinated.unwrap_or(false),
                    request.microchip_id.as_deref(),
                    request.owner_name.as_deref(),
                    request.owner_email.as_deref(),
                    request.notes.as_deref(),
                ],
            )
            .map_err(storage_err("insert_cat"))?;

        let id = self.conn.last_insert_rowid();
        self.get_by_id(id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("cat {id} missing right after insert"))
        })
    }

    fn get_by_id(&self, id: CatId) -> RepoResult<Option<Cat>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CAT_SELECT_SQL} WHERE id = ?1;"))
            .map_err(storage_err("get_cat"))?;

        let mut rows = stmt.query([id]).map_err(storage_err("get_cat"))?;
        if let Some(row) = rows.next().map_err(storage_err("get_cat"))? {
            return Ok(Some(parse_cat_row(row)?));
        }

        Ok(None)
    }

    fn update(&self, id: CatId, updates: &UpdateCatRequest) -> RepoResult<Cat> {
        updates.validate()?;

        if updates.is_empty() {
            return self.get_by_id(id)?.ok_or(RepoError::NotFound(id));
        }

        let changed = self
            .conn
            .execute(
                "UPDATE cats
                 SET
                    name = COALESCE(?1, name),
                    breed = COALESCE(?2, breed),
                    color = COALESCE(?3, color),
                    age = COALESCE(?4, age),
                    weight = COALESCE(?5, weight),
                    is_indoor = COALESCE(?6, is_indoor),
                    is_vaccinated = COALESCE(?7, is_vaccinated),
                    microchip_id = COALESCE(?8, microchip_id),
                    owner_name = COALESCE(?9, owner_name),
                    owner_email = COALESCE(?10, owner_email),
                    notes = COALESCE(?11, notes),
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?12;",
                params![
                    updates.name.as_deref().map(str::trim),
                    updates.breed.as_deref(),
                    updates.color.as_deref(),
                    updates.age,
                    updates.weight,
                    updates.is_indoor,
                    updates.is_vaccinated,
                    updates.microchip_id.as_deref(),
                    updates.owner_name.as_deref(),
                    updates.owner_email.as_deref(),
                    updates.notes.as_deref(),
                    id,
                ],
            )
            .map_err(storage_err("update_cat"))?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        self.get_by_id(id)?.ok_or(RepoError::NotFound(id))
    }

    fn delete(&self, id: CatId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM cats WHERE id = ?1;", [id])
            .map_err(storage_err("delete_cat"))?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn list(&self, request: &ListCatsRequest) -> RepoResult<Vec<Cat>> {
        let mut sql = format!("{CAT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(filter) = &request.filter {
            push_filter_clauses(filter, &mut sql, &mut bind_values);
        }

        sql.push_str(" ORDER BY id ASC LIMIT ? OFFSET ?");
        bind_values.push(Value::Integer(i64::from(normalize_list_limit(
            request.limit,
        ))));
        bind_values.push(Value::Integer(i64::from(request.offset)));

        let mut stmt = self.conn.prepare(&sql).map_err(storage_err("list_cats"))?;
        let mut rows = stmt
            .query(params_from_iter(bind_values))
            .map_err(storage_err("list_cats"))?;
        let mut cats = Vec::new();

        while let Some(row) = rows.next().map_err(storage_err("list_cats"))? {
            cats.push(parse_cat_row(row)?);
        }

        Ok(cats)
    }
}

/// Clamps a requested page size into `1..=MAX_LIST_LIMIT`.
pub fn normalize_list_limit(limit: u32) -> u32 {
    match limit {
        0 => DEFAULT_LIST_LIMIT,
        limit => limit.min(MAX_LIST_LIMIT),
    }
}

fn push_filter_clauses(filter: &CatFilter, sql: &mut String, bind_values: &mut Vec<Value>) {
    if let Some(breed) = &filter.breed {
        sql.push_str(" AND breed = ? COLLATE NOCASE");
        bind_values.push(Value::Text(breed.clone()));
    }
    if let Some(is_indoor) = filter.is_indoor {
        sql.push_str(" AND is_indoor = ?");
        bind_values.push(Value::Integer(bool_to_int(is_indoor)));
    }
    if let Some(is_vaccinated) = filter.is_vaccinated {
        sql.push_str(" AND is_vaccinated = ?");
        bind_values.push(Value::Integer(bool_to_int(is_vaccinated)));
    }
    if let Some(min_age) = filter.min_age {
        sql.push_str(" AND age >= ?");
        bind_values.push(Value::Integer(i64::from(min_age)));
    }
    if let Some(max_age) = filter.max_age {
        sql.push_str(" AND age <= ?");
        bind_values.push(Value::Integer(i64::from(max_age)));
    }
    if let Some(owner_email) = &filter.owner_email {
        sql.push_str(" AND owner_email = ? COLLATE NOCASE");
        bind_values.push(Value::Text(owner_email.clone()));
    }
}

fn parse_cat_row(row: &Row<'_>) -> RepoResult<Cat> {
    let read = storage_err("read_cat_row");

    Ok(Cat {
        id: row.get("id").map_err(read)?,
        name: row.get("name").map_err(read)?,
        breed: row.get("breed").map_err(read)?,
        color: row.get("color").map_err(read)?,
        age: row.get("age").map_err(read)?,
        weight: row.get("weight").map_err(read)?,
        is_indoor: int_to_bool(row.get("is_indoor").map_err(read)?, "is_indoor")?,
        is_vaccinated: int_to_bool(row.get("is_vaccinated").map_err(read)?, "is_vaccinated")?,
        microchip_id: row.get("microchip_id").map_err(read)?,
        owner_name: row.get("owner_name").map_err(read)?,
        owner_email: row.get("owner_email").map_err(read)?,
        notes: row.get("notes").map_err(read)?,
        created_at: row.get("created_at").map_err(read)?,
        updated_at: row.get("updated_at").map_err(read)?,
    })
}

fn storage_err(operation: &'static str) -> impl Fn(rusqlite::Error) -> RepoError + Copy {
    move |err| RepoError::from(StorageError::new(operation, err))
}

fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid {column} value `{other}` in cats.{column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
