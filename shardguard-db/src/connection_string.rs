//! ADO-style `Key=Value;` connection strings for SQLite.

use crate::{DbError, DbResult};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Placeholder a connection template uses for the shard's database name.
pub const DATABASE_PLACEHOLDER: &str = "{database}";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// How the database file is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenMode {
    #[default]
    ReadWriteCreate,
    ReadWrite,
    ReadOnly,
    Memory,
}

impl OpenMode {
    fn as_str(&self) -> &'static str {
        match self {
            Self::ReadWriteCreate => "ReadWriteCreate",
            Self::ReadWrite => "ReadWrite",
            Self::ReadOnly => "ReadOnly",
            Self::Memory => "Memory",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    #[default]
    Private,
    Shared,
}

/// A parsed connection string.
///
/// Keys are case-insensitive. `Data Source` is required; unknown keys are
/// rejected so a typo never silently falls back to a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub data_source: String,
    pub mode: OpenMode,
    pub cache: CacheMode,
    pub busy_timeout: Duration,
    pub foreign_keys: bool,
}

impl ConnectionString {
    pub fn new(data_source: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            mode: OpenMode::default(),
            cache: CacheMode::default(),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            foreign_keys: true,
        }
    }

    pub fn parse(s: &str) -> DbResult<Self> {
        let mut data_source = None;
        let mut cs = Self::new(String::new());

        for segment in s.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                DbError::InvalidConnectionString(format!("segment '{segment}' has no '='"))
            })?;
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "data source" | "datasource" | "filename" => {
                    data_source = Some(value.to_string());
                }
                "mode" => cs.mode = parse_mode(value)?,
                "cache" => {
                    cs.cache = match value.to_ascii_lowercase().as_str() {
                        "private" | "default" => CacheMode::Private,
                        "shared" => CacheMode::Shared,
                        other => {
                            return Err(DbError::InvalidConnectionString(format!(
                                "unknown cache mode '{other}'"
                            )));
                        }
                    };
                }
                "busy timeout" | "default timeout" => {
                    let ms: u64 = value.parse().map_err(|_| {
                        DbError::InvalidConnectionString(format!("busy timeout '{value}' is not a number"))
                    })?;
                    cs.busy_timeout = Duration::from_millis(ms);
                }
                "foreign keys" => cs.foreign_keys = parse_bool(value)?,
                other => {
                    return Err(DbError::InvalidConnectionString(format!(
                        "unsupported keyword '{other}'"
                    )));
                }
            }
        }

        cs.data_source = data_source
            .filter(|ds| !ds.is_empty())
            .ok_or_else(|| DbError::InvalidConnectionString("missing 'Data Source'".into()))?;
        Ok(cs)
    }

    /// Whether the string still carries an unfilled `{database}` placeholder.
    pub fn has_placeholder(s: &str) -> bool {
        s.contains(DATABASE_PLACEHOLDER)
    }
}

fn parse_mode(value: &str) -> DbResult<OpenMode> {
    match value.to_ascii_lowercase().as_str() {
        "readwritecreate" => Ok(OpenMode::ReadWriteCreate),
        "readwrite" => Ok(OpenMode::ReadWrite),
        "readonly" => Ok(OpenMode::ReadOnly),
        "memory" => Ok(OpenMode::Memory),
        other => Err(DbError::InvalidConnectionString(format!("unknown mode '{other}'"))),
    }
}

fn parse_bool(value: &str) -> DbResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(DbError::InvalidConnectionString(format!("'{other}' is not a boolean"))),
    }
}

impl FromStr for ConnectionString {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Data Source={}", self.data_source)?;
        if self.mode != OpenMode::default() {
            write!(f, ";Mode={}", self.mode.as_str())?;
        }
        if self.cache == CacheMode::Shared {
            f.write_str(";Cache=Shared")?;
        }
        if self.busy_timeout != Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS) {
            write!(f, ";Busy Timeout={}", self.busy_timeout.as_millis())?;
        }
        if !self.foreign_keys {
            f.write_str(";Foreign Keys=False")?;
        }
        Ok(())
    }
}
