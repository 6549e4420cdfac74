use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};
use crate::sql::quote_identifier;

/// DBMS dialects known to the exporter, keyed by the task's `dbms` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
    Oracle,
    SqlServer,
}

impl Dialect {
    /// Resolve a dialect key; matching is case-insensitive.
    pub fn parse(key: &str) -> ConfigResult<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            "oracle" => Ok(Self::Oracle),
            "mssql" | "sqlserver" => Ok(Self::SqlServer),
            _ => Err(ConfigError::UnknownDialect(key.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
            Self::Oracle => "oracle",
            Self::SqlServer => "mssql",
        }
    }

    /// Character placed on both sides of an identifier.
    pub fn quote_char(self) -> char {
        match self {
            Self::MySql => '`',
            Self::Postgres | Self::Sqlite | Self::Oracle | Self::SqlServer => '"',
        }
    }

    pub fn quote_ident(self, ident: &str) -> String {
        quote_identifier(ident, self.quote_char())
    }
}

impl FromStr for Dialect {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
