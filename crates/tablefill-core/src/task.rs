use std::collections::HashSet;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::{ConfigError, ConfigResult};
use crate::source::ColumnSource;

/// Immutable input to one worker invocation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescriptor {
    /// Project that owns the exported table.
    pub project_id: u64,
    /// DBMS dialect key used for identifier quoting (ex.: postgres).
    pub dbms: String,
    /// Seed for deterministic sources.
    #[serde(default)]
    pub seed: u64,
    pub table: TableSpec,
}

/// A target table, its record count and ordered columns.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableSpec {
    pub name: String,
    /// Number of rows to generate.
    #[serde(rename = "recordCnt", alias = "record_count")]
    pub record_count: u64,
    /// Column order fixes the output column order.
    pub columns: Vec<ColumnSpec>,
}

/// One output column bound to a value source.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ColumnSpec {
    pub name: String,
    pub source: SourceKind,
    /// Source-specific settings; decoded by [`ColumnSpec::resolve_source`].
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Closed set of value source kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Faker,
    Ai,
    File,
    Fixed,
    /// Reserved; rejected at stream construction.
    Manual,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Faker => "faker",
            SourceKind::Ai => "ai",
            SourceKind::File => "file",
            SourceKind::Fixed => "fixed",
            SourceKind::Manual => "manual",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TaskDescriptor {
    /// Parse a descriptor from JSON; malformed input is a configuration error.
    pub fn from_json(input: &str) -> ConfigResult<Self> {
        serde_json::from_str(input).map_err(|err| ConfigError::InvalidTask(err.to_string()))
    }

    /// Resolve the dialect key carried by the task.
    pub fn dialect(&self) -> ConfigResult<Dialect> {
        Dialect::parse(&self.dbms)
    }

    /// Check the structural invariants of the descriptor.
    ///
    /// Column metadata is validated separately, per column, when sources are
    /// resolved.
    pub fn validate(&self) -> ConfigResult<()> {
        self.dialect()?;
        self.table.validate()
    }
}

impl TableSpec {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidTask(
                "table name must not be empty".to_string(),
            ));
        }
        if let Some(problem) = file_stem_problem(&self.name) {
            return Err(ConfigError::InvalidTask(format!(
                "table name '{}' {problem}",
                self.name
            )));
        }
        if self.columns.is_empty() {
            return Err(ConfigError::InvalidTask(format!(
                "table '{}' has no columns",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name.trim().is_empty() {
                return Err(ConfigError::InvalidTask(format!(
                    "table '{}' has a column with an empty name",
                    self.name
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(ConfigError::InvalidTask(format!(
                    "table '{}' declares column '{}' more than once",
                    self.name, column.name
                )));
            }
        }
        Ok(())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|col| col.name.as_str()).collect()
    }
}

/// Why `name` cannot be used as a single file name component, if it can't.
///
/// Table names and archive entry names become file names, so they must stay
/// inside their directory.
pub fn file_stem_problem(name: &str) -> Option<&'static str> {
    if name.contains('\0') {
        Some("contains a NUL byte")
    } else if name.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if name == "." || name == ".." {
        Some("is a relative path component")
    } else {
        None
    }
}

impl ColumnSpec {
    /// Decode the metadata into the typed source for this column's kind.
    pub fn resolve_source(&self, table: &str) -> ConfigResult<ColumnSource> {
        ColumnSource::decode(table, &self.name, self.source, &self.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_json(columns: &str) -> String {
        format!(
            r#"{{"projectId": 7, "dbms": "postgres", "table": {{"name": "orders", "recordCnt": 3, "columns": {columns}}}}}"#
        )
    }

    #[test]
    fn parses_camel_case_descriptor() {
        let task = TaskDescriptor::from_json(&task_json(
            r#"[{"name": "id", "source": "fixed", "metadata": {"value": "1"}}]"#,
        ))
        .expect("parse task");
        assert_eq!(task.project_id, 7);
        assert_eq!(task.seed, 0);
        assert_eq!(task.table.record_count, 3);
        assert_eq!(task.table.columns[0].source, SourceKind::Fixed);
        task.validate().expect("valid task");
    }

    #[test]
    fn rejects_unknown_source_kind() {
        let err = TaskDescriptor::from_json(&task_json(
            r#"[{"name": "id", "source": "oracle_sequence"}]"#,
        ))
        .expect_err("unknown kind");
        assert!(matches!(err, ConfigError::InvalidTask(_)));
    }

    #[test]
    fn rejects_duplicate_columns() {
        let task = TaskDescriptor::from_json(&task_json(
            r#"[{"name": "id", "source": "fixed", "metadata": {"value": "1"}},
                {"name": "id", "source": "fixed", "metadata": {"value": "2"}}]"#,
        ))
        .expect("parse task");
        let err = task.validate().expect_err("duplicate column");
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_table_names_that_leave_the_project_dir() {
        for name in ["../../escaped", "nested/orders", "C:\\orders", "..", "nul\0byte"] {
            let mut task = TaskDescriptor::from_json(&task_json(
                r#"[{"name": "id", "source": "fixed", "metadata": {"value": "1"}}]"#,
            ))
            .expect("parse task");
            task.table.name = name.to_string();
            assert!(
                matches!(task.validate(), Err(ConfigError::InvalidTask(_))),
                "accepted table name {name:?}"
            );
        }
    }

    #[test]
    fn accepts_schema_qualified_style_names() {
        assert_eq!(file_stem_problem("sales.orders"), None);
        assert_eq!(file_stem_problem("order items"), None);
        assert_eq!(file_stem_problem("v1..v2"), None);
    }

    #[test]
    fn rejects_unknown_dialect() {
        let mut task = TaskDescriptor::from_json(&task_json(
            r#"[{"name": "id", "source": "fixed", "metadata": {"value": "1"}}]"#,
        ))
        .expect("parse task");
        task.dbms = "db2".to_string();
        assert!(matches!(
            task.validate(),
            Err(ConfigError::UnknownDialect(key)) if key == "db2"
        ));
    }
}
