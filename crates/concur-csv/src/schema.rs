//! Schema discovery and loading.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// The declared type of a schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Long,
    Double,
    String,
    StringArray,
}

impl ValueType {
    fn parse(token: &str) -> Result<Self> {
        match token {
            "long" => Ok(Self::Long),
            "double" => Ok(Self::Double),
            "string" => Ok(Self::String),
            "string[]" => Ok(Self::StringArray),
            other => Err(Error::invalid_schema(format!("unknown column type '{other}'"))),
        }
    }
}

/// One `(name, type)` pair parsed from a header cell written as
/// `name:type`, e.g. `age:long`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    name: String,
    value_type: ValueType,
}

impl ColumnSchema {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.value_type
    }

    fn parse_cell(cell: &str) -> Result<Self> {
        let (name, type_token) = cell
            .split_once(':')
            .ok_or_else(|| Error::invalid_schema(format!("header cell '{cell}' is missing a ':type' suffix")))?;
        if name.is_empty() {
            return Err(Error::invalid_schema(format!("header cell '{cell}' has an empty column name")));
        }
        Ok(Self {
            name: name.to_string(),
            value_type: ValueType::parse(type_token)?,
        })
    }
}

/// An ordered column schema, parsed from a header file's single data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<ColumnSchema>,
}

impl Schema {
    /// Parses a schema from a single header row of `name:type` cells.
    pub fn parse_header_row(row: &csv::StringRecord) -> Result<Self> {
        let columns = row.iter().map(ColumnSchema::parse_cell).collect::<Result<Vec<_>>>()?;
        if columns.is_empty() {
            return Err(Error::invalid_schema("header row has no columns"));
        }
        Ok(Self { columns })
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// Discovers a header file and zero or more data files under `dir`.
///
/// The header file is the one whose filename contains `header`
/// (case-insensitive); every other `*.csv` file is a data file. Data
/// files are sorted by filename for deterministic processing order.
pub struct SchemaLoader;

impl SchemaLoader {
    /// Loads the schema and discovers data files under `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<(Schema, Vec<PathBuf>)> {
        let dir = dir.as_ref();
        let mut header_path: Option<PathBuf> = None;
        let mut data_paths: Vec<PathBuf> = Vec::new();

        let entries = fs::read_dir(dir).map_err(|err| {
            Error::missing_header(format!("could not read import directory {}: {err}", dir.display()))
        })?;

        for entry in entries {
            let entry = entry.map_err(|err| Error::missing_header(err.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("csv") {
                continue;
            }
            let is_header = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.to_ascii_lowercase().contains("header"));
            if is_header {
                header_path = Some(path);
            } else {
                data_paths.push(path);
            }
        }

        let header_path = header_path
            .ok_or_else(|| Error::missing_header(format!("no *header*.csv file found under {}", dir.display())))?;
        data_paths.sort();

        let mut reader = csv::ReaderBuilder::new().has_headers(false).from_path(&header_path)?;
        let mut records = reader.records();
        let row = records
            .next()
            .ok_or_else(|| Error::missing_header(format!("header file {} has no rows", header_path.display())))??;
        let schema = Schema::parse_header_row(&row)?;

        Ok((schema, data_paths))
    }
}
