use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};
use crate::task::SourceKind;

/// Typed value source for one column, decoded from its metadata.
///
/// `manual` has no variant: it can be declared but never resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSource {
    Faker(FakerSource),
    Ai(AiSource),
    File(FileSource),
    Fixed(FixedSource),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakerSource {
    pub rule: String,
    pub locale: FakerLocale,
}

/// Locale of the faker data set. Written as `en_US` or `pt_BR`; `-` and
/// lower-case region codes are accepted on input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FakerLocale {
    #[default]
    EnUs,
    PtBr,
}

impl FakerLocale {
    pub const ALL: [FakerLocale; 2] = [FakerLocale::EnUs, FakerLocale::PtBr];

    pub fn code(self) -> &'static str {
        match self {
            Self::EnUs => "en_US",
            Self::PtBr => "pt_BR",
        }
    }
}

impl FromStr for FakerLocale {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|locale| locale.code().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| ConfigError::UnknownLocale(value.to_string()))
    }
}

impl fmt::Display for FakerLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiSource {
    pub rule: String,
    /// Values requested per backend call; the worker default applies when unset.
    pub chunk_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileSource {
    pub path: PathBuf,
    pub column: FileColumn,
    pub has_headers: bool,
    pub delimiter: u8,
    pub on_exhausted: ExhaustPolicy,
}

/// Which field of each record feeds the column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileColumn {
    Name(String),
    Index(usize),
}

/// Behavior when a file runs out of records before the table is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExhaustPolicy {
    /// Restart from the first record.
    #[default]
    Cycle,
    /// Yield nothing; the column is omitted from the remaining rows.
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSource {
    pub value: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MetaKind {
    String,
    PositiveInt,
    UInt,
    Bool,
    Char,
    OneOf(&'static [&'static str]),
}

#[derive(Clone, Copy, Debug)]
struct MetaSpec {
    key: &'static str,
    kind: MetaKind,
    required: bool,
}

impl MetaSpec {
    const fn new(key: &'static str, kind: MetaKind, required: bool) -> Self {
        Self {
            key,
            kind,
            required,
        }
    }
}

const FAKER_META: &[MetaSpec] = &[
    MetaSpec::new("rule", MetaKind::String, true),
    MetaSpec::new("locale", MetaKind::String, false),
];
const FAKER_SHAPE: &str = r#"{"rule": string, "locale"?: "en_US" | "pt_BR"}"#;

const AI_META: &[MetaSpec] = &[
    MetaSpec::new("rule", MetaKind::String, true),
    MetaSpec::new("chunkSize", MetaKind::PositiveInt, false),
];
const AI_SHAPE: &str = r#"{"rule": string, "chunkSize"?: positive integer}"#;

const FILE_META: &[MetaSpec] = &[
    MetaSpec::new("path", MetaKind::String, true),
    MetaSpec::new("column", MetaKind::String, false),
    MetaSpec::new("columnIndex", MetaKind::UInt, false),
    MetaSpec::new("hasHeaders", MetaKind::Bool, false),
    MetaSpec::new("delimiter", MetaKind::Char, false),
    MetaSpec::new("onExhausted", MetaKind::OneOf(&["cycle", "stop"]), false),
];
const FILE_SHAPE: &str = r#"{"path": string, "column"?: string, "columnIndex"?: integer, "hasHeaders"?: bool, "delimiter"?: char, "onExhausted"?: "cycle" | "stop"}"#;

const FIXED_META: &[MetaSpec] = &[MetaSpec::new("value", MetaKind::String, true)];
const FIXED_SHAPE: &str = r#"{"value": string}"#;

struct MetaMap<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> MetaMap<'a> {
    fn get_str(&self, key: &str) -> Option<&'a str> {
        self.map
            .and_then(|map| map.get(key))
            .and_then(|value| value.as_str())
    }

    fn get_u64(&self, key: &str) -> Option<u64> {
        self.map
            .and_then(|map| map.get(key))
            .and_then(|value| value.as_u64())
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.map
            .and_then(|map| map.get(key))
            .and_then(|value| value.as_bool())
    }
}

/// Keeps the error context for one column while decoding.
struct Decoder<'a> {
    table: &'a str,
    column: &'a str,
    kind: SourceKind,
    expected: &'static str,
}

impl Decoder<'_> {
    fn mismatch(&self, detail: impl Into<String>) -> ConfigError {
        ConfigError::MetadataMismatch {
            table: self.table.to_string(),
            column: self.column.to_string(),
            kind: self.kind,
            detail: detail.into(),
            expected: self.expected,
        }
    }

    fn validate<'m>(&self, metadata: &'m Value, specs: &[MetaSpec]) -> ConfigResult<MetaMap<'m>> {
        let map = match metadata {
            Value::Null => None,
            Value::Object(map) => Some(map),
            _ => return Err(self.mismatch("metadata must be a JSON object")),
        };

        if let Some(map) = map {
            for (key, value) in map {
                let Some(spec) = specs.iter().find(|spec| spec.key == key.as_str()) else {
                    return Err(self.mismatch(format!("unknown key '{key}'")));
                };
                if !kind_matches(spec.kind, value) {
                    return Err(self.mismatch(format!("invalid value for '{key}'")));
                }
            }
        }

        for spec in specs {
            if spec.required && !map.is_some_and(|map| map.contains_key(spec.key)) {
                return Err(self.mismatch(format!("missing required key '{}'", spec.key)));
            }
        }

        Ok(MetaMap { map })
    }

    fn required_str<'m>(&self, meta: &MetaMap<'m>, key: &str) -> ConfigResult<&'m str> {
        let value = meta
            .get_str(key)
            .ok_or_else(|| self.mismatch(format!("missing required key '{key}'")))?;
        if value.trim().is_empty() {
            return Err(self.mismatch(format!("'{key}' must not be empty")));
        }
        Ok(value)
    }
}

fn kind_matches(kind: MetaKind, value: &Value) -> bool {
    match kind {
        MetaKind::String => value.is_string(),
        MetaKind::PositiveInt => value.as_u64().is_some_and(|value| value > 0),
        MetaKind::UInt => value.as_u64().is_some(),
        MetaKind::Bool => value.is_boolean(),
        MetaKind::Char => value
            .as_str()
            .is_some_and(|value| value.len() == 1 && value.is_ascii()),
        MetaKind::OneOf(allowed) => value.as_str().is_some_and(|value| allowed.contains(&value)),
    }
}

impl ColumnSource {
    /// Decode `metadata` for a column declared with `kind`.
    pub fn decode(
        table: &str,
        column: &str,
        kind: SourceKind,
        metadata: &Value,
    ) -> ConfigResult<Self> {
        let decoder = |expected| Decoder {
            table,
            column,
            kind,
            expected,
        };

        match kind {
            SourceKind::Faker => {
                let decoder = decoder(FAKER_SHAPE);
                let meta = decoder.validate(metadata, FAKER_META)?;
                let locale = meta
                    .get_str("locale")
                    .map(str::parse::<FakerLocale>)
                    .transpose()
                    .map_err(|err| decoder.mismatch(err.to_string()))?
                    .unwrap_or_default();
                Ok(ColumnSource::Faker(FakerSource {
                    rule: decoder.required_str(&meta, "rule")?.to_string(),
                    locale,
                }))
            }
            SourceKind::Ai => {
                let decoder = decoder(AI_SHAPE);
                let meta = decoder.validate(metadata, AI_META)?;
                Ok(ColumnSource::Ai(AiSource {
                    rule: decoder.required_str(&meta, "rule")?.to_string(),
                    chunk_size: meta.get_u64("chunkSize").map(|value| value as usize),
                }))
            }
            SourceKind::File => {
                let decoder = decoder(FILE_SHAPE);
                let meta = decoder.validate(metadata, FILE_META)?;
                let column = match (meta.get_str("column"), meta.get_u64("columnIndex")) {
                    (Some(_), Some(_)) => {
                        return Err(decoder.mismatch("'column' and 'columnIndex' are exclusive"));
                    }
                    (Some(name), None) => FileColumn::Name(name.to_string()),
                    (None, index) => FileColumn::Index(index.unwrap_or(0) as usize),
                };
                let on_exhausted = match meta.get_str("onExhausted") {
                    Some("stop") => ExhaustPolicy::Stop,
                    _ => ExhaustPolicy::Cycle,
                };
                Ok(ColumnSource::File(FileSource {
                    path: PathBuf::from(decoder.required_str(&meta, "path")?),
                    column,
                    has_headers: meta.get_bool("hasHeaders").unwrap_or(true),
                    delimiter: meta
                        .get_str("delimiter")
                        .and_then(|value| value.bytes().next())
                        .unwrap_or(b','),
                    on_exhausted,
                }))
            }
            SourceKind::Fixed => {
                let decoder = decoder(FIXED_SHAPE);
                let meta = decoder.validate(metadata, FIXED_META)?;
                // An empty literal is a legitimate fixed value.
                let value = meta
                    .get_str("value")
                    .ok_or_else(|| decoder.mismatch("missing required key 'value'"))?;
                Ok(ColumnSource::Fixed(FixedSource {
                    value: value.to_string(),
                }))
            }
            SourceKind::Manual => Err(ConfigError::Unimplemented {
                table: table.to_string(),
                column: column.to_string(),
                kind,
            }),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            ColumnSource::Faker(_) => SourceKind::Faker,
            ColumnSource::Ai(_) => SourceKind::Ai,
            ColumnSource::File(_) => SourceKind::File,
            ColumnSource::Fixed(_) => SourceKind::Fixed,
        }
    }
}
