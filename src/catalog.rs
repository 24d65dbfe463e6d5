use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::embed;
use crate::source::CatalogSource;

pub const UNTITLED: &str = "(Untitled)";
const SLUG_MAX_CHARS: usize = 80;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("catalog request to {target} failed")]
    Request {
        target: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("catalog request to {target} returned HTTP {status}")]
    Status { target: String, status: u16 },
    #[error("catalog file {target} could not be read")]
    Io {
        target: String,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog store is unavailable")]
    Storage(#[source] anyhow::Error),
    #[error("catalog document is not a sequence of records: {0}")]
    Malformed(String),
}

/// Record exactly as it arrives from a catalog source; nothing is trusted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<RawTags>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub embed: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTags {
    List(Vec<serde_json::Value>),
    Joined(String),
    Other(serde_json::Value),
}

impl RawTags {
    fn into_tags(self) -> Vec<String> {
        match self {
            RawTags::List(values) => values.into_iter().map(value_to_string).collect(),
            RawTags::Joined(joined) if joined.is_empty() => Vec::new(),
            RawTags::Joined(joined) => joined.split(',').map(|s| s.trim().to_string()).collect(),
            RawTags::Other(serde_json::Value::Null) | RawTags::Other(serde_json::Value::Bool(false)) => {
                Vec::new()
            }
            RawTags::Other(value) => {
                let joined = value_to_string(value);
                joined.split(',').map(|s| s.trim().to_string()).collect()
            }
        }
    }
}

fn value_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct LenientVisitor;

    impl<'de> Visitor<'de> for LenientVisitor {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string, number, boolean or null")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            // `false` behaves like a missing value in hand-written catalogs.
            Ok(v.then(|| "true".to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> Result<Self::Value, D2::Error> {
            d.deserialize_any(self)
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            while seq.next_element::<de::IgnoredAny>()?.is_some() {}
            Ok(None)
        }

        fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            while map.next_entry::<de::IgnoredAny, de::IgnoredAny>()?.is_some() {}
            Ok(None)
        }
    }

    deserializer.deserialize_any(LenientVisitor)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    pub poster: String,
    pub tags: Vec<String>,
    pub year: String,
    pub embed: String,
    pub confidence: bool,
    pub added_at: String,
}

/// What to stamp on records that carry neither `addedAt` nor `date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingTimestamp {
    /// Load time; newest-first ordering of such records changes across reloads.
    #[default]
    Now,
    Epoch,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub missing_added_at: MissingTimestamp,
    pub now: DateTime<Utc>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            missing_added_at: MissingTimestamp::default(),
            now: Utc::now(),
        }
    }
}

impl LoadOptions {
    pub fn with_policy(missing_added_at: MissingTimestamp) -> Self {
        Self {
            missing_added_at,
            ..Self::default()
        }
    }

    fn default_timestamp(&self) -> String {
        let at = match self.missing_added_at {
            MissingTimestamp::Now => self.now,
            MissingTimestamp::Epoch => Utc.timestamp_opt(0, 0).single().unwrap_or(self.now),
        };
        iso_timestamp(at)
    }
}

pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl CatalogItem {
    /// Applies every defaulting rule to one record. `position` is zero-based.
    pub fn from_raw(raw: RawRecord, position: usize, opts: &LoadOptions) -> Self {
        let title = present(raw.title);
        let id = present(raw.id)
            .or_else(|| title.as_deref().map(slugify).filter(|slug| !slug.is_empty()))
            .unwrap_or_else(|| format!("item-{}", position + 1));
        let poster = present(raw.poster).unwrap_or_default();
        let tags = raw.tags.map(RawTags::into_tags).unwrap_or_default();
        let link = present(raw.embed).or_else(|| present(raw.link)).unwrap_or_default();
        let embed::Normalized { embed, confidence } = embed::normalize(&link);
        let added_at = present(raw.added_at)
            .or_else(|| present(raw.date))
            .unwrap_or_else(|| opts.default_timestamp());

        Self {
            id,
            title: title.unwrap_or_else(|| UNTITLED.to_string()),
            poster,
            tags,
            year: present(raw.year).unwrap_or_default(),
            embed,
            confidence,
            added_at,
        }
    }

    pub fn badge(&self) -> &'static str {
        if self.confidence {
            "Embed OK"
        } else {
            "Needs Embed"
        }
    }

    pub fn tag_line(&self) -> String {
        self.tags.join(" • ")
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub fn slugify(title: &str) -> String {
    static MARKUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid markup regex"));
    static SEPARATOR_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug separator regex"));

    let lowered = title.to_lowercase();
    let stripped = MARKUP_RE.replace_all(&lowered, "");
    let dashed = SEPARATOR_RE.replace_all(&stripped, "-");
    let dashed = dashed.strip_prefix('-').unwrap_or(&*dashed);
    let dashed = dashed.strip_suffix('-').unwrap_or(dashed);
    dashed.chars().take(SLUG_MAX_CHARS).collect()
}

/// Immutable result of one load cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    /// Authored ids are reserved up front; derived ids and repeated authored
    /// ids get a `-N` suffix that avoids every reserved id.
    pub fn from_records(records: Vec<RawRecord>, opts: &LoadOptions) -> Self {
        let mut items: Vec<(CatalogItem, bool)> = records
            .into_iter()
            .enumerate()
            .map(|(idx, raw)| {
                let authored = raw.id.as_deref().is_some_and(|id| !id.is_empty());
                (CatalogItem::from_raw(raw, idx, opts), authored)
            })
            .collect();

        let mut taken: HashSet<String> = items
            .iter()
            .filter(|(_, authored)| *authored)
            .map(|(item, _)| item.id.clone())
            .collect();
        let mut claimed = HashSet::new();
        for (item, authored) in &mut items {
            if *authored && claimed.insert(item.id.clone()) {
                continue;
            }
            item.id = unique_id(&mut taken, std::mem::take(&mut item.id));
        }

        Self {
            items: items.into_iter().map(|(item, _)| item).collect(),
        }
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CatalogItem> {
        self.items.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }
}

fn unique_id(seen: &mut HashSet<String>, id: String) -> String {
    if seen.insert(id.clone()) {
        return id;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{id}-{n}");
        if seen.insert(candidate.clone()) {
            tracing::debug!(original = %id, id = %candidate, "disambiguated duplicate catalog id");
            return candidate;
        }
        n += 1;
    }
}

/// Parses a catalog document. `null` is an empty catalog.
pub fn parse_records(body: &str) -> Result<Vec<RawRecord>, LoadError> {
    let document: serde_json::Value =
        serde_json::from_str(body).map_err(|err| LoadError::Malformed(err.to_string()))?;
    match document {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(values) => values
            .into_iter()
            .enumerate()
            .map(|(idx, value)| match value {
                serde_json::Value::Null => {
                    Err(LoadError::Malformed(format!("record {} is null", idx + 1)))
                }
                value @ serde_json::Value::Object(_) => serde_json::from_value(value)
                    .map_err(|err| LoadError::Malformed(format!("record {}: {err}", idx + 1))),
                _ => Ok(RawRecord::default()),
            })
            .collect(),
        other => Err(LoadError::Malformed(format!(
            "expected an array, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

pub fn load(source: &dyn CatalogSource, opts: &LoadOptions) -> Result<Catalog, LoadError> {
    let target = source.describe();
    tracing::info!(source = %target, "loading catalog");
    let records = source.fetch_records().map_err(|err| {
        tracing::error!(source = %target, error = %err, "catalog load failed");
        err
    })?;
    let catalog = Catalog::from_records(records, opts);
    let unresolved = catalog.items().iter().filter(|item| !item.confidence).count();
    tracing::info!(
        source = %target,
        items = catalog.len(),
        unresolved,
        "catalog loaded"
    );
    Ok(catalog)
}
