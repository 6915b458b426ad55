use anyhow::{Context, Result};
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

use crate::models::FrequencyEntry;
use crate::persist::write_atomic;

/// Keyword → `[variant, count]` rows, in keyword insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    rows: Vec<(String, Vec<FrequencyEntry>)>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a keyword's rows, keeping its original position.
    pub fn insert(&mut self, keyword: impl Into<String>, entries: Vec<FrequencyEntry>) {
        let keyword = keyword.into();
        match self.rows.iter_mut().find(|(k, _)| *k == keyword) {
            Some((_, slot)) => *slot = entries,
            None => self.rows.push((keyword, entries)),
        }
    }

    pub fn get(&self, keyword: &str) -> Option<&[FrequencyEntry]> {
        self.rows
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, e)| e.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FrequencyEntry])> {
        self.rows.iter().map(|(k, e)| (k.as_str(), e.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("--- Frequency Table ---\n\n");
        for (keyword, entries) in &self.rows {
            out.push_str(&format!("\"{}\": [\n", keyword));
            for e in entries {
                out.push_str(&format!("    [\"{}\", {}],\n", e.variant, e.count));
            }
            out.push_str("],\n\n");
        }
        out
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn write_report(&self, path: &Path) -> Result<()> {
        write_atomic(path, self.to_json()?.as_bytes())
            .with_context(|| format!("writing report to {}", path.display()))
    }

    pub fn read_report(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading report {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("decoding report {}", path.display()))
    }
}

impl Serialize for FrequencyTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rows.len()))?;
        for (k, v) in &self.rows {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FrequencyTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = deserializer.deserialize_map(OrderedMapVisitor(PhantomData))?;
        Ok(Self { rows })
    }
}

/// Reads a JSON object as `(key, value)` pairs in document order.
pub struct OrderedMapVisitor<V>(pub PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = Vec<(String, V)>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut out = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((k, v)) = access.next_entry::<String, V>()? {
            out.push((k, v));
        }
        Ok(out)
    }
}
