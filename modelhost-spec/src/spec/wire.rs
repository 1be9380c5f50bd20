//! Wire (JSON) representations of the spec types.
//!
//! These mirror the documents exactly and carry no invariants; the public spec
//! types are built from them by validation. Field names are camelCase, unknown
//! fields are rejected, and absent optionals and empty alias maps are omitted
//! when serializing.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// A JSON object of alias → spec, kept in document order with duplicates preserved
/// so validation can report them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntries<T>(pub Vec<(String, T)>);

impl<T> AliasEntries<T> {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> Default for AliasEntries<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> FromIterator<(String, T)> for AliasEntries<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: Serialize> Serialize for AliasEntries<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (alias, spec) in &self.0 {
            map.serialize_entry(alias, spec)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for AliasEntries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = AliasEntries<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from alias to spec")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((alias, spec)) = access.next_entry::<String, T>()? {
                    entries.push((alias, spec));
                }
                Ok(AliasEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawTimeSeriesSpec {
    pub id: i64,
    pub start: i64,
    pub end: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_outside_points: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawScheduleInputTimeSeriesSpec {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_outside_points: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFileSpec {
    pub id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawDataSpec {
    #[serde(default, skip_serializing_if = "AliasEntries::is_empty")]
    pub time_series: AliasEntries<RawTimeSeriesSpec>,
    #[serde(default, skip_serializing_if = "AliasEntries::is_empty")]
    pub files: AliasEntries<RawFileSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawScheduleInputSpec {
    pub stride: i64,
    pub window_size: i64,
    pub start: i64,
    #[serde(default, skip_serializing_if = "AliasEntries::is_empty")]
    pub time_series: AliasEntries<RawScheduleInputTimeSeriesSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawScheduleOutputTimeSeriesSpec {
    pub id: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawScheduleOutputSpec {
    #[serde(default, skip_serializing_if = "AliasEntries::is_empty")]
    pub time_series: AliasEntries<RawScheduleOutputTimeSeriesSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawScheduleDataSpec {
    pub input: RawScheduleInputSpec,
    pub output: RawScheduleOutputSpec,
}
