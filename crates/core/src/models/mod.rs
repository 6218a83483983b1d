//! Domain models for the catalog loader.
//!
//! These models are storage- and transport-agnostic and represent the
//! canonical form of catalog data within the domain layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Identifiers
// =============================================================================

/// Numeric identifier of a catalog entry, as assigned by the remote catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct CatalogId(pub u32);

impl CatalogId {
    /// Get the raw numeric value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for CatalogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CatalogId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(Self)
    }
}

impl From<u32> for CatalogId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

// =============================================================================
// Filter Vocabulary
// =============================================================================

/// Evolution stage vocabulary of the remote catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    BabyI,
    BabyII,
    Child,
    Adult,
    Perfect,
    Ultimate,
    Armor,
    Hybrid,
}

impl Level {
    /// The exact string the remote API expects as a query value.
    pub fn as_query_value(&self) -> &'static str {
        match self {
            Self::BabyI => "Baby I",
            Self::BabyII => "Baby II",
            Self::Child => "Child",
            Self::Adult => "Adult",
            Self::Perfect => "Perfect",
            Self::Ultimate => "Ultimate",
            Self::Armor => "Armor",
            Self::Hybrid => "Hybrid",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_query_value())
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baby i" | "baby1" | "baby-i" => Ok(Self::BabyI),
            "baby ii" | "baby2" | "baby-ii" => Ok(Self::BabyII),
            "child" => Ok(Self::Child),
            "adult" => Ok(Self::Adult),
            "perfect" => Ok(Self::Perfect),
            "ultimate" => Ok(Self::Ultimate),
            "armor" => Ok(Self::Armor),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!("Unknown level: '{}'", other)),
        }
    }
}

/// Attribute vocabulary of the remote catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Vaccine,
    Data,
    Virus,
    Free,
    Variable,
    Unknown,
}

impl Attribute {
    /// The exact string the remote API expects as a query value.
    pub fn as_query_value(&self) -> &'static str {
        match self {
            Self::Vaccine => "Vaccine",
            Self::Data => "Data",
            Self::Virus => "Virus",
            Self::Free => "Free",
            Self::Variable => "Variable",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_query_value())
    }
}

impl std::str::FromStr for Attribute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vaccine" => Ok(Self::Vaccine),
            "data" => Ok(Self::Data),
            "virus" => Ok(Self::Virus),
            "free" => Ok(Self::Free),
            "variable" => Ok(Self::Variable),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("Unknown attribute: '{}'", other)),
        }
    }
}

/// Active filter criteria for the minimal index.
///
/// Changing either field invalidates the current minimal index and the
/// loaded set derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FilterState {
    pub attribute: Option<Attribute>,
    pub level: Option<Level>,
}

impl FilterState {
    /// True when no criterion is set (unfiltered index).
    pub fn is_empty(&self) -> bool {
        self.attribute.is_none() && self.level.is_none()
    }
}

// =============================================================================
// Minimal Index
// =============================================================================

/// Lightweight catalog entry produced by the remote index query.
///
/// The minimal index is a read-only ordered sequence of these for the
/// lifetime of one filter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimalEntry {
    pub id: CatalogId,
    pub name: String,
    pub image: Option<String>,
}

/// One row of the static offline name directory, used only for
/// search-candidate computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameIndexEntry {
    pub id: CatalogId,
    pub name: String,
}

// =============================================================================
// Record Detail Elements
// =============================================================================

/// Evolution stage tag on a full record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelTag {
    #[serde(default)]
    pub id: Option<u32>,
    pub level: String,
}

/// Type tag on a full record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTag {
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(rename = "type")]
    pub name: String,
}

/// Attribute tag on a full record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeTag {
    #[serde(default)]
    pub id: Option<u32>,
    pub attribute: String,
}

/// Field emblem on a full record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTag {
    #[serde(default)]
    pub id: Option<u32>,
    pub field: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Localized description text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    pub description: String,
}

/// Named skill with optional translation and description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    #[serde(default)]
    pub id: Option<u32>,
    pub skill: String,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Link to a prior or next evolution of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evolution {
    #[serde(default)]
    pub id: Option<u32>,
    pub digimon: String,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

// =============================================================================
// Record
// =============================================================================

/// The cache's stored unit: a catalog record at one of two completeness
/// tiers over the same identifier.
///
/// - *partial*: `id`, `name`, `image` — sufficient for grid display.
/// - *full*: partial fields plus every detail field — required for detail
///   display. A detail field is `None` on a partial record, `Some` (possibly
///   empty) on a full one.
///
/// Invariant: a record, once written as full, is never downgraded to
/// partial. [`Record::merged_with`] takes the field-level union, preferring
/// the newly fetched side for any field present in both while preserving
/// previously cached fields absent from the new fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: CatalogId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels: Option<Vec<LevelTag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<TypeTag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<AttributeTag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldTag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptions: Option<Vec<Description>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<Skill>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_evolutions: Option<Vec<Evolution>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_evolutions: Option<Vec<Evolution>>,
    /// When this record (or its newest fragment) was fetched from the remote.
    pub fetched_at: DateTime<Utc>,
}

impl Record {
    /// Build a partial (grid-tier) record.
    pub fn partial(
        id: CatalogId,
        name: impl Into<String>,
        image: Option<String>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            image,
            levels: None,
            types: None,
            attributes: None,
            fields: None,
            descriptions: None,
            skills: None,
            prior_evolutions: None,
            next_evolutions: None,
            fetched_at,
        }
    }

    /// True when every detail field is present, i.e. the record carries
    /// everything the detail display needs.
    pub fn is_full(&self) -> bool {
        self.levels.is_some()
            && self.types.is_some()
            && self.attributes.is_some()
            && self.fields.is_some()
            && self.descriptions.is_some()
            && self.skills.is_some()
            && self.prior_evolutions.is_some()
            && self.next_evolutions.is_some()
    }

    /// Field-level union with a newly fetched record for the same id.
    ///
    /// The newly fetched side wins for every field it actually carries;
    /// fields it omits keep their cached value. This defends against the
    /// remote detail payload omitting a field the list payload had, or
    /// vice versa, and guarantees a full record is never downgraded.
    pub fn merged_with(self, newer: Record) -> Record {
        debug_assert_eq!(self.id, newer.id, "merge is only defined per identifier");
        Record {
            id: self.id,
            name: if newer.name.is_empty() { self.name } else { newer.name },
            image: newer.image.or(self.image),
            levels: newer.levels.or(self.levels),
            types: newer.types.or(self.types),
            attributes: newer.attributes.or(self.attributes),
            fields: newer.fields.or(self.fields),
            descriptions: newer.descriptions.or(self.descriptions),
            skills: newer.skills.or(self.skills),
            prior_evolutions: newer.prior_evolutions.or(self.prior_evolutions),
            next_evolutions: newer.next_evolutions.or(self.next_evolutions),
            fetched_at: self.fetched_at.max(newer.fetched_at),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn partial(id: u32) -> Record {
        Record::partial(CatalogId(id), "Agumon", Some("a.png".into()), Utc::now())
    }

    fn full(id: u32) -> Record {
        let mut rec = partial(id);
        rec.levels = Some(vec![LevelTag { id: Some(3), level: "Child".into() }]);
        rec.types = Some(vec![TypeTag { id: Some(1), name: "Reptile".into() }]);
        rec.attributes = Some(vec![AttributeTag { id: Some(1), attribute: "Vaccine".into() }]);
        rec.fields = Some(vec![]);
        rec.descriptions = Some(vec![]);
        rec.skills = Some(vec![]);
        rec.prior_evolutions = Some(vec![]);
        rec.next_evolutions = Some(vec![]);
        rec
    }

    #[test]
    fn catalog_id_display_and_parse() {
        let id: CatalogId = "42".parse().unwrap();
        assert_eq!(id, CatalogId(42));
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn level_query_value_roundtrip() {
        let level: Level = "Baby I".parse().unwrap();
        assert_eq!(level, Level::BabyI);
        assert_eq!(level.as_query_value(), "Baby I");
        assert!("mega".parse::<Level>().is_err());
    }

    #[test]
    fn partial_record_is_not_full() {
        assert!(!partial(1).is_full());
        assert!(full(1).is_full());
    }

    // Merge order must not matter at the tier level: partial-then-full and
    // full-then-partial both yield the full record.
    #[test]
    fn merge_is_commutative_across_tiers() {
        let a = partial(1);
        let b = full(1);

        let ab = a.clone().merged_with(b.clone());
        let ba = b.merged_with(a);

        assert_eq!(ab, ba);
        assert!(ab.is_full());
    }

    #[test]
    fn merge_never_downgrades_a_full_record() {
        let cached = full(7);
        let refetched_partial = partial(7);

        let merged = cached.clone().merged_with(refetched_partial);

        assert!(merged.is_full());
        assert_eq!(merged.levels, cached.levels);
    }

    #[test]
    fn merge_prefers_newly_fetched_fields() {
        let mut cached = full(7);
        cached.image = Some("old.png".into());
        let mut newer = full(7);
        newer.image = Some("new.png".into());
        newer.levels = Some(vec![LevelTag { id: Some(4), level: "Adult".into() }]);

        let merged = cached.merged_with(newer.clone());

        assert_eq!(merged.image, Some("new.png".into()));
        assert_eq!(merged.levels, newer.levels);
    }

    #[test]
    fn merge_is_idempotent() {
        let rec = full(9);
        assert_eq!(rec.clone().merged_with(rec.clone()), rec);
    }

    // Partial records serialize without detail keys, so stored payloads for
    // grid-tier entries stay compact; absent keys deserialize back to None.
    #[test]
    fn partial_record_json_omits_detail_fields() {
        let json = serde_json::to_value(partial(3)).unwrap();
        assert!(json.get("levels").is_none());
        assert!(json.get("priorEvolutions").is_none());

        let back: Record = serde_json::from_value(json).unwrap();
        assert!(!back.is_full());
    }

    #[test]
    fn full_record_json_uses_camel_case_detail_keys() {
        let json = serde_json::to_value(full(3)).unwrap();
        assert!(json.get("priorEvolutions").is_some());
        assert!(json.get("nextEvolutions").is_some());
    }
}
