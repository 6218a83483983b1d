//! HTTP client for the remote catalog API.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, instrument, trace, warn};

use digidex_core::error::{SourceError, SourceResult};
use digidex_core::models::{
    Attribute, AttributeTag, CatalogId, Description, Evolution, FieldTag, FilterState, Level,
    LevelTag, MinimalEntry, Record, Skill, TypeTag,
};
use digidex_core::ports::CatalogSource;

/// Configuration for the catalog API client.
#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    /// Base URL of the catalog API (e.g. `https://digi-api.com/api/v1`).
    pub base_url: String,
    /// Request timeout.
    pub timeout: std::time::Duration,
    /// Page size requested on index queries. The remote caps pages, so this
    /// is set high enough to pull the whole filtered index in one response.
    pub index_page_size: u32,
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://digi-api.com/api/v1".to_string(),
            timeout: std::time::Duration::from_secs(30),
            index_page_size: 2000,
        }
    }
}

/// Catalog API adapter implementing the [`CatalogSource`] port.
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: String,
    index_page_size: u32,
}

impl HttpCatalogClient {
    /// Build a client from configuration.
    pub fn new(config: CatalogClientConfig) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            index_page_size: config.index_page_size,
        })
    }

    /// Issue one index query with the given criteria.
    async fn query_index(
        &self,
        attribute: Option<Attribute>,
        level: Option<Level>,
    ) -> SourceResult<Vec<MinimalEntry>> {
        let url = format!("{}/digimon", self.base_url);
        let mut query: Vec<(&str, String)> =
            vec![("pageSize", self.index_page_size.to_string())];
        if let Some(attribute) = attribute {
            query.push(("attribute", attribute.as_query_value().to_string()));
        }
        if let Some(level) = level {
            query.push(("level", level.as_query_value().to_string()));
        }

        trace!(%url, ?attribute, ?level, "Index query");
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::IndexStatus {
                status: status.as_u16(),
            });
        }

        let page: IndexPageDto = response
            .json()
            .await
            .map_err(|e| SourceError::ParseError(e.to_string()))?;

        Ok(page
            .content
            .into_iter()
            .map(IndexEntryDto::into_minimal)
            .collect())
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogClient {
    /// Fetch the minimal index for the given filter criteria.
    ///
    /// With both criteria set, a combined query is attempted first; an empty
    /// result or a query error falls back to two single-criteria queries
    /// intersected by id (the remote does not reliably support combined
    /// filters, and the intersection is the safe lower bound).
    #[instrument(skip(self))]
    async fn fetch_index(&self, filter: &FilterState) -> SourceResult<Vec<MinimalEntry>> {
        if let (Some(attribute), Some(level)) = (filter.attribute, filter.level) {
            match self.query_index(Some(attribute), Some(level)).await {
                Ok(entries) if !entries.is_empty() => return Ok(entries),
                Ok(_) => debug!("Combined query empty, falling back to intersection"),
                Err(e) => {
                    warn!(error = %e, "Combined query failed, falling back to intersection");
                }
            }

            let (by_level, by_attribute) = futures::join!(
                self.query_index(None, Some(level)),
                self.query_index(Some(attribute), None)
            );
            return Ok(intersect_by_id(by_level?, &by_attribute?));
        }

        self.query_index(filter.attribute, filter.level).await
    }

    /// Fetch the full record for `id`. Any non-success status is a
    /// definitive absent, not an error.
    #[instrument(skip(self))]
    async fn fetch_record(&self, id: CatalogId) -> SourceResult<Option<Record>> {
        let url = format!("{}/digimon/{}", self.base_url, id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            trace!(%id, status = response.status().as_u16(), "Record absent");
            return Ok(None);
        }

        let dto: RecordDto = response
            .json()
            .await
            .map_err(|e| SourceError::ParseError(e.to_string()))?;

        Ok(Some(dto.into_record()))
    }
}

/// Intersection by identifier, preserving the order of `primary`.
fn intersect_by_id(primary: Vec<MinimalEntry>, secondary: &[MinimalEntry]) -> Vec<MinimalEntry> {
    let secondary_ids: HashSet<CatalogId> = secondary.iter().map(|e| e.id).collect();
    primary
        .into_iter()
        .filter(|e| secondary_ids.contains(&e.id))
        .collect()
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct IndexPageDto {
    #[serde(default)]
    content: Vec<IndexEntryDto>,
}

#[derive(Debug, Deserialize)]
struct IndexEntryDto {
    id: u32,
    name: String,
    #[serde(default)]
    images: Vec<ImageDto>,
}

#[derive(Debug, Deserialize)]
struct ImageDto {
    href: String,
}

impl IndexEntryDto {
    fn into_minimal(self) -> MinimalEntry {
        let image = self.images.into_iter().next().map(|i| i.href);
        MinimalEntry {
            id: CatalogId(self.id),
            name: self.name,
            image,
        }
    }
}

/// Full record payload. Arrays the remote omits deserialize to empty, so a
/// fetched record always carries every detail field (possibly empty).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordDto {
    id: u32,
    name: String,
    #[serde(default)]
    images: Vec<ImageDto>,
    #[serde(default)]
    levels: Vec<LevelTag>,
    #[serde(default)]
    types: Vec<TypeTag>,
    #[serde(default)]
    attributes: Vec<AttributeTag>,
    #[serde(default)]
    fields: Vec<FieldTag>,
    #[serde(default)]
    descriptions: Vec<Description>,
    #[serde(default)]
    skills: Vec<Skill>,
    #[serde(default)]
    prior_evolutions: Vec<Evolution>,
    #[serde(default)]
    next_evolutions: Vec<Evolution>,
}

impl RecordDto {
    fn into_record(self) -> Record {
        let image = self.images.into_iter().next().map(|i| i.href);
        Record {
            id: CatalogId(self.id),
            name: self.name,
            image,
            levels: Some(self.levels),
            types: Some(self.types),
            attributes: Some(self.attributes),
            fields: Some(self.fields),
            descriptions: Some(self.descriptions),
            skills: Some(self.skills),
            prior_evolutions: Some(self.prior_evolutions),
            next_evolutions: Some(self.next_evolutions),
            fetched_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u32) -> MinimalEntry {
        MinimalEntry {
            id: CatalogId(id),
            name: format!("Mon-{id}"),
            image: None,
        }
    }

    #[test]
    fn index_page_parses_and_extracts_first_image() {
        let json = r#"{
            "content": [
                {"id": 1, "name": "Garummon", "images": [{"href": "https://img/1.png", "transparent": false}]},
                {"id": 2, "name": "Gabumon", "images": []}
            ],
            "pageable": {"currentPage": 0}
        }"#;

        let page: IndexPageDto = serde_json::from_str(json).unwrap();
        let entries: Vec<MinimalEntry> =
            page.content.into_iter().map(IndexEntryDto::into_minimal).collect();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].image.as_deref(), Some("https://img/1.png"));
        assert_eq!(entries[1].image, None);
    }

    #[test]
    fn empty_index_body_parses_to_no_entries() {
        let page: IndexPageDto = serde_json::from_str("{}").unwrap();
        assert!(page.content.is_empty());
    }

    #[test]
    fn record_payload_parses_into_a_full_record() {
        let json = r#"{
            "id": 177,
            "name": "Greymon",
            "images": [{"href": "https://img/177.png"}],
            "levels": [{"id": 4, "level": "Adult"}],
            "types": [{"id": 9, "type": "Dinosaur"}],
            "attributes": [{"id": 1, "attribute": "Vaccine"}],
            "fields": [{"id": 2, "field": "Nature Spirits", "image": "https://img/ns.png"}],
            "descriptions": [{"origin": "reference_book", "language": "en_us", "description": "..."}],
            "skills": [{"id": 5, "skill": "Mega Flame", "translation": "", "description": "Spews flames."}],
            "priorEvolutions": [{"id": 15, "digimon": "Agumon"}],
            "nextEvolutions": [{"id": 163, "digimon": "MetalGreymon", "condition": "..."}]
        }"#;

        let record = serde_json::from_str::<RecordDto>(json).unwrap().into_record();

        assert_eq!(record.id, CatalogId(177));
        assert!(record.is_full());
        assert_eq!(record.image.as_deref(), Some("https://img/177.png"));
        assert_eq!(record.levels.as_ref().unwrap()[0].level, "Adult");
        assert_eq!(record.prior_evolutions.as_ref().unwrap()[0].digimon, "Agumon");
    }

    // The detail endpoint sometimes ships records with whole sections
    // missing; those must still count as full (empty, not unknown).
    #[test]
    fn sparse_record_payload_defaults_to_empty_sections() {
        let json = r#"{"id": 3, "name": "Mon-3"}"#;

        let record = serde_json::from_str::<RecordDto>(json).unwrap().into_record();

        assert!(record.is_full());
        assert!(record.skills.as_ref().unwrap().is_empty());
        assert_eq!(record.image, None);
    }

    #[test]
    fn intersection_preserves_primary_order() {
        let primary = vec![entry(5), entry(1), entry(9), entry(3)];
        let secondary = vec![entry(3), entry(5)];

        let out = intersect_by_id(primary, &secondary);

        let ids: Vec<u32> = out.iter().map(|e| e.id.value()).collect();
        assert_eq!(ids, vec![5, 3]);
    }

    #[test]
    fn intersection_with_disjoint_sets_is_empty() {
        let out = intersect_by_id(vec![entry(1), entry(2)], &[entry(3)]);
        assert!(out.is_empty());
    }
}
