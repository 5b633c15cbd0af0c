//! Catalog record type.
//!
//! A `CatalogRecord` is one item as returned by the catalog API's list,
//! search and related endpoints. Only `id` is mandatory on the wire; every
//! other field tolerates `null` or absence, and the normalizer decides
//! whether the record carries enough text to be indexed.

use serde::{Deserialize, Serialize};

use crate::point::Payload;

/// Release date written to the payload when the catalog omits one.
pub const UNKNOWN_RELEASE_DATE: &str = "Unknown";

/// An item decoded from the external catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Stable catalog identifier, reused as the vector point id
    pub id: u64,

    /// Display title
    #[serde(default)]
    pub title: Option<String>,

    /// Free-text synopsis; the descriptive field that gets embedded
    #[serde(default)]
    pub overview: Option<String>,

    /// Poster image reference (path relative to the image CDN)
    #[serde(default)]
    pub poster_path: Option<String>,

    /// Release date as reported by the catalog (YYYY-MM-DD)
    #[serde(default)]
    pub release_date: Option<String>,

    /// Catalog popularity score
    #[serde(default)]
    pub popularity: Option<f64>,

    /// Average user rating
    #[serde(default)]
    pub vote_average: Option<f64>,

    /// Number of user ratings
    #[serde(default)]
    pub vote_count: Option<u64>,
}

impl CatalogRecord {
    /// Create a record with only the required fields set.
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: Some(title.into()),
            overview: None,
            poster_path: None,
            release_date: None,
            popularity: None,
            vote_average: None,
            vote_count: None,
        }
    }

    /// Set the synopsis (builder pattern).
    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = Some(overview.into());
        self
    }

    /// Set the poster reference (builder pattern).
    pub fn with_poster_path(mut self, poster_path: impl Into<String>) -> Self {
        self.poster_path = Some(poster_path.into());
        self
    }

    /// Set the release date (builder pattern).
    pub fn with_release_date(mut self, release_date: impl Into<String>) -> Self {
        self.release_date = Some(release_date.into());
        self
    }

    /// Set the rating (builder pattern).
    pub fn with_vote_average(mut self, vote_average: f64) -> Self {
        self.vote_average = Some(vote_average);
        self
    }

    /// Title, or an empty string when absent.
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    /// Synopsis, or an empty string when absent.
    pub fn overview(&self) -> &str {
        self.overview.as_deref().unwrap_or_default()
    }

    /// Four-digit release year, when the release date carries one.
    pub fn year(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .filter(|d| d.len() >= 4 && d.is_char_boundary(4))
            .map(|d| &d[..4])
    }

    /// Build the metadata stored alongside the record's vector.
    ///
    /// Missing optional fields fall back to `""`, `"Unknown"` and `0` so
    /// consumers never have to handle absent keys.
    pub fn payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("title".into(), self.title().into());
        payload.insert("overview".into(), self.overview().into());
        payload.insert(
            "poster_path".into(),
            self.poster_path.clone().unwrap_or_default().into(),
        );
        payload.insert(
            "release_date".into(),
            self.release_date
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| UNKNOWN_RELEASE_DATE.to_string())
                .into(),
        );
        payload.insert(
            "vote_average".into(),
            self.vote_average.unwrap_or(0.0).into(),
        );
        if let Some(popularity) = self.popularity {
            payload.insert("popularity".into(), popularity.into());
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_tolerates_nulls() {
        let json = r#"{"id": 13, "title": "Forrest Gump", "overview": null, "poster_path": null}"#;
        let record: CatalogRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 13);
        assert_eq!(record.title(), "Forrest Gump");
        assert_eq!(record.overview(), "");
        assert!(record.poster_path.is_none());
    }

    #[test]
    fn test_decode_requires_id() {
        let json = r#"{"title": "No id"}"#;
        assert!(serde_json::from_str::<CatalogRecord>(json).is_err());
    }

    #[test]
    fn test_payload_defaults() {
        let record = CatalogRecord::new(1, "Title").with_overview("Synopsis");
        let payload = record.payload();
        assert_eq!(payload["title"], "Title");
        assert_eq!(payload["overview"], "Synopsis");
        assert_eq!(payload["poster_path"], "");
        assert_eq!(payload["release_date"], UNKNOWN_RELEASE_DATE);
        assert_eq!(payload["vote_average"], 0.0);
        assert!(!payload.contains_key("popularity"));
    }

    #[test]
    fn test_payload_carries_optional_fields() {
        let mut record = CatalogRecord::new(2, "Title")
            .with_overview("Synopsis")
            .with_poster_path("/p.jpg")
            .with_release_date("1994-09-23")
            .with_vote_average(8.7);
        record.popularity = Some(120.5);

        let payload = record.payload();
        assert_eq!(payload["poster_path"], "/p.jpg");
        assert_eq!(payload["release_date"], "1994-09-23");
        assert_eq!(payload["vote_average"], 8.7);
        assert_eq!(payload["popularity"], 120.5);
    }

    #[test]
    fn test_year() {
        let record = CatalogRecord::new(3, "T").with_release_date("2001-12-19");
        assert_eq!(record.year(), Some("2001"));
        assert_eq!(CatalogRecord::new(4, "T").year(), None);
        assert_eq!(CatalogRecord::new(5, "T").with_release_date("").year(), None);
    }
}
