//! Record filtering and text normalization.

use ingest_types::CatalogRecord;

/// Canonical text embedded for a record: `"{title}: {synopsis}"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the canonical text for `record`.
///
/// Returns `None` when the title or the synopsis is missing or blank; such
/// records are not indexed.
pub fn normalize(record: &CatalogRecord) -> Option<NormalizedText> {
    let title = record.title().trim();
    let synopsis = record.overview().trim();
    if title.is_empty() || synopsis.is_empty() {
        return None;
    }
    Some(NormalizedText(format!("{}: {}", title, synopsis)))
}
