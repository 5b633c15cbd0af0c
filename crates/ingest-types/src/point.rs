//! Vector index point types.

use serde::{Deserialize, Serialize};

/// Scalar metadata stored next to a vector.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Distance metric of a vector collection.
///
/// Serialized with the names the vector service uses (`"Cosine"`, `"Euclid"`,
/// `"Dot"`); lowercase spellings are accepted when reading configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Distance {
    #[default]
    #[serde(alias = "cosine")]
    Cosine,
    #[serde(alias = "euclid", alias = "euclidean")]
    Euclid,
    #[serde(alias = "dot")]
    Dot,
}

impl Distance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Distance::Cosine => "Cosine",
            Distance::Euclid => "Euclid",
            Distance::Dot => "Dot",
        }
    }
}

impl std::fmt::Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point written to the vector index.
///
/// `id` is the catalog identifier and acts as the idempotency key: writing
/// the same id again replaces the stored vector and payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

impl IndexPoint {
    pub fn new(id: u64, vector: Vec<f32>, payload: Payload) -> Self {
        Self {
            id,
            vector,
            payload,
        }
    }

    /// Vector dimension
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_serialization() {
        assert_eq!(serde_json::to_string(&Distance::Cosine).unwrap(), "\"Cosine\"");
        assert_eq!(serde_json::to_string(&Distance::Euclid).unwrap(), "\"Euclid\"");

        let parsed: Distance = serde_json::from_str("\"cosine\"").unwrap();
        assert_eq!(parsed, Distance::Cosine);
        let parsed: Distance = serde_json::from_str("\"euclidean\"").unwrap();
        assert_eq!(parsed, Distance::Euclid);
        let parsed: Distance = serde_json::from_str("\"Dot\"").unwrap();
        assert_eq!(parsed, Distance::Dot);
    }

    #[test]
    fn test_index_point_dimension() {
        let point = IndexPoint::new(7, vec![0.0; 384], Payload::new());
        assert_eq!(point.dimension(), 384);
    }
}
