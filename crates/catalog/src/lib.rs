use std::collections::HashMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A 3D coordinate triple as it appears on the wire (`{"x": .., "y": .., "z": ..}`).
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coord3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coord3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// The six display fields shown in the info panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneSpecs {
    pub screen_size: String,
    pub processor: String,
    pub camera: String,
    pub battery: String,
    pub storage: String,
}

/// One phone as served by the backend. Immutable once fetched.
///
/// `scale`/`position`/`rotation` drive model placement and default to a
/// neutral transform when a record omits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneRecord {
    pub name: String,
    pub model_path: String,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub position: Coord3,
    #[serde(default)]
    pub rotation: Coord3,
    pub specs: PhoneSpecs,
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    NotFound,
    Corrupt(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::NotFound => write!(f, "phone record not found"),
            CatalogError::Corrupt(msg) => write!(f, "catalog payload corrupt: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Insertion-ordered id -> [`PhoneRecord`] mapping.
///
/// Order is load order: the backend's catalog object first, then any records
/// fetched lazily for ids that were not part of the initial payload. Menu
/// order is exactly this order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Catalog {
    ids: Vec<String>,
    records: HashMap<String, PhoneRecord>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `GET /api/phones` payload: a JSON object of id -> record.
    ///
    /// Key order in the document is preserved.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let map = serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(raw)
            .map_err(|e| CatalogError::Corrupt(e.to_string()))?;

        let mut catalog = Self::new();
        for (id, value) in map {
            let record = serde_json::from_value::<PhoneRecord>(value)
                .map_err(|e| CatalogError::Corrupt(format!("record {id}: {e}")))?;
            catalog.insert(id, record);
        }
        Ok(catalog)
    }

    /// Parse a single `GET /api/phones/{id}` payload.
    pub fn parse_record(raw: &str) -> Result<PhoneRecord, CatalogError> {
        serde_json::from_str(raw).map_err(|e| CatalogError::Corrupt(e.to_string()))
    }

    /// Insert or replace a record. A new id is appended to the menu order.
    pub fn insert(&mut self, id: impl Into<String>, record: PhoneRecord) {
        let id = id.into();
        if !self.records.contains_key(&id) {
            self.ids.push(id.clone());
        }
        self.records.insert(id, record);
    }

    pub fn get(&self, id: &str) -> Option<&PhoneRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn first_id(&self) -> Option<&str> {
        self.ids.first().map(String::as_str)
    }

    /// Ids in menu order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// (id, record) pairs in menu order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &PhoneRecord)> {
        self.ids
            .iter()
            .filter_map(|id| self.records.get(id).map(|r| (id.as_str(), r)))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// Serialized as the same id -> record object the backend serves, keys in
// menu order.
impl Serialize for Catalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.ids.len()))?;
        for (id, record) in self.entries() {
            map.serialize_entry(id, record)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(name: &str) -> PhoneRecord {
        PhoneRecord {
            name: name.to_string(),
            model_path: format!("models/{name}.glb"),
            scale: 1.0,
            position: Coord3::default(),
            rotation: Coord3::default(),
            specs: PhoneSpecs {
                screen_size: "6.1\"".to_string(),
                processor: "Octa-core".to_string(),
                camera: "48 MP".to_string(),
                battery: "4000 mAh".to_string(),
                storage: "128 GB".to_string(),
            },
        }
    }

    #[test]
    fn from_json_preserves_document_order() {
        let raw = r#"{
            "zeta": {"name": "Zeta", "modelPath": "models/zeta.glb",
                     "specs": {"screenSize": "a", "processor": "b", "camera": "c",
                               "battery": "d", "storage": "e"}},
            "alpha": {"name": "Alpha", "modelPath": "models/alpha.glb",
                      "specs": {"screenSize": "a", "processor": "b", "camera": "c",
                                "battery": "d", "storage": "e"}}
        }"#;
        let catalog = Catalog::from_json(raw).unwrap();
        let ids: Vec<&str> = catalog.ids().collect();
        assert_eq!(ids, vec!["zeta", "alpha"]);
        assert_eq!(catalog.first_id(), Some("zeta"));
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let raw = r#"{
            "name": "Nova X",
            "modelPath": "models/nova_x.glb",
            "scale": 2.5,
            "position": {"x": 0.0, "y": -1.0, "z": 0.0},
            "rotation": {"x": 0.0, "y": 1.57, "z": 0.0},
            "specs": {"screenSize": "6.7\"", "processor": "Octa-core 3.2 GHz",
                      "camera": "108 MP", "battery": "5000 mAh", "storage": "256 GB"}
        }"#;
        let rec = Catalog::parse_record(raw).unwrap();
        assert_eq!(rec.model_path, "models/nova_x.glb");
        assert_eq!(rec.scale, 2.5);
        assert_eq!(rec.position, Coord3::new(0.0, -1.0, 0.0));
        assert_eq!(rec.specs.screen_size, "6.7\"");

        let json = serde_json::to_value(&rec).unwrap();
        assert!(json.get("modelPath").is_some());
        assert!(json["specs"].get("screenSize").is_some());
    }

    #[test]
    fn placement_fields_default_when_omitted() {
        let raw = r#"{
            "name": "Bare", "modelPath": "models/bare.glb",
            "specs": {"screenSize": "a", "processor": "b", "camera": "c",
                      "battery": "d", "storage": "e"}
        }"#;
        let rec = Catalog::parse_record(raw).unwrap();
        assert_eq!(rec.scale, 1.0);
        assert_eq!(rec.position, Coord3::default());
        assert_eq!(rec.rotation, Coord3::default());
    }

    #[test]
    fn lazy_insert_appends_to_menu_order() {
        let mut catalog = Catalog::new();
        catalog.insert("phone1", record("one"));
        catalog.insert("phone2", record("two"));
        assert!(!catalog.contains("phone9"));

        catalog.insert("phone9", record("nine"));
        let ids: Vec<&str> = catalog.ids().collect();
        assert_eq!(ids, vec!["phone1", "phone2", "phone9"]);

        // Replacing an existing record must not duplicate its menu entry.
        catalog.insert("phone2", record("two-again"));
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get("phone2").unwrap().name, "two-again");
    }

    #[test]
    fn invalid_payload_is_corrupt() {
        let err = Catalog::from_json("not json").unwrap_err();
        assert!(matches!(err, CatalogError::Corrupt(_)));

        let err = Catalog::from_json(r#"{"p": {"name": "missing specs"}}"#).unwrap_err();
        assert!(matches!(err, CatalogError::Corrupt(_)));
    }

    #[test]
    fn serializes_in_menu_order() {
        let mut catalog = Catalog::new();
        catalog.insert("second", record("b"));
        catalog.insert("first", record("a"));
        let json = serde_json::to_string(&catalog).unwrap();
        assert!(json.find("\"second\"").unwrap() < json.find("\"first\"").unwrap());
    }
}
