use std::collections::BTreeMap;
use std::fs;

use camino::Utf8Path;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::domain::Species;
use crate::error::SckanError;

/// Region `Name` → `(x, y)` on the species body map.
pub type CoordinateMap = BTreeMap<String, (i64, i64)>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRecord {
    #[serde(rename = "URL", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "X", default, deserialize_with = "de_coordinate")]
    pub x: Option<i64>,
    #[serde(rename = "Y", default, deserialize_with = "de_coordinate")]
    pub y: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCoordinate {
    Int(i64),
    Float(f64),
    Text(String),
}

fn de_coordinate<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawCoordinate>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawCoordinate::Int(value)) => Ok(Some(value)),
        Some(RawCoordinate::Float(value)) => Ok(Some(value.trunc() as i64)),
        Some(RawCoordinate::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<i64>()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid coordinate: {text}")))
        }
    }
}

/// Per-species region reference files, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    records: BTreeMap<Species, Vec<RegionRecord>>,
}

impl AssetRegistry {
    pub fn load(dir: &Utf8Path) -> Result<Self, SckanError> {
        let mut records = BTreeMap::new();
        for species in Species::ALL {
            let path = dir.join(species.asset_file());
            if !path.as_std_path().exists() {
                warn!(species = %species, path = %path, "region asset missing");
                continue;
            }
            let items = read_records(&path)?;
            debug!(species = %species, records = items.len(), "region asset loaded");
            records.insert(species, items);
        }
        Ok(Self { records })
    }

    pub fn from_records(records: impl IntoIterator<Item = (Species, Vec<RegionRecord>)>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }

    pub fn supports(&self, species: Species) -> bool {
        self.records.contains_key(&species)
    }

    pub fn supported(&self) -> Vec<Species> {
        self.records.keys().copied().collect()
    }

    pub fn records(&self, species: Species) -> Option<&[RegionRecord]> {
        self.records.get(&species).map(Vec::as_slice)
    }

    pub fn coordinates(&self, species: Species) -> Option<CoordinateMap> {
        let records = self.records(species)?;
        Some(
            records
                .iter()
                .filter_map(|record| Some((record.name.clone(), (record.x?, record.y?))))
                .collect(),
        )
    }
}

pub fn read_records(path: &Utf8Path) -> Result<Vec<RegionRecord>, SckanError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|_| SckanError::AssetRead(path.to_path_buf()))?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(content.as_str());
    serde_json::from_str(content).map_err(|err| SckanError::AssetParse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;

    #[test]
    fn coordinates_accept_numbers_and_strings() {
        let json = r#"[
            {"Name": "heart", "X": "120", "Y": 340},
            {"Name": "lung", "X": 80.6, "Y": "20"},
            {"URL": "http://purl.obolibrary.org/obo/UBERON_0002107", "Name": "liver"}
        ]"#;
        let records: Vec<RegionRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].x, Some(120));
        assert_eq!(records[1].x, Some(80));
        assert_eq!(records[2].x, None);
        assert!(records[2].url.is_some());

        let registry = AssetRegistry::from_records([(Species::Human, records)]);
        let coords = registry.coordinates(Species::Human).unwrap();
        assert_eq!(coords.get("heart"), Some(&(120, 340)));
        assert!(!coords.contains_key("liver"));
        assert!(registry.coordinates(Species::Rat).is_none());
    }

    #[test]
    fn load_skips_missing_files_and_strips_bom() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        fs::write(
            dir.join("coords_rat.json").as_std_path(),
            "\u{feff}[{\"Name\": \"spinal cord\", \"X\": 1, \"Y\": 2}]",
        )
        .unwrap();

        let registry = AssetRegistry::load(&dir).unwrap();
        assert_eq!(registry.supported(), vec![Species::Rat]);
        assert!(!registry.supports(Species::Human));
    }

    #[test]
    fn load_reports_unparsable_asset() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        fs::write(dir.join("coords_human.json").as_std_path(), "{not json").unwrap();

        let err = AssetRegistry::load(&dir).unwrap_err();
        assert!(matches!(err, SckanError::AssetParse { .. }));
    }
}
