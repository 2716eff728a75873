//! Reference data: neighborhoods, resident cases and facility tables.
//!
//! The engine only talks to the [`NeighborhoodStore`] and [`CaseCorpus`]
//! traits. [`DataStore`] is the JSON-file implementation the server uses.

use crate::error::CollaboratorError;
use crate::normalize::{district_key, strip_district_prefix};
use crate::settings::DataSettings;
use crate::vocab::FacilityKind;
use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::read_to_string;
use std::path::Path;

pub type Row = Map<String, Value>;

/// Renders a cell as text; numbers and booleans are stringified, nulls and
/// containers are treated as absent.
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodRecord {
    #[serde(alias = "Name_of_neighborhood", alias = "الحي", alias = "اسم_الحي")]
    pub name: String,
    #[serde(flatten)]
    pub attributes: Row,
}

impl NeighborhoodRecord {
    /// First non-empty textual value among `fields`.
    pub fn first_text(&self, fields: &[&str]) -> Option<(String, String)> {
        fields.iter().find_map(|field| {
            self.attributes
                .get(*field)
                .and_then(cell_text)
                .map(|text| (field.to_string(), text))
        })
    }
}

/// A resident's experience paired with the neighborhood they chose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeighborhoodCase {
    pub case_id: u64,
    pub narrative: String,
    pub recommended_neighborhood: Option<String>,
}

/// One line of the cases file.
#[derive(Debug, Clone, Deserialize)]
pub struct CaseEntry {
    #[serde(alias = "الحالة", alias = "description")]
    pub narrative: String,
    #[serde(default, alias = "الحي", alias = "recommended_neighborhood")]
    pub neighborhood: Option<String>,
    #[serde(default, alias = "satisfaction")]
    pub benefits: Vec<String>,
}

/// Rows of one facility kind as the store holds them. Column names vary
/// between sources, so nothing about them is assumed here.
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityTable {
    pub kind: FacilityKind,
    rows: Vec<Row>,
}

impl FacilityTable {
    pub fn new(kind: FacilityKind, rows: Vec<Row>) -> Self {
        Self { kind, rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.rows.iter().any(|row| row.contains_key(column))
    }
}

/// A facility row in the shape the rest of the engine consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacilityRecord {
    pub id: String,
    pub name: String,
    pub neighborhood: Option<String>,
    pub facility_type: FacilityKind,
    pub attributes: BTreeMap<String, Value>,
}

pub trait NeighborhoodStore: Send + Sync {
    fn find_neighborhood_info(&self, name: &str) -> Option<NeighborhoodRecord>;

    /// Names without the "حي " prefix, deduplicated, in first-seen order.
    fn available_neighborhoods(&self) -> Vec<String>;

    fn neighborhood_benefits(&self, name: &str) -> Vec<String>;

    fn facility_records(&self, kind: FacilityKind) -> Result<FacilityTable, CollaboratorError>;

    fn neighborhood_records(&self) -> Vec<NeighborhoodRecord>;
}

pub trait CaseCorpus: Send + Sync {
    fn cases_for_similarity(&self) -> Vec<NeighborhoodCase>;
}

#[derive(Debug, Clone, Default)]
pub struct DataStore {
    neighborhoods: Vec<NeighborhoodRecord>,
    cases: Vec<CaseEntry>,
    facilities: HashMap<FacilityKind, Vec<Row>>,
}

impl DataStore {
    pub fn new(
        neighborhoods: Vec<NeighborhoodRecord>,
        cases: Vec<CaseEntry>,
        facilities: HashMap<FacilityKind, Vec<Row>>,
    ) -> Self {
        Self {
            neighborhoods,
            cases,
            facilities,
        }
    }

    pub fn load(settings: &DataSettings) -> Result<Self> {
        let neighborhoods = Self::load_neighborhoods(&settings.neighborhoods_file)?;
        let cases = Self::load_cases(&settings.cases_file)?;
        let mut facilities = HashMap::new();
        for kind in FacilityKind::ALL {
            let path = Path::new(&settings.facilities_dir).join(format!("{}.json", kind.file_stem()));
            if !path.exists() {
                warn!("no {} data at {:?}", kind, path);
                continue;
            }
            let content = read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
            let rows: Vec<Row> =
                serde_json::from_str(&content).with_context(|| format!("parsing {:?}", path))?;
            facilities.insert(kind, rows);
        }
        info!(
            "loaded {} neighborhoods, {} cases, {} facility tables",
            neighborhoods.len(),
            cases.len(),
            facilities.len()
        );
        Ok(Self::new(neighborhoods, cases, facilities))
    }

    fn load_neighborhoods(path: &str) -> Result<Vec<NeighborhoodRecord>> {
        let content = read_to_string(path).with_context(|| format!("reading {}", path))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path))
    }

    /// One JSON object per line; unreadable lines are skipped.
    fn load_cases(path: &str) -> Result<Vec<CaseEntry>> {
        let content = read_to_string(path).with_context(|| format!("reading {}", path))?;
        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .filter_map(|(i, line)| match serde_json::from_str(line) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("skipping case line {} in {}: {}", i + 1, path, err);
                    None
                }
            })
            .collect())
    }
}

impl NeighborhoodStore for DataStore {
    fn find_neighborhood_info(&self, name: &str) -> Option<NeighborhoodRecord> {
        let key = district_key(name);
        if key.is_empty() {
            return None;
        }
        self.neighborhoods
            .iter()
            .find(|n| district_key(&n.name) == key)
            .or_else(|| {
                self.neighborhoods
                    .iter()
                    .find(|n| district_key(&n.name).contains(key.as_str()))
            })
            .cloned()
    }

    fn available_neighborhoods(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let recorded = self.neighborhoods.iter().map(|n| n.name.as_str());
        let from_cases = self.cases.iter().filter_map(|c| c.neighborhood.as_deref());
        recorded
            .chain(from_cases)
            .filter(|name| {
                let key = district_key(name);
                !key.is_empty() && seen.insert(key)
            })
            .map(|name| strip_district_prefix(name).to_string())
            .collect()
    }

    fn neighborhood_benefits(&self, name: &str) -> Vec<String> {
        let key = district_key(name);
        let mut seen = HashSet::new();
        self.cases
            .iter()
            .filter(|c| c.neighborhood.as_deref().map(district_key).as_deref() == Some(key.as_str()))
            .flat_map(|c| c.benefits.iter())
            .map(|b| b.trim())
            .filter(|b| !b.is_empty() && seen.insert(b.to_string()))
            .map(str::to_string)
            .collect()
    }

    fn facility_records(&self, kind: FacilityKind) -> Result<FacilityTable, CollaboratorError> {
        let rows = self.facilities.get(&kind).cloned().unwrap_or_default();
        Ok(FacilityTable::new(kind, rows))
    }

    fn neighborhood_records(&self) -> Vec<NeighborhoodRecord> {
        self.neighborhoods.clone()
    }
}

impl CaseCorpus for DataStore {
    fn cases_for_similarity(&self) -> Vec<NeighborhoodCase> {
        self.cases
            .iter()
            .enumerate()
            .map(|(i, c)| NeighborhoodCase {
                case_id: i as u64 + 1,
                narrative: c.narrative.clone(),
                recommended_neighborhood: c
                    .neighborhood
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string),
            })
            .collect()
    }
}
