//! Facility lookup over the store's tables: by neighborhood, or by a fuzzy
//! name query that widens in fixed stages until something matches.

use crate::error::SearchError;
use crate::extractor::rule_regex;
use crate::normalize::{district_key, normalize};
use crate::store::{cell_text, FacilityRecord, FacilityTable, NeighborhoodStore, Row};
use crate::vocab::FacilityKind;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const NEIGHBORHOOD_COLUMNS: [&str; 6] = ["الحي", "اسم_الحي", "neighborhood", "المنطقة", "location", "الحيّ"];

pub const MAX_HITS: usize = 5;

const NAME_FIELD: &str = "الاسم";
const MIN_KEYWORD_CHARS: usize = 3;

static QUESTION_PREFIXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^أين (?:توجد|يوجد|تقع|يقع|هي|هو) ",
        r"^ما (?:هي|هو) ",
        r"^كيف (?:أجد|أصل إلى) ",
        r"^أين (?:مكان|موقع) ",
        r"^(?:موقع|مكان|عنوان) ",
        r"^(?:دلني|دلوني|أرشدني) (?:على|عن|إلى) ",
        r"^أبحث عن ",
    ]
    .iter()
    .map(|p| rule_regex(p))
    .collect()
});

static TRAILING_PHRASES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r" في (?:الرياض|جدة|مكة|المدينة|الدمام).*$",
        r" بالقرب من.*$",
        r" على طريق.*$",
        r" عند.*$",
    ]
    .iter()
    .map(|p| rule_regex(p))
    .collect()
});

/// Columns holding a facility's name, most specific first.
fn search_columns(kind: FacilityKind) -> [&'static str; 5] {
    match kind {
        FacilityKind::School => ["اسم_المدرسة", "name", "school_name", "المدرسة", NAME_FIELD],
        FacilityKind::Hospital => ["اسم_المستشفى", "name", "hospital_name", "المستشفى", NAME_FIELD],
        FacilityKind::Park => ["اسم_الحديقة", "name", "park_name", "الحديقة", NAME_FIELD],
        FacilityKind::Supermarket => [
            "اسم_السوبرماركت",
            "name",
            "supermarket_name",
            "السوبرماركت",
            NAME_FIELD,
        ],
        FacilityKind::Mall => ["اسم_المول", "name", "mall_name", "المول", NAME_FIELD],
    }
}

/// How far the query had to widen before rows matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
    NameField,
    SearchFields,
    Keywords,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub kind: FacilityKind,
    pub stage: MatchStage,
    /// The cleaned query that matched.
    pub query: String,
    /// At most [`MAX_HITS`] records.
    pub records: Vec<FacilityRecord>,
    /// Matches before truncation.
    pub total: usize,
}

/// Strips question scaffolding and trailing location phrases from a
/// facility query. Returns normalized text.
pub fn clean_query(query: &str) -> String {
    let original = normalize(query).trim().to_string();
    let mut cleaned = original.clone();
    for re in QUESTION_PREFIXES.iter() {
        cleaned = re.replace(&cleaned, "").into_owned();
    }
    cleaned = cleaned.replace(['؟', '?', '.'], "").trim().to_string();
    for re in TRAILING_PHRASES.iter() {
        cleaned = re.replace(&cleaned, "").into_owned();
    }
    let cleaned = cleaned.trim();
    if cleaned.chars().count() < 2 {
        return original;
    }
    cleaned.to_string()
}

fn cell_matches(row: &Row, column: &str, needle: &str) -> bool {
    row.get(column)
        .and_then(cell_text)
        .map(|text| normalize(&text).contains(needle))
        .unwrap_or(false)
}

pub struct FacilitySearch {
    store: Arc<dyn NeighborhoodStore>,
}

impl FacilitySearch {
    pub fn new(store: Arc<dyn NeighborhoodStore>) -> Self {
        Self { store }
    }

    /// Facilities located in `neighborhood`. With no kind, every kind is
    /// searched and the results concatenated in declaration order.
    pub fn find(
        &self,
        neighborhood: &str,
        kind: Option<FacilityKind>,
    ) -> Result<Vec<FacilityRecord>, SearchError> {
        if let Some(kind) = kind {
            return self.find_kind(neighborhood, kind);
        }
        let mut records = Vec::new();
        let mut unlocatable = None;
        let mut located_any = false;
        for kind in FacilityKind::ALL {
            match self.find_kind(neighborhood, kind) {
                Ok(found) => {
                    located_any = true;
                    records.extend(found);
                }
                Err(err @ SearchError::NoNeighborhoodColumn { .. }) => {
                    warn!("{}", err);
                    unlocatable.get_or_insert(err);
                }
                Err(err) => return Err(err),
            }
        }
        match unlocatable {
            Some(err) if !located_any => Err(err),
            _ => Ok(records),
        }
    }

    fn find_kind(&self, neighborhood: &str, kind: FacilityKind) -> Result<Vec<FacilityRecord>, SearchError> {
        let table = self.store.facility_records(kind)?;
        if table.is_empty() {
            debug!("no {} records loaded", kind);
            return Ok(Vec::new());
        }
        let column = NEIGHBORHOOD_COLUMNS
            .iter()
            .copied()
            .find(|c| table.has_column(c))
            .ok_or(SearchError::NoNeighborhoodColumn { kind })?;
        let key = district_key(neighborhood);
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<FacilityRecord> = table
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| cell_matches(row, column, &key))
            .map(|(i, row)| Self::record(&table, i, row))
            .collect();
        info!("{} {} records in {}", records.len(), kind, neighborhood);
        Ok(records)
    }

    /// Fuzzy lookup by name within one kind. `Ok(None)` means nothing
    /// matched at any stage.
    pub fn search(&self, kind: FacilityKind, query: &str) -> Result<Option<SearchHit>, SearchError> {
        let table = self.store.facility_records(kind)?;
        if table.is_empty() {
            return Ok(None);
        }
        let mut cleaned = clean_query(query);
        if cleaned.chars().count() < MIN_KEYWORD_CHARS {
            cleaned = normalize(kind.label());
        }
        let columns = search_columns(kind);

        // Stage 1: the name field
        let hit = self.matching(&table, |row| cell_matches(row, NAME_FIELD, &cleaned));
        if !hit.is_empty() {
            return Ok(Some(Self::hit(&table, MatchStage::NameField, cleaned, hit)));
        }

        // Stage 2: every searchable column
        let hit = self.matching(&table, |row| columns.iter().any(|c| cell_matches(row, c, &cleaned)));
        if !hit.is_empty() {
            return Ok(Some(Self::hit(&table, MatchStage::SearchFields, cleaned, hit)));
        }

        // Stage 3: individual words of a multi-word query. Facility-type
        // words like "مدرسة" only count when nothing else is left.
        let mut words: Vec<&str> = cleaned
            .split_whitespace()
            .filter(|w| w.chars().count() >= MIN_KEYWORD_CHARS)
            .collect();
        if words.iter().any(|w| FacilityKind::score(w).is_none()) {
            words.retain(|w| FacilityKind::score(w).is_none());
        }
        if cleaned.split_whitespace().count() > 1 && !words.is_empty() {
            let hit = self.matching(&table, |row| {
                words
                    .iter()
                    .any(|w| columns.iter().any(|c| cell_matches(row, c, w)))
            });
            if !hit.is_empty() {
                return Ok(Some(Self::hit(&table, MatchStage::Keywords, cleaned.clone(), hit)));
            }
        }

        debug!("no {} matches {:?}", kind, cleaned);
        Ok(None)
    }

    /// Searches every kind in declaration order; kinds that fail are skipped.
    pub fn search_all(&self, query: &str) -> Vec<SearchHit> {
        FacilityKind::ALL
            .iter()
            .filter_map(|kind| match self.search(*kind, query) {
                Ok(hit) => hit,
                Err(err) => {
                    warn!("searching {} failed: {}", kind, err);
                    None
                }
            })
            .collect()
    }

    fn matching<F>(&self, table: &FacilityTable, predicate: F) -> Vec<usize>
    where
        F: Fn(&Row) -> bool,
    {
        table
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| predicate(row))
            .map(|(i, _)| i)
            .collect()
    }

    fn hit(table: &FacilityTable, stage: MatchStage, query: String, rows: Vec<usize>) -> SearchHit {
        let total = rows.len();
        let records = rows
            .into_iter()
            .take(MAX_HITS)
            .map(|i| Self::record(table, i, &table.rows()[i]))
            .collect();
        SearchHit {
            kind: table.kind,
            stage,
            query,
            records,
            total,
        }
    }

    /// Shapes a raw row into a record.
    pub fn record(table: &FacilityTable, index: usize, row: &Row) -> FacilityRecord {
        let kind = table.kind;
        let id = row
            .get("id")
            .and_then(cell_text)
            .unwrap_or_else(|| format!("{}-{}", kind.file_stem(), index + 1));
        let name = std::iter::once(NAME_FIELD)
            .chain(search_columns(kind))
            .find_map(|c| row.get(c).and_then(cell_text))
            .unwrap_or_else(|| kind.label().to_string());
        let neighborhood = NEIGHBORHOOD_COLUMNS
            .iter()
            .find_map(|c| row.get(*c).and_then(cell_text));
        let attributes: BTreeMap<_, _> = row
            .iter()
            .filter(|(k, _)| k.as_str() != "id")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        FacilityRecord {
            id,
            name,
            neighborhood,
            facility_type: kind,
            attributes,
        }
    }
}
