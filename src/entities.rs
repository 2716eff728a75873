//! Typed entities pulled out of a single message.

use crate::vocab::{Direction, FacilityKind, MaritalStatus, PropertyType, TransactionType};
use serde::Serialize;
use std::fmt;

/// The pattern family a neighborhood was found through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionContext {
    Recommendation,
    GeneralInfo,
    Living,
    /// Bare occurrence of a known name, no surrounding pattern.
    Mention,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeighborhoodMention {
    pub name: String,
    pub context: MentionContext,
}

/// A facility the user wants to live near, with the text it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProximityFacility {
    pub kind: FacilityKind,
    pub raw_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HousingPreferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersonProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<MaritalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

impl PersonProfile {
    pub fn attribute_count(&self) -> usize {
        [
            self.age.is_some(),
            self.marital_status.is_some(),
            self.children.is_some(),
            self.rooms.is_some(),
            self.bathrooms.is_some(),
            self.area.is_some(),
            self.direction.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Neighborhood,
    Workplace,
    FacilityName,
    FacilityType,
    FacilitiesText,
    Budget,
    PropertyType,
    TransactionType,
    Floor,
    Age,
    MaritalStatus,
    Children,
    Rooms,
    Bathrooms,
    Area,
    Direction,
    ProximityFacilities,
    PreferredLocation,
}

impl EntityKind {
    pub const ALL: [EntityKind; 18] = [
        EntityKind::Neighborhood,
        EntityKind::Workplace,
        EntityKind::FacilityName,
        EntityKind::FacilityType,
        EntityKind::FacilitiesText,
        EntityKind::Budget,
        EntityKind::PropertyType,
        EntityKind::TransactionType,
        EntityKind::Floor,
        EntityKind::Age,
        EntityKind::MaritalStatus,
        EntityKind::Children,
        EntityKind::Rooms,
        EntityKind::Bathrooms,
        EntityKind::Area,
        EntityKind::Direction,
        EntityKind::ProximityFacilities,
        EntityKind::PreferredLocation,
    ];
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Everything the extractor could read out of one utterance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Entities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<NeighborhoodMention>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workplace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility_type: Option<FacilityKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facilities_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<u64>,
    pub housing: HousingPreferences,
    pub person: PersonProfile,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub proximity_facilities: Vec<ProximityFacility>,
    pub location_preference: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_location: Option<String>,
}

impl Entities {
    pub fn has(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Neighborhood => self.neighborhood.is_some(),
            EntityKind::Workplace => self.workplace.is_some(),
            EntityKind::FacilityName => self.facility_name.is_some(),
            EntityKind::FacilityType => self.facility_type.is_some(),
            EntityKind::FacilitiesText => self.facilities_text.is_some(),
            EntityKind::Budget => self.budget.is_some(),
            EntityKind::PropertyType => self.housing.property_type.is_some(),
            EntityKind::TransactionType => self.housing.transaction_type.is_some(),
            EntityKind::Floor => self.housing.floor.is_some(),
            EntityKind::Age => self.person.age.is_some(),
            EntityKind::MaritalStatus => self.person.marital_status.is_some(),
            EntityKind::Children => self.person.children.is_some(),
            EntityKind::Rooms => self.person.rooms.is_some(),
            EntityKind::Bathrooms => self.person.bathrooms.is_some(),
            EntityKind::Area => self.person.area.is_some(),
            EntityKind::Direction => self.person.direction.is_some(),
            EntityKind::ProximityFacilities => !self.proximity_facilities.is_empty(),
            EntityKind::PreferredLocation => self.preferred_location.is_some(),
        }
    }

    pub fn kinds(&self) -> Vec<EntityKind> {
        EntityKind::ALL
            .into_iter()
            .filter(|kind| self.has(*kind))
            .collect()
    }

    pub fn neighborhood_name(&self) -> Option<&str> {
        self.neighborhood.as_ref().map(|m| m.name.as_str())
    }

    /// Distinct facility kinds asked for via "near X", in first-seen order.
    pub fn proximity_kinds(&self) -> Vec<FacilityKind> {
        let mut kinds = Vec::new();
        for facility in &self.proximity_facilities {
            if !kinds.contains(&facility.kind) {
                kinds.push(facility.kind);
            }
        }
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_lists_only_present_entities() {
        let mut entities = Entities::default();
        assert!(entities.kinds().is_empty());

        entities.budget = Some(8000);
        entities.person.age = Some(30);
        entities.proximity_facilities.push(ProximityFacility {
            kind: FacilityKind::School,
            raw_text: "مدرسه".into(),
        });
        assert_eq!(
            entities.kinds(),
            vec![EntityKind::Budget, EntityKind::Age, EntityKind::ProximityFacilities]
        );
    }

    #[test]
    fn proximity_kinds_are_distinct() {
        let mut entities = Entities::default();
        for (kind, text) in [
            (FacilityKind::Park, "حديقه"),
            (FacilityKind::School, "مدرسه"),
            (FacilityKind::Park, "منتزه"),
        ] {
            entities.proximity_facilities.push(ProximityFacility {
                kind,
                raw_text: text.into(),
            });
        }
        assert_eq!(
            entities.proximity_kinds(),
            vec![FacilityKind::Park, FacilityKind::School]
        );
    }

    #[test]
    fn serializes_without_empty_fields() {
        let entities = Entities {
            budget: Some(15000),
            ..Default::default()
        };
        let json = serde_json::to_value(&entities).unwrap();
        assert_eq!(json["budget"], 15000);
        assert!(json.get("neighborhood").is_none());
    }
}
