//! Intent classification.
//!
//! A query type is chosen by walking a fixed, ordered rule table; the first
//! rule that fires decides. Specific directive patterns sit at the top and
//! general keyword tests at the bottom, so the general rules never shadow
//! the specific ones.

use crate::entities::{Entities, MentionContext, ProximityFacility};
use crate::extractor::{rule_regex, EntityExtractor};
use crate::normalize::{normalize, token_count};
use crate::vocab::{
    any_transaction_keyword, FacilityKind, PropertyType, FACILITY_NOUNS, HOUSING_NOUNS,
    HOUSING_TRIGGERS, RECOMMENDATION_TRIGGERS,
};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

pub const RANKING_DISCLAIMER: &str = "لا يوجد حي يمكن تصنيفه على أنه الأفضل أو الأسوأ بشكل عام، فاختيار الحي يعتمد بشكل كبير على تفضيلاتك واحتياجاتك الشخصية. كل حي يتمتع بمميزاته الخاصة التي قد تتناسب مع البعض ولا تتناسب مع الآخرين. قد تجد أن بعض الأحياء تتميز بالقرب من المدارس أو المرافق العامة، بينما قد تكون أحياء أخرى مثالية للعائلات التي تبحث عن بيئة هادئة. من المهم أن تأخذ في اعتبارك ما الذي تبحث عنه في الحي مثل الموقع، الخدمات، الأسعار، والأجواء العامة قبل اتخاذ قرارك.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    NeighborhoodRecommendation,
    NeighborhoodInfo,
    NeighborhoodFacilities,
    FacilityLocation,
    FacilitySearch,
    HousingSearch,
    Unknown,
}

impl QueryType {
    pub fn label(self) -> &'static str {
        match self {
            QueryType::NeighborhoodRecommendation => "neighborhood_recommendation",
            QueryType::NeighborhoodInfo => "neighborhood_info",
            QueryType::NeighborhoodFacilities => "neighborhood_facilities",
            QueryType::FacilityLocation => "facility_location",
            QueryType::FacilitySearch => "facility_search",
            QueryType::HousingSearch => "housing_search",
            QueryType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Downstream behaviours an utterance asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    NeighborhoodRecommendation,
    NeighborhoodInfo,
    NeighborhoodFacilities,
    FacilitySearch,
    HousingSearch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryAnalysis {
    pub query_type: QueryType,
    pub entities: Entities,
    pub intents: BTreeSet<Intent>,
    /// Name of the rule that decided the query type.
    pub rule: &'static str,
}

impl QueryAnalysis {
    fn new(query_type: QueryType, entities: Entities, rule: &'static str) -> Self {
        let mut intents = BTreeSet::new();
        let primary = match query_type {
            QueryType::NeighborhoodRecommendation => Some(Intent::NeighborhoodRecommendation),
            QueryType::NeighborhoodInfo => Some(Intent::NeighborhoodInfo),
            QueryType::NeighborhoodFacilities => Some(Intent::NeighborhoodFacilities),
            QueryType::FacilityLocation | QueryType::FacilitySearch => Some(Intent::FacilitySearch),
            QueryType::HousingSearch => Some(Intent::HousingSearch),
            QueryType::Unknown => None,
        };
        intents.extend(primary);
        let wants_nearby = matches!(
            query_type,
            QueryType::NeighborhoodRecommendation | QueryType::HousingSearch
        ) && !entities.proximity_facilities.is_empty();
        if wants_nearby {
            intents.insert(Intent::FacilitySearch);
        }
        Self {
            query_type,
            entities,
            intents,
            rule,
        }
    }
}

// --- Rule patterns ---

static DIRECTIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"دلني على حي قريب من [{L}]+",
        r"دلني على حي [{L}]+",
        r"أرشدني إلى حي [{L}]+",
        r"أقترح لي حي [{L}]+",
    ]
    .iter()
    .map(|p| rule_regex(p))
    .collect()
});

static DIRECTIVE_LOCATION: Lazy<Regex> =
    Lazy::new(|| rule_regex(r"(?:قريب|بالقرب) من (?:منطقة )?([{L}]+)"));

static DIRECTIVE_FACILITIES: Lazy<Regex> =
    Lazy::new(|| rule_regex(r"(?:وفيه|يوجد فيه|فيه|فيها) ([{L}\s]+)"));

static PROPERTIES_PATTERN: Lazy<Regex> = Lazy::new(|| {
    rule_regex(r"(?:اقترح (?:لي|علي)|أريد|أبحث عن) حي (?:فيه|فيها|به|بها) ([{L}\s]+)")
});

static HOUSING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"أبحث عن (?:سكن|شقة|فيلا|بيت|منزل|عقار)",
        r"(?:أريد|أبغى) (?:سكن|شقة|فيلا|بيت|منزل|عقار)",
        r"(?:أبحث عن|أريد|أبغى) مكان للسكن",
    ]
    .iter()
    .map(|p| rule_regex(p))
    .collect()
});

const SHORT_QUERY_TOKENS: usize = 5;
const PERSONAL_ATTRIBUTES_FOR_RECOMMENDATION: usize = 2;

// --- Rule table ---

type Apply = fn(&IntentClassifier, &str, &Entities) -> Option<(QueryType, Entities)>;

/// A named step of the classification cascade.
pub struct ClassifierRule {
    pub name: &'static str,
    apply: Apply,
}

static RULES: [ClassifierRule; 9] = [
    ClassifierRule {
        name: "directive",
        apply: IntentClassifier::directive,
    },
    ClassifierRule {
        name: "neighborhood_with_properties",
        apply: IntentClassifier::neighborhood_with_properties,
    },
    ClassifierRule {
        name: "housing_search",
        apply: IntentClassifier::housing_search,
    },
    ClassifierRule {
        name: "facility_location",
        apply: IntentClassifier::facility_location,
    },
    ClassifierRule {
        name: "short_facility_query",
        apply: IntentClassifier::short_facility_query,
    },
    ClassifierRule {
        name: "neighborhood_info",
        apply: IntentClassifier::neighborhood_info,
    },
    ClassifierRule {
        name: "recommendation_keyword",
        apply: IntentClassifier::recommendation_keyword,
    },
    ClassifierRule {
        name: "neighborhood_facilities",
        apply: IntentClassifier::neighborhood_facilities,
    },
    ClassifierRule {
        name: "personal_profile",
        apply: IntentClassifier::personal_profile,
    },
];

#[derive(Debug, Clone)]
pub struct IntentClassifier {
    extractor: EntityExtractor,
}

impl IntentClassifier {
    pub fn new(extractor: EntityExtractor) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &EntityExtractor {
        &self.extractor
    }

    /// Rule names in evaluation order; "unknown" is implied after the last.
    pub fn rule_names() -> Vec<&'static str> {
        RULES.iter().map(|r| r.name).collect()
    }

    /// Extracts entities and classifies in one call.
    pub fn analyze(&self, text: &str) -> QueryAnalysis {
        let entities = self.extractor.extract(text);
        self.classify(text, &entities)
    }

    pub fn classify(&self, text: &str, entities: &Entities) -> QueryAnalysis {
        let text = normalize(text);
        let text = text.trim();
        for rule in RULES.iter() {
            if let Some((query_type, entities)) = (rule.apply)(self, text, entities) {
                info!("query classified as {} by rule {}", query_type, rule.name);
                return QueryAnalysis::new(query_type, entities, rule.name);
            }
        }
        debug!("no classification rule matched {:?}", text);
        QueryAnalysis::new(QueryType::Unknown, entities.clone(), "unknown")
    }

    // Rule 1: "دلني على حي ..." with optional location and facility clauses.
    fn directive(&self, text: &str, entities: &Entities) -> Option<(QueryType, Entities)> {
        if !DIRECTIVE_PATTERNS.iter().any(|re| re.is_match(text)) {
            return None;
        }
        let mut entities = entities.clone();
        if let Some(place) = DIRECTIVE_LOCATION.captures(text).and_then(|c| c.get(1)) {
            entities.location_preference = true;
            entities.preferred_location = Some(place.as_str().to_string());
        }
        if let Some(clause) = DIRECTIVE_FACILITIES.captures(text).and_then(|c| c.get(1)) {
            let clause = clause.as_str().trim();
            entities.facilities_text = Some(clause.to_string());
            if let Some(kind) = FacilityKind::first_mentioned(clause) {
                entities.facility_type = Some(kind);
            }
        }
        Some((QueryType::NeighborhoodRecommendation, entities))
    }

    // Rule 2: "اقترح لي حي فيه ..." where the clause lists wanted facilities.
    fn neighborhood_with_properties(
        &self,
        text: &str,
        entities: &Entities,
    ) -> Option<(QueryType, Entities)> {
        let clause = PROPERTIES_PATTERN.captures(text)?.get(1)?.as_str().trim();
        let mut entities = entities.clone();
        entities.proximity_facilities = FacilityKind::first_mentioned(clause)
            .map(|kind| ProximityFacility {
                kind,
                raw_text: clause.to_string(),
            })
            .into_iter()
            .collect();
        Some((QueryType::NeighborhoodRecommendation, entities))
    }

    // Rule 3
    fn housing_search(&self, text: &str, entities: &Entities) -> Option<(QueryType, Entities)> {
        let by_keywords = HOUSING_TRIGGERS.any_in(text)
            && (PropertyType::detect(text).is_some()
                || any_transaction_keyword(text)
                || HOUSING_NOUNS.any_in(text));
        if by_keywords || HOUSING_PATTERNS.iter().any(|re| re.is_match(text)) {
            Some((QueryType::HousingSearch, entities.clone()))
        } else {
            None
        }
    }

    // Rule 4
    fn facility_location(&self, _text: &str, entities: &Entities) -> Option<(QueryType, Entities)> {
        entities.facility_name.as_ref()?;
        entities.facility_type?;
        Some((QueryType::FacilityLocation, entities.clone()))
    }

    // Rule 5
    fn short_facility_query(
        &self,
        text: &str,
        entities: &Entities,
    ) -> Option<(QueryType, Entities)> {
        if token_count(text) > SHORT_QUERY_TOKENS || text.contains('\n') {
            return None;
        }
        let kind = FacilityKind::score(text)?;
        let mut entities = entities.clone();
        entities.facility_type = Some(kind);
        entities.facility_name = Some(text.to_string());
        Some((QueryType::FacilitySearch, entities))
    }

    // Rule 6
    fn neighborhood_info(&self, _text: &str, entities: &Entities) -> Option<(QueryType, Entities)> {
        let mention = entities.neighborhood.as_ref()?;
        (mention.context == MentionContext::Recommendation)
            .then(|| (QueryType::NeighborhoodInfo, entities.clone()))
    }

    // Rule 7
    fn recommendation_keyword(
        &self,
        text: &str,
        entities: &Entities,
    ) -> Option<(QueryType, Entities)> {
        RECOMMENDATION_TRIGGERS
            .any_in(text)
            .then(|| (QueryType::NeighborhoodRecommendation, entities.clone()))
    }

    // Rule 8
    fn neighborhood_facilities(
        &self,
        text: &str,
        entities: &Entities,
    ) -> Option<(QueryType, Entities)> {
        (FACILITY_NOUNS.any_in(text) && entities.neighborhood.is_some())
            .then(|| (QueryType::NeighborhoodFacilities, entities.clone()))
    }

    // Rule 9
    fn personal_profile(&self, _text: &str, entities: &Entities) -> Option<(QueryType, Entities)> {
        (entities.person.attribute_count() >= PERSONAL_ATTRIBUTES_FOR_RECOMMENDATION)
            .then(|| (QueryType::NeighborhoodRecommendation, entities.clone()))
    }
}

// --- Best/worst pre-pass ---

const END: &str = r"(?:[?؟]|$|\s)";

static RANKING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        format!(r"^(?:ما|ايش|وش|وين) (?:هو )?(?:أفضل|أحسن) (?:حي|منطقة|الأحياء){END}"),
        format!(r"^(?:ما|ايش|وش|وين) (?:هي )?(?:أفضل|أحسن) (?:أحياء|الأحياء|المناطق|مناطق){END}"),
        format!(r"^(?:أفضل|أحسن) (?:حي|منطقة){END}"),
        format!(r"^(?:ما|ايش|وش|وين) (?:هو )?(?:أسوأ|اسوء|أسوا) (?:حي|منطقة|الأحياء){END}"),
        format!(r"^(?:ما|ايش|وش|وين) (?:هي )?(?:أسوأ|اسوء|أسوا) (?:أحياء|الأحياء|المناطق|مناطق){END}"),
        format!(r"^(?:أسوأ|اسوء|أسوا|أردأ|اردء) (?:حي|منطقة){END}"),
        format!(r"^أقترح (?:(?:لي|علي) )?أفضل (?:حي|منطقة|الأحياء){END}"),
        format!(r"^أخبرني عن أفضل (?:حي|منطقة|الأحياء){END}"),
        format!(r"^(?:أبغى|أبي) أفضل حي{END}"),
    ]
    .iter()
    .map(|p| rule_regex(p))
    .collect()
});

static PERSONAL_CONTEXT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"أقترح لي حي بناء على",
        r"أفضل حي لي",
        r"أفضل حي يناسبني",
        r"ماهو أفضل حي لي",
        r"أنا عمري [0-9]+ سنة",
        r"عائلة لديها",
        r"أبحث عن أفضل حي",
    ]
    .iter()
    .map(|p| rule_regex(p))
    .collect()
});

static CRITERIA_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"أفضل حي لل[{L}]+",
        r"أفضل منطقة لل[{L}]+",
        r"أفضل حي من ناحية ال[{L}]+",
        r"أفضل حي من حيث ال[{L}]+",
        r"أفضل الأحياء (?:من|في|ب|ل)[{L}]*",
        r"أفضل حي (?:قريب|بالقرب) من",
        r"أفضل حي (?:فيه|يوجد فيه|به|يوجد به)",
        r"أفضل حي (?:بسعر|بمتوسط سعر)",
    ]
    .iter()
    .map(|p| rule_regex(p))
    .collect()
});

/// The neutral answer to "what is the best/worst neighborhood" when the
/// question carries no personal context or specific criterion.
pub fn ranking_disclaimer(text: &str) -> Option<&'static str> {
    let text = normalize(text);
    let text = text.trim();
    if PERSONAL_CONTEXT_PATTERNS.iter().any(|re| re.is_match(text)) {
        debug!("ranking question carries personal context");
        return None;
    }
    if CRITERIA_PATTERNS.iter().any(|re| re.is_match(text)) {
        debug!("ranking question carries a specific criterion");
        return None;
    }
    RANKING_PATTERNS
        .iter()
        .any(|re| re.is_match(text))
        .then_some(RANKING_DISCLAIMER)
}

// --- Show-all requests ---

/// "اعرض جميع المدارس في حي ..." style requests. `kind` is `None` for
/// facilities of every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowAll {
    pub kind: Option<FacilityKind>,
}

static SHOW_ALL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    rule_regex(r"(?:اعرض|ما هي|أرني|أريد) (?:جميع|كل) ([{L}\s]+?) في (?:حي )?[{L}]+")
});

static ALL_FACILITIES_WORDS: Lazy<Vec<String>> =
    Lazy::new(|| ["المرافق", "الخدمات"].iter().map(|w| normalize(w)).collect());

pub fn show_all_request(text: &str) -> Option<ShowAll> {
    let text = normalize(text);
    let subject = SHOW_ALL_PATTERN.captures(&text)?.get(1)?.as_str().trim().to_string();
    if ALL_FACILITIES_WORDS.iter().any(|w| subject.contains(w.as_str())) {
        return Some(ShowAll { kind: None });
    }
    FacilityKind::score(&subject).map(|kind| ShowAll { kind: Some(kind) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gazetteer::Gazetteer;
    use std::sync::Arc;

    fn classifier() -> IntentClassifier {
        let gazetteer = Arc::new(Gazetteer::new([
            "النرجس", "الياسمين", "الملقا", "حطين", "العليا",
        ]));
        IntentClassifier::new(EntityExtractor::new(gazetteer))
    }

    #[test]
    fn facility_location_question() {
        let analysis = classifier().analyze("اين توجد مدرسة النور");
        assert_eq!(analysis.query_type, QueryType::FacilityLocation);
        assert_eq!(analysis.entities.facility_type, Some(FacilityKind::School));
        assert!(analysis.entities.facility_name.as_deref().unwrap().contains("النور"));
        assert!(analysis.intents.contains(&Intent::FacilitySearch));
    }

    #[test]
    fn directive_with_location_and_facility() {
        let analysis = classifier().analyze("دلني على حي قريب من الملقا وفيه مدارس");
        assert_eq!(analysis.query_type, QueryType::NeighborhoodRecommendation);
        assert_eq!(analysis.rule, "directive");
        assert!(analysis.entities.location_preference);
        assert_eq!(analysis.entities.preferred_location.as_deref(), Some("الملقا"));
        assert_eq!(analysis.entities.facility_type, Some(FacilityKind::School));
    }

    #[test]
    fn neighborhood_with_properties_builds_proximity() {
        let analysis = classifier().analyze("أريد حي فيه حدائق");
        assert_eq!(analysis.query_type, QueryType::NeighborhoodRecommendation);
        assert_eq!(analysis.rule, "neighborhood_with_properties");
        assert_eq!(analysis.entities.proximity_facilities.len(), 1);
        assert_eq!(analysis.entities.proximity_facilities[0].kind, FacilityKind::Park);
        assert!(analysis.intents.contains(&Intent::FacilitySearch));
    }

    #[test]
    fn housing_search_needs_trigger_and_noun() {
        let c = classifier();
        let analysis = c.analyze("أبحث عن شقة للإيجار بميزانية 40 ألف");
        assert_eq!(analysis.query_type, QueryType::HousingSearch);
        assert_eq!(analysis.entities.budget, Some(40_000));
        assert_ne!(c.analyze("أبحث عن مدرسة النور").query_type, QueryType::HousingSearch);
    }

    #[test]
    fn short_facility_query() {
        let analysis = classifier().analyze("مستشفيات قريبة");
        assert_eq!(analysis.query_type, QueryType::FacilitySearch);
        assert_eq!(analysis.entities.facility_type, Some(FacilityKind::Hospital));
    }

    #[test]
    fn multi_line_message_is_not_a_short_facility_query() {
        let c = classifier();
        assert_eq!(c.analyze("مستشفيات قريبة").rule, "short_facility_query");

        let analysis = c.analyze("مستشفيات\nقريبة");
        assert_ne!(analysis.rule, "short_facility_query");
        assert_ne!(analysis.query_type, QueryType::FacilitySearch);
    }

    #[test]
    fn neighborhood_info_from_recommendation_context() {
        let analysis = classifier().analyze("معلومات عن حي النرجس من فضلك لو سمحت اليوم");
        assert_eq!(analysis.query_type, QueryType::NeighborhoodInfo);
        assert_eq!(analysis.entities.neighborhood_name(), Some("النرجس"));
    }

    #[test]
    fn recommendation_keyword_keeps_budget() {
        let analysis = classifier().analyze("ابحث عن حي يناسب راتب 8000");
        assert_eq!(analysis.query_type, QueryType::NeighborhoodRecommendation);
        assert_eq!(analysis.entities.budget, Some(8000));
    }

    #[test]
    fn neighborhood_facilities_needs_a_mention() {
        let c = classifier();
        let analysis = c.analyze("هل تتوفر خدمات ومرافق جيدة في حي حطين للعائلات الكبيرة");
        assert_eq!(analysis.query_type, QueryType::NeighborhoodFacilities);
        assert_eq!(analysis.entities.neighborhood_name(), Some("حطين"));
    }

    #[test]
    fn personal_profile_implies_recommendation() {
        let analysis = classifier().analyze("عمري 30 سنة ومتزوج ولدي طفلين");
        assert_eq!(analysis.query_type, QueryType::NeighborhoodRecommendation);
        assert_eq!(analysis.rule, "personal_profile");
    }

    #[test]
    fn unknown_otherwise() {
        let analysis = classifier().analyze("كيف حالك اليوم");
        assert_eq!(analysis.query_type, QueryType::Unknown);
        assert!(analysis.intents.is_empty());
    }

    #[test]
    fn classify_is_pure() {
        let c = classifier();
        let text = "اقترح لي حي مناسب لعائلة";
        let entities = c.extractor().extract(text);
        assert_eq!(c.classify(text, &entities), c.classify(text, &entities));
    }

    #[test]
    fn rule_order_is_inspectable() {
        let names = IntentClassifier::rule_names();
        assert_eq!(names.first(), Some(&"directive"));
        assert_eq!(names.last(), Some(&"personal_profile"));
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn general_ranking_question_gets_disclaimer() {
        assert_eq!(ranking_disclaimer("ما هو أفضل حي؟"), Some(RANKING_DISCLAIMER));
        assert_eq!(ranking_disclaimer("اسوء حي"), Some(RANKING_DISCLAIMER));
        assert_eq!(ranking_disclaimer("وش افضل حي"), Some(RANKING_DISCLAIMER));
    }

    #[test]
    fn ranking_with_criteria_or_context_is_classified_normally() {
        assert_eq!(ranking_disclaimer("ما هو أفضل حي للعائلات؟"), None);
        assert_eq!(ranking_disclaimer("أفضل حي قريب من الجامعة"), None);
        assert_eq!(ranking_disclaimer("ما هو أفضل حي لي"), None);
        assert_eq!(ranking_disclaimer("اقترح لي حي في الشمال"), None);
    }

    #[test]
    fn show_all_requests() {
        assert_eq!(
            show_all_request("اعرض جميع المدارس في حي الياسمين"),
            Some(ShowAll {
                kind: Some(FacilityKind::School)
            })
        );
        assert_eq!(
            show_all_request("ما هي كل المرافق في النرجس"),
            Some(ShowAll { kind: None })
        );
        assert_eq!(show_all_request("اعرض المدارس"), None);
    }
}
