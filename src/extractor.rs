//! Entity extraction from normalized utterances.
//!
//! The extractor is an ordered list of rules. A rule is skipped once the
//! entity kind it produces has been filled by an earlier rule, so the first
//! successful group for a kind wins and later, more general groups cannot
//! overwrite it.

use crate::entities::{
    Entities, EntityKind, MentionContext, NeighborhoodMention, ProximityFacility,
};
use crate::gazetteer::Gazetteer;
use crate::normalize::{fold_letters, normalize};
use crate::vocab::{
    is_common_word, Direction, FacilityKind, MaritalStatus, PropertyType, TransactionType,
    PROXIMITY_PHRASES,
};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Arabic letters without punctuation or digits.
pub(crate) const LETTERS: &str = r"\x{0621}-\x{064A}\x{0671}-\x{06D3}";

/// Compiles a rule written in natural orthography.
pub(crate) fn rule_regex(source: &str) -> Regex {
    let folded = fold_letters(source).replace("{L}", LETTERS);
    Regex::new(&folded).unwrap_or_else(|err| panic!("invalid rule pattern {source:?}: {err}"))
}

fn rule_set(sources: &[&str]) -> Vec<Regex> {
    sources.iter().map(|s| rule_regex(s)).collect()
}

// --- Neighborhood pattern groups ---

const CLAUSE: &str = r"([{L}\s]+)";

static RECOMMENDATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    rule_set(&[
        &format!(r"اقترح (?:لي|علي) (?:حي|منطقة) {CLAUSE}"),
        &format!(r"(?:أبي|أبغى|أريد) (?:حي|منطقة) {CLAUSE}"),
        &format!(r"معلومات عن (?:حي|منطقة) {CLAUSE}"),
        &format!(r"أين (?:يقع|تقع|هو|هي) (?:حي|منطقة) {CLAUSE}"),
    ])
});

static GENERAL_INFO_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    rule_set(&[
        &format!(r"ما (?:هي|هو) (?:حي|منطقة) {CLAUSE}"),
        &format!(r"كيف (?:حي|منطقة) {CLAUSE}"),
    ])
});

static LIVING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    rule_set(&[
        &format!(r"(?:أسكن|أعيش|مقيم|ساكن) في (?:(?:حي|منطقة) )?{CLAUSE}"),
        &format!(r"(?:أفضل|أرغب) (?:السكن|العيش) في (?:(?:حي|منطقة) )?{CLAUSE}"),
        &format!(r"أبحث عن عقار في (?:(?:حي|منطقة) )?{CLAUSE}"),
        r"(?:حي|منطقة) ([{L}]+) (?:للسكن|مناسب|مناسبة|جيدة|جيد)",
    ])
});

static WORK_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    rule_set(&[
        &format!(r"(?:مكان عملي|أعمل|وظيفتي|دوامي) في (?:(?:حي|منطقة) )?{CLAUSE}"),
        &format!(r"(?:مقر العمل|مقر عملي|مكتبي|شركتي) في (?:(?:حي|منطقة) )?{CLAUSE}"),
    ])
});

// --- Facility questions ---

static FACILITY_QUESTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    const SPAN: &str = r"([{L}\s]+?)\s*(?:[?؟.،,]|\sفي\s|$)";
    rule_set(&[
        &format!(r"أين (?:توجد|يوجد|تقع|يقع) {SPAN}"),
        &format!(r"(?:موقع|مكان|عنوان) {SPAN}"),
        &format!(r"أبحث عن {SPAN}"),
        &format!(r"(?:دلني|دلوني|أرشدني) (?:على|عن|إلى) {SPAN}"),
    ])
});

const FACILITY_NAME_CHARS: std::ops::RangeInclusive<usize> = 3..=50;

// --- Budget ---

const NUMBER: &str = r"([0-9][0-9,٬]*(?:\.[0-9]+)?)";

static BUDGET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    rule_set(&[
        &format!(
            r"(?:الميزانية|ميزانيتي|ميزانية|بميزانية|بحدود|في حدود) (?:(?:قدرها|مقدارها|تبلغ|حوالي|تقريبا|هي|هو) )*{NUMBER}(?:\s*(?:ألف|مليون))?"
        ),
        &format!(
            r"(?:الراتب|راتبي|راتب|دخلي|الدخل|دخل) (?:(?:الشهري|قدره|حوالي|تقريبا|هو|يبلغ) )*{NUMBER}(?:\s*(?:ألف|مليون))?"
        ),
        &format!(r"{NUMBER}\s*(?:(?:ألف|مليون)(?:\s*ريال)?|ريال|ر\.س)"),
        &format!(r"{NUMBER}\s+(?:ميزانية|ميزانيتي)"),
        &format!(
            r"(?:أقصى|الأقصى) (?:سعر|حد|ميزانية) (?:(?:هو|هي) )?{NUMBER}(?:\s*(?:ألف|مليون))?"
        ),
    ])
});

static THOUSAND: Lazy<String> = Lazy::new(|| normalize("ألف"));
static MILLION: Lazy<String> = Lazy::new(|| normalize("مليون"));

// --- Person and housing ---

static AGE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    rule_set(&[
        r"عمري ([0-9]+)",
        r"أنا (?:في|ب|بعمر) ([0-9]+)",
        r"عندي ([0-9]+) (?:سنة|عام|سنين)",
        r"أنا ([0-9]+) (?:سنة|عام)",
    ])
});

static CHILDREN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    rule_regex(r"([0-9]+) (?:أولاد|أطفال|أبناء|طفل|ابن|ولد|عيال|بنات)")
});

static ROOMS_PATTERN: Lazy<Regex> = Lazy::new(|| rule_regex(r"([0-9]+) (?:غرف|غرفة)"));

static BATHROOMS_PATTERN: Lazy<Regex> =
    Lazy::new(|| rule_regex(r"([0-9]+) (?:حمامات|حمام|دورات مياه|دورة مياه)"));

static AREA_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    rule_set(&[
        r"(?:مساحة|مساحته|مساحتها) (?:[{L}]+ )?([0-9]+)",
        r"([0-9]+) (?:متر|م2|م٢)",
    ])
});

static FLOOR_PATTERN: Lazy<Regex> =
    Lazy::new(|| rule_regex(r"(?:الطابق|الدور) (?:ال)?(أرضي|[0-9]+)"));

static PROXIMITY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    PROXIMITY_PHRASES
        .iter()
        .map(|phrase| rule_regex(&format!(r"\b{}\s+([^.،,؟?]*)", regex::escape(phrase))))
        .collect()
});

static DIRECTION_PHRASES: Lazy<Vec<(Direction, Vec<String>)>> = Lazy::new(|| {
    Direction::ALL
        .into_iter()
        .map(|direction| {
            let phrases = direction
                .variants()
                .words()
                .iter()
                .flat_map(|v| {
                    [
                        format!("في {v}"),
                        normalize(&format!("منطقة {v}")),
                        normalize(&format!("{v} المدينة")),
                    ]
                })
                .collect();
            (direction, phrases)
        })
        .collect()
});

type Apply = fn(&EntityExtractor, &str, &mut Entities);

/// One step of the extraction battery.
pub struct ExtractionRule {
    pub kind: EntityKind,
    apply: Apply,
}

const fn step(kind: EntityKind, apply: Apply) -> ExtractionRule {
    ExtractionRule { kind, apply }
}

static RULES: [ExtractionRule; 15] = [
    step(EntityKind::Neighborhood, EntityExtractor::apply_neighborhood),
    step(EntityKind::FacilityName, EntityExtractor::apply_facility_question),
    step(EntityKind::FacilityType, EntityExtractor::apply_facility_type),
    step(EntityKind::Budget, EntityExtractor::apply_budget),
    step(EntityKind::PropertyType, EntityExtractor::apply_property_type),
    step(EntityKind::TransactionType, EntityExtractor::apply_transaction_type),
    step(EntityKind::Floor, EntityExtractor::apply_floor),
    step(EntityKind::Age, EntityExtractor::apply_age),
    step(EntityKind::MaritalStatus, EntityExtractor::apply_marital_status),
    step(EntityKind::Children, EntityExtractor::apply_children),
    step(EntityKind::Rooms, EntityExtractor::apply_rooms),
    step(EntityKind::Bathrooms, EntityExtractor::apply_bathrooms),
    step(EntityKind::Area, EntityExtractor::apply_area),
    step(EntityKind::Direction, EntityExtractor::apply_direction),
    step(EntityKind::ProximityFacilities, EntityExtractor::apply_proximity),
];

#[derive(Debug, Clone)]
pub struct EntityExtractor {
    gazetteer: Arc<Gazetteer>,
}

impl EntityExtractor {
    pub fn new(gazetteer: Arc<Gazetteer>) -> Self {
        Self { gazetteer }
    }

    pub fn gazetteer(&self) -> &Gazetteer {
        &self.gazetteer
    }

    pub fn rules() -> &'static [ExtractionRule] {
        &RULES
    }

    /// Runs the whole battery over `text`, normalizing it first.
    pub fn extract(&self, text: &str) -> Entities {
        let text = normalize(text);
        let mut entities = Entities::default();
        for rule in RULES.iter() {
            if entities.has(rule.kind) {
                debug!("{} already extracted, skipping rule", rule.kind);
                continue;
            }
            (rule.apply)(self, &text, &mut entities);
        }
        entities
    }

    // --- Neighborhood ---

    /// Resolves a captured clause: the longest leading run of up to three
    /// words that names a known neighborhood exactly, else a partial match
    /// on the first word.
    pub fn resolve_clause(&self, clause: &str) -> Option<String> {
        let words: Vec<&str> = clause.split_whitespace().collect();
        for n in (1..=words.len().min(3)).rev() {
            if let Some(name) = self.gazetteer.exact(&words[..n].join(" ")) {
                return Some(name.to_string());
            }
        }
        let first = words.first()?;
        if is_common_word(first) {
            debug!("captured span {:?} is a common word, not a neighborhood", first);
            return None;
        }
        self.gazetteer.resolve(first).map(str::to_string)
    }

    fn first_resolved(&self, patterns: &[Regex], text: &str) -> Option<String> {
        patterns
            .iter()
            .filter_map(|re| re.captures(text))
            .find_map(|caps| caps.get(1).and_then(|m| self.resolve_clause(m.as_str())))
    }

    /// The neighborhood named in the text together with the pattern family
    /// that found it. Workplace mentions are reported separately.
    pub fn neighborhood_mention(&self, text: &str) -> (Option<NeighborhoodMention>, Option<String>) {
        let groups: [(&[Regex], MentionContext); 3] = [
            (RECOMMENDATION_PATTERNS.as_slice(), MentionContext::Recommendation),
            (GENERAL_INFO_PATTERNS.as_slice(), MentionContext::GeneralInfo),
            (LIVING_PATTERNS.as_slice(), MentionContext::Living),
        ];
        for (patterns, context) in groups {
            if let Some(name) = self.first_resolved(patterns, text) {
                return (Some(NeighborhoodMention { name, context }), None);
            }
        }

        let workplace = self.first_resolved(&WORK_PATTERNS, text);
        let workplace_key = workplace.as_deref().map(Gazetteer::key_of);
        let mention = self
            .gazetteer
            .all_in(text)
            .into_iter()
            .find(|name| Some(Gazetteer::key_of(name)) != workplace_key)
            .map(|name| NeighborhoodMention {
                name: name.to_string(),
                context: MentionContext::Mention,
            });
        (mention, workplace)
    }

    fn apply_neighborhood(&self, text: &str, entities: &mut Entities) {
        let (mention, workplace) = self.neighborhood_mention(text);
        entities.neighborhood = mention;
        entities.workplace = workplace;
    }

    // --- Facilities ---

    /// A facility named in a "where is X" style question, with its type.
    pub fn facility_question(&self, text: &str) -> Option<(String, FacilityKind)> {
        for re in FACILITY_QUESTION_PATTERNS.iter() {
            let Some(span) = re.captures(text).and_then(|c| c.get(1)) else {
                continue;
            };
            let span = span.as_str().trim();
            if let Some(kind) = self.validate_facility_span(span) {
                return Some((span.to_string(), kind));
            }
        }
        None
    }

    fn validate_facility_span(&self, span: &str) -> Option<FacilityKind> {
        if !FACILITY_NAME_CHARS.contains(&span.chars().count()) {
            return None;
        }
        let first_word = span.split_whitespace().next().unwrap_or_default();
        if matches!(first_word, "حي" | "منطقه" | "احياء" | "الحي") {
            return None;
        }
        if self.gazetteer.mentions_any(span) {
            debug!("span {:?} names a neighborhood, not a facility", span);
            return None;
        }
        FacilityKind::score(span)
    }

    fn apply_facility_question(&self, text: &str, entities: &mut Entities) {
        if let Some((name, kind)) = self.facility_question(text) {
            entities.facility_name = Some(name);
            entities.facility_type = Some(kind);
        }
    }

    fn apply_facility_type(&self, text: &str, entities: &mut Entities) {
        entities.facility_type = FacilityKind::score(text);
    }

    /// "near X" phrases classified by facility keyword, then any facility
    /// keyword of a kind not yet captured.
    pub fn proximity_facilities(&self, text: &str) -> Vec<ProximityFacility> {
        let mut found = Vec::new();
        for re in PROXIMITY_PATTERNS.iter() {
            for caps in re.captures_iter(text) {
                let Some(raw) = caps.get(1).map(|m| m.as_str().trim()) else {
                    continue;
                };
                if let Some(kind) = FacilityKind::first_mentioned(raw) {
                    found.push(ProximityFacility {
                        kind,
                        raw_text: raw.to_string(),
                    });
                }
            }
        }
        for kind in FacilityKind::ALL {
            if found.iter().any(|f| f.kind == kind) {
                continue;
            }
            if let Some(keyword) = kind.keywords().first_in(text) {
                found.push(ProximityFacility {
                    kind,
                    raw_text: keyword.to_string(),
                });
            }
        }
        found
    }

    fn apply_proximity(&self, text: &str, entities: &mut Entities) {
        entities.proximity_facilities = self.proximity_facilities(text);
    }

    // --- Budget ---

    /// Amount in riyals, scaled by a trailing "ألف"/"مليون".
    pub fn budget(&self, text: &str) -> Option<u64> {
        let (matched, digits) = BUDGET_PATTERNS.iter().find_map(|re| {
            re.captures(text)
                .and_then(|c| Some((c.get(0)?.as_str(), c.get(1)?.as_str())))
        })?;
        let multiplier = if matched.contains(MILLION.as_str()) {
            1_000_000.0
        } else if matched.contains(THOUSAND.as_str()) {
            1_000.0
        } else {
            1.0
        };
        let cleaned: String = digits.chars().filter(|c| !matches!(c, ',' | '٬')).collect();
        match cleaned.parse::<f64>() {
            Ok(value) if value.is_finite() && value >= 0.0 => Some((value * multiplier).round() as u64),
            Ok(value) => {
                warn!("dropping out-of-range budget {}", value);
                None
            }
            Err(err) => {
                warn!("dropping unparseable budget {:?}: {}", digits, err);
                None
            }
        }
    }

    fn apply_budget(&self, text: &str, entities: &mut Entities) {
        entities.budget = self.budget(text);
    }

    // --- Housing ---

    fn apply_property_type(&self, text: &str, entities: &mut Entities) {
        entities.housing.property_type = PropertyType::detect(text);
    }

    fn apply_transaction_type(&self, text: &str, entities: &mut Entities) {
        entities.housing.transaction_type = TransactionType::detect(text);
    }

    fn apply_floor(&self, text: &str, entities: &mut Entities) {
        entities.housing.floor = FLOOR_PATTERN
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| match m.as_str() {
                "ارضي" => Some(0),
                digits => parse_count(digits, "floor"),
            });
    }

    // --- Person ---

    fn apply_age(&self, text: &str, entities: &mut Entities) {
        entities.person.age = first_number(&AGE_PATTERNS, text, "age");
    }

    fn apply_marital_status(&self, text: &str, entities: &mut Entities) {
        entities.person.marital_status = MaritalStatus::detect(text);
    }

    fn apply_children(&self, text: &str, entities: &mut Entities) {
        entities.person.children = first_number(std::slice::from_ref(&*CHILDREN_PATTERN), text, "children");
    }

    fn apply_rooms(&self, text: &str, entities: &mut Entities) {
        entities.person.rooms = first_number(std::slice::from_ref(&*ROOMS_PATTERN), text, "rooms");
    }

    fn apply_bathrooms(&self, text: &str, entities: &mut Entities) {
        entities.person.bathrooms =
            first_number(std::slice::from_ref(&*BATHROOMS_PATTERN), text, "bathrooms");
    }

    fn apply_area(&self, text: &str, entities: &mut Entities) {
        entities.person.area = first_number(&AREA_PATTERNS, text, "area");
    }

    fn apply_direction(&self, text: &str, entities: &mut Entities) {
        entities.person.direction = DIRECTION_PHRASES
            .iter()
            .find(|(_, phrases)| phrases.iter().any(|p| text.contains(p.as_str())))
            .map(|(direction, _)| *direction);
    }
}

fn first_number(patterns: &[Regex], text: &str, what: &str) -> Option<u32> {
    let digits = patterns
        .iter()
        .find_map(|re| re.captures(text).and_then(|c| c.get(1)))?;
    parse_count(digits.as_str(), what)
}

fn parse_count(digits: &str, what: &str) -> Option<u32> {
    match digits.parse::<u32>() {
        Ok(n) => Some(n),
        Err(err) => {
            warn!("dropping {} value {:?}: {}", what, digits, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::Direction;

    fn extractor() -> EntityExtractor {
        EntityExtractor::new(Arc::new(Gazetteer::new([
            "النرجس",
            "الياسمين",
            "الملقا",
            "حي العليا",
            "الملك فهد",
        ])))
    }

    #[test]
    fn budget_with_thousands_separator() {
        let e = extractor();
        assert_eq!(e.extract("راتبي 15,000").budget, Some(15000));
    }

    #[test]
    fn budget_with_million_unit() {
        let e = extractor();
        assert_eq!(e.extract("ميزانيتي 2 مليون").budget, Some(2_000_000));
    }

    #[test]
    fn budget_from_currency_and_thousand() {
        let e = extractor();
        assert_eq!(e.extract("أبحث عن شقة بـ 800 ألف ريال").budget, Some(800_000));
        assert_eq!(e.extract("السعر ٣٥٠٠ ريال").budget, Some(3500));
        assert_eq!(e.extract("ابحث عن حي يناسب راتب 8000").budget, Some(8000));
    }

    #[test]
    fn budget_absent_without_currency_context() {
        let e = extractor();
        assert_eq!(e.extract("عندي 3 أطفال").budget, None);
    }

    #[test]
    fn facility_location_question() {
        let e = extractor();
        let entities = e.extract("اين توجد مدرسة النور");
        assert_eq!(entities.facility_type, Some(FacilityKind::School));
        assert!(entities.facility_name.unwrap().contains("النور"));
    }

    #[test]
    fn facility_question_stops_at_preposition() {
        let e = extractor();
        let (name, kind) = e
            .facility_question(&normalize("أين يقع مستشفى الحبيب في الرياض؟"))
            .unwrap();
        assert_eq!(name, "مستشفي الحبيب");
        assert_eq!(kind, FacilityKind::Hospital);
    }

    #[test]
    fn neighborhood_is_not_a_facility_name() {
        let e = extractor();
        assert!(e.facility_question(&normalize("اين يقع حي الملقا")).is_none());
        assert!(e.facility_question(&normalize("اين توجد مدرسة الملقا")).is_none());
    }

    #[test]
    fn living_pattern_beats_work_pattern() {
        let e = extractor();
        let entities = e.extract("أعمل في العليا وأسكن في الياسمين");
        let mention = entities.neighborhood.unwrap();
        assert_eq!(mention.name, "الياسمين");
        assert_eq!(mention.context, MentionContext::Living);
    }

    #[test]
    fn workplace_is_not_a_residence() {
        let e = extractor();
        let entities = e.extract("أعمل في حي العليا وأريد سكن قريب من مدرسة");
        assert_eq!(entities.workplace.as_deref(), Some("العليا"));
        assert!(entities.neighborhood.is_none());
    }

    #[test]
    fn recommendation_mention_resolves_multiword_names() {
        let e = extractor();
        let entities = e.extract("معلومات عن حي الملك فهد");
        let mention = entities.neighborhood.unwrap();
        assert_eq!(mention.name, "الملك فهد");
        assert_eq!(mention.context, MentionContext::Recommendation);
    }

    #[test]
    fn bare_mention_falls_back() {
        let e = extractor();
        let mention = e.extract("كم أسعار الشقق بالنرجس").neighborhood.unwrap();
        assert_eq!(mention.name, "النرجس");
        assert_eq!(mention.context, MentionContext::Mention);
    }

    #[test]
    fn person_attributes() {
        let e = extractor();
        let entities = e.extract("عمري 35 سنة متزوج ولدي 3 أطفال وأحتاج 4 غرف و2 حمامات في الشمال");
        assert_eq!(entities.person.age, Some(35));
        assert_eq!(entities.person.marital_status, Some(MaritalStatus::Married));
        assert_eq!(entities.person.children, Some(3));
        assert_eq!(entities.person.rooms, Some(4));
        assert_eq!(entities.person.bathrooms, Some(2));
        assert_eq!(entities.person.direction, Some(Direction::North));
        assert_eq!(entities.person.attribute_count(), 6);
    }

    #[test]
    fn housing_keywords() {
        let e = extractor();
        let entities = e.extract("أريد شقة للإيجار في الدور الأرضي");
        assert_eq!(entities.housing.property_type, Some(PropertyType::Apartment));
        assert_eq!(entities.housing.transaction_type, Some(TransactionType::Rent));
        assert_eq!(entities.housing.floor, Some(0));
    }

    #[test]
    fn proximity_phrases_then_keywords() {
        let e = extractor();
        let found = e.proximity_facilities(&normalize("أبحث عن شقة قريبة من مدرسة وفيها حديقة"));
        assert_eq!(found[0].kind, FacilityKind::School);
        assert!(found[0].raw_text.starts_with("مدرسه"));
        assert!(found.iter().any(|f| f.kind == FacilityKind::Park));
        assert_eq!(
            found.iter().filter(|f| f.kind == FacilityKind::School).count(),
            1
        );
    }

    #[test]
    fn proximity_phrases_are_not_deduplicated() {
        let e = extractor();
        let found = e.proximity_facilities(&normalize("بيت بجوار مستشفى"));
        assert!(found.iter().any(|f| f.kind == FacilityKind::Hospital));
    }

    #[test]
    fn extraction_is_deterministic() {
        let e = extractor();
        let text = "أبحث عن فيلا للبيع بميزانية 3 مليون قريبة من مول";
        assert_eq!(e.extract(text), e.extract(text));
    }

    #[test]
    fn rule_order_starts_with_neighborhood() {
        let kinds: Vec<_> = EntityExtractor::rules().iter().map(|r| r.kind).collect();
        assert_eq!(kinds[0], EntityKind::Neighborhood);
        assert_eq!(kinds.last(), Some(&EntityKind::ProximityFacilities));
    }
}
