//! Case-based neighborhood recommendation and income-tier matching.

use crate::error::{CollaboratorError, DataShapeError};
use crate::extractor::{rule_regex, EntityExtractor};
use crate::gazetteer::Gazetteer;
use crate::normalize::{normalize, strip_district_prefix};
use crate::settings::EngineSettings;
use crate::similarity::{call_with_timeout, ScoredCase, SimilarityResponder};
use crate::store::{CaseCorpus, NeighborhoodRecord, NeighborhoodStore};
use crate::vocab::is_common_word;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const MIN_EXPLICIT_CHARS: usize = 3;

pub const PRICE_FIELDS: [&str; 4] = ["price_level", "مستوى_السعر", "price_comparison", "مقارنة_الأسعار"];

// --- Explicit requests ---

const SPAN: &str = r"([{L}\s]+?)(?:\.|$|\s)";

static EXPLICIT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"اقترح (?:لي|علي) (?:حي|منطقة) ",
        r"اقتراح (?:حي|منطقة) ",
        r"(?:أبي|أبغى|أريد) (?:حي|منطقة) ",
        r"معلومات عن (?:حي|منطقة) ",
        r"(?:ساكن|أسكن) في (?:حي|منطقة) ",
        r"أفضل (?:حي|منطقة) ",
    ]
    .iter()
    .map(|prefix| rule_regex(&format!("{}{}", prefix, SPAN)))
    .collect()
});

static LAST_LINE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        rule_regex(&format!("(?:حي|منطقة) {}", SPAN)),
        rule_regex(r"^([{L}\s]+?)$"),
    ]
});

/// "حي فيه مدارس": a request for a kind of neighborhood, not a named one.
static FACILITY_REQUEST_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"اقترح (?:لي|علي) حي (?:فيه|فيها|به|بها) ",
        r"أريد حي (?:فيه|فيها|به|بها) ",
        r"ابحث عن حي (?:فيه|فيها|به|بها) ",
    ]
    .iter()
    .map(|p| rule_regex(p))
    .collect()
});

// --- Income tiers ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IncomeTier {
    Low,
    LowMid,
    Mid,
    MidHigh,
    High,
}

impl IncomeTier {
    pub const ALL: [IncomeTier; 5] = [
        IncomeTier::Low,
        IncomeTier::LowMid,
        IncomeTier::Mid,
        IncomeTier::MidHigh,
        IncomeTier::High,
    ];

    /// Monthly income in riyals to tier.
    pub fn from_income(income: u64) -> Self {
        match income {
            0..=4_999 => IncomeTier::Low,
            5_000..=9_999 => IncomeTier::LowMid,
            10_000..=14_999 => IncomeTier::Mid,
            15_000..=24_999 => IncomeTier::MidHigh,
            _ => IncomeTier::High,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            IncomeTier::Low => "low",
            IncomeTier::LowMid => "low-mid",
            IncomeTier::Mid => "mid",
            IncomeTier::MidHigh => "mid-high",
            IncomeTier::High => "high",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IncomeTier::Low => "منخفض",
            IncomeTier::LowMid => "منخفض إلى متوسط",
            IncomeTier::Mid => "متوسط",
            IncomeTier::MidHigh => "متوسط إلى مرتفع",
            IncomeTier::High => "مرتفع",
        }
    }

    pub fn cheaper(self) -> Option<Self> {
        match self {
            IncomeTier::Low => None,
            IncomeTier::LowMid => Some(IncomeTier::Low),
            IncomeTier::Mid => Some(IncomeTier::LowMid),
            IncomeTier::MidHigh => Some(IncomeTier::Mid),
            IncomeTier::High => Some(IncomeTier::MidHigh),
        }
    }

    /// A neighborhood priced at `level` fits this tier when it is the same
    /// tier or the next cheaper one.
    pub fn accepts(self, level: IncomeTier) -> bool {
        level == self || Some(level) == self.cheaper()
    }

    /// Reads a stored price level. Accepts the tier keys, their Arabic
    /// equivalents and a 1 to 5 scale.
    pub fn parse_level(value: &str) -> Option<Self> {
        let folded = normalize(value).replace(['_', '-'], " ");
        let value = folded.split_whitespace().collect::<Vec<_>>().join(" ");
        let tier = match value.as_str() {
            "low mid" | "lower mid" | "منخفض متوسط" | "متوسط منخفض" | "منخفض الي متوسط"
            | "دون المتوسط" | "2" => IncomeTier::LowMid,
            "mid high" | "upper mid" | "متوسط مرتفع" | "مرتفع متوسط" | "متوسط الي مرتفع"
            | "فوق المتوسط" | "4" => IncomeTier::MidHigh,
            "low" | "cheap" | "منخفض" | "منخفضه" | "رخيص" | "اقتصادي" | "1" => IncomeTier::Low,
            "mid" | "medium" | "middle" | "متوسط" | "متوسطه" | "3" => IncomeTier::Mid,
            "high" | "expensive" | "مرتفع" | "مرتفعه" | "عالي" | "عاليه" | "غالي" | "5" => {
                IncomeTier::High
            }
            _ => return None,
        };
        Some(tier)
    }
}

impl fmt::Display for IncomeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The price tier a neighborhood record declares.
pub fn price_tier(record: &NeighborhoodRecord) -> Result<IncomeTier, DataShapeError> {
    let (field, value) = record
        .first_text(&PRICE_FIELDS)
        .ok_or_else(|| DataShapeError::MissingField {
            record: record.name.clone(),
            field: PRICE_FIELDS[0].to_string(),
        })?;
    IncomeTier::parse_level(&value).ok_or(DataShapeError::InvalidValue {
        record: record.name.clone(),
        field,
        value,
    })
}

// --- Results ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecommendationSource {
    Explicit,
    SimilarCase { case_id: u64, score: f32 },
    Retrieved,
    MessageMention,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub neighborhood: String,
    pub source: RecommendationSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetRecommendation {
    pub tier: IncomeTier,
    pub neighborhoods: Vec<String>,
    /// True when no record matched the tier and the names are a random sample.
    pub sampled: bool,
}

// --- Engine ---

pub struct RecommendationEngine {
    extractor: EntityExtractor,
    store: Arc<dyn NeighborhoodStore>,
    corpus: Arc<dyn CaseCorpus>,
    responder: Arc<dyn SimilarityResponder>,
    timeout: Duration,
    default_neighborhood: String,
    sample_size: usize,
    fallback_neighborhoods: Vec<String>,
}

impl RecommendationEngine {
    pub fn new(
        extractor: EntityExtractor,
        store: Arc<dyn NeighborhoodStore>,
        corpus: Arc<dyn CaseCorpus>,
        responder: Arc<dyn SimilarityResponder>,
        settings: &EngineSettings,
    ) -> Self {
        Self {
            extractor,
            store,
            corpus,
            responder,
            timeout: Duration::from_millis(settings.similarity_timeout_ms),
            default_neighborhood: settings.default_neighborhood.clone(),
            sample_size: settings.budget_sample_size.max(1),
            fallback_neighborhoods: settings.fallback_neighborhoods.clone(),
        }
    }

    pub fn default_neighborhood(&self) -> &str {
        &self.default_neighborhood
    }

    fn gazetteer(&self) -> &Gazetteer {
        self.extractor.gazetteer()
    }

    /// Always yields a neighborhood. Each tier is tried in turn and the
    /// first one that produces a name wins.
    pub fn recommend(&self, text: &str) -> Recommendation {
        if let Some(name) = self.explicit_neighborhood(text) {
            info!("explicitly requested neighborhood: {}", name);
            return Recommendation {
                neighborhood: name,
                source: RecommendationSource::Explicit,
            };
        }

        let ranked = self.similar_cases(text);
        if let Some(top) = ranked.first() {
            if let Some(name) = top.recommended_neighborhood.as_deref() {
                info!("top similar case {} suggests {} ({:.2})", top.case_id, name, top.score);
                return Recommendation {
                    neighborhood: strip_district_prefix(name).to_string(),
                    source: RecommendationSource::SimilarCase {
                        case_id: top.case_id,
                        score: top.score,
                    },
                };
            }
        }
        if let Some(name) = ranked.iter().find_map(|c| c.recommended_neighborhood.as_deref()) {
            info!("using first retrieved neighborhood {}", name);
            return Recommendation {
                neighborhood: strip_district_prefix(name).to_string(),
                source: RecommendationSource::Retrieved,
            };
        }

        let normalized = normalize(text);
        if let (Some(mention), _) = self.extractor.neighborhood_mention(&normalized) {
            info!("using neighborhood mentioned in the message: {}", mention.name);
            return Recommendation {
                neighborhood: mention.name,
                source: RecommendationSource::MessageMention,
            };
        }

        info!("falling back to default neighborhood {}", self.default_neighborhood);
        Recommendation {
            neighborhood: self.default_neighborhood.clone(),
            source: RecommendationSource::Default,
        }
    }

    /// Ranked cases from the responder. A failed or slow responder yields
    /// an empty ranking so the caller moves on to the next tier.
    pub fn similar_cases(&self, text: &str) -> Vec<ScoredCase> {
        let cases = self.corpus.cases_for_similarity();
        if cases.is_empty() {
            return Vec::new();
        }
        let responder = Arc::clone(&self.responder);
        let utterance = text.to_string();
        let answer = call_with_timeout(self.timeout, move || responder.find_similar_cases(&utterance, &cases))
            .and_then(checked_ranking);
        match answer {
            Ok(ranked) => ranked,
            Err(err) => {
                warn!("similarity lookup failed, degrading: {}", err);
                Vec::new()
            }
        }
    }

    /// A neighborhood the user asked for by name. The captured span must
    /// resolve against the known names and may not be the user's workplace.
    pub fn explicit_neighborhood(&self, text: &str) -> Option<String> {
        let text = normalize(text);
        if text.trim().is_empty() {
            return None;
        }
        let workplace = self.extractor.extract(&text).workplace.map(|w| Gazetteer::key_of(&w));
        let accept = |name: &str| -> Option<String> {
            if workplace.as_deref() == Some(Gazetteer::key_of(name).as_str()) {
                debug!("{} is the workplace, not a request", name);
                return None;
            }
            Some(name.to_string())
        };

        let one_line = text.replace('\n', " ");
        for re in EXPLICIT_PATTERNS.iter() {
            let Some(span) = re.captures(&one_line).and_then(|c| c.get(1)) else {
                continue;
            };
            let span = span.as_str().trim();
            if is_common_word(span) || span.chars().count() < MIN_EXPLICIT_CHARS {
                debug!("ignoring captured span {:?}", span);
                continue;
            }
            // the first usable capture decides, matched or not
            return self.gazetteer().resolve_loose(span).and_then(accept);
        }

        if FACILITY_REQUEST_PATTERNS.iter().any(|re| re.is_match(&text)) {
            debug!("request describes a kind of neighborhood, not a name");
            return None;
        }

        let last_line = text.lines().last().unwrap_or("").trim();
        for re in LAST_LINE_PATTERNS.iter() {
            let Some(span) = re.captures(last_line).and_then(|c| c.get(1)) else {
                continue;
            };
            let span = span.as_str().trim();
            if is_common_word(span) {
                continue;
            }
            if let Some(name) = self.gazetteer().resolve_loose(span).and_then(accept) {
                return Some(name);
            }
        }

        None
    }

    /// Neighborhoods whose price level fits the income tier. Falls back to
    /// a random sample of all neighborhoods rather than returning nothing.
    pub fn recommend_by_budget(&self, income: u64) -> BudgetRecommendation {
        let tier = IncomeTier::from_income(income);
        let mut seen = HashSet::new();
        let neighborhoods: Vec<String> = self
            .store
            .neighborhood_records()
            .iter()
            .filter(|record| match price_tier(record) {
                Ok(level) => tier.accepts(level),
                Err(err) => {
                    debug!("price level treated as absent: {}", err);
                    false
                }
            })
            .map(|record| strip_district_prefix(&record.name).to_string())
            .filter(|name| seen.insert(Gazetteer::key_of(name)))
            .collect();

        if !neighborhoods.is_empty() {
            info!("{} neighborhoods fit income {} ({})", neighborhoods.len(), income, tier);
            return BudgetRecommendation {
                tier,
                neighborhoods,
                sampled: false,
            };
        }

        let all = self.known_neighborhoods();
        let mut sample: Vec<String> = all
            .choose_multiple(&mut rand::thread_rng(), self.sample_size)
            .cloned()
            .collect();
        if sample.is_empty() {
            sample.push(self.default_neighborhood.clone());
        }
        warn!("no neighborhood priced for {} tier, sampling", tier);
        BudgetRecommendation {
            tier,
            neighborhoods: sample,
            sampled: true,
        }
    }

    /// Names from the store, or the configured fallback list when it has none.
    pub fn known_neighborhoods(&self) -> Vec<String> {
        let names = self.store.available_neighborhoods();
        if names.is_empty() {
            self.fallback_neighborhoods.clone()
        } else {
            names
        }
    }
}

fn checked_ranking(ranked: Vec<ScoredCase>) -> Result<Vec<ScoredCase>, CollaboratorError> {
    match ranked.iter().find(|c| !c.score.is_finite()) {
        Some(case) => Err(CollaboratorError::Malformed(format!(
            "case {} scored {}",
            case.case_id, case.score
        ))),
        None => Ok(ranked),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CaseEntry, DataStore, NeighborhoodCase};
    use serde_json::json;
    use std::collections::HashMap;
    use std::thread;

    struct Fixed(Result<Vec<ScoredCase>, CollaboratorError>);

    impl SimilarityResponder for Fixed {
        fn find_similar_cases(
            &self,
            _: &str,
            _: &[NeighborhoodCase],
        ) -> Result<Vec<ScoredCase>, CollaboratorError> {
            self.0.clone()
        }

        fn classify_off_topic(&self, _: &str) -> Result<String, CollaboratorError> {
            Err(CollaboratorError::Unavailable("test".into()))
        }
    }

    struct Slow;

    impl SimilarityResponder for Slow {
        fn find_similar_cases(
            &self,
            _: &str,
            _: &[NeighborhoodCase],
        ) -> Result<Vec<ScoredCase>, CollaboratorError> {
            thread::sleep(Duration::from_millis(400));
            Ok(vec![scored(1, Some("حطين"))])
        }

        fn classify_off_topic(&self, _: &str) -> Result<String, CollaboratorError> {
            Ok(String::new())
        }
    }

    fn scored(case_id: u64, neighborhood: Option<&str>) -> ScoredCase {
        ScoredCase {
            case_id,
            score: 0.5,
            recommended_neighborhood: neighborhood.map(str::to_string),
        }
    }

    fn store() -> Arc<DataStore> {
        let records = [
            ("النرجس", "high"),
            ("الياسمين", "mid"),
            ("العريجاء", "low"),
            ("الشفا", "منخفض متوسط"),
            ("حطين", "مرتفع"),
            ("العليا", "غير معروف"),
        ]
        .iter()
        .map(|(name, level)| serde_json::from_value(json!({"name": name, "price_level": level})).unwrap())
        .collect();
        let cases = vec![CaseEntry {
            narrative: "عائلة تبحث عن مدارس".into(),
            neighborhood: Some("النرجس".into()),
            benefits: vec![],
        }];
        Arc::new(DataStore::new(records, cases, HashMap::new()))
    }

    fn engine_with(responder: Arc<dyn SimilarityResponder>, timeout_ms: u64) -> RecommendationEngine {
        let store = store();
        let gazetteer = Arc::new(Gazetteer::new(store.available_neighborhoods()));
        let settings = EngineSettings {
            similarity_timeout_ms: timeout_ms,
            ..EngineSettings::default()
        };
        RecommendationEngine::new(EntityExtractor::new(gazetteer), store.clone(), store, responder, &settings)
    }

    fn engine(result: Result<Vec<ScoredCase>, CollaboratorError>) -> RecommendationEngine {
        engine_with(Arc::new(Fixed(result)), 1000)
    }

    #[test]
    fn tiers_follow_income_thresholds() {
        assert_eq!(IncomeTier::from_income(0), IncomeTier::Low);
        assert_eq!(IncomeTier::from_income(4_999), IncomeTier::Low);
        assert_eq!(IncomeTier::from_income(5_000), IncomeTier::LowMid);
        assert_eq!(IncomeTier::from_income(8_000), IncomeTier::LowMid);
        assert_eq!(IncomeTier::from_income(10_000), IncomeTier::Mid);
        assert_eq!(IncomeTier::from_income(24_999), IncomeTier::MidHigh);
        assert_eq!(IncomeTier::from_income(25_000), IncomeTier::High);
    }

    #[test]
    fn parses_price_levels() {
        assert_eq!(IncomeTier::parse_level("Low-Mid"), Some(IncomeTier::LowMid));
        assert_eq!(IncomeTier::parse_level("mid_high"), Some(IncomeTier::MidHigh));
        assert_eq!(IncomeTier::parse_level("مرتفعة"), Some(IncomeTier::High));
        assert_eq!(IncomeTier::parse_level("متوسط إلى مرتفع"), Some(IncomeTier::MidHigh));
        assert_eq!(IncomeTier::parse_level("3"), Some(IncomeTier::Mid));
        assert_eq!(IncomeTier::parse_level("غير معروف"), None);
    }

    #[test]
    fn adjacency_is_same_or_next_cheaper() {
        assert!(IncomeTier::LowMid.accepts(IncomeTier::Low));
        assert!(IncomeTier::LowMid.accepts(IncomeTier::LowMid));
        assert!(!IncomeTier::LowMid.accepts(IncomeTier::Mid));
        assert!(IncomeTier::Low.accepts(IncomeTier::Low));
        assert!(!IncomeTier::High.accepts(IncomeTier::Mid));
    }

    #[test]
    fn price_tier_reports_shape_problems() {
        let missing: NeighborhoodRecord = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert!(matches!(price_tier(&missing), Err(DataShapeError::MissingField { .. })));
        let junk: NeighborhoodRecord =
            serde_json::from_value(json!({"name": "x", "مستوى_السعر": "؟"})).unwrap();
        assert!(matches!(price_tier(&junk), Err(DataShapeError::InvalidValue { .. })));
    }

    #[test]
    fn budget_recommendation_filters_by_tier() {
        let engine = engine(Ok(vec![]));
        let rec = engine.recommend_by_budget(8_000);
        assert_eq!(rec.tier, IncomeTier::LowMid);
        assert!(!rec.sampled);
        assert_eq!(rec.neighborhoods, vec!["العريجاء", "الشفا"]);
    }

    #[test]
    fn budget_recommendation_samples_when_nothing_fits() {
        let gazetteer = Arc::new(Gazetteer::new(["أ"]));
        let empty = Arc::new(DataStore::default());
        let engine = RecommendationEngine::new(
            EntityExtractor::new(gazetteer),
            empty.clone(),
            empty,
            Arc::new(Fixed(Ok(vec![]))),
            &EngineSettings::default(),
        );
        let rec = engine.recommend_by_budget(50_000);
        assert!(rec.sampled);
        assert_eq!(rec.neighborhoods.len(), EngineSettings::default().budget_sample_size);
    }

    #[test]
    fn budget_recommendation_falls_back_to_default_when_nothing_is_known() {
        let gazetteer = Arc::new(Gazetteer::new(["أ"]));
        let empty = Arc::new(DataStore::new(vec![], vec![], HashMap::new()));
        let settings = EngineSettings {
            fallback_neighborhoods: vec![],
            ..EngineSettings::default()
        };
        let engine = RecommendationEngine::new(
            EntityExtractor::new(gazetteer),
            empty.clone(),
            empty,
            Arc::new(Fixed(Ok(vec![]))),
            &settings,
        );
        let rec = engine.recommend_by_budget(8_000);
        assert!(rec.sampled);
        assert_eq!(rec.neighborhoods, vec![engine.default_neighborhood().to_string()]);
    }

    #[test]
    fn explicit_name_on_last_line() {
        let engine = engine(Ok(vec![]));
        let text = "عندي عائلة وأطفال\nوأفكر في حي الشفا";
        assert_eq!(engine.explicit_neighborhood(text), Some("الشفا".to_string()));
        let rec = engine.recommend(text);
        assert_eq!(rec.neighborhood, "الشفا");
        assert_eq!(rec.source, RecommendationSource::Explicit);
    }

    #[test]
    fn only_the_last_line_is_read_for_a_bare_name() {
        let engine = engine(Ok(vec![]));
        assert_eq!(engine.explicit_neighborhood("حطين\nكيف حالك"), None);
        assert_eq!(engine.explicit_neighborhood("كيف حالك\nحطين"), Some("حطين".to_string()));
    }

    #[test]
    fn explicit_request_wins() {
        let engine = engine(Ok(vec![scored(1, Some("حطين"))]));
        let rec = engine.recommend("اقترح لي حي الشفا لو سمحت");
        assert_eq!(rec.neighborhood, "الشفا");
        assert_eq!(rec.source, RecommendationSource::Explicit);
    }

    #[test]
    fn facility_request_is_not_explicit() {
        let engine = engine(Ok(vec![]));
        assert_eq!(engine.explicit_neighborhood("اقترح لي حي فيه مدارس"), None);
    }

    #[test]
    fn workplace_is_not_an_explicit_request() {
        let engine = engine(Ok(vec![]));
        assert_eq!(engine.explicit_neighborhood("أعمل في العليا"), None);
    }

    #[test]
    fn top_similar_case_is_used() {
        let engine = engine(Ok(vec![scored(4, Some("حي حطين")), scored(2, Some("النرجس"))]));
        let rec = engine.recommend("عائلة كبيرة");
        assert_eq!(rec.neighborhood, "حطين");
        assert!(matches!(rec.source, RecommendationSource::SimilarCase { case_id: 4, .. }));
    }

    #[test]
    fn first_named_retrieved_case_when_top_has_none() {
        let engine = engine(Ok(vec![scored(4, None), scored(2, Some("النرجس"))]));
        let rec = engine.recommend("عائلة كبيرة");
        assert_eq!(rec.neighborhood, "النرجس");
        assert_eq!(rec.source, RecommendationSource::Retrieved);
    }

    #[test]
    fn responder_failure_degrades_to_default() {
        let engine = engine(Err(CollaboratorError::Unavailable("down".into())));
        let rec = engine.recommend("أريد مكانا هادئا");
        assert_eq!(rec.neighborhood, "الياسمين");
        assert_eq!(rec.source, RecommendationSource::Default);
    }

    #[test]
    fn non_finite_scores_are_rejected() {
        let mut bad = scored(4, Some("حطين"));
        bad.score = f32::NAN;
        assert!(matches!(
            checked_ranking(vec![scored(2, None), bad.clone()]),
            Err(CollaboratorError::Malformed(_))
        ));

        let engine = engine(Ok(vec![bad]));
        let rec = engine.recommend("أريد مكانا هادئا");
        assert_eq!(rec.neighborhood, "الياسمين");
        assert_eq!(rec.source, RecommendationSource::Default);
    }

    #[test]
    fn slow_responder_degrades_to_message_mention() {
        let engine = engine_with(Arc::new(Slow), 20);
        let rec = engine.recommend("أسكن حاليا في النرجس، وأريد الانتقال");
        assert_eq!(rec.neighborhood, "النرجس");
        assert_eq!(rec.source, RecommendationSource::MessageMention);
    }

    #[test]
    fn never_empty() {
        let engine = engine(Ok(vec![]));
        for text in ["", "؟", "كيف حالك", "اقترح"] {
            assert!(!engine.recommend(text).neighborhood.is_empty());
        }
    }
}
