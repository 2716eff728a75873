//! The conversational pipeline: one call per user message, from raw text
//! to reply, with the turn recorded for later follow-ups.

use crate::classifier::{ranking_disclaimer, show_all_request, IntentClassifier, QueryAnalysis, QueryType};
use crate::conversation::{ContextResolver, Focus, FollowUp};
use crate::entities::{Entities, MentionContext};
use crate::error::SearchError;
use crate::extractor::EntityExtractor;
use crate::gazetteer::Gazetteer;
use crate::history::{ConversationHistory, ConversationTurn, InMemoryHistory};
use crate::normalize::normalize;
use crate::recommend::{BudgetRecommendation, Recommendation, RecommendationEngine, RecommendationSource};
use crate::reply;
use crate::search::{FacilitySearch, SearchHit};
use crate::settings::EngineSettings;
use crate::similarity::{call_with_timeout, LexicalResponder, SimilarityResponder, REDIRECT_TEXT};
use crate::store::{CaseCorpus, DataStore, FacilityRecord, NeighborhoodStore};
use crate::vocab::{FacilityKind, FACILITY_NOUNS};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// What the advisor decided to do with a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Prompt,
    RankingDisclaimer,
    Recommended { recommendation: Recommendation },
    Budget { income: u64, budget: BudgetRecommendation },
    NeighborhoodInfo { neighborhood: String },
    Facilities {
        neighborhood: String,
        facility_type: Option<FacilityKind>,
        count: usize,
    },
    FacilityFound { hit: SearchHit },
    FacilityNotFound { query: String },
    AskFacilityDetails { facility_type: FacilityKind },
    AskNeighborhood,
    Unlocatable { facility_type: FacilityKind },
    OffTopic,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub text: String,
    pub outcome: Outcome,
    /// Present when the message went through classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<QueryAnalysis>,
}

impl Reply {
    fn new(text: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            text: text.into(),
            outcome,
            analysis: None,
        }
    }

    /// Classification label, "unknown" when the message short-circuited
    /// before classification.
    pub fn query_type(&self) -> QueryType {
        self.analysis
            .as_ref()
            .map(|a| a.query_type)
            .unwrap_or(QueryType::Unknown)
    }
}

pub struct Advisor {
    classifier: IntentClassifier,
    resolver: ContextResolver,
    engine: RecommendationEngine,
    search: FacilitySearch,
    store: Arc<dyn NeighborhoodStore>,
    responder: Arc<dyn SimilarityResponder>,
    timeout: Duration,
}

impl Advisor {
    pub fn new(
        store: Arc<dyn NeighborhoodStore>,
        corpus: Arc<dyn CaseCorpus>,
        responder: Arc<dyn SimilarityResponder>,
        history: Arc<dyn ConversationHistory>,
        settings: &EngineSettings,
    ) -> Self {
        let gazetteer = Arc::new(Self::gazetteer(store.as_ref(), settings));
        info!("advisor knows {} neighborhoods", gazetteer.len());
        let extractor = EntityExtractor::new(Arc::clone(&gazetteer));
        let engine = RecommendationEngine::new(
            extractor.clone(),
            Arc::clone(&store),
            corpus,
            Arc::clone(&responder),
            settings,
        );
        Self {
            classifier: IntentClassifier::new(extractor),
            resolver: ContextResolver::new(history, gazetteer, settings.context_window),
            engine,
            search: FacilitySearch::new(Arc::clone(&store)),
            store,
            responder,
            timeout: Duration::from_millis(settings.similarity_timeout_ms),
        }
    }

    /// The usual wiring: one data store serving both collaborator roles, the
    /// local lexical responder and bounded in-memory history.
    pub fn with_store(store: DataStore, settings: &EngineSettings) -> Self {
        let store = Arc::new(store);
        let responder = LexicalResponder::new(settings.similarity_top_k, settings.min_similarity);
        Self::new(
            store.clone(),
            store,
            Arc::new(responder),
            Arc::new(InMemoryHistory::new(settings.history_limit)),
            settings,
        )
    }

    // Store names first, then the configured districts so that the default
    // and sampled names are recognized when they come back in a follow-up.
    fn gazetteer(store: &dyn NeighborhoodStore, settings: &EngineSettings) -> Gazetteer {
        let stored = store.available_neighborhoods();
        Gazetteer::new(
            stored
                .iter()
                .chain(settings.fallback_neighborhoods.iter())
                .chain(std::iter::once(&settings.default_neighborhood)),
        )
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn engine(&self) -> &RecommendationEngine {
        &self.engine
    }

    pub fn search(&self) -> &FacilitySearch {
        &self.search
    }

    pub fn store(&self) -> &Arc<dyn NeighborhoodStore> {
        &self.store
    }

    pub fn handle(&self, user_id: &str, message: &str) -> Reply {
        let text = message.trim();
        if text.is_empty() {
            return Reply::new(reply::EMPTY_PROMPT, Outcome::Prompt);
        }
        let reply = self.respond(user_id, text);
        self.resolver
            .history()
            .append(user_id, ConversationTurn::new(text, reply.text.as_str()));
        reply
    }

    fn respond(&self, user_id: &str, text: &str) -> Reply {
        // Stage 1: "which is the best neighborhood" has no neutral answer
        if let Some(disclaimer) = ranking_disclaimer(text) {
            info!("answering ranking question with the disclaimer");
            return Reply::new(disclaimer, Outcome::RankingDisclaimer);
        }

        // Stage 2: show-all requests
        if let Some(request) = show_all_request(text) {
            let entities = self.classifier.extractor().extract(text);
            return match entities.neighborhood_name() {
                Some(name) => self.facilities(name, request.kind, false),
                None => Reply::new(reply::ASK_FOR_NEIGHBORHOOD, Outcome::AskNeighborhood),
            };
        }

        // Stage 3: short continuations of the previous answer
        if let Some(follow_up) = self.resolver.resolve(user_id, text) {
            return self.follow_up(follow_up);
        }

        // Stage 4: classify and route
        let analysis = self.classifier.analyze(text);
        let mut reply = self.route(user_id, text, &analysis);
        reply.analysis = Some(analysis);
        reply
    }

    fn follow_up(&self, follow_up: FollowUp) -> Reply {
        match follow_up {
            FollowUp::Neighborhood { name, focus } => match focus {
                Focus::Overview => self.info(&name),
                Focus::AllFacilities => self.facilities(&name, None, false),
                Focus::Facility(kind) => self.facilities(&name, Some(kind), false),
            },
            FollowUp::FacilityType(kind) => Reply::new(
                reply::facility_follow_up(kind),
                Outcome::AskFacilityDetails { facility_type: kind },
            ),
            FollowUp::Recommendation { seed } => self.recommended(self.engine.recommend(&seed)),
        }
    }

    fn route(&self, user_id: &str, text: &str, analysis: &QueryAnalysis) -> Reply {
        let entities = &analysis.entities;
        match analysis.query_type {
            QueryType::HousingSearch => self.housing(text, entities),
            QueryType::NeighborhoodInfo => match entities.neighborhood_name() {
                Some(name) => self.info(name),
                None => self.recommended(self.engine.recommend(text)),
            },
            QueryType::NeighborhoodRecommendation => self.recommendation(text, entities),
            QueryType::NeighborhoodFacilities => match entities.neighborhood_name() {
                Some(name) => self.facilities(name, entities.facility_type, true),
                None => Reply::new(reply::ASK_FOR_NEIGHBORHOOD, Outcome::AskNeighborhood),
            },
            QueryType::FacilityLocation => {
                let query = entities.facility_name.as_deref().unwrap_or(text);
                self.locate(entities.facility_type, query)
            }
            QueryType::FacilitySearch => match (entities.neighborhood_name(), entities.facility_type) {
                (Some(name), kind) => self.facilities(name, kind, false),
                (None, kind) => {
                    let query = entities.facility_name.as_deref().unwrap_or(text);
                    self.locate(kind, query)
                }
            },
            QueryType::Unknown => self.unknown(user_id, text),
        }
    }

    fn recommendation(&self, text: &str, entities: &Entities) -> Reply {
        if let Some(mention) = &entities.neighborhood {
            let source = match mention.context {
                MentionContext::Recommendation => RecommendationSource::Explicit,
                _ => RecommendationSource::MessageMention,
            };
            return self.recommended(Recommendation {
                neighborhood: mention.name.clone(),
                source,
            });
        }
        if let Some(income) = entities.budget {
            let budget = self.engine.recommend_by_budget(income);
            return Reply::new(reply::budget(income, &budget), Outcome::Budget { income, budget });
        }
        self.recommended(self.engine.recommend(text))
    }

    fn recommended(&self, recommendation: Recommendation) -> Reply {
        let name = recommendation.neighborhood.as_str();
        let record = self.store.find_neighborhood_info(name);
        let benefits = self.store.neighborhood_benefits(name);
        Reply::new(
            reply::recommendation(&recommendation, record.as_ref(), &benefits),
            Outcome::Recommended { recommendation },
        )
    }

    fn info(&self, name: &str) -> Reply {
        let record = self.store.find_neighborhood_info(name);
        let benefits = self.store.neighborhood_benefits(name);
        Reply::new(
            reply::neighborhood_overview(name, record.as_ref(), &benefits),
            Outcome::NeighborhoodInfo {
                neighborhood: name.to_string(),
            },
        )
    }

    fn housing(&self, text: &str, entities: &Entities) -> Reply {
        let recommendation = self.engine.recommend(text);
        let nearby: Vec<(FacilityKind, Vec<FacilityRecord>)> = entities
            .proximity_kinds()
            .into_iter()
            .map(|kind| {
                let found = self
                    .search
                    .find(&recommendation.neighborhood, Some(kind))
                    .unwrap_or_else(|err| {
                        warn!("nearby {} lookup failed: {}", kind, err);
                        Vec::new()
                    });
                (kind, found)
            })
            .collect();
        Reply::new(
            reply::housing(entities, &recommendation, &nearby),
            Outcome::Recommended { recommendation },
        )
    }

    fn facilities(&self, name: &str, kind: Option<FacilityKind>, highlights: bool) -> Reply {
        match self.search.find(name, kind) {
            Ok(records) => {
                let text = if highlights && kind.is_none() {
                    reply::facility_highlights(name, &records)
                } else {
                    reply::facilities_in(name, kind, &records)
                };
                Reply::new(
                    text,
                    Outcome::Facilities {
                        neighborhood: name.to_string(),
                        facility_type: kind,
                        count: records.len(),
                    },
                )
            }
            Err(err) => Self::search_failure(err),
        }
    }

    fn locate(&self, kind: Option<FacilityKind>, query: &str) -> Reply {
        let hit = match kind {
            Some(kind) => match self.search.search(kind, query) {
                Ok(hit) => hit,
                Err(err) => return Self::search_failure(err),
            },
            None => None,
        };
        // the extracted type can be wrong, so widen to every kind
        let hit = hit.or_else(|| self.search.search_all(query).into_iter().next());
        match hit {
            Some(hit) => Reply::new(reply::search_hit(&hit), Outcome::FacilityFound { hit }),
            None => Reply::new(
                reply::search_miss(query),
                Outcome::FacilityNotFound {
                    query: query.to_string(),
                },
            ),
        }
    }

    fn unknown(&self, user_id: &str, text: &str) -> Reply {
        if let Some(name) = self.resolver.resolve_reference(user_id, text) {
            let normalized = normalize(text);
            if FACILITY_NOUNS.any_in(&normalized) {
                return self.facilities(&name, FacilityKind::score(&normalized), true);
            }
            return self.info(&name);
        }

        let responder = Arc::clone(&self.responder);
        let utterance = text.to_string();
        match call_with_timeout(self.timeout, move || responder.classify_off_topic(&utterance)) {
            Ok(answer) if !answer.trim().is_empty() => Reply::new(answer, Outcome::OffTopic),
            Ok(_) => Reply::new(REDIRECT_TEXT, Outcome::OffTopic),
            Err(err) => {
                warn!("off-topic responder failed: {}", err);
                Reply::new(REDIRECT_TEXT, Outcome::OffTopic)
            }
        }
    }

    fn search_failure(err: SearchError) -> Reply {
        match err {
            SearchError::NoNeighborhoodColumn { kind } => {
                Reply::new(reply::unlocatable(kind), Outcome::Unlocatable { facility_type: kind })
            }
            SearchError::Store(err) => {
                warn!("facility store failed: {}", err);
                Reply::new(reply::ERROR_TEXT, Outcome::Failed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CaseEntry;
    use serde_json::json;
    use std::collections::HashMap;

    fn advisor() -> (Arc<InMemoryHistory>, Advisor) {
        let neighborhoods = vec![
            serde_json::from_value(json!({"name": "حي النرجس", "price_level": "high"})).unwrap(),
            serde_json::from_value(json!({"name": "الملقا", "price_level": "mid-high"})).unwrap(),
        ];
        let cases: Vec<CaseEntry> = vec![serde_json::from_value(json!({
            "narrative": "عائلة لديها أطفال تبحث عن مدارس قريبة وحدائق",
            "neighborhood": "حي النرجس",
            "benefits": ["المدارس قريبة جداً من البيت"]
        }))
        .unwrap()];
        let mut facilities = HashMap::new();
        facilities.insert(
            FacilityKind::School,
            vec![json!({"الاسم": "مدرسة النور", "الحي": "النرجس"})
                .as_object()
                .cloned()
                .unwrap()],
        );
        let store = Arc::new(DataStore::new(neighborhoods, cases, facilities));
        let history = Arc::new(InMemoryHistory::new(50));
        let advisor = Advisor::new(
            store.clone(),
            store,
            Arc::new(LexicalResponder::default()),
            history.clone(),
            &EngineSettings::default(),
        );
        (history, advisor)
    }

    #[test]
    fn empty_message_prompts_without_recording() {
        let (history, advisor) = advisor();
        let reply = advisor.handle("u", "   ");
        assert_eq!(reply.outcome, Outcome::Prompt);
        assert_eq!(reply.text, reply::EMPTY_PROMPT);
        assert_eq!(history.len("u"), 0);
    }

    #[test]
    fn every_other_turn_is_recorded() {
        let (history, advisor) = advisor();
        advisor.handle("u", "مرحبا");
        advisor.handle("u", "معلومات عن حي الملقا");
        assert_eq!(history.len("u"), 2);
        assert_eq!(history.len("other"), 0);
    }

    #[test]
    fn show_all_lists_facilities() {
        let (_, advisor) = advisor();
        let reply = advisor.handle("u", "اعرض جميع المدارس في حي النرجس");
        assert!(reply.text.contains("مدرسة النور"));
        assert!(matches!(
            reply.outcome,
            Outcome::Facilities {
                facility_type: Some(FacilityKind::School),
                count: 1,
                ..
            }
        ));
    }

    #[test]
    fn reference_to_previous_neighborhood() {
        let (_, advisor) = advisor();
        advisor.handle("u", "معلومات عن حي الملقا");
        let reply = advisor.handle("u", "كم عدد السكان في هذا الحي");
        assert_eq!(
            reply.outcome,
            Outcome::NeighborhoodInfo {
                neighborhood: "الملقا".into()
            }
        );
    }

    #[test]
    fn off_topic_is_redirected() {
        let (_, advisor) = advisor();
        let reply = advisor.handle("u", "كم الساعة الآن");
        assert_eq!(reply.outcome, Outcome::OffTopic);
        assert_eq!(reply.text, REDIRECT_TEXT);
        assert_eq!(reply.query_type(), QueryType::Unknown);
    }
}
