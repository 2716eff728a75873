use crate::error::CollaboratorError;
use crate::normalize::normalize;
use crate::store::NeighborhoodCase;
use crate::vocab::{is_common_word, KeywordGroup};
use log::{debug, warn};
use ndarray::Array1;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

pub const REDIRECT_TEXT: &str = "أستطيع مساعدتك في البحث عن عقار أو سكن مناسب أو المرافق المتوفرة. هل يمكنني مساعدتك في إيجاد حي مناسب لاحتياجاتك؟";

const GREETING_REPLIES: [&str; 2] = [
    "أهلاً بك! أنا هنا لمساعدتك في إيجاد الحي المناسب والمرافق القريبة منه. كيف يمكنني مساعدتك؟",
    "مرحباً بك! يمكنني اقتراح حي يناسبك أو البحث عن مدرسة أو مستشفى أو حديقة. بماذا تفكر؟",
];

const THANKS_REPLY: &str = "العفو! إذا احتجت إلى معلومات عن حي أو مرفق آخر فأنا في الخدمة.";

static GREETINGS: Lazy<KeywordGroup> = Lazy::new(|| {
    KeywordGroup::new(&[
        "مرحبا", "السلام عليكم", "اهلا", "هلا", "صباح الخير", "مساء الخير", "hello",
    ])
});

static THANKS: Lazy<KeywordGroup> =
    Lazy::new(|| KeywordGroup::new(&["شكرا", "مشكور", "يعطيك العافيه", "thanks"]));

/// A corpus case scored against an utterance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCase {
    pub case_id: u64,
    pub score: f32,
    pub recommended_neighborhood: Option<String>,
}

/// Ranks resident cases against an utterance and answers off-topic
/// messages. Implementations may be remote and slow; callers wrap them in
/// [`call_with_timeout`].
pub trait SimilarityResponder: Send + Sync {
    /// Cases ranked best first. An empty list means nothing was similar.
    fn find_similar_cases(
        &self,
        utterance: &str,
        corpus: &[NeighborhoodCase],
    ) -> Result<Vec<ScoredCase>, CollaboratorError>;

    fn classify_off_topic(&self, utterance: &str) -> Result<String, CollaboratorError>;
}

/// Runs a collaborator call on its own thread and gives up after `timeout`.
///
/// The worker is detached on timeout; its late result is dropped.
pub fn call_with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, CollaboratorError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CollaboratorError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("collaborator-call".into())
        .spawn(move || {
            let _ = tx.send(call());
        })
        .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!("collaborator call exceeded {:?}", timeout);
            Err(CollaboratorError::Timeout(timeout))
        }
        Err(RecvTimeoutError::Disconnected) => Err(CollaboratorError::Unavailable(
            "collaborator worker stopped without answering".into(),
        )),
    }
}

/// Local responder: IDF-weighted bag-of-words vectors compared by cosine,
/// with the top candidates reranked by token overlap.
#[derive(Debug, Clone)]
pub struct LexicalResponder {
    top_k: usize,
    min_score: f32,
}

impl Default for LexicalResponder {
    fn default() -> Self {
        Self::new(5, 0.05)
    }
}

impl LexicalResponder {
    pub fn new(top_k: usize, min_score: f32) -> Self {
        Self {
            top_k: top_k.max(1),
            min_score,
        }
    }

    fn tokens(text: &str) -> Vec<String> {
        normalize(text)
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() >= 2 && !is_common_word(t))
            .map(|t| {
                // light stemming: drop the definite article on longer words
                match t.strip_prefix("ال") {
                    Some(stem) if stem.chars().count() >= 3 => stem.to_string(),
                    _ => t.to_string(),
                }
            })
            .collect()
    }

    /// Smoothed so that a term present in every document keeps a small
    /// positive weight, even for a one-case corpus.
    fn calculate_idf(documents: &[Vec<String>]) -> HashMap<String, f32> {
        let total_docs = documents.len() as f32;
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for doc in documents {
            let unique: HashSet<&str> = doc.iter().map(String::as_str).collect();
            for token in unique {
                *doc_freq.entry(token).or_insert(0) += 1;
            }
        }
        doc_freq
            .into_iter()
            .map(|(token, freq)| {
                let idf = ((1.0 + total_docs) / (1.0 + freq as f32)).log10() + 1.0;
                (token.to_string(), idf)
            })
            .collect()
    }

    fn embed(tokens: &[String], index: &HashMap<String, usize>, idf: &HashMap<String, f32>) -> Array1<f32> {
        let mut vector = Array1::<f32>::zeros(index.len());
        for token in tokens {
            if let Some(&i) = index.get(token) {
                vector[i] += *idf.get(token).unwrap_or(&1.0);
            }
        }
        vector
    }

    pub fn cosine_similarity(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
        let dot_product = a.dot(b);
        let norm_a = a.dot(a).sqrt();
        let norm_b = b.dot(b).sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot_product / (norm_a * norm_b)
        }
    }

    pub fn jaccard_similarity(a: &[String], b: &[String]) -> f32 {
        let set1: HashSet<_> = a.iter().collect();
        let set2: HashSet<_> = b.iter().collect();
        let union = set1.union(&set2).count();
        if union == 0 {
            0.0
        } else {
            set1.intersection(&set2).count() as f32 / union as f32
        }
    }
}

impl SimilarityResponder for LexicalResponder {
    fn find_similar_cases(
        &self,
        utterance: &str,
        corpus: &[NeighborhoodCase],
    ) -> Result<Vec<ScoredCase>, CollaboratorError> {
        if corpus.is_empty() {
            warn!("similarity requested against an empty case corpus");
            return Ok(Vec::new());
        }
        let documents: Vec<Vec<String>> = corpus.iter().map(|c| Self::tokens(&c.narrative)).collect();
        let idf = Self::calculate_idf(&documents);
        let mut index = HashMap::new();
        for token in documents.iter().flatten() {
            let next = index.len();
            index.entry(token.clone()).or_insert(next);
        }

        let query = Self::tokens(utterance);
        let query_vector = Self::embed(&query, &index, &idf);

        let mut candidates: Vec<(usize, f32)> = documents
            .iter()
            .enumerate()
            .map(|(i, doc)| (i, Self::cosine_similarity(&query_vector, &Self::embed(doc, &index, &idf))))
            .filter(|(_, cosine)| *cosine > 0.0)
            .collect();
        candidates.sort_unstable_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(self.top_k);

        let mut scored: Vec<ScoredCase> = candidates
            .into_iter()
            .map(|(i, cosine)| {
                let jaccard = Self::jaccard_similarity(&query, &documents[i]);
                (i, 0.7 * cosine + 0.3 * jaccard)
            })
            .filter(|(_, score)| *score >= self.min_score)
            .map(|(i, score)| ScoredCase {
                case_id: corpus[i].case_id,
                score,
                recommended_neighborhood: corpus[i].recommended_neighborhood.clone(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        debug!("{} similar cases for {:?}", scored.len(), utterance);
        Ok(scored)
    }

    fn classify_off_topic(&self, utterance: &str) -> Result<String, CollaboratorError> {
        let text = normalize(utterance);
        if GREETINGS.any_in(&text) {
            let reply = GREETING_REPLIES
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(REDIRECT_TEXT);
            return Ok(reply.to_string());
        }
        if THANKS.any_in(&text) {
            return Ok(THANKS_REPLY.to_string());
        }
        Ok(REDIRECT_TEXT.to_string())
    }
}
