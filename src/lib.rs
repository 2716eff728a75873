//! Query understanding and case-based neighborhood recommendation for
//! Arabic housing conversations.
//!
//! [`advisor::Advisor`] is the entry point: it takes one user message at a
//! time and returns a reply, keeping a short per-user history so follow-ups
//! like "نعم" resolve against the previous answer.

pub mod advisor;
pub mod api;
pub mod classifier;
pub mod conversation;
pub mod entities;
pub mod error;
pub mod extractor;
pub mod gazetteer;
pub mod history;
pub mod normalize;
pub mod recommend;
pub mod reply;
pub mod search;
pub mod settings;
pub mod similarity;
pub mod store;
pub mod vocab;

pub use advisor::{Advisor, Outcome, Reply};
pub use settings::Settings;
