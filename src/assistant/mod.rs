// Quiz taking is driven by the client; the server only generates.
#[cfg_attr(not(test), allow(dead_code))]
pub mod attempt;
pub mod chat;
pub mod intent;
pub mod prompts;
pub mod quiz;

use std::sync::Arc;

pub use chat::{ChatClient, Material};
pub use intent::IntentClassifier;
pub use quiz::{Difficulty, QuizGenerator, QuizKind};

use crate::model::LanguageModel;

/// Every model-backed component, sharing one transport.
pub struct Assistant {
    pub classifier: IntentClassifier,
    pub chat: ChatClient,
    pub quiz: QuizGenerator,
}

impl Assistant {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            classifier: IntentClassifier::new(model.clone()),
            chat: ChatClient::new(model.clone()),
            quiz: QuizGenerator::new(model),
        }
    }
}
