use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::model::{GenerationRequest, LanguageModel};

/// What the user is trying to do in a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    #[serde(rename = "criar_plano")]
    CreatePlan,
    #[serde(rename = "analisar_material")]
    AnalyzeMaterial,
    #[serde(rename = "tecnicas_estudo")]
    StudyTechniques,
    #[serde(rename = "gerar_questionario")]
    GenerateQuizQuestions,
    #[serde(rename = "gerar_quiz")]
    GenerateQuiz,
    #[serde(rename = "gerar_exame")]
    GenerateExam,
    #[serde(rename = "resumir_conteudo")]
    SummarizeContent,
    #[serde(rename = "outro")]
    Other,
}

impl Intent {
    pub const ALL: [Intent; 8] = [
        Intent::CreatePlan,
        Intent::AnalyzeMaterial,
        Intent::StudyTechniques,
        Intent::GenerateQuizQuestions,
        Intent::GenerateQuiz,
        Intent::GenerateExam,
        Intent::SummarizeContent,
        Intent::Other,
    ];

    /// Wire label, as sent in the `X-Intent` header.
    pub fn label(&self) -> &'static str {
        match self {
            Intent::CreatePlan => "criar_plano",
            Intent::AnalyzeMaterial => "analisar_material",
            Intent::StudyTechniques => "tecnicas_estudo",
            Intent::GenerateQuizQuestions => "gerar_questionario",
            Intent::GenerateQuiz => "gerar_quiz",
            Intent::GenerateExam => "gerar_exame",
            Intent::SummarizeContent => "resumir_conteudo",
            Intent::Other => "outro",
        }
    }

    /// Exact label match after trimming and lowercasing; anything else is `Other`.
    pub fn from_label(raw: &str) -> Intent {
        let normalized = raw.trim().to_lowercase();
        Intent::ALL
            .into_iter()
            .find(|intent| intent.label() == normalized)
            .unwrap_or(Intent::Other)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn classification_prompt(message: &str) -> String {
    format!(
        r#"Analise a mensagem do usuário e classifique a intenção dele nas seguintes categorias:
- criar_plano: O usuário quer criar um plano de estudos
- analisar_material: O usuário quer analisar um material ou conteúdo
- tecnicas_estudo: O usuário quer dicas ou técnicas de estudo
- gerar_questionario: O usuário quer gerar perguntas e respostas sobre um tema
- gerar_quiz: O usuário quer gerar um quiz interativo sobre o material
- gerar_exame: O usuário quer criar um exame simulado sobre o material
- resumir_conteudo: O usuário quer um resumo do conteúdo
- outro: Nenhuma das opções acima

Responda apenas com uma das categorias acima, sem explicações.

Mensagem do usuário: "{}""#,
        message
    )
}

/// Best-effort intent detection. Never fails: any error yields `Intent::Other`.
pub struct IntentClassifier {
    model: Arc<dyn LanguageModel>,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn classify(&self, message: &str) -> Intent {
        let request = GenerationRequest::single(classification_prompt(message), 0.2, 100);

        match self.model.generate(request).await {
            Ok(raw) => {
                debug!("Raw intent label: {:?}", raw);
                let intent = Intent::from_label(&raw);
                info!("Detected intent: {}", intent);
                intent
            }
            Err(e) => {
                warn!("Intent detection failed, falling back to outro: {}", e);
                Intent::Other
            }
        }
    }
}
