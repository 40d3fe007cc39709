use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::model::{GenerationRequest, LanguageModel};

pub const OPTIONS_PER_QUESTION: usize = 4;
pub const QUIZ_QUESTION_RANGE: RangeInclusive<u32> = 3..=15;
pub const EXAM_QUESTION_RANGE: RangeInclusive<u32> = 5..=20;
const MAX_SOURCE_CHARS: usize = 25_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizData {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub questions: Vec<QuizQuestion>,
}

impl QuizData {
    /// Rejects data a quiz cannot be taken from.
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.title.trim().is_empty() {
            return Err(LlmError::Generation("quiz has no title".into()));
        }
        if self.questions.is_empty() {
            return Err(LlmError::Generation("quiz has no questions".into()));
        }
        for (i, q) in self.questions.iter().enumerate() {
            if q.options.len() != OPTIONS_PER_QUESTION {
                return Err(LlmError::Generation(format!(
                    "question {} has {} options, expected {}",
                    i + 1,
                    q.options.len(),
                    OPTIONS_PER_QUESTION
                )));
            }
            if q.correct_answer >= q.options.len() {
                return Err(LlmError::Generation(format!(
                    "question {} has correctAnswer {} out of range",
                    i + 1,
                    q.correct_answer
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "fácil")]
    Easy,
    #[default]
    #[serde(rename = "médio")]
    Medium,
    #[serde(rename = "difícil")]
    Hard,
}

impl Difficulty {
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "fácil",
            Difficulty::Medium => "médio",
            Difficulty::Hard => "difícil",
        }
    }

    /// Case-insensitive; accepts Portuguese or English names. Anything
    /// else is `Medium`.
    pub fn normalize(raw: Option<&str>) -> Difficulty {
        match raw.map(|r| r.trim().to_lowercase()).as_deref() {
            Some("fácil") | Some("facil") | Some("easy") => Difficulty::Easy,
            Some("difícil") | Some("dificil") | Some("hard") => Difficulty::Hard,
            _ => Difficulty::Medium,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizKind {
    Quiz,
    Exam,
}

impl QuizKind {
    pub fn from_type(raw: Option<&str>) -> QuizKind {
        match raw {
            Some(t) if t.eq_ignore_ascii_case("exam") => QuizKind::Exam,
            _ => QuizKind::Quiz,
        }
    }

    pub fn question_range(&self) -> RangeInclusive<u32> {
        match self {
            QuizKind::Quiz => QUIZ_QUESTION_RANGE,
            QuizKind::Exam => EXAM_QUESTION_RANGE,
        }
    }

    pub fn default_count(&self) -> u32 {
        match self {
            QuizKind::Quiz => 5,
            QuizKind::Exam => 10,
        }
    }

    pub fn clamp(&self, count: u32) -> u32 {
        let range = self.question_range();
        count.clamp(*range.start(), *range.end())
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuizKind::Quiz => "quiz",
            QuizKind::Exam => "exame",
        }
    }
}

fn quiz_prompt(content: &str, count: u32, difficulty: Difficulty) -> String {
    let source = if content.chars().count() > MAX_SOURCE_CHARS {
        let truncated: String = content.chars().take(MAX_SOURCE_CHARS).collect();
        format!("{}...", truncated)
    } else {
        content.to_string()
    };

    format!(
        r#"Crie um quiz interativo de múltipla escolha com base no conteúdo fornecido.

Informações:
- Número de questões: {count}
- Nível de dificuldade: {difficulty}

Regras para o quiz:
1. Cada questão deve ter exatamente 4 alternativas
2. Apenas uma das alternativas deve ser correta
3. A alternativa correta deve ser identificada pelo índice (0, 1, 2 ou 3)
4. Inclua uma explicação detalhada para cada resposta correta
5. As questões devem ser relevantes para o conteúdo fornecido
6. Use linguagem clara e educativa
7. O quiz deve ter um título relacionado ao conteúdo

Conteúdo de referência:
"""
{source}
"""

Forneça sua resposta no formato JSON exatamente como especificado abaixo:
{{
  "title": "Título do Quiz",
  "description": "Breve descrição do quiz (2-3 frases)",
  "questions": [
    {{
      "question": "Texto da questão 1?",
      "options": ["Alternativa A", "Alternativa B", "Alternativa C", "Alternativa D"],
      "correctAnswer": 0,
      "explanation": "Explicação de por que a alternativa A é correta"
    }}
  ]
}}"#
    )
}

/// Parses the JSON object embedded in a model reply and checks it.
pub fn parse_quiz(raw: &str) -> Result<QuizData, LlmError> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &raw[s..=e],
        _ => return Err(LlmError::Generation("no JSON object in model reply".into())),
    };

    let quiz: QuizData = serde_json::from_str(json)
        .map_err(|e| LlmError::Generation(format!("invalid quiz JSON: {}", e)))?;
    quiz.validate()?;
    Ok(quiz)
}

/// Adds the exam marker unless the title already reads like one.
fn exam_title(title: &str) -> String {
    let lower = title.to_lowercase();
    if lower.contains("exame") || lower.contains("simulado") {
        title.to_string()
    } else {
        format!("Exame Simulado: {}", title)
    }
}

pub struct QuizGenerator {
    model: Arc<dyn LanguageModel>,
}

impl QuizGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn generate(
        &self,
        kind: QuizKind,
        content: &str,
        count: u32,
        difficulty: Difficulty,
    ) -> Result<QuizData, LlmError> {
        match kind {
            QuizKind::Quiz => self.generate_quiz(content, count, difficulty).await,
            QuizKind::Exam => self.generate_exam(content, count, difficulty).await,
        }
    }

    pub async fn generate_quiz(
        &self,
        content: &str,
        count: u32,
        difficulty: Difficulty,
    ) -> Result<QuizData, LlmError> {
        let count = QuizKind::Quiz.clamp(count);
        self.request(content, count, difficulty).await
    }

    pub async fn generate_exam(
        &self,
        content: &str,
        count: u32,
        difficulty: Difficulty,
    ) -> Result<QuizData, LlmError> {
        let count = QuizKind::Exam.clamp(count);
        let mut exam = self.request(content, count, difficulty).await?;
        exam.title = exam_title(&exam.title);
        Ok(exam)
    }

    async fn request(
        &self,
        content: &str,
        count: u32,
        difficulty: Difficulty,
    ) -> Result<QuizData, LlmError> {
        info!(
            "Requesting {} questions at difficulty {}",
            count, difficulty
        );
        let request =
            GenerationRequest::single(quiz_prompt(content, count, difficulty), 0.4, 4000)
                .with_json_output();

        let raw = self.model.generate(request).await?;
        debug!("Raw quiz reply: {}", raw);

        parse_quiz(&raw).map_err(|e| {
            error!("Quiz reply rejected: {}", e);
            e
        })
    }
}
