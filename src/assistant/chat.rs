use std::sync::Arc;

use log::{debug, info, warn};

use super::intent::Intent;
use super::prompts::EMPTY_CONVERSATION_OPENER;
use crate::error::LlmError;
use crate::format::render_block;
use crate::model::{FragmentStream, GenerationRequest, LanguageModel, Part, Turn, TurnRole};
use crate::types::{ChatMessage, Role};

pub const THOUGHT_PROCESS_UNAVAILABLE: &str = "Processo de pensamento indisponível no momento.";

/// Uploaded study material, ready to be sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    /// Base64 image bytes.
    Image { mime_type: String, data: String },
    Document { name: String, text: String },
}

/// Conversational calls against the model: streamed replies plus the
/// single-shot helpers used around a chat turn.
pub struct ChatClient {
    model: Arc<dyn LanguageModel>,
}

impl ChatClient {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Maps the history onto transport turns. The transport has no system
    /// slot, so the system prompt is prepended to the first turn's text.
    /// A history that opens with a model turn gets a leading user turn
    /// holding the prompt instead, so instructions never go out as model
    /// text.
    pub fn build_turns(history: &[ChatMessage], system_prompt: &str) -> Vec<Turn> {
        if history.is_empty() {
            return vec![Turn::user(format!(
                "{}\n\n{}",
                system_prompt, EMPTY_CONVERSATION_OPENER
            ))];
        }

        let mut turns: Vec<Turn> = history
            .iter()
            .map(|msg| match msg.role {
                Role::Assistant => Turn::model(msg.content.clone()),
                Role::User | Role::System => Turn::user(msg.content.clone()),
            })
            .collect();

        if turns[0].role == TurnRole::User {
            turns[0] = Turn::user(format!("{}\n\n{}", system_prompt, history[0].content));
        } else {
            turns.insert(0, Turn::user(system_prompt));
        }
        turns
    }

    /// Opens a streamed reply. Errors before the first fragment are
    /// returned here; later ones arrive as the stream's terminal item.
    pub async fn stream_reply(
        &self,
        history: &[ChatMessage],
        system_prompt: &str,
    ) -> Result<FragmentStream, LlmError> {
        let turns = Self::build_turns(history, system_prompt);
        info!("Streaming reply for {} turns", turns.len());
        self.model
            .stream(GenerationRequest::new(turns, 0.7, 1500))
            .await
    }

    /// Short numbered reasoning outline for a query. Best-effort.
    pub async fn thought_process(&self, query: &str, intent: Intent, recent_messages: usize) -> String {
        let prompt = format!(
            r#"Analise a seguinte consulta do usuário e detalhe seu processo de pensamento em etapas:

"{query}"

Contexto adicional:
- Intenção detectada: {intent}
- Histórico recente de mensagens: {recent_messages} mensagens

Forneça seu processo de pensamento em etapas numeradas, cobrindo:
1. Análise inicial da consulta
2. Identificação das necessidades do estudante
3. Avaliação do contexto educacional
4. Estratégia de resposta
5. Recursos ou técnicas educacionais relevantes
6. Possíveis desafios ou considerações adicionais
7. Abordagem final recomendada

Responda em português e mantenha cada etapa concisa e clara."#
        );

        match self
            .model
            .generate(GenerationRequest::single(prompt, 0.2, 800))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("Thought process unavailable: {}", e);
                THOUGHT_PROCESS_UNAVAILABLE.to_string()
            }
        }
    }

    /// Educational analysis of an uploaded file, rendered with the
    /// formatter.
    pub async fn analyze_file(&self, material: &Material) -> Result<String, LlmError> {
        let parts = match material {
            Material::Image { mime_type, data } => {
                info!("Analyzing image upload ({})", mime_type);
                vec![
                    Part::Text(IMAGE_ANALYSIS_PROMPT.to_string()),
                    Part::InlineData {
                        mime_type: mime_type.clone(),
                        data: data.clone(),
                    },
                ]
            }
            Material::Document { name, text } => {
                info!("Analyzing document upload {} ({} chars)", name, text.chars().count());
                vec![Part::Text(format!(
                    "{}\n\nNome do arquivo: {}\n\nConteúdo do documento:\n{}",
                    DOCUMENT_ANALYSIS_PROMPT, name, text
                ))]
            }
        };

        let request = GenerationRequest::new(
            vec![Turn {
                role: TurnRole::User,
                parts,
            }],
            0.2,
            2000,
        );
        let analysis = self.model.generate(request).await?;
        debug!("Raw analysis: {}", analysis);
        Ok(render_block(&analysis))
    }
}

const IMAGE_ANALYSIS_PROMPT: &str = "Analise esta imagem em detalhes e me proporcione:

1. Descrição detalhada: descreva o que você vê na imagem em termos educacionais.
2. Extração de texto: identifique e transcreva qualquer texto visível.
3. Assunto principal: qual parece ser o tema ou disciplina principal.
4. Contexto educacional: como esta imagem pode ser usada para aprender.

Depois da análise, apresente estas opções ao estudante:

- Criar um plano de estudos baseado neste conteúdo
- Gerar um quiz para testar conhecimentos sobre este material
- Criar um resumo esquematizado dos principais conceitos
- Elaborar cartões de memorização (flashcards)
- Simular um exame sobre este tema
- Explicar conceitos específicos mais detalhadamente
- Criar um mapa mental relacionando os conceitos

Responda em português, com linguagem clara e didática.";

const DOCUMENT_ANALYSIS_PROMPT: &str = "Analise este documento em detalhes e me proporcione:

1. Resumo do conteúdo: sintetize os principais pontos e informações.
2. Conceitos-chave: identifique e explique os conceitos mais importantes.
3. Estrutura do material: como o conteúdo está organizado e como isso afeta o aprendizado.
4. Contexto educacional: como este material pode ser utilizado para aprender.

Depois da análise, apresente estas opções ao estudante:

- Criar um plano de estudos personalizado baseado neste material
- Gerar um quiz para testar conhecimentos sobre este conteúdo
- Criar um resumo esquematizado dos principais conceitos
- Elaborar cartões de memorização (flashcards) para revisão
- Simular um exame sobre este tema
- Explicar conceitos específicos mais detalhadamente
- Criar um mapa mental relacionando os conceitos

Responda em português, com linguagem clara e didática.";
