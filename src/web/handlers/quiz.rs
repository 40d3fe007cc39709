use actix_web::{web, HttpResponse};
use log::{error, info};
use serde_json::Value;

use crate::assistant::{Difficulty, QuizKind};
use crate::error::ApiError;
use crate::web::models::QuizRequest;
use crate::AppState;

const MIN_CONTENT_CHARS: usize = 50;

/// Requested count, or the kind's default when missing or not a positive
/// number, clamped to the kind's range.
fn question_count(raw: Option<&Value>, kind: QuizKind) -> u32 {
    let requested = raw
        .and_then(Value::as_f64)
        .filter(|n| *n > 0.0)
        .map(|n| n.min(u32::MAX as f64) as u32)
        .unwrap_or_else(|| kind.default_count());
    kind.clamp(requested)
}

// Quiz / exam generation endpoint
pub async fn generate_quiz(
    data: web::Data<AppState>,
    req: web::Json<QuizRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = req.into_inner();

    let content = match req.content {
        Some(Value::String(content)) if !content.is_empty() => content,
        _ => {
            return Err(ApiError::BadRequest(
                "Conteúdo não fornecido ou inválido.".to_string(),
            ))
        }
    };
    if content.chars().count() < MIN_CONTENT_CHARS {
        return Err(ApiError::BadRequest(
            "Conteúdo muito curto para gerar um quiz/exame significativo.".to_string(),
        ));
    }

    let kind = QuizKind::from_type(req.kind.as_ref().and_then(Value::as_str));
    let count = question_count(req.num_questions.as_ref(), kind);
    let difficulty = Difficulty::normalize(req.difficulty.as_ref().and_then(Value::as_str));

    info!(
        "Generating {} with {} questions, difficulty {}",
        kind.label(),
        count,
        difficulty
    );

    match data
        .assistant
        .quiz
        .generate(kind, &content, count, difficulty)
        .await
    {
        Ok(quiz) => Ok(HttpResponse::Ok().json(quiz)),
        Err(e) => {
            error!("Failed to generate {}: {}", kind.label(), e);
            Err(ApiError::Upstream(format!(
                "Falha ao gerar {}: {}",
                kind.label(),
                e
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fake::FakeModel;
    use crate::web::handlers::testing;
    use crate::web::routes;
    use actix_web::{test as actix_test, App};
    use serde_json::json;

    const CONTENT: &str = "A Revolução Francesa começou em 1789 e transformou profundamente a política europeia.";

    fn quiz_reply() -> String {
        json!({
            "title": "Revolução Francesa",
            "questions": [{
                "question": "Em que ano começou?",
                "options": ["1789", "1815", "1848", "1914"],
                "correctAnswer": 0,
                "explanation": "A queda da Bastilha foi em 1789."
            }]
        })
        .to_string()
    }

    #[test]
    fn test_question_count_defaults_and_clamps() {
        assert_eq!(question_count(None, QuizKind::Quiz), 5);
        assert_eq!(question_count(None, QuizKind::Exam), 10);
        assert_eq!(question_count(Some(&json!("dez")), QuizKind::Quiz), 5);
        assert_eq!(question_count(Some(&json!(-4)), QuizKind::Exam), 10);
        assert_eq!(question_count(Some(&json!(1)), QuizKind::Quiz), 3);
        assert_eq!(question_count(Some(&json!(50)), QuizKind::Exam), 20);
        assert_eq!(question_count(Some(&json!(7)), QuizKind::Quiz), 7);
    }

    #[actix_web::test]
    async fn test_exam_request_returns_quiz_data() {
        let (state, model) = testing::state(FakeModel::new().with_reply(&quiz_reply()));
        let app = actix_test::init_service(App::new().app_data(state).configure(routes::configure)).await;

        let req = actix_test::TestRequest::post()
            .uri("/api/quiz")
            .set_json(json!({"content": CONTENT, "type": "exam", "numQuestions": 2, "difficulty": "HARD"}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["title"], "Exame Simulado: Revolução Francesa");
        assert_eq!(body["questions"][0]["correctAnswer"], 0);

        let prompt = model.requests()[0].contents[0].text();
        assert!(prompt.contains("Número de questões: 5"));
        assert!(prompt.contains("Nível de dificuldade: difícil"));
    }

    #[actix_web::test]
    async fn test_short_content_is_rejected() {
        let (state, model) = testing::state(FakeModel::new());
        let app = actix_test::init_service(App::new().app_data(state).configure(routes::configure)).await;

        let req = actix_test::TestRequest::post()
            .uri("/api/quiz")
            .set_json(json!({"content": "curto demais"}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        assert!(model.requests().is_empty());

        let req = actix_test::TestRequest::post()
            .uri("/api/quiz")
            .set_json(json!({"content": 42}))
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), 400);
    }

    #[actix_web::test]
    async fn test_generation_failure_is_500_envelope() {
        let (state, _) = testing::state(FakeModel::new().with_reply("sem json aqui"));
        let app = actix_test::init_service(App::new().app_data(state).configure(routes::configure)).await;

        let req = actix_test::TestRequest::post()
            .uri("/api/quiz")
            .set_json(json!({"content": CONTENT}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), 500);
        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().starts_with("Falha ao gerar quiz"));
    }
}
