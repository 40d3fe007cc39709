use actix_web::web;
use crate::web::handlers::{self, chat, quiz, sessions, upload};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(handlers::json_error))
        .service(
            web::scope("/api")
                .route("/chat", web::post().to(chat::chat))
                .route("/quiz", web::post().to(quiz::generate_quiz))
                .route("/upload", web::post().to(upload::upload))
                .route("/sessions", web::get().to(sessions::list_sessions))
                .route("/sessions", web::post().to(sessions::create_session))
                .route("/sessions/current", web::get().to(sessions::current_session))
                .route("/sessions/current", web::put().to(sessions::set_current_session))
                .route("/sessions/{id}", web::get().to(sessions::get_session))
                .route("/sessions/{id}", web::delete().to(sessions::delete_session))
                .route("/sessions/{id}/messages", web::post().to(sessions::append_message))
                .route("/sessions/{id}/file", web::get().to(sessions::uploaded_file)),
        )
        .route("/", web::get().to(handlers::index))
        .route("/health", web::get().to(handlers::health_check));
}
