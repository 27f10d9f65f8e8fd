use actix_web::{web, HttpResponse};
use tracing::{error, info};

use crate::error::AppError;
use crate::messages::{ConversationStart, IncomingMessage};
use crate::AppState;

/// Webhook the controller calls whenever a conversation starts or its
/// connection must be re-established.
pub async fn conversation_start(
    req: web::Json<ConversationStart>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let start = req.into_inner();
    if start.conversation_id.trim().is_empty() {
        return Err(AppError::ValidationError("conversation_id must not be empty".into()));
    }

    info!("Controller announced conversation {}", start.conversation_id);
    state.controller.open(start).await;
    Ok(HttpResponse::Ok().finish())
}

/// Starts a conversation without a controller socket and returns the greeting.
pub async fn start_conversation(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let conversation_id = path.into_inner();
    let mut conversation = state.conversation(&conversation_id);

    match conversation.start().await {
        Ok(greetings) => Ok(HttpResponse::Ok().json(greetings)),
        Err(e) => {
            error!("Failed to start conversation {}: {}", conversation_id, e);
            Err(e)
        }
    }
}

/// Answers one message without a controller socket.
pub async fn post_message(
    path: web::Path<String>,
    req: web::Json<IncomingMessage>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let conversation_id = path.into_inner();
    let mut conversation = state.conversation(&conversation_id);

    match conversation.answer(&req).await {
        Ok(answers) => Ok(HttpResponse::Ok().json(answers)),
        Err(e) => {
            error!("Failed to answer message {} in {}: {}", req.id, conversation_id, e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::configure;
    use crate::config::Settings;
    use crate::watson::MockAssistantService;
    use actix_web::{test, App};
    use serde_json::json;
    use std::sync::Arc;

    fn state(mock: MockAssistantService) -> web::Data<AppState> {
        let settings = Settings::new_for_test().unwrap();
        web::Data::new(AppState::with_assistant(settings, Arc::new(mock)))
    }

    #[actix_web::test]
    async fn test_webhook_rejects_empty_conversation_id() {
        let app = test::init_service(
            App::new()
                .app_data(state(MockAssistantService::new()))
                .configure(configure),
        )
        .await;

        let resp = test::TestRequest::post()
            .uri("/")
            .set_json(json!({ "conversation_id": " ", "session": "s" }))
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["status"], 400);
    }

    #[actix_web::test]
    async fn test_webhook_requires_session() {
        let app = test::init_service(
            App::new()
                .app_data(state(MockAssistantService::new()))
                .configure(configure),
        )
        .await;

        let resp = test::TestRequest::post()
            .uri("/")
            .set_json(json!({ "conversation_id": "c1" }))
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["status"], 400);
        assert!(body["error"]["message"].as_str().unwrap().contains("session"));
    }

    #[actix_web::test]
    async fn test_post_message_rejects_invalid_body() {
        let app = test::init_service(
            App::new()
                .app_data(state(MockAssistantService::new()))
                .configure(configure),
        )
        .await;

        let resp = test::TestRequest::post()
            .uri("/conversations/c1/messages")
            .set_json(json!({ "id": "m1", "text": "hi" }))
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["status"], 400);
    }

    #[actix_web::test]
    async fn test_post_message_returns_translated_replies() {
        let mut mock = MockAssistantService::new();
        mock.expect_create_session().times(1).returning(|| Ok("s1".to_string()));
        mock.expect_message().times(1).returning(|_, _, _| {
            Ok(vec![json!({
                "response_type": "image",
                "source": "https://example.com/cat.png",
                "title": "Cat"
            })])
        });

        let app = test::init_service(App::new().app_data(state(mock)).configure(configure)).await;

        let resp = test::TestRequest::post()
            .uri("/conversations/c1/messages")
            .set_json(json!({ "id": "m9", "text": "show me", "type": "T", "sent_by_human": true }))
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body[0]["type"], "i");
        assert_eq!(body[0]["text"], "Cat");
        assert_eq!(body[0]["external_file_url"], "https://example.com/cat.png");
        assert_eq!(body[0]["quoted_message_id"], "m9");
    }

    #[actix_web::test]
    async fn test_post_message_surfaces_vendor_error() {
        let mut mock = MockAssistantService::new();
        mock.expect_create_session()
            .returning(|| Err(crate::error::AssistantError::Auth("bad api key".into())));

        let app = test::init_service(App::new().app_data(state(mock)).configure(configure)).await;

        let resp = test::TestRequest::post()
            .uri("/conversations/c1/messages")
            .set_json(json!({ "id": "m1", "text": "hi", "type": "T", "sent_by_human": true }))
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), 502);
    }
}
