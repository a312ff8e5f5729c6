#[cfg(test)]
mod learn_api_integration_tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use learnserver::core::config::AppConfig;
    use learnserver::core::shared::state::AppState;
    use learnserver::main_module::build_router;
    use learnserver::security::Argon2Config;
    use learnserver::store::MemoryStore;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let state = AppState::with_argon2(
            AppConfig::default(),
            Arc::new(MemoryStore::new()),
            Argon2Config::low_memory(),
        )
        .expect("Failed to build state");
        build_router(Arc::new(state))
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn register_and_login(app: &Router, email: &str, style: &str) -> (String, String) {
        let (status, body) = call(
            app,
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "name": "Test Student",
                "email": email,
                "password": "tangerine-river",
                "learning_style": style
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        let (status, body) = call(
            app,
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": email, "password": "tangerine-river" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let token = body["data"]["token"].as_str().unwrap().to_string();
        let id = body["data"]["user"]["id"].as_str().unwrap().to_string();
        (token, id)
    }

    async fn create(app: &Router, token: &str, uri: &str, body: Value) -> Value {
        let (status, body) = call(app, Method::POST, uri, Some(token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = app();
        let (status, body) = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "learnserver");
    }

    #[tokio::test]
    async fn test_full_learning_flow() {
        let app = app();
        let (token, learner_id) = register_and_login(&app, "flow@example.com", "kinesthetic").await;

        let course = create(
            &app,
            &token,
            "/api/courses",
            json!({ "name": "Mathematics", "description": "Numbers" }),
        )
        .await;
        let course_id = course["id"].as_str().unwrap();

        let algebra = create(
            &app,
            &token,
            "/api/topics",
            json!({ "course_id": course_id, "name": "Algebra" }),
        )
        .await;
        let algebra_id = algebra["id"].as_str().unwrap();
        let geometry = create(
            &app,
            &token,
            "/api/topics",
            json!({ "course_id": course_id, "name": "Geometry" }),
        )
        .await;
        let geometry_id = geometry["id"].as_str().unwrap();

        create(
            &app,
            &token,
            "/api/materials",
            json!({
                "topic_id": algebra_id,
                "type": "pdf",
                "title": "Algebra Workbook",
                "content_url": "https://example.com/algebra.pdf"
            }),
        )
        .await;
        create(
            &app,
            &token,
            "/api/materials",
            json!({
                "topic_id": geometry_id,
                "type": "video",
                "title": "Shapes",
                "content_url": "https://example.com/shapes"
            }),
        )
        .await;

        let quiz = create(
            &app,
            &token,
            "/api/quizzes",
            json!({
                "topic_id": algebra_id,
                "title": "Algebra Quiz",
                "questions": [
                    { "question": "2x = 4, x = ?", "options": ["1", "2"], "correct_answer": 1 },
                    { "question": "x + 1 = 1, x = ?", "options": ["0", "1"], "correct": "0" },
                    { "question": "3x = 9, x = ?", "options": ["3", "6"], "correct_answer": 0 },
                    { "question": "x - 2 = 0, x = ?", "options": ["2", "4"], "correct_answer": 0 }
                ]
            }),
        )
        .await;
        let quiz_id = quiz["id"].as_str().unwrap();

        let (status, topics) = call(
            &app,
            Method::GET,
            &format!("/api/topics/{course_id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(topics["data"].as_array().unwrap().len(), 2);

        // 2 of 4 correct
        let (status, result) = call(
            &app,
            Method::POST,
            &format!("/api/quizzes/{quiz_id}/submit"),
            Some(&token),
            Some(json!({ "answers": [1, 0, 1, null] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{result}");
        assert_eq!(result["success"], true);
        assert_eq!(result["data"]["score"], 50);
        assert_eq!(result["data"]["grade"], "F");
        assert_eq!(result["data"]["status"], "in_progress");
        assert_eq!(result["data"]["points_earned"], 5);

        let (status, recs) = call(
            &app,
            Method::GET,
            &format!("/api/recommendations/{learner_id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let recs = recs["data"].as_array().unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0]["topic_name"], "Algebra");
        assert_eq!(recs[0]["material"]["type"], "pdf");
        assert!(recs[0]["reason"]
            .as_str()
            .unwrap()
            .starts_with("Improve score in Algebra (score: 50)"));
        assert_eq!(recs[1]["reason"], "Explore new topic: Geometry");

        // Sparse answers, all correct
        let (status, result) = call(
            &app,
            Method::POST,
            &format!("/api/quizzes/{quiz_id}/submit"),
            Some(&token),
            Some(json!({ "answers": { "0": 1, "1": "0", "2": 0, "3": 0 } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{result}");
        assert_eq!(result["data"]["score"], 100);
        assert_eq!(result["data"]["total_points"], 15);
        assert_eq!(
            result["data"]["new_badges"],
            json!(["Quiz Master", "Perfect Score"])
        );

        let (status, progress) = call(
            &app,
            Method::GET,
            &format!("/api/progress/{learner_id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let entry = &progress["data"][0];
        assert_eq!(entry["topic_name"], "Algebra");
        assert_eq!(entry["course_name"], "Mathematics");
        assert_eq!(entry["status"], "completed");
        assert_eq!(entry["quiz_attempts"].as_array().unwrap().len(), 2);

        let (status, profile) = call(&app, Method::GET, "/api/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["data"]["points"], 15);
        assert!(profile["data"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_auth_failures() {
        let app = app();
        let (token, learner_id) = register_and_login(&app, "auth@example.com", "visual").await;
        let (_, other_id) = register_and_login(&app, "other@example.com", "auditory").await;

        let (status, body) = call(&app, Method::GET, "/api/courses", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, _) = call(&app, Method::GET, "/api/courses", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(
            &app,
            Method::GET,
            &format!("/api/progress/{other_id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(
            &app,
            Method::GET,
            &format!("/api/recommendations/{other_id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);

        let (status, _) = call(
            &app,
            Method::GET,
            &format!("/api/recommendations/{learner_id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": "auth@example.com", "password": "wrong-password" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "name": "Dup", "email": "auth@example.com", "password": "tangerine-river" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_submission_errors() {
        let app = app();
        let (token, _) = register_and_login(&app, "errors@example.com", "visual").await;

        let missing = "00000000-0000-0000-0000-000000000000";
        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/api/quizzes/{missing}/submit"),
            Some(&token),
            Some(json!({ "answers": [0] })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/progress",
            Some(&token),
            Some(json!({ "topic_id": missing, "score": 150 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/quizzes",
            Some(&token),
            Some(json!({ "title": "No topic" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Invalid request body"));
    }

    #[tokio::test]
    async fn test_sparse_answer_keys() {
        let app = app();
        let (token, _) = register_and_login(&app, "sparse@example.com", "auditory").await;

        let course = create(&app, &token, "/api/courses", json!({ "name": "Science" })).await;
        let topic = create(
            &app,
            &token,
            "/api/topics",
            json!({ "course_id": course["id"], "name": "Cells" }),
        )
        .await;
        let quiz = create(
            &app,
            &token,
            "/api/quizzes",
            json!({
                "topic_id": topic["id"],
                "title": "Cells Quiz",
                "questions": [
                    { "question": "Powerhouse?", "options": ["Nucleus", "Mitochondria"], "correct_answer": 1 },
                    { "question": "Control centre?", "options": ["Nucleus", "Ribosome"], "correct_answer": 0 }
                ]
            }),
        )
        .await;
        let submit = format!("/api/quizzes/{}/submit", quiz["id"].as_str().unwrap());

        let (status, result) = call(
            &app,
            Method::POST,
            &submit,
            Some(&token),
            Some(json!({ "answers": { "0": 1, "1": null } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{result}");
        assert_eq!(result["data"]["score"], 50);

        let (status, body) = call(
            &app,
            Method::POST,
            &submit,
            Some(&token),
            Some(json!({ "answers": { "1": 0, "01": 0 } })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}
