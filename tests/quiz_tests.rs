// tests/quiz_tests.rs

mod common;

use common::{generate_quiz, register_and_login, sample_quiz_json, seed_interests, spawn_app};

#[tokio::test]
async fn generate_requires_interests() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &app.address).await;

    let resp = client
        .post(format!("{}/api/quizzes/generate", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "difficulty": "beginner" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("No interests on file")
    );

    let quiz_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quizzes")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(quiz_count, 0);
}

#[tokio::test]
async fn generate_creates_quiz_from_interest_profile() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (user_id, token) = register_and_login(&client, &app.address).await;
    seed_interests(&client, &app.address, &token, &[("Programming", 9)]).await;

    let quiz = generate_quiz(&app, &client, &token, 5).await;

    assert_eq!(quiz["user_id"].as_i64().unwrap(), user_id);
    assert_eq!(quiz["subject_area"], "Programming");
    assert_eq!(quiz["difficulty"], "beginner");
    assert_eq!(quiz["is_generated"], true);

    let questions = quiz["questions"].as_array().unwrap();
    assert!(!questions.is_empty() && questions.len() <= 10);

    for (i, question) in questions.iter().enumerate() {
        assert_eq!(question["order_index"].as_i64().unwrap(), i as i64);
        let options = question["options"].as_array().unwrap();
        assert_eq!(options.len(), 4);
        let correct = options
            .iter()
            .filter(|o| o["is_correct"] == true)
            .count();
        assert_eq!(correct, 1);
    }
}

#[tokio::test]
async fn generate_clamps_question_count() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &app.address).await;
    seed_interests(&client, &app.address, &token, &[("History", 6)]).await;

    app.provider.push_ok(sample_quiz_json("Clamped", 10));

    let resp = client
        .post(format!("{}/api/quizzes/generate", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "difficulty": "intermediate", "question_count": 25 }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 201);

    let prompts = app.provider.prompts.lock().unwrap();
    assert!(prompts.last().unwrap().contains("exactly 10"));
}

#[tokio::test]
async fn generate_retries_transient_provider_failure() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &app.address).await;
    seed_interests(&client, &app.address, &token, &[("Math", 5)]).await;

    app.provider.push_err("rate limited");
    app.provider.push_ok(sample_quiz_json("Retried", 3));

    let resp = client
        .post(format!("{}/api/quizzes/generate", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "difficulty": "beginner", "question_count": 3 }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 201);
    let quiz: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(quiz["title"], "Retried");
}

#[tokio::test]
async fn generate_fails_cleanly_when_retry_budget_is_exhausted() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &app.address).await;
    seed_interests(&client, &app.address, &token, &[("Math", 5)]).await;

    app.provider.push_err("rate limited");
    app.provider.push_err("rate limited again");

    let resp = client
        .post(format!("{}/api/quizzes/generate", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "difficulty": "beginner" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 502);
}

#[tokio::test]
async fn malformed_provider_output_persists_nothing() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &app.address).await;
    seed_interests(&client, &app.address, &token, &[("Biology", 7)]).await;

    app.provider
        .push_ok("Sorry, I cannot generate a quiz today.");

    let resp = client
        .post(format!("{}/api/quizzes/generate", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "difficulty": "advanced" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 502);

    let quiz_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quizzes")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(quiz_count, 0);
}

#[tokio::test]
async fn personalized_batch_skips_failed_interests() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &app.address).await;
    seed_interests(
        &client,
        &app.address,
        &token,
        &[("Astronomy", 9), ("Chemistry", 5), ("Drawing", 2)],
    )
    .await;

    // Astronomy succeeds, Chemistry fails both attempts, Drawing succeeds.
    app.provider.push_ok(sample_quiz_json("Astronomy Quiz", 5));
    app.provider.push_err("overloaded");
    app.provider.push_err("still overloaded");
    app.provider.push_ok(sample_quiz_json("Drawing Quiz", 5));

    let resp = client
        .post(format!("{}/api/quizzes/generate/personalized", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 201);
    let quizzes: Vec<serde_json::Value> = resp.json().await.unwrap();
    assert_eq!(quizzes.len(), 2);

    // Difficulty is bucketed from the interest level.
    assert_eq!(quizzes[0]["subject_area"], "Astronomy");
    assert_eq!(quizzes[0]["difficulty"], "advanced");
    assert_eq!(quizzes[1]["subject_area"], "Drawing");
    assert_eq!(quizzes[1]["difficulty"], "beginner");
}

#[tokio::test]
async fn list_returns_own_quizzes_newest_first() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &app.address).await;
    seed_interests(&client, &app.address, &token, &[("Programming", 8)]).await;

    let first = generate_quiz(&app, &client, &token, 2).await;
    let second = generate_quiz(&app, &client, &token, 2).await;

    let resp = client
        .get(format!("{}/api/quizzes/", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let quizzes: Vec<serde_json::Value> = resp.json().await.unwrap();
    assert_eq!(quizzes.len(), 2);
    assert_eq!(quizzes[0]["id"], second["id"]);
    assert_eq!(quizzes[1]["id"], first["id"]);
}

#[tokio::test]
async fn get_quiz_is_scoped_to_the_owner() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, owner_token) = register_and_login(&client, &app.address).await;
    seed_interests(&client, &app.address, &owner_token, &[("Programming", 8)]).await;
    let quiz = generate_quiz(&app, &client, &owner_token, 3).await;
    let quiz_id = quiz["id"].as_i64().unwrap();

    let (_, other_token) = register_and_login(&client, &app.address).await;

    let resp = client
        .get(format!("{}/api/quizzes/{}", app.address, quiz_id))
        .header("Authorization", format!("Bearer {}", other_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = client
        .get(format!("{}/api/quizzes/{}", app.address, quiz_id))
        .header("Authorization", format!("Bearer {}", owner_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn delete_quiz_leaves_no_orphans() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &app.address).await;
    seed_interests(&client, &app.address, &token, &[("Programming", 8)]).await;

    let quiz = generate_quiz(&app, &client, &token, 3).await;
    let quiz_id = quiz["id"].as_i64().unwrap();
    let question = &quiz["questions"][0];
    let question_id = question["id"].as_i64().unwrap();
    let option_id = question["options"][0]["id"].as_i64().unwrap();

    // Create an attempt with one answer so every table has rows to cascade.
    let attempt: serde_json::Value = client
        .post(format!("{}/api/attempts/", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "quiz_id": quiz_id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let attempt_id = attempt["id"].as_i64().unwrap();

    let resp = client
        .post(format!("{}/api/attempts/{}/answers", app.address, attempt_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "question_id": question_id,
            "selected_option_id": option_id
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = client
        .delete(format!("{}/api/quizzes/{}", app.address, quiz_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    for table in [
        "quizzes",
        "quiz_questions",
        "quiz_options",
        "quiz_attempts",
        "quiz_answers",
    ] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&app.pool)
            .await
            .unwrap();
        assert_eq!(count, 0, "expected no rows left in {}", table);
    }

    let resp = client
        .get(format!("{}/api/quizzes/{}", app.address, quiz_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = client
        .get(format!("{}/api/attempts/{}", app.address, attempt_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}
