use std::fs;
use std::path::Path;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use marquee_api::{
    api::{create_router, AppState},
    config::Config,
    data::{artifacts, Dataset},
    services::ModelContext,
};

fn write_dataset(dir: &Path) -> (String, String) {
    let movies = json!([
        {
            "movie_id": 1,
            "title": "Toy Story",
            "overview": "Woody the cowboy toy feels threatened when Buzz Lightyear the space toy arrives",
            "genre": "Animation, Comedy, Family",
            "cast": "Tom Hanks, Tim Allen",
            "director": "John Lasseter",
            "original_language": "en",
            "rating": 3.9
        },
        {
            "movie_id": 2,
            "title": "Toy Story 2",
            "overview": "Woody the cowboy toy is stolen and Buzz Lightyear leads the toys on a rescue",
            "genre": "Animation, Comedy, Family",
            "cast": "Tom Hanks, Tim Allen",
            "director": "John Lasseter",
            "original_language": "en",
            "rating": 3.8
        },
        {
            "movie_id": 3,
            "title": "Tin Toy",
            "overview": "A wind-up toy musician tries to escape a drooling baby",
            "genre": "Animation, Short",
            "director": "John Lasseter",
            "original_language": "en",
            "rating": 3.4
        },
        {
            "movie_id": 4,
            "title": "The Dark Knight",
            "overview": "Batman faces the Joker in Gotham City",
            "genre": "Action, Crime, Drama",
            "cast": "Christian Bale, Heath Ledger",
            "director": "Christopher Nolan",
            "original_language": "en",
            "rating": 4.5
        },
        {
            "movie_id": 5,
            "title": "Inception",
            "overview": "A thief who steals secrets by entering dreams",
            "genre": "Action, Sci-Fi, Thriller",
            "cast": "Leonardo DiCaprio, Marion Cotillard",
            "director": "Christopher Nolan",
            "original_language": "en",
            "rating": 4.2
        }
    ]);
    let ratings = "userId,movieId,rating\n\
                   1,1,5.0\n1,2,4.5\n1,3,3.0\n1,4,2.0\n\
                   2,1,4.0\n2,4,5.0\n2,5,5.0\n\
                   3,2,5.0\n3,3,2.5\n3,5,3.0\n";

    let movies_path = dir.join("movies.json");
    let ratings_path = dir.join("ratings.csv");
    fs::write(&movies_path, movies.to_string()).unwrap();
    fs::write(&ratings_path, ratings).unwrap();
    (
        movies_path.display().to_string(),
        ratings_path.display().to_string(),
    )
}

fn test_config(dir: &Path) -> Config {
    let (movies_path, ratings_path) = write_dataset(dir);
    Config {
        models_dir: dir.join("models").display().to_string(),
        movies_path,
        ratings_path,
        latent_factors: 4,
        training_epochs: 200,
        learning_rate: 0.05,
        regularization: 0.02,
        ..Config::default()
    }
}

fn trained_context(config: &Config) -> ModelContext {
    let dataset = Dataset::load(&config.movies_path, &config.ratings_path).unwrap();
    ModelContext::train(&dataset, config).unwrap()
}

fn create_test_server(dir: &TempDir) -> TestServer {
    let config = test_config(dir.path());
    let ctx = trained_context(&config);
    let state = AppState::new(config, Some(ctx));
    TestServer::new(create_router(state)).unwrap()
}

fn create_unready_server(dir: &TempDir) -> TestServer {
    let config = test_config(dir.path());
    let state = AppState::load(config);
    assert!(!state.is_ready());
    TestServer::new(create_router(state)).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_recommend() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let response = server
        .get("/api/recommend")
        .add_query_param("movie_title", "Toy Story")
        .add_query_param("user_id", 1)
        .add_query_param("alpha", 0.6)
        .add_query_param("top_n", 3)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["movie_title"], "Toy Story");
    assert_eq!(body["matched_title"], "Toy Story");
    assert_eq!(body["user_id"], 1);
    assert_eq!(body["top_n"], 3);

    let recs = body["recommendations"].as_array().unwrap();
    assert_eq!(recs.len(), 3);
    assert_eq!(recs[0]["title"], "Toy Story 2");
    for rec in recs {
        assert_ne!(rec["movie_id"], 1);
        for field in ["movie_id", "title", "genre", "overview", "rating", "score", "content_score", "collab_score"] {
            assert!(rec.get(field).is_some(), "missing {}", field);
        }
    }
    let scores: Vec<f64> = recs.iter().map(|r| r["score"].as_f64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_recommend_defaults() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let response = server
        .get("/api/recommend")
        .add_query_param("movie_title", "toy story")
        .add_query_param("user_id", 2)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["alpha"], 0.6);
    assert_eq!(body["top_n"], 10);
    // five movies, reference excluded
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_recommend_cold_start_user() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let response = server
        .get("/api/recommend")
        .add_query_param("movie_title", "Toy Story")
        .add_query_param("user_id", 4242)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let recs = body["recommendations"].as_array().unwrap();
    assert!(!recs.is_empty());
    assert!(recs.iter().all(|r| r["collab_score"] == 0.5));
}

#[tokio::test]
async fn test_recommend_unknown_movie() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let response = server
        .get("/api/recommend")
        .add_query_param("movie_title", "Non-existent Movie")
        .add_query_param("user_id", 1)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Non-existent Movie"));
}

#[tokio::test]
async fn test_recommend_validation_errors() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let cases = [
        vec![("user_id", "1")],
        vec![("movie_title", "Toy Story")],
        vec![("movie_title", "Toy Story"), ("user_id", "abc")],
        vec![("movie_title", "Toy Story"), ("user_id", "0")],
        vec![("movie_title", "Toy Story"), ("user_id", "1"), ("alpha", "1.5")],
        vec![("movie_title", "Toy Story"), ("user_id", "1"), ("top_n", "0")],
        vec![("movie_title", "Toy Story"), ("user_id", "1"), ("top_n", "51")],
    ];

    for params in cases {
        let mut request = server.get("/api/recommend");
        for (key, value) in &params {
            request = request.add_query_param(key, value);
        }
        let response = request.await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].is_string(), "no error message for {:?}", params);
    }
}

#[tokio::test]
async fn test_status_ready() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let ctx = trained_context(&config);
    artifacts::save_models(&config.models_dir, &ctx).unwrap();

    let state = AppState::load(config);
    assert!(state.is_ready());
    let server = TestServer::new(create_router(state)).unwrap();

    let response = server.get("/api/status").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["models"]["is_ready"], true);
    assert_eq!(body["models"]["total_models"], 4);
    assert_eq!(body["dataset"]["movies"], 5);
    assert_eq!(body["dataset"]["ratings"], 10);
    assert_eq!(body["dataset"]["users"], 3);
    assert!(body["loaded_at"].is_string());

    let response = server
        .get("/api/recommend")
        .add_query_param("movie_title", "Inception")
        .add_query_param("user_id", 3)
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_status_not_ready() {
    let dir = TempDir::new().unwrap();
    let server = create_unready_server(&dir);

    let response = server.get("/api/status").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "not_ready");
    assert!(body["models"]["models_dir"].as_str().unwrap().ends_with("models"));
    assert_eq!(body["models"]["is_ready"], false);
    assert_eq!(body["models"]["missing_models"].as_array().unwrap().len(), 4);
    assert!(body["dataset"].is_null());
}

#[tokio::test]
async fn test_routes_unavailable_without_models() {
    let dir = TempDir::new().unwrap();
    let server = create_unready_server(&dir);

    let response = server
        .get("/api/recommend")
        .add_query_param("movie_title", "Toy Story")
        .add_query_param("user_id", 1)
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let response = server.get("/api/movies").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_invalid_params_rejected_without_models() {
    let dir = TempDir::new().unwrap();
    let server = create_unready_server(&dir);

    let response = server
        .get("/api/recommend")
        .add_query_param("movie_title", "Toy Story")
        .add_query_param("user_id", 1)
        .add_query_param("alpha", 1.5)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .get("/api/recommend")
        .add_query_param("movie_title", "Toy Story")
        .add_query_param("user_id", -4)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_movies() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let response = server.get("/api/movies").add_query_param("q", "TOY").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["query"], "TOY");
    assert_eq!(body["total"], 3);
    assert_eq!(body["movies"][0]["title"], "Toy Story");
    assert_eq!(
        body["movies"][0],
        json!({ "movie_id": 1, "title": "Toy Story", "genre": "Animation, Comedy, Family", "rating": 3.9 })
    );

    let response = server
        .get("/api/movies")
        .add_query_param("limit", 2)
        .await;
    let body: Value = response.json();
    assert_eq!(body["total"], 2);
    assert_eq!(body["query"], "");

    let response = server.get("/api/movies").add_query_param("limit", 0).await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_request_id_header() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server(&dir);

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("req-42"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "req-42");

    let response = server.get("/health").await;
    assert!(!response.header("x-request-id").is_empty());
}
