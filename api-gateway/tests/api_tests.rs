//! Router tests against the in-memory store.

use std::sync::Arc;

use api_gateway::{router, AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use song_ingest::{FakeFaultSink, FaultDiagnostic, FaultSink, FaultStage};
use song_store::{InMemorySongStore, NewSong, SongId, SongStore, UserId};
use tower::util::ServiceExt;

struct Harness {
    app: Router,
    store: InMemorySongStore,
    faults: FakeFaultSink,
}

fn harness() -> Harness {
    let store = InMemorySongStore::new();
    let faults = FakeFaultSink::new();
    let state = Arc::new(AppState {
        store: Arc::new(store.clone()),
        faults: Arc::new(faults.clone()),
    });
    Harness {
        app: router(state),
        store,
        faults,
    }
}

async fn seed(store: &InMemorySongStore, spotify_song_id: &str) -> SongId {
    store
        .upsert_song(&NewSong {
            name: "Seeded".into(),
            img: None,
            tempo: 120.0,
            loudness: -6.0,
            duration: Some(200),
            popularity: 5,
            album_genre: "rock".into(),
            spotify_album_id: "al".into(),
            spotify_artist_id: "ar".into(),
            spotify_song_id: spotify_song_id.into(),
        })
        .await
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post(uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::empty()).unwrap()
}

fn song(spotify_song_id: &str, name: &str) -> Value {
    json!({
        "name": name,
        "tempo": 1.0,
        "loudness": -5.0,
        "popularity": 10,
        "album_genre": "pop",
        "spotify_album_id": "al1",
        "spotify_artist_id": "ar1",
        "spotify_song_id": spotify_song_id
    })
}

// ------------------------------------------------------------------ //
//  Envelope                                                           //
// ------------------------------------------------------------------ //

#[tokio::test]
async fn health_is_open() {
    let h = harness();
    let (status, body) = send(&h.app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn unknown_route_is_404_json() {
    let h = harness();
    let (status, body) = send(&h.app, get("/api/nothing", Some("1"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({"status": "failed", "message": "The requested route was not found."})
    );
}

#[tokio::test]
async fn batch_routes_require_caller_identity() {
    let h = harness();
    for user in [None, Some("abc")] {
        let (status, body) = send(
            &h.app,
            post("/api/song/like", user, json!({"songs": [{"song_id": 1}]})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"status": "failed", "message": "Unauthorized"}));
    }
    assert_eq!(h.store.read_calls(), 0);
}

#[tokio::test]
async fn missing_songs_array_is_400_required() {
    let h = harness();
    let (status, body) = send(&h.app, post("/api/song", Some("1"), json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"status": "failed", "errors": [{"param": "songs", "type": "required"}]})
    );
}

#[tokio::test]
async fn non_array_songs_is_400_validity() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        post("/api/song/rate", Some("1"), json!({"songs": {"song_id": 1}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["param"], "songs");
    assert_eq!(body["errors"][0]["type"], "validity");
}

#[tokio::test]
async fn unparseable_body_is_400() {
    let h = harness();
    let req = Request::builder()
        .method("POST")
        .uri("/api/song")
        .header("content-type", "application/json")
        .header("x-user-id", "1")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&h.app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "failed");
    assert!(body["message"].is_string());
}

// ------------------------------------------------------------------ //
//  Batches                                                            //
// ------------------------------------------------------------------ //

#[tokio::test]
async fn catalog_batch_reports_each_position() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        post(
            "/api/song",
            Some("1"),
            json!({"songs": [song("s1", "A"), song("s2", ""), "junk"]}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "succeeded");
    let songs = body["songs"].as_array().unwrap();
    assert_eq!(songs.len(), 3);
    assert_eq!(songs[0], json!({"status": "succeeded"}));
    assert_eq!(songs[1]["status"], "failed");
    assert_eq!(songs[1]["errors"][0]["param"], "songs[1].name");
    assert_eq!(songs[1]["errors"][0]["type"], "required");
    assert_eq!(songs[2]["status"], "failed");
    assert!(songs[2]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .all(|e| e["type"] == "required"));
    assert_eq!(h.store.songs().len(), 1);
}

#[tokio::test]
async fn catalog_text_is_escaped_before_storage() {
    let h = harness();
    let (status, _) = send(
        &h.app,
        post("/api/song", Some("1"), json!({"songs": [song("s1", "<b>Hits</b>")]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let stored = h.store.song_by_spotify_id("s1").unwrap();
    assert_eq!(stored.fields.name, "&lt;b&gt;Hits&lt;&#x2F;b&gt;");
}

#[tokio::test]
async fn like_then_list_then_dislike() {
    let h = harness();
    let a = seed(&h.store, "a").await;
    let b = seed(&h.store, "b").await;

    let (status, body) = send(
        &h.app,
        post(
            "/api/song/like",
            Some("7"),
            json!({"songs": [{"song_id": a.0}, {"song_id": 424242}, {"song_id": b.0.to_string()}]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["songs"],
        json!([
            {"status": "succeeded"},
            {"status": "failed", "message": "song id does not exist"},
            {"status": "succeeded"}
        ])
    );

    let (status, body) = send(&h.app, get("/api/song/favorite", Some("7"))).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["songs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![a.0, b.0]);

    send(
        &h.app,
        post("/api/song/dislike", Some("7"), json!({"songs": [{"song_id": a.0}]})),
    )
    .await;
    assert!(!h.store.is_favorite(UserId(7), a));
    assert!(h.store.is_favorite(UserId(7), b));
    assert!(h.faults.snapshot().is_empty());
}

#[tokio::test]
async fn favorites_are_per_caller() {
    let h = harness();
    let a = seed(&h.store, "a").await;
    send(
        &h.app,
        post("/api/song/like", Some("1"), json!({"songs": [{"song_id": a.0}]})),
    )
    .await;

    let (_, body) = send(&h.app, get("/api/song/favorite", Some("2"))).await;
    assert_eq!(body, json!({"status": "succeeded", "songs": []}));
}

#[tokio::test]
async fn store_fault_is_generic_for_client_and_detailed_for_operators() {
    let h = harness();
    let a = seed(&h.store, "a").await;
    let b = seed(&h.store, "b").await;
    h.store.fail_writes_for(a);

    let (status, body) = send(
        &h.app,
        post(
            "/api/song/rate",
            Some("3"),
            json!({"songs": [
                {"song_id": a.0, "pace": 1, "rate": 4.0},
                {"song_id": b.0, "pace": 1, "rate": 5.0}
            ]}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["songs"],
        json!([
            {"status": "failed", "message": "Internal server error"},
            {"status": "succeeded"}
        ])
    );

    let faults = h.faults.snapshot();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].index, 0);
    assert_eq!(faults[0].stage, FaultStage::Persist);
    assert_eq!(faults[0].operation, "rating");
    assert!(!body.to_string().contains(&faults[0].detail));
}

struct BrokenSink;

#[async_trait]
impl FaultSink for BrokenSink {
    async fn record(&self, _faults: &[FaultDiagnostic]) -> anyhow::Result<()> {
        anyhow::bail!("request_log unavailable")
    }
}

#[tokio::test]
async fn sink_failure_does_not_change_the_response() {
    let store = InMemorySongStore::new();
    store.fail_upserts_of("s1");
    let app = router(Arc::new(AppState {
        store: Arc::new(store.clone()),
        faults: Arc::new(BrokenSink),
    }));

    let (status, body) = send(
        &app,
        post("/api/song", Some("1"), json!({"songs": [song("s1", "A"), song("s2", "B")]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["songs"][0]["message"], "Internal server error");
    assert_eq!(body["songs"][1], json!({"status": "succeeded"}));
}
