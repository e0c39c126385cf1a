use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, BodyDataStream},
    http::{Request, StatusCode, header},
};
use futures::{StreamExt, future::BoxFuture, future::join_all};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use idle_quest_back::{
    build_router,
    config::{AppConfig, GameRules},
    dao::{
        game_store::{GameStore, PlayerUpdate, ProgressUpdate, QuestUpdate, memory::MemoryGameStore},
        models::{EnemyEntity, GlobalProgressEntity, LootEntryEntity, PlayerEntity, QuestEntity},
        storage::StorageResult,
    },
    services::enemy_service,
    state::{AppState, SharedState},
};

const SECRET: &str = "let-me-in";

async fn app_with(config: AppConfig, secret: Option<&str>) -> (Router, SharedState) {
    app_with_store(config, secret, Arc::new(MemoryGameStore::new())).await
}

async fn app_with_store(
    config: AppConfig,
    secret: Option<&str>,
    store: Arc<dyn GameStore>,
) -> (Router, SharedState) {
    let state = AppState::new(config, secret.map(str::to_owned));
    enemy_service::seed_catalog(&store, &state.config().enemies)
        .await
        .unwrap();
    state.set_game_store(store).await;
    (build_router(state.clone()), state)
}

async fn app() -> Router {
    app_with(AppConfig::default(), Some(SECRET)).await.0
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_with(app, method, uri, body, Some(SECRET)).await
}

async fn send_public(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_with(app, method, uri, body, None).await
}

async fn send_with(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    secret: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(secret) = secret {
        builder = builder.header("X-Admin-Secret", secret);
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
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn healthcheck_reports_ok_with_a_store() {
    let app = app().await;
    let (status, body) = send_public(&app, "GET", "/healthcheck", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn degraded_mode_answers_503() {
    let state = AppState::new(AppConfig::default(), Some(SECRET.into()));
    let app = build_router(state);

    let (status, body) = send_public(&app, "GET", "/global", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "service_unavailable");

    let (status, body) = send_public(&app, "GET", "/healthcheck", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn global_progress_defaults_and_rolls_over() {
    let app = app().await;

    let (status, body) = send_public(&app, "GET", "/global", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current"], 0);
    assert_eq!(body["goal"], 1_000);
    assert_eq!(body["stage"], 1);

    let (status, body) =
        send_public(&app, "PATCH", "/global", Some(json!({"amount": 1_500}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stages_completed"], 1);
    assert_eq!(body["progress"]["stage"], 2);
    assert_eq!(body["progress"]["current"], 500);
    assert_eq!(body["progress"]["goal"], 1_500);

    let (status, body) = send_public(&app, "PATCH", "/global", Some(json!({"amount": 0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn admin_can_overwrite_progress() {
    let app = app().await;

    let payload = json!({"current": 10, "goal": 20, "stage": 4});
    let (status, _) = send_public(&app, "PUT", "/global", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "PUT", "/global", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stage"], 4);

    let (status, _) = send(
        &app,
        "PUT",
        "/global",
        Some(json!({"current": 0, "goal": 0, "stage": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn players_are_created_fetched_and_validated() {
    let app = app().await;

    let (status, body) =
        send_public(&app, "PUT", "/players/Ayla", Some(json!({"xp": 250}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Ayla");
    assert_eq!(body["level"], 3);
    assert_eq!(body["xp_to_next_level"], 50);

    let (status, body) = send_public(
        &app,
        "PUT",
        "/players/Ayla",
        Some(json!({"equipment": ["sword"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["xp"], 250);
    assert_eq!(body["power"], 10 + 3 * 5 + 3);

    let (status, body) = send_public(&app, "GET", "/players/Ayla", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["equipment"], json!(["sword"]));

    let (status, body) = send_public(&app, "GET", "/players/Nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = send_public(&app, "PUT", "/players/Ayla", Some(json!({"xp": 10}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_public(&app, "GET", "/players/bad!name", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_public(&app, "PUT", "/players/Ayla", Some(json!({"xp": "lots"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn granting_xp_levels_players_up() {
    let app = app().await;
    send_public(&app, "PUT", "/players/Bram", Some(json!({}))).await;

    let (status, body) =
        send_public(&app, "POST", "/players/Bram/xp", Some(json!({"amount": 150}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["previous_level"], 1);
    assert_eq!(body["leveled_up"], true);
    assert_eq!(body["player"]["level"], 2);
    assert_eq!(body["player"]["xp"], 150);

    let (status, _) =
        send_public(&app, "POST", "/players/Ghost/xp", Some(json!({"amount": 5}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) =
        send_public(&app, "POST", "/players/Bram/xp", Some(json!({"amount": 100_001}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn leaderboard_ranks_by_level_then_xp() {
    let app = app().await;
    for (name, xp) in [("Cato", 120), ("Dara", 480), ("Eli", 450), ("Fen", 10)] {
        send_public(&app, "PUT", &format!("/players/{name}"), Some(json!({"xp": xp}))).await;
    }

    let (status, body) = send_public(&app, "GET", "/leaderboard?limit=3", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Dara", "Eli", "Cato"]);
    assert_eq!(body[0]["rank"], 1);

    let (status, _) = send_public(&app, "GET", "/leaderboard?limit=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send_public(&app, "GET", "/players", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Cato");
}

#[tokio::test]
async fn admin_routes_require_the_secret() {
    let app = app().await;
    let quest = json!({"title": "Slay the slime"});

    let (status, body) = send_public(&app, "POST", "/quests", Some(quest.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) =
        send_with(&app, "POST", "/quests", Some(quest.clone()), Some("wrong")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send_public(&app, "DELETE", "/enemies/slime", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "POST", "/quests", Some(quest)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn admin_routes_are_closed_without_a_configured_secret() {
    let (app, _) = app_with(AppConfig::default(), None).await;
    let (status, _) = send(&app, "DELETE", "/players/Ayla", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn quests_follow_their_lifecycle() {
    let app = app().await;

    let (status, quest) = send(
        &app,
        "POST",
        "/quests",
        Some(json!({"title": "Find the amulet", "player": "Ayla"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(quest["status"], "open");
    let uri = format!("/quests/{}", quest["id"].as_str().unwrap());

    let (status, body) =
        send_public(&app, "PATCH", &uri, Some(json!({"status": "in_progress"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "in_progress");

    let (status, body) =
        send_public(&app, "PATCH", &uri, Some(json!({"status": "completed"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["completed_at"].is_string());

    let (status, body) = send_public(&app, "PATCH", &uri, Some(json!({"status": "open"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, body) = send_public(&app, "GET", "/quests", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send_public(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_public(&app, "GET", "/quests/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn enemy_catalog_is_seeded_and_editable() {
    let app = app().await;

    let (status, body) = send_public(&app, "GET", "/enemies", None).await;
    assert_eq!(status, StatusCode::OK);
    let powers: Vec<u64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|enemy| enemy["power"].as_u64().unwrap())
        .collect();
    assert!(powers.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(body[0]["id"], "slime");

    let bat = json!({"name": "Cave Bat", "power": 2, "hp": 5, "xp_reward": 3,
                     "loot": [{"item": "wing", "chance": 0.5}]});
    let (status, body) = send(&app, "PUT", "/enemies/bat", Some(bat)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "bat");

    let (status, body) = send_public(&app, "GET", "/enemies/bat", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loot"][0]["item"], "wing");

    let invalid = json!({"name": "Cursed", "power": 1, "hp": 1, "xp_reward": 1,
                         "loot": [{"item": "gem", "chance": 1.5}]});
    let (status, _) = send(&app, "PUT", "/enemies/cursed", Some(invalid)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "DELETE", "/enemies/bat", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", "/enemies/bat", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn certain_victory_grants_xp_loot_and_progress() {
    let config = AppConfig {
        rules: GameRules {
            min_win_chance: 1.0,
            max_win_chance: 1.0,
            victory_progress: 7,
            ..GameRules::default()
        },
        enemies: vec![EnemyEntity {
            id: "training-dummy".into(),
            name: "Training Dummy".into(),
            power: 1,
            hp: 10,
            xp_reward: 120,
            loot: vec![
                LootEntryEntity {
                    item: "straw".into(),
                    chance: 1.0,
                },
                LootEntryEntity {
                    item: "nothing".into(),
                    chance: 0.0,
                },
            ],
        }],
    };
    let (app, _) = app_with(config, Some(SECRET)).await;
    send_public(&app, "PUT", "/players/Ayla", Some(json!({}))).await;

    let attack = json!({"player": "Ayla", "enemy_id": "training-dummy"});
    let (status, body) = send_public(&app, "POST", "/combat/attack", Some(attack)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["won"], true);
    assert_eq!(body["xp_gained"], 120);
    assert_eq!(body["leveled_up"], true);
    assert_eq!(body["loot"], json!(["straw"]));
    assert_eq!(body["player"]["inventory"], json!(["straw"]));
    assert_eq!(body["global"]["current"], 7);

    let (_, global) = send_public(&app, "GET", "/global", None).await;
    assert_eq!(global["current"], 7);
}

#[tokio::test]
async fn attacking_unknown_targets_is_not_found() {
    let app = app().await;
    send_public(&app, "PUT", "/players/Ayla", Some(json!({}))).await;

    let (status, _) = send_public(
        &app,
        "POST",
        "/combat/attack",
        Some(json!({"player": "Ayla", "enemy_id": "hydra"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_public(
        &app,
        "POST",
        "/combat/attack",
        Some(json!({"player": "Ghost", "enemy_id": "slime"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = app().await;
    let request = Request::builder()
        .method("PATCH")
        .uri("/global")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Memory store that sleeps before every call so concurrent requests interleave.
#[derive(Clone, Default)]
struct SlowStore {
    inner: MemoryGameStore,
}

const STORE_LATENCY: Duration = Duration::from_millis(5);

impl SlowStore {
    fn delayed<T, F>(&self, call: impl FnOnce(MemoryGameStore) -> F + Send + 'static) -> BoxFuture<'static, T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = self.inner.clone();
        Box::pin(async move {
            tokio::time::sleep(STORE_LATENCY).await;
            call(inner).await
        })
    }
}

impl GameStore for SlowStore {
    fn load_progress(&self) -> BoxFuture<'static, StorageResult<Option<GlobalProgressEntity>>> {
        self.delayed(|store| store.load_progress())
    }

    fn save_progress(&self, progress: GlobalProgressEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.delayed(move |store| store.save_progress(progress))
    }

    fn update_progress(
        &self,
        seed: GlobalProgressEntity,
        update: ProgressUpdate,
    ) -> BoxFuture<'static, StorageResult<GlobalProgressEntity>> {
        self.delayed(move |store| store.update_progress(seed, update))
    }

    fn find_player(&self, name: String) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        self.delayed(move |store| store.find_player(name))
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        self.delayed(|store| store.list_players())
    }

    fn leaderboard(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        self.delayed(move |store| store.leaderboard(limit))
    }

    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<bool>> {
        self.delayed(move |store| store.insert_player(player))
    }

    fn update_player(
        &self,
        name: String,
        update: PlayerUpdate,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        self.delayed(move |store| store.update_player(name, update))
    }

    fn delete_player(&self, name: String) -> BoxFuture<'static, StorageResult<bool>> {
        self.delayed(move |store| store.delete_player(name))
    }

    fn find_quest(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestEntity>>> {
        self.delayed(move |store| store.find_quest(id))
    }

    fn list_quests(&self) -> BoxFuture<'static, StorageResult<Vec<QuestEntity>>> {
        self.delayed(|store| store.list_quests())
    }

    fn insert_quest(&self, quest: QuestEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.delayed(move |store| store.insert_quest(quest))
    }

    fn update_quest(
        &self,
        id: Uuid,
        update: QuestUpdate,
    ) -> BoxFuture<'static, StorageResult<Option<QuestEntity>>> {
        self.delayed(move |store| store.update_quest(id, update))
    }

    fn delete_quest(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        self.delayed(move |store| store.delete_quest(id))
    }

    fn find_enemy(&self, id: String) -> BoxFuture<'static, StorageResult<Option<EnemyEntity>>> {
        self.delayed(move |store| store.find_enemy(id))
    }

    fn list_enemies(&self) -> BoxFuture<'static, StorageResult<Vec<EnemyEntity>>> {
        self.delayed(|store| store.list_enemies())
    }

    fn save_enemy(&self, enemy: EnemyEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.delayed(move |store| store.save_enemy(enemy))
    }

    fn insert_enemies(&self, enemies: Vec<EnemyEntity>) -> BoxFuture<'static, StorageResult<()>> {
        self.delayed(move |store| store.insert_enemies(enemies))
    }

    fn delete_enemy(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        self.delayed(move |store| store.delete_enemy(id))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.delayed(|store| store.health_check())
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.delayed(|store| store.try_reconnect())
    }
}

async fn slow_app() -> Router {
    app_with_store(AppConfig::default(), Some(SECRET), Arc::new(SlowStore::default()))
        .await
        .0
}

/// Read SSE frames until one named `name` arrives and return its JSON data.
async fn next_event(stream: &mut BodyDataStream, buffer: &mut String, name: &str) -> Value {
    let event_line = format!("event: {name}");
    loop {
        while let Some(end) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..end + 2).collect();
            if frame.lines().any(|line| line == event_line) {
                let data = frame
                    .lines()
                    .find_map(|line| line.strip_prefix("data: "))
                    .unwrap();
                return serde_json::from_str(data).unwrap();
            }
        }

        let chunk = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap_or_else(|_| panic!("no `{name}` event within 5s"))
            .expect("SSE stream ended")
            .unwrap();
        buffer.push_str(std::str::from_utf8(&chunk).unwrap());
    }
}

#[tokio::test]
async fn public_stream_reports_status_then_game_events() {
    let app = app().await;
    let request = Request::builder()
        .uri("/sse/public")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let mut stream = response.into_body().into_data_stream();
    let mut buffer = String::new();

    let status = next_event(&mut stream, &mut buffer, "system.status").await;
    assert_eq!(status, json!({"degraded": false}));

    send_public(&app, "PATCH", "/global", Some(json!({"amount": 1_200}))).await;
    let progress = next_event(&mut stream, &mut buffer, "progress.updated").await;
    assert_eq!(progress["stages_completed"], 1);
    assert_eq!(progress["progress"]["current"], 200);
    assert_eq!(progress["progress"]["stage"], 2);

    send_public(&app, "PUT", "/players/Ayla", Some(json!({}))).await;
    send_public(&app, "POST", "/players/Ayla/xp", Some(json!({"amount": 230}))).await;
    let level_up = next_event(&mut stream, &mut buffer, "player.leveled_up").await;
    assert_eq!(
        level_up,
        json!({"name": "Ayla", "previous_level": 1, "level": 3})
    );
}

#[tokio::test]
async fn defeat_grants_nothing() {
    let config = AppConfig {
        rules: GameRules {
            min_win_chance: 0.0,
            max_win_chance: 0.0,
            victory_progress: 7,
            ..GameRules::default()
        },
        enemies: vec![EnemyEntity {
            id: "training-dummy".into(),
            name: "Training Dummy".into(),
            power: 1,
            hp: 10,
            xp_reward: 120,
            loot: vec![LootEntryEntity {
                item: "straw".into(),
                chance: 1.0,
            }],
        }],
    };
    let (app, _) = app_with(config, Some(SECRET)).await;
    send_public(&app, "PUT", "/players/Ayla", Some(json!({"xp": 40}))).await;

    let attack = json!({"player": "Ayla", "enemy_id": "training-dummy"});
    let (status, body) = send_public(&app, "POST", "/combat/attack", Some(attack)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["won"], false);
    assert_eq!(body["win_chance"], 0.0);
    assert_eq!(body["xp_gained"], 0);
    assert_eq!(body["leveled_up"], false);
    assert_eq!(body["loot"], json!([]));
    assert!(body.get("global").is_none());
    assert_eq!(body["player"]["xp"], 40);
    assert_eq!(body["player"]["inventory"], json!([]));

    let (_, global) = send_public(&app, "GET", "/global", None).await;
    assert_eq!(global["current"], 0);
    assert_eq!(global["stage"], 1);
}

#[tokio::test]
async fn leaderboard_limit_is_clamped_to_the_configured_maximum() {
    let config = AppConfig {
        rules: GameRules {
            leaderboard_limit: 2,
            max_leaderboard_limit: 2,
            ..GameRules::default()
        },
        ..AppConfig::default()
    };
    let (app, _) = app_with(config, Some(SECRET)).await;
    for (name, xp) in [("Cato", 120), ("Dara", 480), ("Eli", 450)] {
        send_public(&app, "PUT", &format!("/players/{name}"), Some(json!({"xp": xp}))).await;
    }

    let (status, body) = send_public(&app, "GET", "/leaderboard?limit=50", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Dara", "Eli"]);
}

#[tokio::test]
async fn counters_beyond_the_storable_range_are_rejected() {
    let app = app().await;
    let too_big = 9_223_372_036_854_775_808u64;

    let (status, _) =
        send_public(&app, "PUT", "/players/Ayla", Some(json!({"xp": too_big}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PUT",
        "/global",
        Some(json!({"current": too_big, "goal": 10, "stage": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let enemy = json!({"name": "Golem", "power": 1, "hp": 1, "xp_reward": too_big});
    let (status, _) = send(&app, "PUT", "/enemies/golem", Some(enemy)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn huge_progress_overwrite_without_goal_growth_returns_promptly() {
    let config = AppConfig {
        rules: GameRules {
            goal_growth: 1.0,
            ..GameRules::default()
        },
        ..AppConfig::default()
    };
    let (app, _) = app_with(config, Some(SECRET)).await;

    let payload = json!({"current": 9_223_372_036_854_775_807u64, "goal": 1, "stage": 1});
    let (status, body) = tokio::time::timeout(
        Duration::from_secs(5),
        send(&app, "PUT", "/global", Some(payload)),
    )
    .await
    .expect("overwrite took too long");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["goal"], 4_294_967_296u64);
    assert!(body["current"].as_u64().unwrap() < 4_294_967_296);
}

#[tokio::test]
async fn racing_status_changes_cannot_reopen_a_completed_quest() {
    let app = slow_app().await;
    for _ in 0..5 {
        let (_, quest) = send(&app, "POST", "/quests", Some(json!({"title": "Guard the gate"}))).await;
        let uri = format!("/quests/{}", quest["id"].as_str().unwrap());
        send_public(&app, "PATCH", &uri, Some(json!({"status": "in_progress"}))).await;

        let ((complete, _), (reopen, _)) = tokio::join!(
            send_public(&app, "PATCH", &uri, Some(json!({"status": "completed"}))),
            send_public(&app, "PATCH", &uri, Some(json!({"status": "open"}))),
        );
        assert_eq!(complete, StatusCode::OK);
        assert!(reopen == StatusCode::OK || reopen == StatusCode::CONFLICT);

        let (_, stored) = send_public(&app, "GET", &uri, None).await;
        assert_eq!(stored["status"], "completed");
        assert!(stored["completed_at"].is_string());
    }
}

#[tokio::test]
async fn editing_a_quest_while_it_is_deleted_does_not_resurrect_it() {
    let app = slow_app().await;
    let (_, quest) = send(&app, "POST", "/quests", Some(json!({"title": "Fetch water"}))).await;
    let uri = format!("/quests/{}", quest["id"].as_str().unwrap());

    let ((edit, _), (delete, _)) = tokio::join!(
        send_public(&app, "PATCH", &uri, Some(json!({"title": "Fetch more water"}))),
        send(&app, "DELETE", &uri, None),
    );
    assert_eq!(delete, StatusCode::NO_CONTENT);
    assert!(edit == StatusCode::OK || edit == StatusCode::NOT_FOUND);

    let (status, _) = send_public(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, quests) = send_public(&app, "GET", "/quests", None).await;
    assert_eq!(quests, json!([]));
}

#[tokio::test]
async fn concurrent_creates_keep_the_requested_experience() {
    let app = slow_app().await;

    let ((first, _), (second, _)) = tokio::join!(
        send_public(&app, "PUT", "/players/Zed", Some(json!({"xp": 500}))),
        send_public(&app, "PUT", "/players/Zed", Some(json!({}))),
    );
    let mut statuses = [first, second];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CREATED]);

    let (_, player) = send_public(&app, "GET", "/players/Zed", None).await;
    assert_eq!(player["xp"], 500);
    assert_eq!(player["level"], 6);
}

#[tokio::test]
async fn parallel_grants_are_all_counted() {
    let app = slow_app().await;
    send_public(&app, "PUT", "/players/Bram", Some(json!({}))).await;

    let grants = (0..10).map(|_| {
        send_public(&app, "POST", "/players/Bram/xp", Some(json!({"amount": 10})))
    });
    for (status, _) in join_all(grants).await {
        assert_eq!(status, StatusCode::OK);
    }

    let (_, player) = send_public(&app, "GET", "/players/Bram", None).await;
    assert_eq!(player["xp"], 100);
    assert_eq!(player["level"], 2);
}
