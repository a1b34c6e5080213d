//! Integration tests for the match-maker service
//!
//! These tests drive the system through its public surfaces:
//! - the HTTP API router, end to end
//! - the lobby with its background sweep loop
//! - concurrent joins from many tasks, with and without a racing sweep
//! - leaderboard storage failures

mod fixtures;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use fixtures::{create_players, create_test_player, FailingLeaderboardStorage, TestSystem};
use match_maker::lobby::Lobby;
use match_maker::types::{JoinId, MatchId, MatchOutcome, MAX_PLAYERS_PER_MATCH};
use match_maker::LeaderboardStorage;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt; // for oneshot

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn join(app: &Router, player_id: &str, level: u8, country: &str) -> JoinId {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/lobby")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "player_id": player_id, "level": level, "country": country })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["join_id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap()
}

async fn get(app: &Router, uri: String) -> Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_http_join_match_and_leaderboard_flow() {
    let system = TestSystem::new(Duration::from_millis(100));
    let app = system.router();
    let sweep_task = system.lobby.spawn();

    // Keep the sweep tick and the match deadline apart
    tokio::time::sleep(Duration::from_millis(50)).await;

    let first = join(&app, "player1", 7, "FIN").await;
    let second = join(&app, "player2", 8, "FIN").await;
    let lone = join(&app, "player3", 40, "FIN").await;

    let (first_response, second_response, lone_response) = tokio::join!(
        get(&app, format!("/match?join_id={}", first)),
        get(&app, format!("/match?join_id={}", second)),
        get(&app, format!("/match?join_id={}", lone)),
    );

    assert_eq!(first_response.status(), StatusCode::OK);
    assert_eq!(second_response.status(), StatusCode::OK);
    assert_eq!(lone_response.status(), StatusCode::NOT_FOUND);

    let match_id = body_json(first_response).await["match_id"].clone();
    assert_eq!(body_json(second_response).await["match_id"], match_id);

    let response = get(
        &app,
        format!("/leaderboard?match_id={}", match_id.as_str().unwrap()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let leaderboard = body_json(response).await;
    let players = leaderboard["players"].as_array().unwrap();
    assert_eq!(players.len(), 2);
    assert_eq!(players[0]["player_id"], "player2");
    assert_eq!(players[0]["level"], 8);
    assert_eq!(players[0]["country"], "FIN");
    assert_eq!(players[0]["score"], 0);
    assert_eq!(players[1]["player_id"], "player1");

    system.lobby.stop();
    sweep_task.await.unwrap();
}

#[tokio::test]
async fn test_full_match_answers_without_waiting_for_sweep() {
    let system = TestSystem::new(Duration::from_secs(3600));
    let app = system.router();

    let mut join_ids = Vec::new();
    for i in 0..MAX_PLAYERS_PER_MATCH {
        join_ids.push(join(&app, &format!("player{}", i), 20, "BRA").await);
    }

    let mut match_ids = Vec::new();
    for join_id in &join_ids {
        let response = get(&app, format!("/match?join_id={}", join_id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        match_ids.push(body_json(response).await["match_id"].clone());
    }

    assert!(match_ids.iter().all(|id| *id == match_ids[0]));
    let stats = system.lobby.stats().unwrap();
    assert_eq!(stats.matches_filled, 1);
    assert_eq!(stats.open_matches, 0);
    assert_eq!(system.leaderboards.leaderboard_count().unwrap(), 1);
}

#[tokio::test]
async fn test_eleventh_player_waits_for_sweep() {
    let system = TestSystem::new(Duration::from_secs(30));
    let players = create_players("jpn", MAX_PLAYERS_PER_MATCH + 1, 12, "JPN");

    for player in &players {
        system.lobby.add_player(player.clone()).unwrap();
    }

    let eleventh = players[MAX_PLAYERS_PER_MATCH].join_id;
    assert_eq!(
        system.lobby.get_match_by_join_id(&eleventh).unwrap(),
        MatchOutcome::Pending
    );
    for player in &players[..MAX_PLAYERS_PER_MATCH] {
        assert!(system
            .lobby
            .get_match_by_join_id(&player.join_id)
            .unwrap()
            .match_id()
            .is_some());
    }

    let report = system.lobby.sweep().unwrap();
    assert_eq!(report.matches_discarded, 1);
    assert_eq!(
        system.lobby.get_match_by_join_id(&eleventh).unwrap(),
        MatchOutcome::Unmatched
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_into_one_bucket() {
    let system = TestSystem::new(Duration::from_secs(30));
    let players = create_players("swe", 95, 5, "SWE");

    let handles: Vec<_> = players
        .iter()
        .cloned()
        .map(|player| {
            let lobby = system.lobby.clone();
            tokio::spawn(async move { lobby.add_player(player) })
        })
        .collect();

    for handle in futures::future::join_all(handles).await {
        handle.unwrap().unwrap();
    }

    let stats = system.lobby.stats().unwrap();
    assert_eq!(stats.players_joined, 95);
    assert_eq!(stats.matches_filled, 9);
    assert_eq!(stats.open_matches, 1);
    assert_eq!(stats.players_waiting, 5);

    system.lobby.sweep().unwrap();

    let mut match_sizes: HashMap<MatchId, usize> = HashMap::new();
    for player in &players {
        let outcome = system.lobby.get_match_by_join_id(&player.join_id).unwrap();
        let match_id = outcome.match_id().expect("every player should be matched");
        *match_sizes.entry(match_id).or_default() += 1;
    }

    assert_eq!(match_sizes.len(), 10);
    assert!(match_sizes.values().all(|size| *size <= MAX_PLAYERS_PER_MATCH));
    assert_eq!(system.leaderboards.leaderboard_count().unwrap(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_countries_never_share_matches() {
    let system = TestSystem::new(Duration::from_secs(30));
    let countries = ["FIN", "SWE", "NOR", "DNK"];
    let players: Vec<_> = countries
        .iter()
        .flat_map(|country| create_players(country, 23, 30, country))
        .collect();

    let handles: Vec<_> = players
        .iter()
        .cloned()
        .map(|player| {
            let lobby = system.lobby.clone();
            tokio::spawn(async move { lobby.add_player(player) })
        })
        .collect();
    for handle in futures::future::join_all(handles).await {
        handle.unwrap().unwrap();
    }
    system.lobby.sweep().unwrap();

    for player in &players {
        let match_id = system
            .lobby
            .get_match_by_join_id(&player.join_id)
            .unwrap()
            .match_id()
            .unwrap();
        let leaderboard = system.leaderboards.get_leaderboard(&match_id).unwrap().unwrap();
        assert!(leaderboard
            .players
            .iter()
            .all(|entry| entry.country == player.country));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_joins_racing_back_to_back_sweeps_lose_no_player() {
    const JOINERS: usize = 8;
    const PLAYERS_PER_JOINER: usize = 200;

    for round in 0..5 {
        let system = TestSystem::new(Duration::from_secs(30));
        let stop = Arc::new(AtomicBool::new(false));

        let sweeper = {
            let lobby = system.lobby.clone();
            let stop = stop.clone();
            tokio::spawn(async move {
                let mut sweeps = 0usize;
                while !stop.load(Ordering::Relaxed) {
                    lobby.sweep().unwrap();
                    sweeps += 1;
                    tokio::task::yield_now().await;
                }
                sweeps
            })
        };

        let joiners: Vec<_> = (0..JOINERS)
            .map(|joiner| {
                let lobby = system.lobby.clone();
                tokio::spawn(async move {
                    let mut joined = Vec::with_capacity(PLAYERS_PER_JOINER);
                    for i in 0..PLAYERS_PER_JOINER {
                        let level = (i % 4) as u8 + 1;
                        let player = create_test_player(
                            &format!("r{}-j{}-p{}", round, joiner, i),
                            level,
                            "NLD",
                        );
                        let match_id = lobby.add_player(player.clone()).unwrap();
                        joined.push((player.player_id, match_id));
                        if i % 16 == 0 {
                            tokio::task::yield_now().await;
                        }
                    }
                    joined
                })
            })
            .collect();

        let mut routed: HashMap<MatchId, Vec<String>> = HashMap::new();
        for handle in futures::future::join_all(joiners).await {
            for (player_id, match_id) in handle.unwrap() {
                routed.entry(match_id).or_default().push(player_id);
            }
        }

        stop.store(true, Ordering::Relaxed);
        assert!(sweeper.await.unwrap() >= 1);
        system.lobby.sweep().unwrap();

        let mut matched = 0usize;
        let mut unmatched = 0usize;
        for (match_id, mut player_ids) in routed {
            match system.leaderboards.get_leaderboard(&match_id).unwrap() {
                Some(record) => {
                    assert!((2..=MAX_PLAYERS_PER_MATCH).contains(&record.players.len()));
                    let mut stored: Vec<String> =
                        record.players.into_iter().map(|p| p.player_id).collect();
                    stored.sort();
                    player_ids.sort();
                    assert_eq!(stored, player_ids);
                    matched += player_ids.len();
                }
                None => {
                    // Only a lone player's match goes without a leaderboard
                    assert_eq!(player_ids.len(), 1);
                    unmatched += 1;
                }
            }
        }

        let stats = system.lobby.stats().unwrap();
        let total = JOINERS * PLAYERS_PER_JOINER;
        assert_eq!(matched + unmatched, total);
        assert_eq!(stats.players_joined, total as u64);
        assert_eq!(stats.players_matched, matched as u64);
        assert_eq!(stats.players_unmatched, unmatched as u64);
        assert_eq!(stats.open_matches, 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_sweep_loop_stops_on_request() {
    let system = TestSystem::new(Duration::from_secs(30));
    let sweep_task = system.lobby.spawn();
    let player = create_test_player("player1", 50, "USA");
    system.lobby.add_player(player.clone()).unwrap();

    let outcome = system
        .lobby
        .wait_for_match(&player.join_id, Duration::from_secs(31))
        .await
        .unwrap();
    assert_eq!(outcome, MatchOutcome::Unmatched);

    system.lobby.stop();
    system.lobby.stop();
    sweep_task.await.unwrap();

    assert!(system.lobby.stats().unwrap().sweeps >= 1);
}

#[tokio::test]
async fn test_storage_failure_does_not_strand_players() {
    let storage = Arc::new(FailingLeaderboardStorage::new());
    let lobby = Lobby::new(Duration::from_secs(30), storage.clone()).unwrap();
    let first = create_test_player("player1", 3, "CAN");
    let second = create_test_player("player2", 3, "CAN");
    lobby.add_player(first.clone()).unwrap();
    lobby.add_player(second.clone()).unwrap();

    lobby.sweep().unwrap();

    assert_eq!(storage.attempts(), 1);
    let outcome = lobby.get_match_by_join_id(&first.join_id).unwrap();
    assert!(outcome.match_id().is_some());
    assert_eq!(lobby.get_match_by_join_id(&second.join_id).unwrap(), outcome);
}

#[tokio::test]
async fn test_metrics_reflect_lobby_activity() {
    let system = TestSystem::new(Duration::from_secs(30));
    for player in create_players("deu", 3, 60, "DEU") {
        system.lobby.add_player(player).unwrap();
    }
    system
        .lobby
        .add_player(create_test_player("lone", 1, "DEU"))
        .unwrap();
    system.lobby.sweep().unwrap();

    let output = match_maker::metrics::render_metrics(&system.metrics_collector).unwrap();
    assert!(output.contains("match_maker_players_joined_total 4"));
    assert!(output.contains("match_maker_matches_started_total{trigger=\"sweep\"} 1"));
    assert!(output.contains("match_maker_players_unmatched_total 1"));
    assert!(output.contains("match_maker_open_matches 0"));
}
