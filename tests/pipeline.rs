use playfeed::fetch::cache::ResponseCache;
use playfeed::fetch::transport::Transport;
use playfeed::fetch::{Endpoint, FetchError, RateLimitedFetcher, RequestParams};
use playfeed::normalize::EventType;
use playfeed::normalize::payload::EventPayload;
use playfeed::output::ndjson;
use playfeed::pipeline::{PipelineOptions, listed_games, play_by_play};
use serde_json::json;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;
use tempfile::{TempDir, tempdir};

#[derive(Default)]
struct FakeTransport {
    bodies: HashMap<(Endpoint, String), String>,
    calls: RefCell<Vec<(Endpoint, String)>>,
}

impl FakeTransport {
    fn serve(mut self, endpoint: Endpoint, game_id: &str, body: serde_json::Value) -> Self {
        self.bodies
            .insert((endpoint, game_id.to_string()), body.to_string());
        self
    }

    fn calls(&self) -> Vec<(Endpoint, String)> {
        self.calls.borrow().clone()
    }
}

impl Transport for FakeTransport {
    fn get(&self, endpoint: Endpoint, params: &RequestParams) -> Result<String, FetchError> {
        let game_id = params.get("GameID").unwrap_or_default().to_string();
        self.calls.borrow_mut().push((endpoint, game_id.clone()));
        self.bodies
            .get(&(endpoint, game_id))
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: endpoint.path().to_string(),
                status: 500,
            })
    }
}

fn nested(game_id: &str) -> serde_json::Value {
    json!({
        "game": {
            "gameId": game_id,
            "actions": [
                {
                    "actionNumber": 2,
                    "clock": "PT12M00.00S",
                    "period": 1,
                    "actionType": "period",
                    "subType": "start",
                    "scoreHome": "0",
                    "scoreAway": "0"
                },
                {
                    "actionNumber": 4,
                    "clock": "PT11M40.00S",
                    "period": 1,
                    "teamId": 1610612744,
                    "personId": 201939,
                    "actionType": "Made Shot",
                    "subType": "Jump Shot",
                    "shotValue": 2,
                    "shotResult": "Made",
                    "xLegacy": 30,
                    "yLegacy": 40,
                    "scoreHome": "2",
                    "scoreAway": "0"
                },
                {
                    "actionNumber": 6,
                    "clock": "PT11M20.00S",
                    "period": 1,
                    "teamId": 1610612747,
                    "personId": 2544,
                    "actionType": "Block",
                    "description": "James BLOCK (1 BLK)"
                }
            ]
        }
    })
}

fn tabular(game_id: &str) -> serde_json::Value {
    json!({
        "resultSets": [{
            "name": "PlayByPlay",
            "headers": [
                "GAME_ID", "EVENTNUM", "EVENTMSGTYPE", "PERIOD", "PCTIMESTRING",
                "HOMEDESCRIPTION", "VISITORDESCRIPTION", "SCORE",
                "PLAYER1_ID", "PLAYER1_TEAM_ID", "PLAYER2_ID", "PLAYER3_ID"
            ],
            "rowSet": [
                [game_id, 2, 12, 1, "12:00", null, null, null, 0, null, 0, 0],
                [game_id, 4, 1, 1, "11:40", "Curry 5' Jump Shot (2 PTS)", null, "0 - 2",
                 201939, 1610612744, 0, 0],
                [game_id, 6, 2, 1, "11:20", "MISS Green 2' Layup", "James BLOCK (1 BLK)", null,
                 203110, 1610612744, 0, 2544]
            ]
        }]
    })
}

fn fetcher(tmp: &TempDir, transport: FakeTransport) -> RateLimitedFetcher<FakeTransport> {
    let cache = ResponseCache::open(&tmp.path().join("cache.sqlite")).unwrap();
    RateLimitedFetcher::new(cache, transport, Duration::from_millis(1))
}

#[test]
fn block_gets_slots_from_tabular_endpoint() {
    let tmp = tempdir().unwrap();
    let transport = FakeTransport::default()
        .serve(Endpoint::PlayByPlayV3, "g1", nested("g1"))
        .serve(Endpoint::PlayByPlayV2, "g1", tabular("g1"));
    let mut fetcher = fetcher(&tmp, transport);

    let games = play_by_play(&mut fetcher, ["g1"], PipelineOptions::default()).collect::<Vec<_>>();
    assert_eq!(games.len(), 1);
    let game = &games[0];
    assert_eq!(game.game_id, "g1");
    assert!(!game.from_cache);
    assert_eq!(
        game.events.iter().map(|e| e.event_type).collect::<Vec<_>>(),
        vec![EventType::Other, EventType::Shot, EventType::Block]
    );
    assert_eq!(game.events[1].points_scored, 2);
    assert_eq!(
        game.events[2].payload,
        EventPayload::Block {
            by: 2544,
            on: Some(203110)
        }
    );
}

#[test]
fn nested_only_drops_actions_that_need_slots() {
    let tmp = tempdir().unwrap();
    let transport = FakeTransport::default().serve(Endpoint::PlayByPlayV3, "g1", nested("g1"));
    let mut fetcher = fetcher(&tmp, transport);

    let games = play_by_play(&mut fetcher, ["g1"], PipelineOptions::default()).collect::<Vec<_>>();
    assert_eq!(games.len(), 1);
    assert_eq!(
        games[0].events.iter().map(|e| e.event_type).collect::<Vec<_>>(),
        vec![EventType::Other, EventType::Shot]
    );
    assert_eq!(
        fetcher.transport().calls(),
        vec![
            (Endpoint::PlayByPlayV3, "g1".to_string()),
            (Endpoint::PlayByPlayV2, "g1".to_string()),
        ]
    );
}

#[test]
fn games_are_fetched_only_as_consumed() {
    let tmp = tempdir().unwrap();
    let transport = FakeTransport::default()
        .serve(Endpoint::PlayByPlayV3, "g1", nested("g1"))
        .serve(Endpoint::PlayByPlayV2, "g1", tabular("g1"))
        .serve(Endpoint::PlayByPlayV3, "g2", nested("g2"))
        .serve(Endpoint::PlayByPlayV2, "g2", tabular("g2"));
    let mut fetcher = fetcher(&tmp, transport);

    let first = play_by_play(&mut fetcher, ["g1", "g2"], PipelineOptions::default())
        .take(1)
        .map(|g| g.game_id)
        .collect::<Vec<_>>();

    assert_eq!(first, vec!["g1"]);
    assert!(
        fetcher
            .transport()
            .calls()
            .iter()
            .all(|(_, game_id)| game_id == "g1")
    );
}

#[test]
fn unfetchable_game_is_skipped() {
    let tmp = tempdir().unwrap();
    let transport = FakeTransport::default()
        .serve(Endpoint::PlayByPlayV2, "g1", tabular("g1"))
        .serve(Endpoint::PlayByPlayV2, "g3", tabular("g3"));
    let mut fetcher = fetcher(&tmp, transport);
    let options = PipelineOptions {
        endpoint: Endpoint::PlayByPlayV2,
        attach_slots: true,
    };

    let games = play_by_play(&mut fetcher, ["g1", "g2", "g3"], options).collect::<Vec<_>>();
    assert_eq!(
        games.iter().map(|g| g.game_id.as_str()).collect::<Vec<_>>(),
        vec!["g1", "g3"]
    );
    // The tabular endpoint already carries slots, so nothing else is requested.
    assert_eq!(fetcher.transport().calls().len(), 3);
    // Blocks ride on the missed shot row in the tabular schema.
    assert_eq!(
        games[0].events.iter().map(|e| e.event_type).collect::<Vec<_>>(),
        vec![EventType::Other, EventType::Shot, EventType::Shot]
    );
}

#[test]
fn second_pass_is_served_from_cache() {
    let tmp = tempdir().unwrap();
    let transport = FakeTransport::default()
        .serve(Endpoint::PlayByPlayV3, "g1", nested("g1"))
        .serve(Endpoint::PlayByPlayV2, "g1", tabular("g1"));
    let mut fetcher = fetcher(&tmp, transport);

    let first = play_by_play(&mut fetcher, ["g1"], PipelineOptions::default()).collect::<Vec<_>>();
    let second = play_by_play(&mut fetcher, ["g1"], PipelineOptions::default()).collect::<Vec<_>>();

    assert!(second[0].from_cache);
    assert_eq!(first[0].events, second[0].events);
    assert_eq!(fetcher.transport().calls().len(), 2);
}

#[test]
fn from_cache_requires_slot_source_hit_too() {
    let tmp = tempdir().unwrap();
    let transport = FakeTransport::default().serve(Endpoint::PlayByPlayV2, "g1", tabular("g1"));
    let mut fetcher = fetcher(&tmp, transport);
    fetcher
        .cache()
        .put(
            Endpoint::PlayByPlayV3,
            &RequestParams::play_by_play("g1"),
            &nested("g1").to_string(),
        )
        .unwrap();

    let first = play_by_play(&mut fetcher, ["g1"], PipelineOptions::default()).collect::<Vec<_>>();
    assert!(!first[0].from_cache);
    assert_eq!(
        fetcher.transport().calls(),
        vec![(Endpoint::PlayByPlayV2, "g1".to_string())]
    );

    let second = play_by_play(&mut fetcher, ["g1"], PipelineOptions::default()).collect::<Vec<_>>();
    assert!(second[0].from_cache);
    assert_eq!(first[0].events, second[0].events);
}

#[test]
fn events_are_written_as_ndjson() {
    let tmp = tempdir().unwrap();
    let transport = FakeTransport::default()
        .serve(Endpoint::PlayByPlayV3, "g1", nested("g1"))
        .serve(Endpoint::PlayByPlayV2, "g1", tabular("g1"));
    let mut fetcher = fetcher(&tmp, transport);
    let games = play_by_play(&mut fetcher, ["g1"], PipelineOptions::default()).collect::<Vec<_>>();

    let path = tmp.path().join("out").join("events.ndjson");
    // A rerun into the same file replaces the previous run's events.
    for _ in 0..2 {
        let mut out = ndjson::create_output(&path).unwrap();
        assert_eq!(ndjson::write_events(&mut out, &games[0].events).unwrap(), 3);
        out.flush().unwrap();
    }

    let text = std::fs::read_to_string(&path).unwrap();
    let lines = text.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 3);
    let block: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
    assert_eq!(block["action_id"], "g10006");
    assert_eq!(block["payload"]["kind"], "block");
    assert_eq!(block["payload"]["by"], 2544);
}

#[test]
fn counts_listed_games() {
    let doc = json!({"resultSets": [{"headers": ["GAME_ID"], "rowSet": [["a"], ["b"]]}]});
    assert_eq!(listed_games(&doc), Some(2));
    assert_eq!(listed_games(&json!({})), None);
}
