use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use battleship_server::{Difficulty, ScoreEntry, Scoreboard};

fn temp_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "battleship-scores-{}-{}.json",
        std::process::id(),
        name
    ));
    let _ = fs::remove_file(&path);
    path
}

#[test]
fn test_in_memory_record() {
    let board = Scoreboard::in_memory();
    assert!(board.is_empty());
    let entries = board
        .record(ScoreEntry::now("alice", "bob", Difficulty::Easy))
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].winner, "alice");
    assert_eq!(board.entries(), entries);
    assert!(board.path().is_none());
}

#[test]
fn test_missing_file_starts_empty() {
    let path = temp_path("missing");
    let board = Scoreboard::load(&path).unwrap();
    assert!(board.is_empty());
    assert!(!path.exists());
}

#[test]
fn test_record_persists_and_reloads() {
    let path = temp_path("reload");
    let board = Scoreboard::load(&path).unwrap();
    board
        .record(ScoreEntry::now("alice", "bob", Difficulty::Easy))
        .unwrap();
    board
        .record(ScoreEntry::now("bob", "alice", Difficulty::Hard))
        .unwrap();
    assert!(path.exists());

    let reloaded = Scoreboard::load(&path).unwrap();
    assert_eq!(reloaded.entries(), board.entries());
    assert_eq!(reloaded.entries()[1].difficulty, Difficulty::Hard);

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let first = &raw.as_array().unwrap()[0];
    assert_eq!(first["winner"], "alice");
    assert_eq!(first["loser"], "bob");
    assert!(first["timestamp"].is_string());
    fs::remove_file(&path).unwrap();
}

#[test]
fn test_corrupt_file_starts_empty() {
    let path = temp_path("corrupt");
    fs::write(&path, "not json at all").unwrap();
    let board = Scoreboard::load(&path).unwrap();
    assert!(board.is_empty());

    board
        .record(ScoreEntry::now("carol", "dave", Difficulty::Medium))
        .unwrap();
    assert_eq!(Scoreboard::load(&path).unwrap().len(), 1);
    fs::remove_file(&path).unwrap();
}

#[test]
fn test_standings_order() {
    let board = Scoreboard::in_memory();
    for (w, l) in [
        ("bob", "alice"),
        ("carol", "bob"),
        ("alice", "carol"),
        ("bob", "carol"),
    ] {
        board.record(ScoreEntry::now(w, l, Difficulty::Easy)).unwrap();
    }
    let standings = board.standings();
    let order: Vec<(&str, usize, usize)> = standings
        .iter()
        .map(|s| (s.name.as_str(), s.wins, s.losses))
        .collect();
    assert_eq!(
        order,
        vec![("bob", 2, 1), ("alice", 1, 1), ("carol", 1, 2)]
    );
}

#[test]
fn test_concurrent_records_do_not_interleave() {
    let path = temp_path("concurrent");
    let board = Arc::new(Scoreboard::load(&path).unwrap());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let board = Arc::clone(&board);
            std::thread::spawn(move || {
                for i in 0..10 {
                    board
                        .record(ScoreEntry::now(
                            &format!("w{}-{}", t, i),
                            "loser",
                            Difficulty::Easy,
                        ))
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(board.len(), 80);
    assert_eq!(Scoreboard::load(&path).unwrap().len(), 80);
    fs::remove_file(&path).unwrap();
}
