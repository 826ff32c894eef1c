//! Append-only scoreboard persisted as a JSON array.
//!
//! The store is process-wide. Every `record` call holds one lock across the
//! append and the file rewrite, so two matches ending together cannot
//! interleave their read-modify-write.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::Context;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::Difficulty;

/// One finished game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub winner: String,
    pub loser: String,
    pub timestamp: DateTime<Utc>,
    pub difficulty: Difficulty,
}

impl ScoreEntry {
    pub fn now(winner: &str, loser: &str, difficulty: Difficulty) -> Self {
        ScoreEntry {
            winner: winner.to_string(),
            loser: loser.to_string(),
            timestamp: Utc::now(),
            difficulty,
        }
    }
}

/// Wins per player, derived at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub name: String,
    pub wins: usize,
    pub losses: usize,
}

pub struct Scoreboard {
    path: Option<PathBuf>,
    entries: Mutex<Vec<ScoreEntry>>,
}

impl Scoreboard {
    /// Scoreboard that is never written to disk.
    pub fn in_memory() -> Self {
        Scoreboard {
            path: None,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Load the scoreboard from `path`.
    ///
    /// A missing file starts an empty board. An unreadable JSON body is logged
    /// and replaced by an empty board on the next write.
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("reading scoreboard {}", path.display()))?;
            match serde_json::from_str::<Vec<ScoreEntry>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        "Scoreboard {} is not valid JSON ({}), starting empty",
                        path.display(),
                        e
                    );
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        info!(
            "Loaded {} scoreboard entries from {}",
            entries.len(),
            path.display()
        );
        Ok(Scoreboard {
            path: Some(path),
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append `entry` and rewrite the file. Returns the full list after the append.
    ///
    /// The entry stays in memory even when the write fails.
    pub fn record(&self, entry: ScoreEntry) -> anyhow::Result<Vec<ScoreEntry>> {
        let mut entries = self.lock();
        entries.push(entry);
        if let Some(path) = &self.path {
            save(path, &entries)?;
        }
        Ok(entries.clone())
    }

    pub fn entries(&self) -> Vec<ScoreEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Players ordered by wins descending, then by name.
    pub fn standings(&self) -> Vec<Standing> {
        let entries = self.lock();
        let mut table: HashMap<&str, (usize, usize)> = HashMap::new();
        for e in entries.iter() {
            table.entry(e.winner.as_str()).or_default().0 += 1;
            table.entry(e.loser.as_str()).or_default().1 += 1;
        }
        let mut standings: Vec<Standing> = table
            .into_iter()
            .map(|(name, (wins, losses))| Standing {
                name: name.to_string(),
                wins,
                losses,
            })
            .collect();
        standings.sort_by(|a, b| b.wins.cmp(&a.wins).then_with(|| a.name.cmp(&b.name)));
        standings
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ScoreEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn save(path: &Path, entries: &[ScoreEntry]) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(entries)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
