//! Listening-log generation with biased song selection.
//!
//! Song choice for a log is driven by an ordered chain of [`BiasRule`]s:
//! a genre-loyalty rule for every 5th user, a "Sad"-mood rule for users whose
//! ordinal is divisible by 7, and an unconditional uniform fallback. Rules
//! fall through when their probability draw fails or their restricted pool is
//! empty, so each rule can be exercised in isolation.

use crate::catalog::{Song, GENRES};
use crate::{ListenLabError, WINDOW_DAYS};
use chrono::{Duration, NaiveDateTime};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;

/// Loyal users pick from their favorite genre with this probability.
pub const LOYALTY_PROBABILITY: f64 = 0.85;
/// Sad-heavy users pick a "Sad" song with this probability.
pub const SAD_MOOD_PROBABILITY: f64 = 0.80;
/// Play duration bounds in seconds, inclusive.
pub const DURATION_RANGE: (u32, u32) = (30, 300);

/// One row of the listening-log table. An independent, immutable event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenEvent {
    pub user_id: String,
    pub song_id: String,
    pub timestamp: NaiveDateTime,
    pub duration_sec: u32,
}

/// The restricted song pool a bias rule draws from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SongPool {
    /// Songs of a single genre.
    Genre(String),
    /// Songs of a single mood.
    Mood(String),
}

/// One step of the biased-selection chain: with `probability`, draw uniformly
/// from the songs matching `pool`. When the probability draw fails or the
/// pool is empty, evaluation falls through to the next rule.
#[derive(Debug, Clone)]
pub struct BiasRule {
    pub pool: SongPool,
    pub probability: f64,
}

impl BiasRule {
    /// The loyalty rule: restrict selection to the user's favorite genre.
    pub fn genre_loyalty(genre: &str) -> Self {
        Self {
            pool: SongPool::Genre(genre.to_string()),
            probability: LOYALTY_PROBABILITY,
        }
    }

    /// The mood rule: restrict selection to songs tagged "Sad".
    pub fn sad_mood() -> Self {
        Self {
            pool: SongPool::Mood("Sad".to_string()),
            probability: SAD_MOOD_PROBABILITY,
        }
    }

    fn admits(&self, song: &Song) -> bool {
        match &self.pool {
            SongPool::Genre(genre) => song.genre == *genre,
            SongPool::Mood(mood) => song.mood == *mood,
        }
    }

    /// Applies this rule once. Returns `None` when the rule falls through.
    pub fn select<'a>(&self, songs: &'a [Song], rng: &mut impl Rng) -> Option<&'a Song> {
        if !rng.gen_bool(self.probability) {
            return None;
        }
        let pool: Vec<&Song> = songs.iter().filter(|s| self.admits(s)).collect();
        pool.choose(rng).copied()
    }
}

/// Evaluates a rule chain in priority order, terminating in a uniform draw
/// over the full catalog.
pub fn pick_song<'a>(
    rules: &[BiasRule],
    songs: &'a [Song],
    rng: &mut impl Rng,
) -> Result<&'a Song, ListenLabError> {
    for rule in rules {
        if let Some(song) = rule.select(songs, rng) {
            return Ok(song);
        }
    }
    songs.choose(rng).ok_or(ListenLabError::EmptyCatalog)
}

/// The rule chain for a user, by 1-indexed ordinal. `favorite_genre` is set
/// for loyal users (ordinal divisible by 5).
pub fn rules_for_user(ordinal: usize, favorite_genre: Option<&str>) -> Vec<BiasRule> {
    let mut rules = Vec::new();
    if let Some(genre) = favorite_genre {
        rules.push(BiasRule::genre_loyalty(genre));
    }
    if ordinal % 7 == 0 {
        rules.push(BiasRule::sad_mood());
    }
    rules
}

/// Output of [`generate_logs`]: the events plus the loyalty assignment the
/// bias rules were built from.
#[derive(Debug, Clone)]
pub struct GeneratedLogs {
    pub events: Vec<ListenEvent>,
    pub favorite_genres: HashMap<String, String>,
}

/// Generates `num_logs` listening events over a population of `num_users`,
/// stamped uniformly within [now - 30d, now + 30d].
///
/// # Errors
///
/// Returns `ListenLabError::EmptyCatalog` when `songs` is empty; this is the
/// only fatal precondition.
pub fn generate_logs(
    num_logs: usize,
    num_users: usize,
    songs: &[Song],
    now: NaiveDateTime,
    rng: &mut impl Rng,
) -> Result<GeneratedLogs, ListenLabError> {
    if songs.is_empty() {
        return Err(ListenLabError::EmptyCatalog);
    }

    let user_ids: Vec<String> = (1..=num_users).map(|i| format!("user_{}", i)).collect();

    // Every 5th user is loyal to one uniformly chosen genre.
    let mut favorite_genres = HashMap::new();
    for (i, user_id) in user_ids.iter().enumerate() {
        if (i + 1) % 5 == 0 {
            let genre = GENRES.choose(rng).expect("non-empty set").to_string();
            favorite_genres.insert(user_id.clone(), genre);
        }
    }

    let rule_chains: Vec<Vec<BiasRule>> = user_ids
        .iter()
        .enumerate()
        .map(|(i, user_id)| {
            rules_for_user(i + 1, favorite_genres.get(user_id).map(String::as_str))
        })
        .collect();

    let window_start = now - Duration::days(WINDOW_DAYS);
    let window_end = now + Duration::days(WINDOW_DAYS);
    let total_seconds = (window_end - window_start).num_seconds();

    let mut events = Vec::with_capacity(num_logs);
    for _ in 0..num_logs {
        let user_idx = rng.gen_range(0..user_ids.len());
        let song = pick_song(&rule_chains[user_idx], songs, rng)?;
        let offset = rng.gen_range(0..=total_seconds);
        let timestamp = window_start + Duration::seconds(offset);
        let duration_sec = rng.gen_range(DURATION_RANGE.0..=DURATION_RANGE.1);
        events.push(ListenEvent {
            user_id: user_ids[user_idx].clone(),
            song_id: song.song_id.clone(),
            timestamp,
            duration_sec,
        });
    }

    Ok(GeneratedLogs {
        events,
        favorite_genres,
    })
}

/// Converts listening events into a `DataFrame` with the
/// `listening_logs.csv` column layout. Timestamps are formatted as
/// `YYYY-MM-DD HH:MM:SS`.
pub fn logs_frame(events: &[ListenEvent]) -> Result<DataFrame, ListenLabError> {
    let df = df!(
        "user_id" => events.iter().map(|e| e.user_id.as_str()).collect::<Vec<_>>(),
        "song_id" => events.iter().map(|e| e.song_id.as_str()).collect::<Vec<_>>(),
        "timestamp" => events
            .iter()
            .map(|e| e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string())
            .collect::<Vec<_>>(),
        "duration_sec" => events.iter().map(|e| e.duration_sec).collect::<Vec<_>>(),
    )?;
    Ok(df)
}
