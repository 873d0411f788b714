//! Synthetic music listening-log generation and batch listening analytics.
//!
//! This library produces a song-metadata table and a listening-log table with
//! deliberate behavioral biases (genre-loyal users, "Sad"-heavy users), and
//! runs a batch of descriptive queries over them with Polars: favorite genre
//! per user, average listen time per song, weekly top songs, mood-based
//! recommendations, genre loyalty scores and night-owl detection.
//!
//! # Example
//!
//! ```ignore
//! use listenlab::{AnalyticsRunner, DatasetBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dataset = DatasetBuilder::new()
//!         .num_songs(100)
//!         .num_logs(2000)
//!         .num_users(50)
//!         .seed(42)
//!         .run()?;
//!
//!     let runner = AnalyticsRunner::new(dataset.logs_frame()?, dataset.songs_frame()?);
//!     let favorites = runner.favorite_genre_per_user()?;
//!     println!("{}", favorites);
//!     Ok(())
//! }
//! ```

use chrono::{Duration, Local, NaiveDateTime};
use getset::Getters;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use thiserror::Error;

pub mod analytics;
pub mod catalog;
pub mod logs;

pub use crate::analytics::{AnalyticsReport, AnalyticsRunner};
pub use crate::catalog::{Song, ARTISTS, GENRES, MOODS};
pub use crate::logs::{BiasRule, ListenEvent, SongPool};

/// Error type for the `listenlab` library.
#[derive(Debug, Error)]
pub enum ListenLabError {
    /// Wraps a `PolarsError`.
    #[error("dataframe error: {0}")]
    Polars(#[from] PolarsError),
    /// The song catalog is empty or missing; listening logs cannot reference it.
    #[error("song catalog is empty; generate song metadata before listening logs")]
    EmptyCatalog,
    /// A generator or analytics parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// File name of the generated song-metadata table.
pub const SONGS_CSV: &str = "songs_metadata.csv";
/// File name of the generated listening-log table.
pub const LOGS_CSV: &str = "listening_logs.csv";

/// Half-width of the timestamp window around "now". Logs are stamped within
/// [now - 30d, now + 30d] so the window always straddles the current week.
pub const WINDOW_DAYS: i64 = 30;

/// Configures and runs the synthetic dataset generation.
///
/// This struct is created using a builder pattern.
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    num_songs: usize,
    num_logs: usize,
    num_users: usize,
    seed: Option<u64>,
    now: Option<NaiveDateTime>,
}

impl Default for DatasetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetBuilder {
    /// Creates a builder with the reference defaults: 100 songs, 2000 logs,
    /// 50 users, unseeded RNG, wall-clock "now".
    pub fn new() -> Self {
        Self {
            num_songs: 100,
            num_logs: 2000,
            num_users: 50,
            seed: None,
            now: None,
        }
    }

    /// Sets the number of songs in the generated catalog.
    pub fn num_songs(&mut self, num_songs: usize) -> &mut Self {
        self.num_songs = num_songs;
        self
    }

    /// Sets the number of listening-log records to generate.
    pub fn num_logs(&mut self, num_logs: usize) -> &mut Self {
        self.num_logs = num_logs;
        self
    }

    /// Sets the size of the user population.
    pub fn num_users(&mut self, num_users: usize) -> &mut Self {
        self.num_users = num_users;
        self
    }

    /// Seeds the random source for a reproducible dataset.
    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.seed = Some(seed);
        self
    }

    /// Overrides the reference time the timestamp window is centered on.
    /// Defaults to the local wall clock.
    pub fn now(&mut self, now: NaiveDateTime) -> &mut Self {
        self.now = Some(now);
        self
    }

    /// Generates the song catalog and listening logs.
    ///
    /// # Errors
    ///
    /// Returns `ListenLabError::InvalidConfig` when the user population is
    /// empty, and `ListenLabError::EmptyCatalog` when logs are requested over
    /// an empty song catalog.
    pub fn run(&self) -> Result<Dataset, ListenLabError> {
        if self.num_users == 0 {
            return Err(ListenLabError::InvalidConfig(
                "user population must be non-empty".to_string(),
            ));
        }
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let generated_at = self.now.unwrap_or_else(|| Local::now().naive_local());
        let songs = catalog::generate_catalog(self.num_songs, &mut rng);
        let generated = logs::generate_logs(
            self.num_logs,
            self.num_users,
            &songs,
            generated_at,
            &mut rng,
        )?;
        Ok(Dataset {
            songs,
            events: generated.events,
            favorite_genres: generated.favorite_genres,
            generated_at,
        })
    }
}

/// A generated dataset: the song catalog, the listening events, and the
/// loyalty assignment used to bias them.
#[derive(Debug, Clone, Getters)]
pub struct Dataset {
    /// The generated song catalog.
    #[getset(get = "pub")]
    songs: Vec<Song>,
    /// The generated listening events, in generation order.
    #[getset(get = "pub")]
    events: Vec<ListenEvent>,
    /// Favorite genre per loyal user, keyed by user id.
    #[getset(get = "pub")]
    favorite_genres: HashMap<String, String>,
    /// Center of the timestamp window the events were stamped in.
    #[getset(get = "pub")]
    generated_at: NaiveDateTime,
}

impl Dataset {
    /// The song catalog as a `DataFrame` with the `songs_metadata.csv` schema.
    pub fn songs_frame(&self) -> Result<DataFrame, ListenLabError> {
        catalog::catalog_frame(&self.songs)
    }

    /// The listening logs as a `DataFrame` with the `listening_logs.csv`
    /// schema. Timestamps are formatted as `YYYY-MM-DD HH:MM:SS`.
    pub fn logs_frame(&self) -> Result<DataFrame, ListenLabError> {
        logs::logs_frame(&self.events)
    }

    /// Start of the timestamp window.
    pub fn window_start(&self) -> NaiveDateTime {
        self.generated_at - Duration::days(WINDOW_DAYS)
    }

    /// End of the timestamp window.
    pub fn window_end(&self) -> NaiveDateTime {
        self.generated_at + Duration::days(WINDOW_DAYS)
    }

    /// Writes `songs_metadata.csv` and `listening_logs.csv` under `dir`,
    /// with headers and no index column.
    pub fn write_csv(&self, dir: &Path) -> Result<(), ListenLabError> {
        std::fs::create_dir_all(dir)?;
        let mut songs = self.songs_frame()?;
        write_frame(&mut songs, &dir.join(SONGS_CSV))?;
        let mut logs = self.logs_frame()?;
        write_frame(&mut logs, &dir.join(LOGS_CSV))?;
        Ok(())
    }
}

pub(crate) fn write_frame(df: &mut DataFrame, path: &Path) -> Result<(), ListenLabError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    CsvWriter::new(&mut writer).finish(df)?;
    Ok(())
}

/// Reads a headered CSV file into a `DataFrame`.
pub fn read_csv(path: &Path) -> Result<DataFrame, ListenLabError> {
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()?
        .collect()?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_users_is_a_config_error() {
        let err = DatasetBuilder::new().num_users(0).run().unwrap_err();
        assert!(matches!(err, ListenLabError::InvalidConfig(_)));
    }

    #[test]
    fn test_empty_catalog_is_fatal() {
        let err = DatasetBuilder::new()
            .num_songs(0)
            .num_logs(10)
            .seed(1)
            .run()
            .unwrap_err();
        assert!(matches!(err, ListenLabError::EmptyCatalog));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let mut builder = DatasetBuilder::new();
        builder.num_songs(10).num_logs(50).num_users(5).seed(7);
        let a = builder.run().unwrap();
        let b = builder.run().unwrap();
        assert_eq!(a.songs().len(), b.songs().len());
        for (x, y) in a.events().iter().zip(b.events().iter()) {
            assert_eq!(x.user_id, y.user_id);
            assert_eq!(x.song_id, y.song_id);
            assert_eq!(x.duration_sec, y.duration_sec);
        }
    }
}
