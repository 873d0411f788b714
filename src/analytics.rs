//! Batch descriptive queries over the listening-log dataset.
//!
//! All six queries are independent Polars lazy pipelines over the logs
//! left-joined with song metadata. Malformed rows or missing join keys
//! propagate as nulls; there is no validation layer.

use crate::{write_frame, ListenLabError};
use chrono::{Datelike, Local, NaiveDateTime};
use getset::Getters;
use polars::prelude::*;
use std::path::Path;

/// Users with at least this share of "Sad" plays get happy recommendations.
pub const SAD_RATIO_THRESHOLD: f64 = 0.5;
/// Maximum number of recommendations per user.
pub const MAX_RECOMMENDATIONS: usize = 3;
/// Users with a loyalty score above this are reported as loyal.
pub const LOYALTY_SCORE_THRESHOLD: f64 = 0.8;

/// Runs the analytics queries over a logs table and a song-metadata table.
pub struct AnalyticsRunner {
    logs: DataFrame,
    songs: DataFrame,
    now: NaiveDateTime,
}

impl AnalyticsRunner {
    /// Creates a runner over in-memory tables. `logs` must carry the
    /// `listening_logs.csv` columns (timestamp as `YYYY-MM-DD HH:MM:SS`
    /// strings), `songs` the `songs_metadata.csv` columns.
    pub fn new(logs: DataFrame, songs: DataFrame) -> Self {
        Self {
            logs,
            songs,
            now: Local::now().naive_local(),
        }
    }

    /// Creates a runner by reading both tables from headered CSV files.
    pub fn from_csv(logs_path: &Path, songs_path: &Path) -> Result<Self, ListenLabError> {
        let logs = crate::read_csv(logs_path)?;
        let songs = crate::read_csv(songs_path)?;
        Ok(Self::new(logs, songs))
    }

    /// Overrides the reference time for the weekly query. Defaults to the
    /// local wall clock.
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    /// Logs with `duration_sec` cast to integer and `timestamp` parsed to a
    /// datetime. Unparseable values become nulls.
    fn typed_logs(&self) -> LazyFrame {
        self.logs.clone().lazy().with_columns([
            col("duration_sec").cast(DataType::Int64),
            col("timestamp").str().to_datetime(
                Some(TimeUnit::Milliseconds),
                None,
                StrptimeOptions {
                    format: Some("%Y-%m-%d %H:%M:%S".into()),
                    strict: false,
                    ..Default::default()
                },
                lit("raise"),
            ),
        ])
    }

    /// Logs enriched with song metadata via a left join on `song_id`.
    fn enriched(&self) -> LazyFrame {
        self.typed_logs().join(
            self.songs.clone().lazy(),
            [col("song_id")],
            [col("song_id")],
            JoinArgs::new(JoinType::Left),
        )
    }

    /// The enriched join, materialized for reference output.
    pub fn enriched_logs(&self) -> Result<DataFrame, ListenLabError> {
        Ok(self.enriched().collect()?)
    }

    /// Minimum and maximum timestamp in the data. Used to verify the
    /// generated window straddles the current week.
    pub fn timestamp_range(&self) -> Result<DataFrame, ListenLabError> {
        let df = self
            .typed_logs()
            .select([
                col("timestamp").min().alias("min_timestamp"),
                col("timestamp").max().alias("max_timestamp"),
            ])
            .collect()?;
        Ok(df)
    }

    /// Per-user play counts by genre, one row per (user, genre).
    fn genre_counts(&self) -> LazyFrame {
        self.enriched()
            .group_by([col("user_id"), col("genre")])
            .agg([col("song_id").count().alias("play_count")])
    }

    /// Total plays per user.
    fn total_plays(&self) -> LazyFrame {
        self.enriched()
            .group_by([col("user_id")])
            .agg([col("song_id").count().alias("total_plays")])
    }

    /// Task 1: the most-played genre per user. Ties break toward the
    /// lexicographically first genre so the result is deterministic.
    pub fn favorite_genre_per_user(&self) -> Result<DataFrame, ListenLabError> {
        let df = self
            .genre_counts()
            .sort(
                ["user_id", "play_count", "genre"],
                SortMultipleOptions::default().with_order_descending_multi([false, true, false]),
            )
            .group_by_stable([col("user_id")])
            .agg([col("genre").first(), col("play_count").first()])
            .collect()?;
        Ok(df)
    }

    /// Task 2: average listen time per song, in seconds.
    pub fn average_listen_time(&self) -> Result<DataFrame, ListenLabError> {
        let df = self
            .typed_logs()
            .group_by([col("song_id")])
            .agg([col("duration_sec").mean().alias("avg_duration_sec")])
            .sort(["song_id"], SortMultipleOptions::default())
            .collect()?;
        Ok(df)
    }

    /// Task 3: the 10 most played songs whose timestamp falls in the current
    /// ISO week (week number only, matching the reference queries).
    pub fn top_songs_this_week(&self) -> Result<DataFrame, ListenLabError> {
        let current_week = self.now.iso_week().week() as i32;
        let df = self
            .enriched()
            .filter(
                col("timestamp")
                    .dt()
                    .week()
                    .cast(DataType::Int32)
                    .eq(lit(current_week)),
            )
            .group_by([col("song_id"), col("title"), col("artist")])
            .agg([col("user_id").count().alias("play_count")])
            .sort(
                ["play_count", "song_id"],
                SortMultipleOptions::default().with_order_descending_multi([true, false]),
            )
            .limit(10)
            .collect()?;
        Ok(df)
    }

    /// Users whose share of "Sad" plays reaches `SAD_RATIO_THRESHOLD`.
    fn sad_users(&self) -> LazyFrame {
        let sad_plays = self
            .enriched()
            .filter(col("mood").eq(lit("Sad")))
            .group_by([col("user_id")])
            .agg([col("song_id").count().alias("sad_play_count")]);
        sad_plays
            .join(
                self.total_plays(),
                [col("user_id")],
                [col("user_id")],
                JoinArgs::new(JoinType::Inner),
            )
            .with_column(
                (col("sad_play_count").cast(DataType::Float64)
                    / col("total_plays").cast(DataType::Float64))
                .alias("sad_ratio"),
            )
            .filter(col("sad_ratio").gt_eq(lit(SAD_RATIO_THRESHOLD)))
            .select([col("user_id")])
    }

    /// Task 4: up to three "Happy" songs per sad-heavy user, excluding songs
    /// the user already played.
    pub fn happy_recommendations(&self) -> Result<DataFrame, ListenLabError> {
        let happy_songs = self
            .songs
            .clone()
            .lazy()
            .filter(col("mood").eq(lit("Happy")))
            .select([col("song_id"), col("title"), col("artist")]);
        let already_played = self
            .typed_logs()
            .select([col("user_id"), col("song_id")])
            .unique(None, UniqueKeepStrategy::Any);

        let df = self
            .sad_users()
            .cross_join(happy_songs, None)
            .join(
                already_played,
                [col("user_id"), col("song_id")],
                [col("user_id"), col("song_id")],
                JoinArgs::new(JoinType::Anti),
            )
            .sort(["user_id", "song_id"], SortMultipleOptions::default())
            .group_by_stable([col("user_id")])
            .agg([
                col("song_id").head(Some(MAX_RECOMMENDATIONS)),
                col("title").head(Some(MAX_RECOMMENDATIONS)),
                col("artist").head(Some(MAX_RECOMMENDATIONS)),
            ])
            .explode([col("song_id"), col("title"), col("artist")])
            .collect()?;
        Ok(df)
    }

    /// Task 5: genre loyalty score per user (plays of the favorite genre over
    /// total plays), keeping users whose score exceeds `threshold`.
    pub fn genre_loyalty_scores(&self, threshold: f64) -> Result<DataFrame, ListenLabError> {
        let favorite = self.favorite_genre_per_user()?.lazy();
        let df = favorite
            .join(
                self.total_plays(),
                [col("user_id")],
                [col("user_id")],
                JoinArgs::new(JoinType::Inner),
            )
            .with_column(
                (col("play_count").cast(DataType::Float64)
                    / col("total_plays").cast(DataType::Float64))
                .alias("loyalty_score"),
            )
            .filter(col("loyalty_score").gt(lit(threshold)))
            .sort(["user_id"], SortMultipleOptions::default())
            .collect()?;
        Ok(df)
    }

    /// Task 6: users with any play between midnight and 5 AM.
    pub fn night_owl_users(&self) -> Result<DataFrame, ListenLabError> {
        let df = self
            .typed_logs()
            .with_column(col("timestamp").dt().hour().cast(DataType::Int32).alias("hour"))
            .filter(col("hour").gt_eq(lit(0)).and(col("hour").lt(lit(5))))
            .select([col("user_id")])
            .unique(None, UniqueKeepStrategy::Any)
            .sort(["user_id"], SortMultipleOptions::default())
            .collect()?;
        Ok(df)
    }

    /// Runs all six queries plus the reference outputs.
    pub fn run_all(&self) -> Result<AnalyticsReport, ListenLabError> {
        Ok(AnalyticsReport {
            enriched_logs: self.enriched_logs()?,
            timestamp_range: self.timestamp_range()?,
            favorite_genres: self.favorite_genre_per_user()?,
            average_listen_time: self.average_listen_time()?,
            top_songs_this_week: self.top_songs_this_week()?,
            happy_recommendations: self.happy_recommendations()?,
            genre_loyalty_scores: self.genre_loyalty_scores(LOYALTY_SCORE_THRESHOLD)?,
            night_owl_users: self.night_owl_users()?,
        })
    }
}

/// The materialized results of one analytics batch.
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct AnalyticsReport {
    enriched_logs: DataFrame,
    timestamp_range: DataFrame,
    favorite_genres: DataFrame,
    average_listen_time: DataFrame,
    top_songs_this_week: DataFrame,
    happy_recommendations: DataFrame,
    genre_loyalty_scores: DataFrame,
    night_owl_users: DataFrame,
}

impl AnalyticsReport {
    /// Writes every result as a headered CSV file under `dir`.
    pub fn write_csv(&self, dir: &Path) -> Result<(), ListenLabError> {
        std::fs::create_dir_all(dir)?;
        let outputs = [
            ("enriched_logs.csv", &self.enriched_logs),
            ("user_favorite_genres.csv", &self.favorite_genres),
            ("avg_listen_time_per_song.csv", &self.average_listen_time),
            ("top_songs_this_week.csv", &self.top_songs_this_week),
            ("happy_recommendations.csv", &self.happy_recommendations),
            ("genre_loyalty_scores.csv", &self.genre_loyalty_scores),
            ("night_owl_users.csv", &self.night_owl_users),
        ];
        for (name, df) in outputs {
            let mut df = df.clone();
            write_frame(&mut df, &dir.join(name))?;
        }
        Ok(())
    }
}
