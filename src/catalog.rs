use crate::ListenLabError;
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

/// Candidate artist names for the generated catalog.
pub const ARTISTS: [&str; 5] = ["Artist A", "Artist B", "Artist C", "Artist D", "Artist E"];
/// Candidate genres for the generated catalog.
pub const GENRES: [&str; 5] = ["Pop", "Rock", "Jazz", "Hip-Hop", "Classical"];
/// Candidate moods for the generated catalog.
pub const MOODS: [&str; 4] = ["Happy", "Sad", "Energetic", "Chill"];

/// One row of the song-metadata table. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Song {
    pub song_id: String,
    pub title: String,
    pub artist: String,
    pub genre: String,
    pub mood: String,
}

/// Generates `num_songs` songs with sequential ids (`song_<i>`, 1-indexed)
/// and uniformly drawn artist, genre and mood.
pub fn generate_catalog(num_songs: usize, rng: &mut impl Rng) -> Vec<Song> {
    (1..=num_songs)
        .map(|i| Song {
            song_id: format!("song_{}", i),
            title: format!("Song {}", i),
            artist: ARTISTS.choose(rng).expect("non-empty set").to_string(),
            genre: GENRES.choose(rng).expect("non-empty set").to_string(),
            mood: MOODS.choose(rng).expect("non-empty set").to_string(),
        })
        .collect()
}

/// Converts a song catalog into a `DataFrame` with the
/// `songs_metadata.csv` column layout.
pub fn catalog_frame(songs: &[Song]) -> Result<DataFrame, ListenLabError> {
    let df = df!(
        "song_id" => songs.iter().map(|s| s.song_id.as_str()).collect::<Vec<_>>(),
        "title" => songs.iter().map(|s| s.title.as_str()).collect::<Vec<_>>(),
        "artist" => songs.iter().map(|s| s.artist.as_str()).collect::<Vec<_>>(),
        "genre" => songs.iter().map(|s| s.genre.as_str()).collect::<Vec<_>>(),
        "mood" => songs.iter().map(|s| s.mood.as_str()).collect::<Vec<_>>(),
    )?;
    Ok(df)
}
