use chrono::NaiveDate;
use listenlab::catalog::Song;
use listenlab::logs::{generate_logs, DURATION_RANGE};
use listenlab::{DatasetBuilder, GENRES, MOODS};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};

fn fixed_now() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 20)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

#[test]
fn test_catalog_ids_are_unique_and_sequential() {
    let dataset = DatasetBuilder::new()
        .num_songs(100)
        .num_logs(0)
        .seed(11)
        .run()
        .unwrap();
    let ids: HashSet<&str> = dataset.songs().iter().map(|s| s.song_id.as_str()).collect();
    assert_eq!(ids.len(), 100);
    for k in 1..=100 {
        assert!(ids.contains(format!("song_{}", k).as_str()));
    }
}

#[test]
fn test_logs_keep_referential_integrity() {
    let dataset = DatasetBuilder::new()
        .num_songs(30)
        .num_logs(1000)
        .num_users(20)
        .seed(12)
        .run()
        .unwrap();
    let ids: HashSet<&str> = dataset.songs().iter().map(|s| s.song_id.as_str()).collect();
    for event in dataset.events() {
        assert!(ids.contains(event.song_id.as_str()));
    }
}

#[test]
fn test_durations_and_timestamps_stay_in_bounds() {
    let dataset = DatasetBuilder::new()
        .num_songs(30)
        .num_logs(1000)
        .num_users(20)
        .seed(13)
        .now(fixed_now())
        .run()
        .unwrap();
    let start = dataset.window_start();
    let end = dataset.window_end();
    for event in dataset.events() {
        assert!(event.duration_sec >= DURATION_RANGE.0);
        assert!(event.duration_sec <= DURATION_RANGE.1);
        assert!(event.timestamp >= start && event.timestamp <= end);
    }
}

#[test]
fn test_loyal_users_favor_their_assigned_genre() {
    let dataset = DatasetBuilder::new()
        .num_songs(100)
        .num_logs(5000)
        .num_users(10)
        .seed(42)
        .run()
        .unwrap();

    // Ordinals 5 and 10 are loyal; nobody else is.
    assert_eq!(dataset.favorite_genres().len(), 2);
    let genre_of: HashMap<&str, &str> = dataset
        .songs()
        .iter()
        .map(|s| (s.song_id.as_str(), s.genre.as_str()))
        .collect();

    for (user_id, favorite) in dataset.favorite_genres() {
        let plays: Vec<_> = dataset
            .events()
            .iter()
            .filter(|e| e.user_id == *user_id)
            .collect();
        assert!(plays.len() >= 300, "expected a large sample per user");
        let matching = plays
            .iter()
            .filter(|e| genre_of[e.song_id.as_str()] == favorite.as_str())
            .count();
        let fraction = matching as f64 / plays.len() as f64;
        // 0.85 from the rule plus the favorite genre's share of uniform
        // fallback draws (~0.15 * 1/5).
        assert!(
            (0.78..=0.96).contains(&fraction),
            "loyal fraction for {} was {}",
            user_id,
            fraction
        );
    }
}

#[test]
fn test_sad_heavy_users_favor_sad_songs() {
    let dataset = DatasetBuilder::new()
        .num_songs(100)
        .num_logs(5000)
        .num_users(10)
        .seed(42)
        .run()
        .unwrap();
    let mood_of: HashMap<&str, &str> = dataset
        .songs()
        .iter()
        .map(|s| (s.song_id.as_str(), s.mood.as_str()))
        .collect();

    let plays: Vec<_> = dataset
        .events()
        .iter()
        .filter(|e| e.user_id == "user_7")
        .collect();
    assert!(plays.len() >= 300, "expected a large sample for user_7");
    let sad = plays
        .iter()
        .filter(|e| mood_of[e.song_id.as_str()] == "Sad")
        .count();
    let fraction = sad as f64 / plays.len() as f64;
    // 0.80 from the rule plus the Sad share of uniform fallback draws
    // (~0.20 * 1/4).
    assert!(
        (0.72..=0.95).contains(&fraction),
        "sad fraction for user_7 was {}",
        fraction
    );
}

#[test]
fn test_small_catalog_scenario() {
    // 5 songs covering all 5 genres and all 4 moods.
    let songs: Vec<Song> = GENRES
        .iter()
        .enumerate()
        .map(|(i, genre)| Song {
            song_id: format!("song_{}", i + 1),
            title: format!("Song {}", i + 1),
            artist: "Artist A".to_string(),
            genre: genre.to_string(),
            mood: MOODS[i % MOODS.len()].to_string(),
        })
        .collect();

    let mut rng = StdRng::seed_from_u64(99);
    let generated = generate_logs(200, 10, &songs, fixed_now(), &mut rng).unwrap();

    let ids: HashSet<&str> = songs.iter().map(|s| s.song_id.as_str()).collect();
    for event in &generated.events {
        assert!(ids.contains(event.song_id.as_str()));
    }

    let favorite = generated.favorite_genres.get("user_5").unwrap();
    let genre_of: HashMap<&str, &str> = songs
        .iter()
        .map(|s| (s.song_id.as_str(), s.genre.as_str()))
        .collect();
    let plays: Vec<_> = generated
        .events
        .iter()
        .filter(|e| e.user_id == "user_5")
        .collect();
    assert!(!plays.is_empty());
    let matching = plays
        .iter()
        .filter(|e| genre_of[e.song_id.as_str()] == favorite.as_str())
        .count();
    // ~85% of user_5's plays come from the favorite genre; a clear majority
    // even at this sample size.
    assert!(matching * 2 > plays.len());
}

#[test]
fn test_frames_match_the_csv_schemas() {
    let dataset = DatasetBuilder::new()
        .num_songs(5)
        .num_logs(20)
        .num_users(4)
        .seed(21)
        .run()
        .unwrap();

    let songs = dataset.songs_frame().unwrap();
    assert_eq!(
        songs.get_column_names_str(),
        vec!["song_id", "title", "artist", "genre", "mood"]
    );

    let logs = dataset.logs_frame().unwrap();
    assert_eq!(
        logs.get_column_names_str(),
        vec!["user_id", "song_id", "timestamp", "duration_sec"]
    );
    let stamps = logs.column("timestamp").unwrap();
    let first = stamps.str().unwrap().get(0).unwrap();
    assert!(chrono::NaiveDateTime::parse_from_str(first, "%Y-%m-%d %H:%M:%S").is_ok());
}
