use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use listenlab::{AnalyticsRunner, DatasetBuilder, LOGS_CSV, SONGS_CSV};
use std::error::Error;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the synthetic song-metadata and listening-log CSV files
    Generate(GenerateArgs),
    /// Run the batch analytics queries over previously generated CSV files
    Analyze(AnalyzeArgs),
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Number of songs in the catalog
    #[arg(long, default_value_t = 100)]
    songs: usize,

    /// Number of listening-log records
    #[arg(long, default_value_t = 2000)]
    logs: usize,

    /// Size of the user population
    #[arg(long, default_value_t = 50)]
    users: usize,

    /// Seed for the random source, for a reproducible dataset
    #[arg(long)]
    seed: Option<u64>,

    /// Directory to write songs_metadata.csv and listening_logs.csv into
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct AnalyzeArgs {
    /// Path to the listening-log CSV file
    #[arg(long, default_value = "listening_logs.csv")]
    logs: PathBuf,

    /// Path to the song-metadata CSV file
    #[arg(long, default_value = "songs_metadata.csv")]
    songs: PathBuf,

    /// Directory to write the query results into
    #[arg(short, long, default_value = "output")]
    out_dir: PathBuf,

    /// Reference time for the weekly query, as "YYYY-MM-DD HH:MM:SS"
    /// (defaults to the wall clock)
    #[arg(long)]
    now: Option<String>,
}

fn run_generate(args: GenerateArgs) -> Result<(), Box<dyn Error>> {
    info!(
        songs = args.songs,
        logs = args.logs,
        users = args.users,
        "generating dataset"
    );
    let mut builder = DatasetBuilder::new();
    builder
        .num_songs(args.songs)
        .num_logs(args.logs)
        .num_users(args.users);
    if let Some(seed) = args.seed {
        builder.seed(seed);
    }
    let dataset = builder.run()?;
    dataset.write_csv(&args.out_dir)?;
    println!(
        "Generated {} with {} rows and {} with {} rows in {}",
        SONGS_CSV,
        dataset.songs().len(),
        LOGS_CSV,
        dataset.events().len(),
        args.out_dir.display()
    );
    Ok(())
}

fn run_analyze(args: AnalyzeArgs) -> Result<(), Box<dyn Error>> {
    let mut runner = AnalyticsRunner::from_csv(&args.logs, &args.songs)?;
    if let Some(now) = &args.now {
        let now = NaiveDateTime::parse_from_str(now, "%Y-%m-%d %H:%M:%S")?;
        runner = runner.with_now(now);
    }

    info!("running analytics batch");
    let report = runner.run_all()?;

    println!("Timestamp range in data:\n{}", report.timestamp_range());
    println!("Favorite genre per user:\n{}", report.favorite_genres());
    println!(
        "Average listen time per song:\n{}",
        report.average_listen_time()
    );
    println!(
        "Top 10 most played songs this week:\n{}",
        report.top_songs_this_week()
    );
    println!(
        "Happy song recommendations for sad-heavy users:\n{}",
        report.happy_recommendations()
    );
    println!(
        "Users with loyalty score > 0.8:\n{}",
        report.genre_loyalty_scores()
    );
    println!("Night owl users:\n{}", report.night_owl_users());

    report.write_csv(&args.out_dir)?;
    println!("Analytics written to {}", args.out_dir.display());
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Generate(args) => run_generate(args),
        Commands::Analyze(args) => run_analyze(args),
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
