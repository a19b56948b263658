mod api;
mod db;
mod labeler;
mod output;
mod report;
mod sheet;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use labeler::{Dictionary, Labeler};

#[derive(Parser)]
#[command(name = "comment_pilot", about = "YouTube comment collection and framing-study coding")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum CommentOrder {
    Time,
    Relevance,
}

impl CommentOrder {
    fn as_str(self) -> &'static str {
        match self {
            CommentOrder::Time => "time",
            CommentOrder::Relevance => "relevance",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch comments for one or more videos into the database
    Collect {
        /// Video ID (can be specified multiple times)
        #[arg(long = "video", required = true)]
        videos: Vec<String>,
        /// Maximum comments per video
        #[arg(long, default_value = "500")]
        max_comments: usize,
        /// Comment order requested from the API
        #[arg(long, value_enum, default_value = "time")]
        order: CommentOrder,
        /// SQLite database path
        #[arg(long, default_value = db::DEFAULT_DB_PATH)]
        db: String,
        /// Also export the raw comments to this CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Label stored comments and write a coding sheet for human review
    Code {
        /// SQLite database path
        #[arg(long, default_value = db::DEFAULT_DB_PATH)]
        db: String,
        /// Coding sheet output path
        #[arg(short, long)]
        out: PathBuf,
        /// Max comments to extract
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Seed for the reproducible pseudo-shuffle
        #[arg(long)]
        seed: Option<i64>,
        /// JSON file overriding the built-in keyword dictionary
        #[arg(long)]
        dictionary: Option<PathBuf>,
        /// Omit the priority_rules / detected_keywords debug columns
        #[arg(long)]
        no_debug: bool,
    },
    /// Summaries and hypothesis tests over a human-coded sheet
    Report {
        /// Coded CSV (coding sheet with label columns filled in)
        coded: PathBuf,
        /// Directory for the report files
        #[arg(short, long, default_value = "out/report")]
        out_dir: PathBuf,
        /// Video metadata CSV with video_id and frame columns
        #[arg(long)]
        videos: Option<PathBuf>,
    },
    /// Robustness checks: time-window filter, leave-one-out sweep, engagement
    AdvancedReport {
        /// Coded CSV (coding sheet with label columns filled in)
        coded: PathBuf,
        /// Directory for the report files
        #[arg(short, long, default_value = "out/advanced")]
        out_dir: PathBuf,
        /// Video metadata CSV with video_id and frame columns
        #[arg(long)]
        videos: Option<PathBuf>,
        /// Keep only comments within this many days of video publication
        #[arg(long, default_value = "14")]
        days: i64,
        /// Skip the leave-one-out analysis
        #[arg(long)]
        no_loo: bool,
        /// Skip the engagement metrics
        #[arg(long)]
        no_engagement: bool,
    },
    /// Show dataset statistics
    Stats {
        /// SQLite database path
        #[arg(long, default_value = db::DEFAULT_DB_PATH)]
        db: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Collect {
            videos,
            max_comments,
            order,
            db: db_path,
            csv,
        } => {
            let api_key = std::env::var("YOUTUBE_API_KEY")
                .context("YOUTUBE_API_KEY environment variable must be set")?;

            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;

            let fetched =
                api::fetch_videos(&api_key, &videos, max_comments, order.as_str()).await?;

            let mut all_comments = Vec::new();
            for video in fetched {
                println!("\nProcessing video: {}", video.video_id);
                db::insert_videos(
                    &conn,
                    &[(video.video_id.clone(), video.published_at.clone())],
                )?;
                let saved = db::insert_comments(&conn, &video.comments)?;
                println!("  Fetched: {} comments", video.comments.len());
                println!("  Saved: {} new comments", saved);
                println!("  Skipped: {} duplicate comments", video.comments.len() - saved);
                all_comments.extend(video.comments);
            }

            if let Some(csv_path) = csv {
                sheet::write_raw_comments(&csv_path, &all_comments)?;
                println!("CSV saved to: {}", csv_path.display());
            }

            println!("\nTotal comments collected: {}", all_comments.len());
            println!("Database saved to: {}", db_path);
            Ok(())
        }
        Commands::Code {
            db: db_path,
            out,
            limit,
            seed,
            dictionary,
            no_debug,
        } => {
            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;

            let comments = db::extract_comments(&conn, limit, seed)?;
            if comments.is_empty() {
                println!("No comments in the database. Run 'collect' first.");
                return Ok(());
            }

            let dict = match dictionary {
                Some(path) => Dictionary::from_json_file(&path)?,
                None => Dictionary::default(),
            };
            let labeler = Labeler::with_dictionary(dict);

            println!("Labeling {} comments...", comments.len());
            let count = sheet::write_coding_sheet(&out, &comments, &labeler, !no_debug)?;
            println!(
                "Generated coding sheet with {} comments: {}",
                count,
                out.display()
            );
            Ok(())
        }
        Commands::Report {
            coded,
            out_dir,
            videos,
        } => report::generate_report(&coded, &out_dir, videos.as_deref()),
        Commands::AdvancedReport {
            coded,
            out_dir,
            videos,
            days,
            no_loo,
            no_engagement,
        } => {
            let opts = report::AdvancedOptions {
                days: Some(days),
                include_loo: !no_loo,
                include_engagement: !no_engagement,
            };
            report::generate_advanced_report(&coded, &out_dir, videos.as_deref(), &opts)
        }
        Commands::Stats { db: db_path } => {
            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;

            println!("Comments: {}", s.total_comments);
            println!("Videos:   {}", s.total_videos);
            if !s.per_video.is_empty() {
                println!();
                println!(
                    "{:<14} | {:>8} | {:<20} | {:<20}",
                    "Video", "Comments", "First comment", "Last comment"
                );
                println!("{}", "-".repeat(72));
                for v in &s.per_video {
                    println!(
                        "{:<14} | {:>8} | {:<20} | {:<20}",
                        v.video_id, v.n_comments, v.first_comment, v.last_comment
                    );
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
