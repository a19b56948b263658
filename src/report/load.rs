use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime};
use tracing::warn;

/// Frame assignment for the original pilot videos, used only when neither
/// the coded file nor the video metadata carries a frame column.
const FRAME_FALLBACK: &[(&str, &str)] = &[
    ("hj50Suuh5DM", "Loss"),
    ("GLbc9in9zeY", "Loss"),
    ("RF8I4LHej5E", "Loss"),
    ("Ygtmbwj0sV4", "Gain"),
];

/// One human-reviewed coding-sheet row as consumed by the report engine.
/// Label and count fields are `None` when blank or non-numeric; they are
/// excluded from aggregation, never treated as zero.
#[derive(Debug, Clone)]
pub struct CodedRow {
    pub video_id: String,
    pub comment_id: String,
    pub frame: Option<String>,
    pub vp: Option<f64>,
    pub e_int: Option<f64>,
    pub e_ext: Option<f64>,
    pub cyn: Option<f64>,
    pub like_count: Option<f64>,
    pub total_reply_count: Option<f64>,
    pub published_at: Option<String>,
    pub video_published_at: Option<String>,
}

/// Load a coded CSV. Column positions come from the header; extra columns
/// are ignored and absent ones load as missing.
pub fn load_coded_csv(path: &Path) -> Result<Vec<CodedRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open coded file {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let col = |name: &str| headers.iter().position(|h| h == name);

    let video_id_col = col("video_id");
    let comment_id_col = col("comment_id");
    let frame_col = col("frame");
    let vp_col = col("VP");
    let e_int_col = col("E_int");
    let e_ext_col = col("E_ext");
    let cyn_col = col("Cyn");
    let like_col = col("like_count");
    let reply_col = col("total_reply_count");
    let published_col = col("published_at");
    let video_published_col = col("video_published_at");

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let text = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let number = |idx: Option<usize>| text(idx).and_then(|s| s.parse::<f64>().ok());

        rows.push(CodedRow {
            video_id: text(video_id_col).unwrap_or_default(),
            comment_id: text(comment_id_col).unwrap_or_default(),
            frame: text(frame_col),
            vp: number(vp_col),
            e_int: number(e_int_col),
            e_ext: number(e_ext_col),
            cyn: number(cyn_col),
            like_count: number(like_col),
            total_reply_count: number(reply_col),
            published_at: text(published_col),
            video_published_at: text(video_published_col),
        });
    }
    Ok(rows)
}

/// Ensure rows carry a frame: merge a video-metadata CSV when provided,
/// then fall back to the static pilot-video lookup for rows still missing
/// one. A dataset left with no frames at all gets a warning, not an error —
/// the frame-keyed outputs will simply be empty.
pub fn apply_frame_metadata(rows: &mut [CodedRow], video_csv: Option<&Path>) -> Result<()> {
    if let Some(path) = video_csv {
        let metadata = load_video_frames(path)?;
        for row in rows.iter_mut() {
            if let Some(frame) = metadata.get(&row.video_id) {
                row.frame = Some(frame.clone());
            }
        }
    }

    if rows.iter().all(|r| r.frame.is_none()) {
        for row in rows.iter_mut() {
            row.frame = FRAME_FALLBACK
                .iter()
                .find(|(vid, _)| *vid == row.video_id)
                .map(|(_, frame)| frame.to_string());
        }
        if rows.iter().any(|r| r.frame.is_none()) {
            warn!("No frame information found. Results may be incomplete.");
        }
    }
    Ok(())
}

fn load_video_frames(path: &Path) -> Result<HashMap<String, String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open video metadata {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let video_id_col = headers.iter().position(|h| h == "video_id");
    let frame_col = headers.iter().position(|h| h == "frame");

    let mut frames = HashMap::new();
    if let (Some(vid), Some(frame)) = (video_id_col, frame_col) {
        for record in reader.records() {
            let record = record?;
            if let (Some(video_id), Some(value)) = (record.get(vid), record.get(frame)) {
                if !value.trim().is_empty() {
                    frames.insert(video_id.to_string(), value.trim().to_string());
                }
            }
        }
    } else {
        warn!(
            "Video metadata {} has no video_id/frame columns; ignoring",
            path.display()
        );
    }
    Ok(frames)
}

/// Keep comments posted within `days` whole days of their video going live.
/// Rows whose timestamps cannot be parsed are excluded.
pub fn filter_by_days_since_video(rows: &[CodedRow], days: i64) -> Vec<CodedRow> {
    rows.iter()
        .filter(|row| {
            let video = row.video_published_at.as_deref().and_then(parse_timestamp);
            let comment = row.published_at.as_deref().and_then(parse_timestamp);
            match (video, comment) {
                (Some(video), Some(comment)) => (comment - video).num_days() <= days,
                _ => false,
            }
        })
        .cloned()
        .collect()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<chrono::FixedOffset>> {
    DateTime::parse_from_rfc3339(raw).ok().or_else(|| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc().fixed_offset())
    })
}

// ── Tests ──
