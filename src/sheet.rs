use std::path::Path;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::db::{Comment, StoredComment};
use crate::labeler::{Label, Labeler};
use crate::output::write_atomic;

/// Coding-sheet header: comment fields, machine predictions, then the blank
/// columns a human coder fills in.
const SHEET_COLUMNS: &[&str] = &[
    "video_id",
    "comment_id",
    "published_at",
    "like_count",
    "total_reply_count",
    "text",
    "pred_VP",
    "pred_E_int",
    "pred_E_ext",
    "pred_Cyn",
    "pred_Norm",
    "pred_Info",
    "pred_Mobi",
    "VP",
    "E_int",
    "E_ext",
    "Cyn",
    "Norm",
    "Info",
    "Mobi",
    "unsure",
    "coder_memo",
];

const DEBUG_COLUMNS: &[&str] = &["priority_rules", "detected_keywords"];

/// Label every comment and write the coding sheet, one row per comment in
/// the extractor's order. Labeling runs in parallel; results are re-joined
/// to their input position before writing, never in completion order.
pub fn write_coding_sheet(
    path: &Path,
    comments: &[Comment],
    labeler: &Labeler,
    include_debug: bool,
) -> Result<usize> {
    let pb = ProgressBar::new(comments.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec})")?
            .progress_chars("=> "),
    );

    let assignments: Vec<_> = comments
        .par_iter()
        .map(|comment| {
            let assignment = labeler.resolve(&comment.text);
            pb.inc(1);
            assignment
        })
        .collect();
    pb.finish_and_clear();

    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<&str> = SHEET_COLUMNS.to_vec();
    if include_debug {
        header.extend_from_slice(DEBUG_COLUMNS);
    }
    writer.write_record(&header)?;

    for (comment, assignment) in comments.iter().zip(&assignments) {
        let mut record: Vec<String> = vec![
            comment.video_id.clone(),
            comment.comment_id.clone(),
            comment.published_at.clone(),
            comment.like_count.to_string(),
            comment.total_reply_count.to_string(),
            comment.text.clone(),
        ];
        for label in Label::ALL {
            record.push(assignment.value(label).to_string());
        }
        // Human-coded label columns, unsure flag, memo: blank at generation.
        for _ in 0..Label::ALL.len() + 2 {
            record.push(String::new());
        }
        if include_debug {
            record.push(assignment.rules_joined());
            record.push(assignment.keywords_json());
        }
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner()?;
    write_atomic(path, &bytes)?;
    Ok(comments.len())
}

/// Export raw collected comments with the upstream API's field names.
pub fn write_raw_comments(path: &Path, comments: &[StoredComment]) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "videoId",
        "videoPublishedAt",
        "commentId",
        "publishedAt",
        "updatedAt",
        "likeCount",
        "totalReplyCount",
        "text",
    ])?;

    for c in comments {
        writer.write_record([
            c.video_id.as_str(),
            c.video_published_at.as_str(),
            c.comment_id.as_str(),
            c.published_at.as_str(),
            c.updated_at.as_str(),
            &c.like_count.to_string(),
            &c.total_reply_count.to_string(),
            c.text.as_str(),
        ])?;
    }

    let bytes = writer.into_inner()?;
    write_atomic(path, &bytes)?;
    Ok(comments.len())
}

// ── Tests ──
