//! Grouped summaries over coded rows: frame and video label rates plus
//! engagement metrics. Missing values stay out of rate denominators.

use std::collections::BTreeMap;

use super::load::CodedRow;

pub struct FrameSummary {
    pub frame: String,
    pub n_comments: usize,
    pub vp_rate: f64,
    pub e_int_rate: f64,
    pub e_ext_rate: f64,
    pub cyn_rate: f64,
    pub median_like: f64,
    pub median_reply: f64,
}

pub struct VideoSummary {
    pub video_id: String,
    pub frame: String,
    pub n_comments: usize,
    pub vp_rate: f64,
    pub e_int_rate: f64,
    pub e_ext_rate: f64,
    pub median_like: f64,
    pub median_reply: f64,
}

pub struct EngagementMetrics {
    pub frame: String,
    pub has_like_rate: f64,
    pub has_reply_rate: f64,
    pub high_engagement_rate: f64,
    pub avg_like_all: f64,
    pub avg_like_if_any: f64,
}

pub struct VpByEngagement {
    pub frame: String,
    pub has_engagement: u8,
    pub vp_rate: Option<f64>,
}

/// Per-frame label rates and engagement medians, frames in sorted order.
/// Rows without a frame are left out.
pub fn frame_summary(rows: &[CodedRow]) -> Vec<FrameSummary> {
    group_by_frame(rows)
        .into_iter()
        .map(|(frame, group)| FrameSummary {
            frame,
            n_comments: group.len(),
            vp_rate: rate(&group, |r| r.vp),
            e_int_rate: rate(&group, |r| r.e_int),
            e_ext_rate: rate(&group, |r| r.e_ext),
            cyn_rate: rate(&group, |r| r.cyn),
            median_like: median(&group, |r| r.like_count),
            median_reply: median(&group, |r| r.total_reply_count),
        })
        .collect()
}

/// Per-video rates, carrying the video's frame through.
pub fn video_summary(rows: &[CodedRow]) -> Vec<VideoSummary> {
    let mut groups: BTreeMap<String, Vec<&CodedRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.video_id.clone()).or_default().push(row);
    }

    groups
        .into_iter()
        .map(|(video_id, group)| VideoSummary {
            video_id,
            frame: group
                .iter()
                .find_map(|r| r.frame.clone())
                .unwrap_or_default(),
            n_comments: group.len(),
            vp_rate: rate(&group, |r| r.vp),
            e_int_rate: rate(&group, |r| r.e_int),
            e_ext_rate: rate(&group, |r| r.e_ext),
            median_like: median(&group, |r| r.like_count),
            median_reply: median(&group, |r| r.total_reply_count),
        })
        .collect()
}

/// Per-frame engagement rates. Unlike label rates, missing like/reply counts
/// coerce to 0 here (an uncounted like is no like).
pub fn engagement_metrics(rows: &[CodedRow]) -> Vec<EngagementMetrics> {
    group_by_frame(rows)
        .into_iter()
        .map(|(frame, group)| {
            let likes: Vec<f64> = group.iter().map(|r| r.like_count.unwrap_or(0.0)).collect();
            let replies: Vec<f64> = group
                .iter()
                .map(|r| r.total_reply_count.unwrap_or(0.0))
                .collect();
            let n = group.len() as f64;

            let has_like = likes.iter().filter(|&&l| l > 0.0).count() as f64;
            let has_reply = replies.iter().filter(|&&r| r > 0.0).count() as f64;
            let high = likes
                .iter()
                .zip(&replies)
                .filter(|(&l, &r)| l > 5.0 || r > 0.0)
                .count() as f64;

            let liked: Vec<f64> = likes.iter().copied().filter(|&l| l > 0.0).collect();
            let avg_like_if_any = if liked.is_empty() {
                0.0
            } else {
                liked.iter().sum::<f64>() / liked.len() as f64
            };

            EngagementMetrics {
                frame,
                has_like_rate: has_like / n,
                has_reply_rate: has_reply / n,
                high_engagement_rate: high / n,
                avg_like_all: likes.iter().sum::<f64>() / n,
                avg_like_if_any,
            }
        })
        .collect()
}

/// Mean VP per (frame, any-like) cell.
pub fn vp_by_engagement(rows: &[CodedRow]) -> Vec<VpByEngagement> {
    let mut groups: BTreeMap<(String, u8), Vec<&CodedRow>> = BTreeMap::new();
    for row in rows {
        let Some(frame) = &row.frame else { continue };
        let has_engagement = u8::from(row.like_count.unwrap_or(0.0) > 0.0);
        groups
            .entry((frame.clone(), has_engagement))
            .or_default()
            .push(row);
    }

    groups
        .into_iter()
        .map(|((frame, has_engagement), group)| {
            let values: Vec<f64> = group.iter().filter_map(|r| r.vp).collect();
            VpByEngagement {
                frame,
                has_engagement,
                vp_rate: if values.is_empty() {
                    None
                } else {
                    Some(values.iter().sum::<f64>() / values.len() as f64)
                },
            }
        })
        .collect()
}

fn group_by_frame(rows: &[CodedRow]) -> BTreeMap<String, Vec<&CodedRow>> {
    let mut groups: BTreeMap<String, Vec<&CodedRow>> = BTreeMap::new();
    for row in rows {
        if let Some(frame) = &row.frame {
            groups.entry(frame.clone()).or_default().push(row);
        }
    }
    groups
}

/// Fraction of 1s among non-missing values; 0 when nothing is codable.
fn rate(group: &[&CodedRow], field: impl Fn(&CodedRow) -> Option<f64>) -> f64 {
    let values: Vec<f64> = group.iter().filter_map(|r| field(r)).collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Median over non-missing values (mean of the middle two for even counts);
/// 0 when nothing is codable.
fn median(group: &[&CodedRow], field: impl Fn(&CodedRow) -> Option<f64>) -> f64 {
    let mut values: Vec<f64> = group.iter().filter_map(|r| field(r)).collect();
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn coded(video_id: &str, frame: &str, vp: Option<f64>, like: f64) -> CodedRow {
        CodedRow {
            video_id: video_id.to_string(),
            comment_id: format!("{}_{}", video_id, like),
            frame: Some(frame.to_string()),
            vp,
            e_int: None,
            e_ext: None,
            cyn: None,
            like_count: Some(like),
            total_reply_count: Some(0.0),
            published_at: None,
            video_published_at: None,
        }
    }

    #[test]
    fn missing_labels_excluded_from_rate_denominator() {
        // ["1", "", "0"] => rate over the 2 codable values = 0.5
        let rows = vec![
            coded("v1", "Loss", Some(1.0), 0.0),
            coded("v1", "Loss", None, 0.0),
            coded("v1", "Loss", Some(0.0), 0.0),
        ];
        let summary = frame_summary(&rows);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].n_comments, 3);
        assert!((summary[0].vp_rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn five_loss_rows_give_point_six() {
        let rows: Vec<CodedRow> = [1.0, 1.0, 0.0, 1.0, 0.0]
            .iter()
            .map(|&v| coded("v1", "Loss", Some(v), 0.0))
            .collect();
        let summary = frame_summary(&rows);
        assert!((summary[0].vp_rate - 0.6).abs() < 1e-12);
    }

    #[test]
    fn frames_sorted_and_unframed_rows_dropped() {
        let mut unframed = coded("v9", "x", Some(1.0), 0.0);
        unframed.frame = None;
        let rows = vec![
            coded("v1", "Loss", Some(1.0), 0.0),
            coded("v2", "Gain", Some(0.0), 0.0),
            unframed,
        ];
        let summary = frame_summary(&rows);
        let frames: Vec<&str> = summary.iter().map(|s| s.frame.as_str()).collect();
        assert_eq!(frames, vec!["Gain", "Loss"]);
    }

    #[test]
    fn even_count_median_averages_middle_two() {
        let rows = vec![
            coded("v1", "Loss", None, 1.0),
            coded("v1", "Loss", None, 2.0),
            coded("v1", "Loss", None, 10.0),
            coded("v1", "Loss", None, 4.0),
        ];
        let summary = frame_summary(&rows);
        assert!((summary[0].median_like - 3.0).abs() < 1e-12);
    }

    #[test]
    fn video_summary_carries_frame() {
        let rows = vec![
            coded("v1", "Loss", Some(1.0), 0.0),
            coded("v1", "Loss", Some(0.0), 0.0),
            coded("v2", "Gain", Some(1.0), 0.0),
        ];
        let summary = video_summary(&rows);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].video_id, "v1");
        assert_eq!(summary[0].frame, "Loss");
        assert_eq!(summary[0].n_comments, 2);
        assert!((summary[0].vp_rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn engagement_rates_and_conditional_mean() {
        let mut with_reply = coded("v1", "Loss", None, 0.0);
        with_reply.total_reply_count = Some(2.0);
        let rows = vec![
            coded("v1", "Loss", None, 10.0),
            coded("v1", "Loss", None, 2.0),
            with_reply,
            coded("v1", "Loss", None, 0.0),
        ];
        let metrics = engagement_metrics(&rows);
        let m = &metrics[0];
        assert!((m.has_like_rate - 0.5).abs() < 1e-12);
        assert!((m.has_reply_rate - 0.25).abs() < 1e-12);
        // like>5 or any reply: rows 1 and 3
        assert!((m.high_engagement_rate - 0.5).abs() < 1e-12);
        assert!((m.avg_like_all - 3.0).abs() < 1e-12);
        assert!((m.avg_like_if_any - 6.0).abs() < 1e-12);
    }

    #[test]
    fn vp_by_engagement_splits_on_any_like() {
        let rows = vec![
            coded("v1", "Loss", Some(1.0), 5.0),
            coded("v1", "Loss", Some(0.0), 0.0),
            coded("v1", "Loss", Some(1.0), 0.0),
        ];
        let cells = vp_by_engagement(&rows);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].has_engagement, 0);
        assert!((cells[0].vp_rate.unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(cells[1].has_engagement, 1);
        assert!((cells[1].vp_rate.unwrap() - 1.0).abs() < 1e-12);
    }
}
