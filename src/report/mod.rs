pub mod hypothesis;
pub mod load;
pub mod loo;
pub mod summary;

use std::path::Path;

use anyhow::Result;

use crate::output::write_atomic;
use hypothesis::{hypothesis_tests, TestResult};
use load::{apply_frame_metadata, filter_by_days_since_video, load_coded_csv};
use loo::{loo_analysis, robustness_narrative, LooRow};
use summary::{
    engagement_metrics, frame_summary, video_summary, vp_by_engagement, EngagementMetrics,
    FrameSummary, VideoSummary, VpByEngagement,
};

/// Basic report: frame summary, video summary, and the hypothesis tests.
pub fn generate_report(
    coded_csv: &Path,
    out_dir: &Path,
    video_csv: Option<&Path>,
) -> Result<()> {
    let mut rows = load_coded_csv(coded_csv)?;
    apply_frame_metadata(&mut rows, video_csv)?;
    println!("Loaded {} comments", rows.len());

    let has_frames = rows.iter().any(|r| r.frame.is_some());

    if has_frames {
        let path = out_dir.join("summary_by_frame.csv");
        write_frame_summary(&path, &frame_summary(&rows))?;
        println!("Generated: {}", path.display());
    }

    let path = out_dir.join("summary_by_video.csv");
    write_video_summary(&path, &video_summary(&rows))?;
    println!("Generated: {}", path.display());

    if has_frames {
        let tests = hypothesis_tests(&rows);
        let path = out_dir.join("tests_h1_h2.csv");
        write_tests(&path, &tests)?;
        println!("Generated: {}", path.display());
        print_test_summary(&tests);
    }

    Ok(())
}

pub struct AdvancedOptions {
    pub days: Option<i64>,
    pub include_loo: bool,
    pub include_engagement: bool,
}

impl Default for AdvancedOptions {
    fn default() -> Self {
        Self {
            days: Some(14),
            include_loo: true,
            include_engagement: true,
        }
    }
}

/// Advanced report: time-window filtered summary/tests, the leave-one-out
/// sweep with its robustness narrative, and engagement metrics.
pub fn generate_advanced_report(
    coded_csv: &Path,
    out_dir: &Path,
    video_csv: Option<&Path>,
    opts: &AdvancedOptions,
) -> Result<()> {
    let mut rows = load_coded_csv(coded_csv)?;
    apply_frame_metadata(&mut rows, video_csv)?;
    println!("Loaded {} comments", rows.len());

    if let Some(days) = opts.days {
        let filtered = filter_by_days_since_video(&rows, days);
        println!(
            "Filtered to {} comments within {} days of video publication",
            filtered.len(),
            days
        );
        if !filtered.is_empty() {
            write_frame_summary(
                &out_dir.join(format!("summary_{}days.csv", days)),
                &frame_summary(&filtered),
            )?;
            write_tests(
                &out_dir.join(format!("tests_{}days.csv", days)),
                &hypothesis_tests(&filtered),
            )?;
        }
    }

    if opts.include_loo {
        println!("Performing Leave-One-Out analysis...");
        let loo = loo_analysis(&rows);
        write_loo(&out_dir.join("loo_analysis.csv"), &loo)?;

        let narrative = robustness_narrative(&loo);
        write_atomic(&out_dir.join("robustness_report.txt"), narrative.as_bytes())?;
        println!("{}", narrative);
    }

    if opts.include_engagement {
        println!("Calculating engagement metrics...");
        write_engagement(
            &out_dir.join("engagement_metrics.csv"),
            &engagement_metrics(&rows),
        )?;
        write_vp_by_engagement(
            &out_dir.join("vp_by_engagement.csv"),
            &vp_by_engagement(&rows),
        )?;
    }

    Ok(())
}

fn print_test_summary(tests: &[TestResult]) {
    println!("\n=== Hypothesis Test Results ===");
    for test in tests {
        println!("\n{} ({}):", test.hypothesis, test.method);
        println!("  Statistic: {:.3}", test.statistic);
        println!("  p-value: {:.3}", test.p_value);
        println!("  Effect size: {:.3}", test.effect_size);
        println!("  Notes: {}", test.notes);
    }
}

// ── CSV writers ──

fn write_csv(path: &Path, build: impl FnOnce(&mut csv::Writer<Vec<u8>>) -> Result<()>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    build(&mut writer)?;
    let bytes = writer.into_inner()?;
    write_atomic(path, &bytes)
}

fn write_frame_summary(path: &Path, summaries: &[FrameSummary]) -> Result<()> {
    write_csv(path, |w| {
        w.write_record([
            "frame",
            "n_comments",
            "VP_rate",
            "E_int_rate",
            "E_ext_rate",
            "Cyn_rate",
            "median_like",
            "median_reply",
        ])?;
        for s in summaries {
            w.write_record([
                s.frame.as_str(),
                &s.n_comments.to_string(),
                &s.vp_rate.to_string(),
                &s.e_int_rate.to_string(),
                &s.e_ext_rate.to_string(),
                &s.cyn_rate.to_string(),
                &s.median_like.to_string(),
                &s.median_reply.to_string(),
            ])?;
        }
        Ok(())
    })
}

fn write_video_summary(path: &Path, summaries: &[VideoSummary]) -> Result<()> {
    write_csv(path, |w| {
        w.write_record([
            "video_id",
            "frame",
            "n_comments",
            "VP_rate",
            "E_int_rate",
            "E_ext_rate",
            "median_like",
            "median_reply",
        ])?;
        for s in summaries {
            w.write_record([
                s.video_id.as_str(),
                s.frame.as_str(),
                &s.n_comments.to_string(),
                &s.vp_rate.to_string(),
                &s.e_int_rate.to_string(),
                &s.e_ext_rate.to_string(),
                &s.median_like.to_string(),
                &s.median_reply.to_string(),
            ])?;
        }
        Ok(())
    })
}

fn write_tests(path: &Path, tests: &[TestResult]) -> Result<()> {
    write_csv(path, |w| {
        w.write_record([
            "hypothesis",
            "method",
            "statistic",
            "p_value",
            "effect_size",
            "notes",
        ])?;
        for t in tests {
            w.write_record([
                t.hypothesis,
                t.method,
                &t.statistic.to_string(),
                &t.p_value.to_string(),
                &t.effect_size.to_string(),
                &t.notes,
            ])?;
        }
        Ok(())
    })
}

fn write_loo(path: &Path, rows: &[LooRow]) -> Result<()> {
    write_csv(path, |w| {
        w.write_record([
            "excluded_video",
            "n_comments",
            "H1_p_value",
            "H1_effect_size",
            "H2_p_value",
            "H2_effect_size",
        ])?;
        for r in rows {
            w.write_record([
                r.excluded_video.as_str(),
                &r.n_comments.to_string(),
                &r.h1_p_value.to_string(),
                &r.h1_effect_size.to_string(),
                &r.h2_p_value.to_string(),
                &r.h2_effect_size.to_string(),
            ])?;
        }
        Ok(())
    })
}

fn write_engagement(path: &Path, metrics: &[EngagementMetrics]) -> Result<()> {
    write_csv(path, |w| {
        w.write_record([
            "frame",
            "has_like_rate",
            "has_reply_rate",
            "high_engagement_rate",
            "avg_like_all",
            "avg_like_if_any",
        ])?;
        for m in metrics {
            w.write_record([
                m.frame.as_str(),
                &m.has_like_rate.to_string(),
                &m.has_reply_rate.to_string(),
                &m.high_engagement_rate.to_string(),
                &m.avg_like_all.to_string(),
                &m.avg_like_if_any.to_string(),
            ])?;
        }
        Ok(())
    })
}

fn write_vp_by_engagement(path: &Path, cells: &[VpByEngagement]) -> Result<()> {
    write_csv(path, |w| {
        w.write_record(["frame", "has_engagement", "VP"])?;
        for c in cells {
            w.write_record([
                c.frame.as_str(),
                &c.has_engagement.to_string(),
                &c.vp_rate.map(|v| v.to_string()).unwrap_or_default(),
            ])?;
        }
        Ok(())
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Four videos, two frames, comments spread over three weeks so the
    /// 14-day filter bites. Rates differ per frame so the tests run.
    fn write_coded_fixture(path: &Path) {
        let mut file = std::fs::File::create(path).unwrap();
        writeln!(
            file,
            "video_id,comment_id,frame,video_published_at,published_at,like_count,total_reply_count,VP,E_int,E_ext,Cyn"
        )
        .unwrap();

        for (video_id, frame) in [
            ("v1", "Loss"),
            ("v2", "Loss"),
            ("v3", "Gain"),
            ("v4", "Gain"),
        ] {
            for i in 0..25 {
                let days_after = i % 20;
                let vp = if frame == "Loss" {
                    u8::from(i % 3 == 0)
                } else {
                    u8::from(i % 5 == 0)
                };
                let e_ext = if frame == "Gain" {
                    u8::from(i % 2 == 0)
                } else {
                    u8::from(i % 5 == 0)
                };
                writeln!(
                    file,
                    "{},{}_c{},{},2024-01-01T00:00:00Z,2024-01-{:02}T12:00:00Z,{},{},{},{},{},{}",
                    video_id,
                    video_id,
                    i,
                    frame,
                    1 + days_after,
                    i % 7,
                    u8::from(i % 4 == 0),
                    vp,
                    u8::from(i % 2 == 1),
                    e_ext,
                    0
                )
                .unwrap();
            }
        }
    }

    #[test]
    fn basic_report_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let coded = dir.path().join("coded.csv");
        write_coded_fixture(&coded);

        generate_report(&coded, dir.path(), None).unwrap();

        assert!(dir.path().join("summary_by_frame.csv").exists());
        assert!(dir.path().join("summary_by_video.csv").exists());
        assert!(dir.path().join("tests_h1_h2.csv").exists());
    }

    #[test]
    fn advanced_report_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let coded = dir.path().join("coded.csv");
        write_coded_fixture(&coded);

        generate_advanced_report(&coded, dir.path(), None, &AdvancedOptions::default()).unwrap();

        assert!(dir.path().join("summary_14days.csv").exists());
        assert!(dir.path().join("tests_14days.csv").exists());
        assert!(dir.path().join("loo_analysis.csv").exists());
        assert!(dir.path().join("robustness_report.txt").exists());
        assert!(dir.path().join("engagement_metrics.csv").exists());
        assert!(dir.path().join("vp_by_engagement.csv").exists());

        let narrative =
            std::fs::read_to_string(dir.path().join("robustness_report.txt")).unwrap();
        assert!(narrative.contains("=== Robustness Analysis Report ==="));
    }

    #[test]
    fn loo_file_has_baseline_plus_one_row_per_video() {
        let dir = tempfile::tempdir().unwrap();
        let coded = dir.path().join("coded.csv");
        write_coded_fixture(&coded);

        let opts = AdvancedOptions {
            days: None,
            include_loo: true,
            include_engagement: false,
        };
        generate_advanced_report(&coded, dir.path(), None, &opts).unwrap();

        let mut reader = csv::Reader::from_path(dir.path().join("loo_analysis.csv")).unwrap();
        let rows: Vec<String> = reader
            .records()
            .map(|r| r.unwrap().get(0).unwrap().to_string())
            .collect();
        assert_eq!(rows, vec!["none", "v1", "v2", "v3", "v4"]);
    }

    #[test]
    fn video_metadata_supplies_frames() {
        let dir = tempfile::tempdir().unwrap();
        let coded = dir.path().join("coded.csv");
        let mut file = std::fs::File::create(&coded).unwrap();
        writeln!(file, "video_id,comment_id,VP,E_ext").unwrap();
        writeln!(file, "va,c1,1,0").unwrap();
        writeln!(file, "vb,c2,0,1").unwrap();
        drop(file);

        let videos = dir.path().join("videos.csv");
        let mut file = std::fs::File::create(&videos).unwrap();
        writeln!(file, "video_id,frame").unwrap();
        writeln!(file, "va,Loss").unwrap();
        writeln!(file, "vb,Gain").unwrap();
        drop(file);

        generate_report(&coded, dir.path(), Some(&videos)).unwrap();

        let summary =
            std::fs::read_to_string(dir.path().join("summary_by_frame.csv")).unwrap();
        assert!(summary.contains("Loss"));
        assert!(summary.contains("Gain"));
    }
}
