//! Leave-one-out robustness sweep: re-run the hypothesis tests with each
//! video excluded in turn and grade how stable the conclusions are.

use super::hypothesis::{hypothesis_tests, TestResult};
use super::load::CodedRow;

pub struct LooRow {
    pub excluded_video: String,
    pub n_comments: usize,
    pub h1_p_value: f64,
    pub h1_effect_size: f64,
    pub h2_p_value: f64,
    pub h2_effect_size: f64,
}

/// Baseline row first (`excluded_video = "none"`), then one row per video
/// in first-appearance order. Iterations where an exclusion leaves too
/// little data for either test are silently skipped.
pub fn loo_analysis(rows: &[CodedRow]) -> Vec<LooRow> {
    let mut results = Vec::new();

    if let Some(row) = loo_row("none", rows) {
        results.push(row);
    }

    let mut videos: Vec<String> = Vec::new();
    for row in rows {
        if !videos.contains(&row.video_id) {
            videos.push(row.video_id.clone());
        }
    }

    for video in videos {
        let reduced: Vec<CodedRow> = rows
            .iter()
            .filter(|r| r.video_id != video)
            .cloned()
            .collect();
        if reduced.is_empty() {
            continue;
        }
        if let Some(row) = loo_row(&video, &reduced) {
            results.push(row);
        }
    }

    results
}

fn loo_row(excluded_video: &str, rows: &[CodedRow]) -> Option<LooRow> {
    let tests = hypothesis_tests(rows);
    let h1 = find_z_test(&tests, "H1")?;
    let h2 = find_z_test(&tests, "H2")?;

    Some(LooRow {
        excluded_video: excluded_video.to_string(),
        n_comments: rows.len(),
        h1_p_value: h1.p_value,
        h1_effect_size: h1.effect_size,
        h2_p_value: h2.p_value,
        h2_effect_size: h2.effect_size,
    })
}

fn find_z_test<'a>(tests: &'a [TestResult], hypothesis: &str) -> Option<&'a TestResult> {
    tests
        .iter()
        .find(|t| t.hypothesis == hypothesis && t.method == "Two-proportion z-test")
}

/// Plain-text robustness report over the LOO sweep: per hypothesis, the
/// full-dataset p-value, how many exclusions stayed significant, the
/// p-value range, and a qualitative grade.
pub fn robustness_narrative(loo: &[LooRow]) -> String {
    let baseline = loo.iter().find(|r| r.excluded_video == "none");
    let iterations: Vec<&LooRow> = loo.iter().filter(|r| r.excluded_video != "none").collect();

    let mut text = String::from("=== Robustness Analysis Report ===\n\n");

    text.push_str("H1 (Loss → VP):\n");
    text.push_str(&hypothesis_section(
        baseline.map(|b| b.h1_p_value),
        &iterations.iter().map(|r| r.h1_p_value).collect::<Vec<_>>(),
        3,
    ));

    text.push_str("\nH2 (Gain → E_ext):\n");
    text.push_str(&hypothesis_section(
        baseline.map(|b| b.h2_p_value),
        &iterations.iter().map(|r| r.h2_p_value).collect::<Vec<_>>(),
        6,
    ));

    if !iterations.is_empty() {
        let h1_effects: Vec<f64> = iterations.iter().map(|r| r.h1_effect_size).collect();
        let h2_effects: Vec<f64> = iterations.iter().map(|r| r.h2_effect_size).collect();
        text.push_str("\n=== Effect Size Stability ===\n");
        text.push_str(&format!(
            "H1 effect size range: {:.3} to {:.3}\n",
            min_of(&h1_effects),
            max_of(&h1_effects)
        ));
        text.push_str(&format!(
            "H2 effect size range: {:.3} to {:.3}\n",
            min_of(&h2_effects),
            max_of(&h2_effects)
        ));
    }

    text
}

fn hypothesis_section(full_p: Option<f64>, p_values: &[f64], precision: usize) -> String {
    let mut section = String::new();

    match full_p {
        Some(p) => section.push_str(&format!(
            "- Full analysis p-value: {:.prec$}\n",
            p,
            prec = precision
        )),
        None => section.push_str("- Full analysis unavailable (insufficient data)\n"),
    }

    if p_values.is_empty() {
        section.push_str("- No LOO iterations completed\n");
        return section;
    }

    let significant = p_values.iter().filter(|&&p| p < 0.05).count();
    section.push_str(&format!(
        "- Significant in {}/{} LOO iterations\n",
        significant,
        p_values.len()
    ));
    section.push_str(&format!(
        "- P-value range: {:.prec$} - {:.prec$}\n",
        min_of(p_values),
        max_of(p_values),
        prec = precision
    ));
    section.push_str(&format!(
        "- Assessment: {}\n",
        assessment(significant, p_values.len())
    ));
    section
}

/// Grade by the fraction of LOO iterations significant at 0.05.
fn assessment(significant: usize, total: usize) -> &'static str {
    if significant == total {
        "ROBUST (always significant)"
    } else if significant as f64 >= total as f64 * 0.75 {
        "MOSTLY ROBUST"
    } else if significant as f64 >= total as f64 * 0.5 {
        "SENSITIVE (varies by video)"
    } else {
        "NOT ROBUST"
    }
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

// ── Tests ──
