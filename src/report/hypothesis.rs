//! Hypothesis tests over the Loss/Gain framing split.
//!
//! H1 compares vote-pledge rates, H2 external-efficacy rates, both via a
//! pooled two-proportion z-test; a chi-square test of independence between
//! frame and VP runs as a confirmatory check. Tests with an empty group are
//! skipped, not failed.

use std::collections::BTreeSet;

use super::load::CodedRow;

pub const LOSS: &str = "Loss";
pub const GAIN: &str = "Gain";

pub struct TestResult {
    pub hypothesis: &'static str,
    pub method: &'static str,
    pub statistic: f64,
    pub p_value: f64,
    pub effect_size: f64,
    pub notes: String,
}

pub fn hypothesis_tests(rows: &[CodedRow]) -> Vec<TestResult> {
    let mut results = Vec::new();

    if let Some(test) = two_proportion_test(rows, "H1", "VP", |r| r.vp) {
        results.push(test);
    }
    if let Some(test) = two_proportion_test(rows, "H2", "E_ext", |r| r.e_ext) {
        results.push(test);
    }
    if let Some(test) = chi_square_test(rows) {
        results.push(test);
    }

    results
}

/// Pooled two-proportion z-test of Loss vs Gain on one label column.
/// Returns None when either group has no codable values.
fn two_proportion_test(
    rows: &[CodedRow],
    hypothesis: &'static str,
    label_name: &str,
    field: impl Fn(&CodedRow) -> Option<f64>,
) -> Option<TestResult> {
    let group = |frame: &str| -> Vec<f64> {
        rows.iter()
            .filter(|r| r.frame.as_deref() == Some(frame))
            .filter_map(|r| field(r))
            .collect()
    };

    let loss = group(LOSS);
    let gain = group(GAIN);
    if loss.is_empty() || gain.is_empty() {
        return None;
    }

    let (n1, n2) = (loss.len() as f64, gain.len() as f64);
    let (x1, x2) = (loss.iter().sum::<f64>(), gain.iter().sum::<f64>());
    let (p1, p2) = (x1 / n1, x2 / n2);

    let p_pool = (x1 + x2) / (n1 + n2);
    let se = (p_pool * (1.0 - p_pool) * (1.0 / n1 + 1.0 / n2)).sqrt();
    let z = if se > 0.0 { (p1 - p2) / se } else { 0.0 };
    let p_value = 2.0 * (1.0 - normal_cdf(z.abs()));

    Some(TestResult {
        hypothesis,
        method: "Two-proportion z-test",
        statistic: z,
        p_value,
        effect_size: p1 - p2,
        notes: format!(
            "Loss {} rate: {:.3}, Gain {} rate: {:.3}",
            label_name, p1, label_name, p2
        ),
    })
}

/// Chi-square test of independence for frame x VP over a complete 2x2
/// contingency table, with Yates continuity correction (one degree of
/// freedom). Skipped unless exactly two frames and both VP outcomes occur.
/// Effect size is Cramer's V computed over the full row count.
fn chi_square_test(rows: &[CodedRow]) -> Option<TestResult> {
    let observations: Vec<(&str, bool)> = rows
        .iter()
        .filter_map(|r| {
            let frame = r.frame.as_deref()?;
            let vp = r.vp?;
            Some((frame, vp != 0.0))
        })
        .collect();

    let frames: BTreeSet<&str> = observations.iter().map(|(f, _)| *f).collect();
    let outcomes: BTreeSet<bool> = observations.iter().map(|(_, v)| *v).collect();
    if frames.len() != 2 || outcomes.len() != 2 {
        return None;
    }

    let frames: Vec<&str> = frames.into_iter().collect();
    let mut table = [[0.0f64; 2]; 2];
    for (frame, vp) in &observations {
        let i = usize::from(*frame == frames[1]);
        let j = usize::from(*vp);
        table[i][j] += 1.0;
    }

    let n = observations.len() as f64;
    let row_sums = [table[0][0] + table[0][1], table[1][0] + table[1][1]];
    let col_sums = [table[0][0] + table[1][0], table[0][1] + table[1][1]];

    let mut chi2 = 0.0;
    for i in 0..2 {
        for j in 0..2 {
            let expected = row_sums[i] * col_sums[j] / n;
            let delta = (table[i][j] - expected).abs() - 0.5;
            let delta = delta.max(0.0);
            chi2 += delta * delta / expected;
        }
    }

    // One degree of freedom: P(X > chi2) = erfc(sqrt(chi2 / 2)).
    let p_value = 2.0 * (1.0 - normal_cdf(chi2.sqrt()));

    Some(TestResult {
        hypothesis: "H1",
        method: "Chi-square test",
        statistic: chi2,
        p_value,
        effect_size: (chi2 / rows.len() as f64).sqrt(),
        notes: "Degrees of freedom: 1".to_string(),
    })
}

/// Standard normal CDF via the Abramowitz-Stegun erf approximation
/// (absolute error below 1.5e-7, plenty for reporting p-values).
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    sign * (1.0 - poly * (-x * x).exp())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn coded(frame: &str, vp: Option<f64>, e_ext: Option<f64>) -> CodedRow {
        CodedRow {
            video_id: "v1".to_string(),
            comment_id: String::new(),
            frame: Some(frame.to_string()),
            vp,
            e_int: None,
            e_ext,
            cyn: None,
            like_count: None,
            total_reply_count: None,
            published_at: None,
            video_published_at: None,
        }
    }

    /// 20 Loss rows with `loss_ones` ones, 20 Gain rows with `gain_ones`.
    fn dataset(loss_ones: usize, gain_ones: usize) -> Vec<CodedRow> {
        let mut rows = Vec::new();
        for i in 0..20 {
            let vp = Some(f64::from(i < loss_ones));
            rows.push(coded(LOSS, vp, vp));
        }
        for i in 0..20 {
            let vp = Some(f64::from(i < gain_ones));
            rows.push(coded(GAIN, vp, vp));
        }
        rows
    }

    #[test]
    fn normal_cdf_reference_points() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.96) - 0.975002).abs() < 1e-4);
        assert!((normal_cdf(-1.96) - 0.024998).abs() < 1e-4);
    }

    #[test]
    fn z_test_known_values() {
        // p1 = 0.6, p2 = 0.3 over 20+20: z ~ 1.9069, p ~ 0.0566.
        let rows = dataset(12, 6);
        let tests = hypothesis_tests(&rows);
        let h1 = tests
            .iter()
            .find(|t| t.hypothesis == "H1" && t.method == "Two-proportion z-test")
            .unwrap();
        assert!((h1.statistic - 1.9069).abs() < 1e-3);
        assert!((h1.p_value - 0.0566).abs() < 1e-3);
        assert!((h1.effect_size - 0.3).abs() < 1e-12);
        assert!(h1.notes.contains("Loss VP rate: 0.600"));
    }

    #[test]
    fn chi_square_known_values() {
        // Same table with Yates correction: chi2 ~ 2.5253, p ~ 0.1120.
        let rows = dataset(12, 6);
        let tests = hypothesis_tests(&rows);
        let chi = tests
            .iter()
            .find(|t| t.method == "Chi-square test")
            .unwrap();
        assert!((chi.statistic - 2.5253).abs() < 1e-3);
        assert!((chi.p_value - 0.1120).abs() < 1e-3);
        assert!((chi.effect_size - (2.5253f64 / 40.0).sqrt()).abs() < 1e-3);
    }

    #[test]
    fn identical_groups_give_zero_statistic() {
        let rows = dataset(10, 10);
        let tests = hypothesis_tests(&rows);
        let h1 = &tests[0];
        assert!(h1.statistic.abs() < 1e-12);
        assert!((h1.p_value - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_group_skips_z_tests() {
        let rows: Vec<CodedRow> = (0..5).map(|_| coded(LOSS, Some(1.0), Some(1.0))).collect();
        let tests = hypothesis_tests(&rows);
        assert!(tests.is_empty());
    }

    #[test]
    fn all_missing_labels_skip_everything() {
        let rows = vec![coded(LOSS, None, None), coded(GAIN, None, None)];
        assert!(hypothesis_tests(&rows).is_empty());
    }

    #[test]
    fn single_vp_outcome_skips_chi_square_only() {
        let rows: Vec<CodedRow> = (0..10)
            .map(|i| {
                let frame = if i < 5 { LOSS } else { GAIN };
                coded(frame, Some(1.0), Some(f64::from(i % 2 == 0)))
            })
            .collect();
        let tests = hypothesis_tests(&rows);
        assert!(tests.iter().all(|t| t.method != "Chi-square test"));
        assert!(tests.iter().any(|t| t.hypothesis == "H1"));
        assert!(tests.iter().any(|t| t.hypothesis == "H2"));
    }

    #[test]
    fn degenerate_se_reports_zero_z() {
        // Every observation is 1 in both groups: pooled variance is 0.
        let rows = dataset(20, 20);
        let tests = hypothesis_tests(&rows);
        let h1 = &tests[0];
        assert_eq!(h1.statistic, 0.0);
    }
}
