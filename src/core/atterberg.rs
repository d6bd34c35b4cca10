//! Liquid limit, plastic limit and plasticity index per ASTM D4318.
//!
//! Water contents are carried as fractions (0.35 = 35 %) until the final
//! limits, which are reported as whole percentages rounded half-to-even.

use crate::config::toml_config::AtterbergSettings;
use crate::core::chart;
use crate::domain::model::{
    AnalysisOutput, AtterbergResult, LiquidLimitRow, PlasticLimitRow, ProjectTrials, SampleCharts,
    SoilDescription,
};
use crate::utils::error::{GeostorError, Result};
use std::collections::BTreeMap;

/// Drop-count windows that a multipoint test must cover, in check order.
pub const DROP_RANGES: [(f64, f64); 3] = [(25.0, 35.0), (20.0, 30.0), (15.0, 25.0)];

/// `(moist - dry) / (dry - tare)`; `None` for physically impossible weights.
pub fn water_content(tare: f64, tare_moist: f64, tare_dry: f64) -> Option<f64> {
    let water = tare_moist - tare_dry;
    let soil = tare_dry - tare;
    if !(water.is_finite() && soil.is_finite()) || soil <= 0.0 || water < 0.0 {
        return None;
    }
    Some(water / soil)
}

fn to_percent(fraction: f64) -> Option<i64> {
    let value = (fraction * 100.0).round_ties_even();
    value.is_finite().then_some(value as i64)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowFit {
    pub slope: f64,
    pub intercept: f64,
}

impl FlowFit {
    /// Water content (fraction) predicted at `drops`.
    pub fn water_content_at(&self, drops: f64) -> f64 {
        self.slope * drops.ln() + self.intercept
    }
}

/// Least-squares line of water content against ln(drops).
///
/// Needs at least two trials with different drop counts.
pub fn fit_flow_curve(points: &[(f64, f64)]) -> Option<FlowFit> {
    if points.len() < 2 || points.iter().any(|(drops, _)| *drops <= 0.0) {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(d, _)| d.ln()).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, w)| *w).sum::<f64>() / n;

    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), (d, w)| {
        let dx = d.ln() - mean_x;
        (sxx + dx * dx, sxy + dx * (w - mean_y))
    });
    if sxx <= f64::EPSILON {
        return None;
    }

    let slope = sxy / sxx;
    Some(FlowFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

/// Checks that the trials cover the three ASTM drop windows.
///
/// Each trial fills the first still-open window it falls in. On failure the
/// error names the first window left open.
pub fn check_drop_ranges(sample_label: &str, trials: &[(i64, f64)]) -> std::result::Result<(), String> {
    let mut covered = [false; 3];

    for (trial, drops) in trials {
        let slot = DROP_RANGES
            .iter()
            .enumerate()
            .find(|(i, (lo, hi))| !covered[*i] && (*lo..=*hi).contains(drops));
        match slot {
            Some((i, _)) => covered[i] = true,
            None if *drops < 15.0 || *drops > 35.0 => {
                tracing::warn!(
                    "Sample {}, trial #{} is out of normal range ({} drops)",
                    sample_label,
                    trial,
                    drops
                );
            }
            None => {}
        }
    }

    match covered.iter().position(|c| !c) {
        None => Ok(()),
        Some(i) => {
            let (lo, hi) = DROP_RANGES[i];
            Err(format!("Need a trial between {} and {} drops", lo, hi))
        }
    }
}

/// First adjacent pair (by ascending water content) within `tolerance_percent`,
/// averaged and rounded to a whole percent.
pub fn plastic_limit(water_contents: &[f64], tolerance_percent: f64) -> Option<i64> {
    let mut sorted: Vec<f64> = water_contents.iter().copied().filter(|w| w.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    sorted
        .windows(2)
        .find(|pair| (pair[1] - pair[0]) * 100.0 <= tolerance_percent + 1e-9)
        .and_then(|pair| to_percent((pair[0] + pair[1]) / 2.0))
}

/// Plasticity index and chart group for a pair of limits.
pub fn classify(liquid_limit: Option<i64>, plastic_limit: Option<i64>) -> (Option<i64>, SoilDescription) {
    let (Some(ll), Some(pl)) = (liquid_limit, plastic_limit) else {
        return (None, SoilDescription::NonPlastic);
    };
    let pi = ll - pl;
    if pi <= 0 {
        return (None, SoilDescription::NonPlastic);
    }

    let a_line = chart::a_line_pi(ll as f64);
    let pi_f = pi as f64;
    let high = ll >= 50;
    let description = if pi_f >= a_line && pi >= 7 {
        if high {
            SoilDescription::FatClay
        } else {
            SoilDescription::LeanClay
        }
    } else if pi_f >= a_line && pi >= 4 {
        SoilDescription::SiltyClay
    } else if high {
        SoilDescription::ElasticSilt
    } else {
        SoilDescription::Silt
    };
    (Some(pi), description)
}

type GroupKey = (String, String);

struct SampleOutcome {
    result: AtterbergResult,
    charts: SampleCharts,
}

fn analyse_sample(
    ll_rows: &[&LiquidLimitRow],
    pl_rows: &[&PlasticLimitRow],
    settings: &AtterbergSettings,
) -> Option<SampleOutcome> {
    let key = &ll_rows.first()?.key;
    let label = format!("{}/{}", key.location_name, key.sample_reference);

    let mut points = Vec::with_capacity(ll_rows.len());
    let mut trial_drops = Vec::with_capacity(ll_rows.len());
    for row in ll_rows {
        let t = &row.trial;
        match water_content(t.tare, t.tare_moist, t.tare_dry) {
            Some(w) => {
                points.push((t.drops, w));
                trial_drops.push((t.trial, t.drops));
            }
            None => tracing::warn!("Sample {}: skipping liquid limit trial #{} with invalid weights", label, t.trial),
        }
    }

    let fit = fit_flow_curve(&points);
    let mut liquid_limit = fit.and_then(|f| to_percent(f.water_content_at(settings.target_drops)));
    if liquid_limit.is_none() {
        tracing::warn!("Sample nonplastic or error in calculating liquid limit for sample {}", label);
    }

    if liquid_limit.is_some() && settings.enforce_drop_ranges {
        if let Err(message) = check_drop_ranges(&label, &trial_drops) {
            tracing::warn!("Sample {} does not meet ASTM criteria. {}", label, message);
            liquid_limit = None;
        }
    }

    let plastic_limit = if pl_rows.is_empty() {
        None
    } else {
        if let Some(other) = pl_rows.iter().find(|r| r.key.sample_id != key.sample_id) {
            tracing::warn!(
                "Sample ID mismatch: LL={}, PL={} for {}",
                key.sample_id,
                other.key.sample_id,
                label
            );
        }
        let contents: Vec<f64> = pl_rows
            .iter()
            .filter_map(|r| water_content(r.trial.tare, r.trial.tare_moist, r.trial.tare_dry))
            .collect();
        let pl = plastic_limit(&contents, settings.plastic_limit_tolerance);
        if pl.is_none() {
            tracing::warn!(
                "No suitable trials found for sample {}. Consider performing additional trials unless nonplastic material.",
                label
            );
        }
        pl
    };

    let (plasticity_index, soil_description) = classify(liquid_limit, plastic_limit);

    let flow_curve = match (fit, liquid_limit) {
        (Some(fit), Some(_)) => Some(chart::flow_curve(&points, &fit, settings)),
        _ => None,
    };
    let plasticity_chart = match (liquid_limit, plasticity_index) {
        (Some(ll), Some(pi)) if soil_description != SoilDescription::NonPlastic => {
            Some(chart::plasticity_chart(ll as f64, pi as f64))
        }
        _ => None,
    };

    Some(SampleOutcome {
        result: AtterbergResult {
            project_number: key.project_number.clone(),
            location_name: key.location_name.clone(),
            sample_id: key.sample_id,
            sample_reference: key.sample_reference.clone(),
            liquid_limit,
            plastic_limit,
            plasticity_index,
            soil_description,
        },
        charts: SampleCharts {
            location_name: key.location_name.clone(),
            sample_reference: key.sample_reference.clone(),
            flow_curve,
            plasticity_chart,
        },
    })
}

/// Computes results for every sample that has liquid limit trials.
///
/// Plastic limit trials of samples without liquid limit trials are ignored.
pub fn analyse_project(trials: &ProjectTrials, settings: &AtterbergSettings) -> Result<AnalysisOutput> {
    let mut ll_groups: BTreeMap<GroupKey, Vec<&LiquidLimitRow>> = BTreeMap::new();
    for row in &trials.liquid_limit {
        ll_groups
            .entry((row.key.location_name.clone(), row.key.sample_reference.clone()))
            .or_default()
            .push(row);
    }

    let mut pl_groups: BTreeMap<GroupKey, Vec<&PlasticLimitRow>> = BTreeMap::new();
    for row in &trials.plastic_limit {
        pl_groups
            .entry((row.key.location_name.clone(), row.key.sample_reference.clone()))
            .or_default()
            .push(row);
    }

    let mut output = AnalysisOutput {
        project_number: trials.project_number.clone(),
        ..Default::default()
    };

    for (key, ll_rows) in &ll_groups {
        let pl_rows = pl_groups.get(key).map(Vec::as_slice).unwrap_or(&[]);
        match analyse_sample(ll_rows, pl_rows, settings) {
            Some(outcome) => {
                tracing::debug!(
                    "{}/{}: LL={:?} PL={:?} PI={:?} {}",
                    key.0,
                    key.1,
                    outcome.result.liquid_limit,
                    outcome.result.plastic_limit,
                    outcome.result.plasticity_index,
                    outcome.result.soil_description
                );
                output.results.push(outcome.result);
                output.charts.push(outcome.charts);
            }
            None => tracing::warn!("Error processing sample {} at location {}", key.1, key.0),
        }
    }

    if output.results.is_empty() {
        return Err(GeostorError::CalculationError {
            message: "No valid Atterberg limits data could be processed".to_string(),
        });
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{LiquidLimitTrial, PlasticLimitTrial, SampleKey};

    const EPS: f64 = 1e-9;

    fn key(location: &str, sample: &str, id: i64) -> SampleKey {
        SampleKey {
            project_number: "P-1".to_string(),
            location_name: location.to_string(),
            sample_id: id,
            sample_reference: sample.to_string(),
        }
    }

    /// Builds weights that give exactly `wc` water content on 10 g of dry soil.
    fn ll_row(k: &SampleKey, trial: i64, drops: f64, wc: f64) -> LiquidLimitRow {
        LiquidLimitRow {
            key: k.clone(),
            trial: LiquidLimitTrial {
                trial,
                drops,
                tare: 20.0,
                tare_moist: 30.0 + 10.0 * wc,
                tare_dry: 30.0,
            },
        }
    }

    fn pl_row(k: &SampleKey, trial: i64, wc: f64) -> PlasticLimitRow {
        PlasticLimitRow {
            key: k.clone(),
            trial: PlasticLimitTrial {
                trial,
                tare: 20.0,
                tare_moist: 30.0 + 10.0 * wc,
                tare_dry: 30.0,
            },
        }
    }

    #[test]
    fn test_water_content() {
        let wc = water_content(10.0, 30.0, 25.0).unwrap();
        assert!((wc - 5.0 / 15.0).abs() < EPS);
        assert_eq!(water_content(10.0, 10.0, 10.0), None);
        assert_eq!(water_content(10.0, 20.0, 22.0), None);
        assert_eq!(water_content(10.0, f64::NAN, 22.0), None);
    }

    #[test]
    fn test_fit_recovers_exact_line() {
        // w = -0.1 ln(N) + 0.8
        let points: Vec<(f64, f64)> = [15.0_f64, 22.0, 31.0]
            .iter()
            .map(|d| (*d, -0.1 * d.ln() + 0.8))
            .collect();
        let fit = fit_flow_curve(&points).unwrap();
        assert!((fit.slope + 0.1).abs() < 1e-12);
        assert!((fit.intercept - 0.8).abs() < 1e-12);
        let ll = to_percent(fit.water_content_at(25.0)).unwrap();
        assert_eq!(ll, 48); // 0.8 - 0.1 ln 25 = 0.4781
    }

    #[test]
    fn test_fit_needs_distinct_drops() {
        assert!(fit_flow_curve(&[(25.0, 0.4)]).is_none());
        assert!(fit_flow_curve(&[(25.0, 0.4), (25.0, 0.42)]).is_none());
        assert!(fit_flow_curve(&[(20.0, 0.4), (30.0, 0.38)]).is_some());
    }

    #[test]
    fn test_drop_range_check() {
        assert!(check_drop_ranges("BH1/1", &[(1, 33.0), (2, 26.0), (3, 17.0)]).is_ok());
        // trial 2 cannot fill [20,30] twice
        assert_eq!(
            check_drop_ranges("BH1/1", &[(1, 28.0), (2, 27.0)]).unwrap_err(),
            "Need a trial between 15 and 25 drops"
        );
        assert_eq!(
            check_drop_ranges("BH1/1", &[(1, 18.0), (2, 22.0), (3, 40.0)]).unwrap_err(),
            "Need a trial between 25 and 35 drops"
        );
        assert_eq!(
            check_drop_ranges("BH1/1", &[(1, 34.0), (2, 16.0)]).unwrap_err(),
            "Need a trial between 20 and 30 drops"
        );
    }

    #[test]
    fn test_plastic_limit_pairs_closest_ascending() {
        // 0.200 and 0.212 are 1.2 points apart
        assert_eq!(plastic_limit(&[0.25, 0.212, 0.20], 1.4), Some(21));
        // 1.5 points apart exceeds the default tolerance
        assert_eq!(plastic_limit(&[0.200, 0.215], 1.4), None);
        assert_eq!(plastic_limit(&[0.200, 0.214], 1.4), Some(21));
        assert_eq!(plastic_limit(&[0.2], 1.4), None);
        assert_eq!(plastic_limit(&[], 1.4), None);
    }

    #[test]
    fn test_rounding_is_half_even() {
        assert_eq!(to_percent(0.125), Some(12));
        assert_eq!(to_percent(0.375), Some(38));
        assert_eq!(to_percent(f64::NAN), None);
    }

    #[test]
    fn test_classification() {
        assert_eq!(classify(Some(45), Some(20)), (Some(25), SoilDescription::LeanClay));
        assert_eq!(classify(Some(70), Some(28)), (Some(42), SoilDescription::FatClay));
        assert_eq!(classify(Some(22), Some(17)), (Some(5), SoilDescription::SiltyClay));
        assert_eq!(classify(Some(40), Some(30)), (Some(10), SoilDescription::Silt));
        assert_eq!(classify(Some(80), Some(50)), (Some(30), SoilDescription::ElasticSilt));
        assert_eq!(classify(Some(30), Some(32)), (None, SoilDescription::NonPlastic));
        assert_eq!(classify(None, Some(20)), (None, SoilDescription::NonPlastic));
        assert_eq!(classify(Some(40), None), (None, SoilDescription::NonPlastic));
    }

    #[test]
    fn test_analyse_project_end_to_end() {
        let settings = AtterbergSettings::default();
        let a = key("BH01", "1", 1);
        let b = key("BH01", "2", 2);
        let line = |d: f64| -0.1 * d.ln() + 0.8;

        let trials = ProjectTrials {
            project_number: "P-1".to_string(),
            liquid_limit: vec![
                ll_row(&a, 1, 33.0, line(33.0)),
                ll_row(&a, 2, 26.0, line(26.0)),
                ll_row(&a, 3, 17.0, line(17.0)),
                // sample 2 misses the low window
                ll_row(&b, 1, 30.0, 0.50),
                ll_row(&b, 2, 27.0, 0.52),
            ],
            plastic_limit: vec![
                pl_row(&a, 1, 0.22),
                pl_row(&a, 2, 0.228),
                pl_row(&b, 1, 0.25),
                pl_row(&b, 2, 0.252),
            ],
        };

        let output = analyse_project(&trials, &settings).unwrap();
        assert_eq!(output.results.len(), 2);

        let first = &output.results[0];
        assert_eq!(first.sample_reference, "1");
        assert_eq!(first.liquid_limit, Some(48));
        assert_eq!(first.plastic_limit, Some(22));
        assert_eq!(first.plasticity_index, Some(26));
        assert_eq!(first.soil_description, SoilDescription::LeanClay);
        assert!(output.charts[0].flow_curve.is_some());
        assert!(output.charts[0].plasticity_chart.is_some());

        let second = &output.results[1];
        assert_eq!(second.liquid_limit, None);
        assert_eq!(second.plastic_limit, Some(25));
        assert_eq!(second.soil_description, SoilDescription::NonPlastic);
        assert!(output.charts[1].flow_curve.is_none());
    }

    #[test]
    fn test_drop_ranges_can_be_relaxed() {
        let settings = AtterbergSettings {
            enforce_drop_ranges: false,
            ..Default::default()
        };
        let a = key("TP1", "A", 5);
        let trials = ProjectTrials {
            project_number: "P-1".to_string(),
            liquid_limit: vec![ll_row(&a, 1, 30.0, 0.50), ll_row(&a, 2, 27.0, 0.52)],
            plastic_limit: vec![],
        };
        let output = analyse_project(&trials, &settings).unwrap();
        assert!(output.results[0].liquid_limit.is_some());
        assert_eq!(output.results[0].plastic_limit, None);
        assert_eq!(output.results[0].soil_description, SoilDescription::NonPlastic);
    }

    #[test]
    fn test_no_liquid_limit_rows_is_an_error() {
        let a = key("TP1", "A", 5);
        let trials = ProjectTrials {
            project_number: "P-1".to_string(),
            liquid_limit: vec![],
            plastic_limit: vec![pl_row(&a, 1, 0.2)],
        };
        assert!(analyse_project(&trials, &AtterbergSettings::default()).is_err());
    }
}
