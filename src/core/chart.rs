//! Geometry for the flow curve and Casagrande plasticity chart.

use crate::config::toml_config::AtterbergSettings;
use crate::core::atterberg::FlowFit;
use crate::domain::model::{FlowCurve, PlasticityChart};

/// PI on the A-line at a given liquid limit.
pub fn a_line_pi(liquid_limit: f64) -> f64 {
    0.73 * (liquid_limit - 20.0)
}

/// PI on the U-line at a given liquid limit.
pub fn u_line_pi(liquid_limit: f64) -> f64 {
    0.9 * (liquid_limit - 8.0)
}

/// `n` values evenly spaced on a log10 axis between `start` and `end`.
pub fn log_space(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let (lo, hi) = (start.log10(), end.log10());
            let step = (hi - lo) / (n - 1) as f64;
            (0..n).map(|i| 10f64.powf(lo + step * i as f64)).collect()
        }
    }
}

pub fn flow_curve(points: &[(f64, f64)], fit: &FlowFit, settings: &AtterbergSettings) -> FlowCurve {
    let min = points.iter().map(|(d, _)| *d).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|(d, _)| *d).fold(f64::NEG_INFINITY, f64::max);

    FlowCurve {
        measured: points.iter().map(|(d, w)| (*d, w * 100.0)).collect(),
        fitted: log_space(min, max, settings.flow_curve_points)
            .into_iter()
            .map(|d| (d, fit.water_content_at(d) * 100.0))
            .collect(),
        liquid_limit_point: (
            settings.target_drops,
            fit.water_content_at(settings.target_drops) * 100.0,
        ),
        slope: fit.slope,
        intercept: fit.intercept,
    }
}

/// Axis extent stepped so that the sample always sits on the chart.
pub fn chart_ll_max(liquid_limit: f64) -> f64 {
    if liquid_limit < 120.0 {
        120.0
    } else if liquid_limit < 180.0 {
        180.0
    } else if liquid_limit < 240.0 {
        240.0
    } else {
        300.0
    }
}

pub fn plasticity_chart(liquid_limit: f64, plasticity_index: f64) -> PlasticityChart {
    let ll_max = chart_ll_max(liquid_limit);

    PlasticityChart {
        ll_max,
        pi_max: ll_max / 2.0,
        sample_point: (liquid_limit, plasticity_index),
        a_line: vec![(0.0, 4.0), (25.5, 4.0), (ll_max, a_line_pi(ll_max))],
        u_line: vec![(16.0, 0.0), (16.0, 7.0), (ll_max, u_line_pi(ll_max))],
        low_high_divide: vec![(50.0, 0.0), (50.0, u_line_pi(50.0))],
        cl_ml_upper_bound: vec![(0.0, 7.0), (7.0 / 0.73 + 20.0, 7.0)],
    }
}
