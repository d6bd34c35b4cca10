use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub number: Option<String>,
    pub name: String,
    pub location: Option<String>,
    pub client: Option<String>,
    pub contractor: Option<String>,
    pub engineer: Option<String>,
    pub comments: Option<String>,
    pub file_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable project attributes. Used both for inserts and partial updates:
/// on update, `None` leaves the stored column untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectFields {
    pub number: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub client: Option<String>,
    pub contractor: Option<String>,
    pub engineer: Option<String>,
    pub comments: Option<String>,
    pub file_reference: Option<String>,
}

/// An investigation point: borehole, trial pit, probe, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    #[serde(flatten)]
    pub details: LocationFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationFields {
    pub location_type: Option<String>,
    pub status: Option<String>,
    pub easting: Option<f64>,
    pub northing: Option<f64>,
    pub epsg_code: Option<String>,
    pub grid_ref_system: Option<String>,
    pub ground_elevation: Option<f64>,
    pub remarks: Option<String>,
    pub final_depth: Option<f64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub purpose: Option<String>,
    pub termination_reason: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub method: Option<String>,
    pub sub_division: Option<String>,
    pub phase_grouping_code: Option<String>,
    pub file_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: i64,
    pub location_id: i64,
    pub reference: String,
    pub sample_type: String,
    pub top_depth: f64,
    #[serde(flatten)]
    pub details: SampleFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleFields {
    pub base_depth: Option<f64>,
    pub date_time: Option<String>,
    pub blows: Option<i64>,
    pub container: Option<String>,
    pub diameter: Option<f64>,
    pub water_depth: Option<f64>,
    pub recovery_percent: Option<f64>,
    pub method: Option<String>,
    pub description: Option<String>,
    pub remarks: Option<String>,
    pub condition: Option<String>,
    pub classification: Option<String>,
    pub stratum_reference: Option<String>,
    pub file_reference: Option<String>,
}

/// Required sample attributes for an insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSample {
    pub location_id: i64,
    pub reference: String,
    pub sample_type: String,
    pub top_depth: f64,
    pub details: SampleFields,
}

/// Partial sample update; unset fields keep their stored values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleUpdate {
    pub reference: Option<String>,
    pub sample_type: Option<String>,
    pub top_depth: Option<f64>,
    pub details: SampleFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeologyLayer {
    pub id: i64,
    pub location_id: i64,
    pub top_depth: f64,
    pub base_depth: f64,
    pub legend: Option<String>,
    pub description: Option<String>,
    pub consistency: Option<String>,
    pub weathering: Option<String>,
    pub structure: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabTest {
    pub id: i64,
    pub sample_id: i64,
    pub test_type: String,
    pub test_result: Option<f64>,
    pub test_unit: Option<String>,
    pub test_date: Option<String>,
    pub remarks: Option<String>,
}

/// AGS 4 abbreviation dictionary entry (ABBR group).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgsAbbreviation {
    pub id: i64,
    pub heading: String,
    pub code: String,
    pub description: Option<String>,
    pub list: Option<String>,
    pub remarks: Option<String>,
    pub file_set: Option<String>,
}

/// One Casagrande cup trial: drops plus tare, wet and dry weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidLimitTrial {
    pub trial: i64,
    pub drops: f64,
    pub tare: f64,
    pub tare_moist: f64,
    pub tare_dry: f64,
}

/// One rolled-thread trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlasticLimitTrial {
    pub trial: i64,
    pub tare: f64,
    pub tare_moist: f64,
    pub tare_dry: f64,
}

/// Key columns joined onto every raw trial row pulled for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleKey {
    pub project_number: String,
    pub location_name: String,
    pub sample_id: i64,
    pub sample_reference: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiquidLimitRow {
    pub key: SampleKey,
    pub trial: LiquidLimitTrial,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlasticLimitRow {
    pub key: SampleKey,
    pub trial: PlasticLimitTrial,
}

/// Plasticity chart group (USCS fine-grained soils).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoilDescription {
    #[serde(rename = "NP")]
    NonPlastic,
    #[serde(rename = "CL")]
    LeanClay,
    #[serde(rename = "CH")]
    FatClay,
    #[serde(rename = "ML")]
    Silt,
    #[serde(rename = "MH")]
    ElasticSilt,
    #[serde(rename = "CL-ML")]
    SiltyClay,
}

impl SoilDescription {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NonPlastic => "NP",
            Self::LeanClay => "CL",
            Self::FatClay => "CH",
            Self::Silt => "ML",
            Self::ElasticSilt => "MH",
            Self::SiltyClay => "CL-ML",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "NP" => Some(Self::NonPlastic),
            "CL" => Some(Self::LeanClay),
            "CH" => Some(Self::FatClay),
            "ML" => Some(Self::Silt),
            "MH" => Some(Self::ElasticSilt),
            "CL-ML" => Some(Self::SiltyClay),
            _ => None,
        }
    }
}

impl fmt::Display for SoilDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtterbergResult {
    pub project_number: String,
    pub location_name: String,
    pub sample_id: i64,
    pub sample_reference: String,
    pub liquid_limit: Option<i64>,
    pub plastic_limit: Option<i64>,
    pub plasticity_index: Option<i64>,
    pub soil_description: SoilDescription,
}

/// Stored row from `atterberglimits`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAtterbergResult {
    pub id: i64,
    pub sample_id: i64,
    pub location_name: String,
    pub sample_reference: String,
    pub liquid_limit: Option<f64>,
    pub plastic_limit: Option<f64>,
    pub plasticity_index: Option<f64>,
    pub soil_description: String,
    pub date_calculated: DateTime<Utc>,
}

/// Chart series for one sample, serialised next to the result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleCharts {
    pub location_name: String,
    pub sample_reference: String,
    pub flow_curve: Option<FlowCurve>,
    pub plasticity_chart: Option<PlasticityChart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowCurve {
    /// Measured (drops, water content %) points.
    pub measured: Vec<(f64, f64)>,
    /// Fitted line sampled on a log-spaced drop axis.
    pub fitted: Vec<(f64, f64)>,
    /// Interpreted point at the target drop count.
    pub liquid_limit_point: (f64, f64),
    pub slope: f64,
    pub intercept: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlasticityChart {
    pub ll_max: f64,
    pub pi_max: f64,
    pub sample_point: (f64, f64),
    pub a_line: Vec<(f64, f64)>,
    pub u_line: Vec<(f64, f64)>,
    pub low_high_divide: Vec<(f64, f64)>,
    pub cl_ml_upper_bound: Vec<(f64, f64)>,
}

/// Output of the analysis transform stage.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutput {
    pub project_number: String,
    pub results: Vec<AtterbergResult>,
    pub charts: Vec<SampleCharts>,
}

/// Raw trial rows pulled for one project.
#[derive(Debug, Clone, Default)]
pub struct ProjectTrials {
    pub project_number: String,
    pub liquid_limit: Vec<LiquidLimitRow>,
    pub plastic_limit: Vec<PlasticLimitRow>,
}

impl ProjectTrials {
    pub fn len(&self) -> usize {
        self.liquid_limit.len() + self.plastic_limit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soil_description_codes() {
        for desc in [
            SoilDescription::NonPlastic,
            SoilDescription::LeanClay,
            SoilDescription::FatClay,
            SoilDescription::Silt,
            SoilDescription::ElasticSilt,
            SoilDescription::SiltyClay,
        ] {
            assert_eq!(SoilDescription::from_code(desc.code()), Some(desc));
        }
        assert_eq!(SoilDescription::from_code("SP"), None);
        assert_eq!(
            serde_json::to_string(&SoilDescription::SiltyClay).unwrap(),
            "\"CL-ML\""
        );
    }
}
