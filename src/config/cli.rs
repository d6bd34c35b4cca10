use crate::domain::model::{GeologyLayer, LabTest, LocationFields, ProjectFields, SampleFields};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "geostor")]
#[command(about = "Geotechnical data management and Atterberg limits analysis", version)]
pub struct Cli {
    /// TOML configuration file (defaults to ./geostor.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file, overrides [database].path
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Output directory, overrides [output].path
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a new database
    Init {
        /// AGS abbreviation CSV to load after creating the schema
        #[arg(long)]
        ags_csv: Option<PathBuf>,
        /// Drop and recreate an existing database
        #[arg(long)]
        force: bool,
    },
    /// Check that the database has the expected tables and columns
    Verify,
    #[command(subcommand)]
    Project(ProjectCommand),
    #[command(subcommand)]
    Location(LocationCommand),
    #[command(subcommand)]
    Sample(SampleCommand),
    #[command(subcommand)]
    Geology(GeologyCommand),
    #[command(subcommand)]
    Lab(LabCommand),
    /// AGS abbreviation dictionary
    #[command(subcommand)]
    Abbr(AbbrCommand),
    /// Raw liquid and plastic limit trials
    #[command(subcommand)]
    Trial(TrialCommand),
    #[command(subcommand)]
    Atterberg(AtterbergCommand),
    /// Bundle a project's tables into <project>_export.zip
    Export { project_number: String },
}

#[derive(Debug, Clone, Default, Args)]
pub struct ProjectArgs {
    #[arg(long)]
    pub number: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub contractor: Option<String>,
    #[arg(long)]
    pub engineer: Option<String>,
    #[arg(long)]
    pub comments: Option<String>,
    #[arg(long)]
    pub file_reference: Option<String>,
}

impl ProjectArgs {
    pub fn into_fields(self, name: Option<String>) -> ProjectFields {
        ProjectFields {
            number: self.number,
            name,
            location: self.location,
            client: self.client,
            contractor: self.contractor,
            engineer: self.engineer,
            comments: self.comments,
            file_reference: self.file_reference,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    Add {
        name: String,
        #[command(flatten)]
        fields: ProjectArgs,
    },
    List,
    Search {
        text: String,
    },
    Show {
        id: i64,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: ProjectArgs,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct LocationArgs {
    #[arg(long = "type")]
    pub location_type: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub easting: Option<f64>,
    #[arg(long)]
    pub northing: Option<f64>,
    #[arg(long)]
    pub epsg_code: Option<String>,
    #[arg(long)]
    pub ground_elevation: Option<f64>,
    #[arg(long)]
    pub final_depth: Option<f64>,
    #[arg(long)]
    pub start_date: Option<String>,
    #[arg(long)]
    pub end_date: Option<String>,
    #[arg(long)]
    pub lat: Option<f64>,
    #[arg(long)]
    pub lon: Option<f64>,
    #[arg(long)]
    pub method: Option<String>,
    #[arg(long)]
    pub purpose: Option<String>,
    #[arg(long)]
    pub remarks: Option<String>,
}

impl From<LocationArgs> for LocationFields {
    fn from(args: LocationArgs) -> Self {
        LocationFields {
            location_type: args.location_type,
            status: args.status,
            easting: args.easting,
            northing: args.northing,
            epsg_code: args.epsg_code,
            ground_elevation: args.ground_elevation,
            final_depth: args.final_depth,
            start_date: args.start_date,
            end_date: args.end_date,
            lat: args.lat,
            lon: args.lon,
            method: args.method,
            purpose: args.purpose,
            remarks: args.remarks,
            ..Default::default()
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum LocationCommand {
    Add {
        project_id: i64,
        name: String,
        #[command(flatten)]
        fields: LocationArgs,
    },
    List {
        #[arg(long)]
        project: Option<i64>,
    },
    Show {
        id: i64,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: LocationArgs,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct SampleArgs {
    #[arg(long = "base")]
    pub base_depth: Option<f64>,
    #[arg(long)]
    pub date_time: Option<String>,
    #[arg(long)]
    pub blows: Option<i64>,
    #[arg(long)]
    pub container: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub classification: Option<String>,
    #[arg(long)]
    pub remarks: Option<String>,
}

impl From<SampleArgs> for SampleFields {
    fn from(args: SampleArgs) -> Self {
        SampleFields {
            base_depth: args.base_depth,
            date_time: args.date_time,
            blows: args.blows,
            container: args.container,
            description: args.description,
            classification: args.classification,
            remarks: args.remarks,
            ..Default::default()
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum SampleCommand {
    Add {
        location_id: i64,
        reference: String,
        #[arg(long = "type")]
        sample_type: String,
        #[arg(long = "top")]
        top_depth: f64,
        #[command(flatten)]
        fields: SampleArgs,
    },
    List {
        location_id: i64,
    },
    Show {
        id: i64,
    },
    Update {
        id: i64,
        #[arg(long)]
        reference: Option<String>,
        #[arg(long = "type")]
        sample_type: Option<String>,
        #[arg(long = "top")]
        top_depth: Option<f64>,
        #[command(flatten)]
        fields: SampleArgs,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, Clone, Args)]
pub struct GeologyArgs {
    pub location_id: i64,
    pub top_depth: f64,
    pub base_depth: f64,
    #[arg(long)]
    pub legend: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub consistency: Option<String>,
    #[arg(long)]
    pub weathering: Option<String>,
    #[arg(long)]
    pub structure: Option<String>,
    #[arg(long)]
    pub remarks: Option<String>,
}

impl From<GeologyArgs> for GeologyLayer {
    fn from(args: GeologyArgs) -> Self {
        GeologyLayer {
            id: 0,
            location_id: args.location_id,
            top_depth: args.top_depth,
            base_depth: args.base_depth,
            legend: args.legend,
            description: args.description,
            consistency: args.consistency,
            weathering: args.weathering,
            structure: args.structure,
            remarks: args.remarks,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum GeologyCommand {
    Add(GeologyArgs),
    List { location_id: i64 },
}

#[derive(Debug, Clone, Args)]
pub struct LabArgs {
    pub sample_id: i64,
    pub test_type: String,
    #[arg(long)]
    pub result: Option<f64>,
    #[arg(long)]
    pub unit: Option<String>,
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub remarks: Option<String>,
}

impl From<LabArgs> for LabTest {
    fn from(args: LabArgs) -> Self {
        LabTest {
            id: 0,
            sample_id: args.sample_id,
            test_type: args.test_type,
            test_result: args.result,
            test_unit: args.unit,
            test_date: args.date,
            remarks: args.remarks,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum LabCommand {
    Add(LabArgs),
    List { sample_id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum AbbrCommand {
    /// Load an AGS ABBR CSV export
    Import { csv: PathBuf },
    /// Codes under a heading, e.g. LOCA_TYPE
    List { heading: String },
    Describe { heading: String, code: String },
    /// Add a custom code
    Add {
        heading: String,
        code: String,
        description: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum TrialCommand {
    /// Add a liquid limit (cup) trial
    AddLl {
        sample_id: i64,
        trial: i64,
        drops: f64,
        tare: f64,
        tare_moist: f64,
        tare_dry: f64,
    },
    /// Add a plastic limit (thread) trial
    AddPl {
        sample_id: i64,
        trial: i64,
        tare: f64,
        tare_moist: f64,
        tare_dry: f64,
    },
    /// Bulk-load trials from CSV
    Import { csv: PathBuf },
    /// Retire all active trials of a sample
    Deactivate { sample_id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum AtterbergCommand {
    /// Calculate limits for every sample of a project
    Run {
        project_number: String,
        #[arg(long, help = "Log CPU and memory usage per stage")]
        monitor: bool,
        #[arg(long, help = "Bundle the outputs into one zip")]
        archive: bool,
    },
    /// Print the stored results of a project
    Show { project_number: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_atterberg_run() {
        let cli = Cli::parse_from(["geostor", "--database", "site.db", "atterberg", "run", "P-1", "--monitor"]);
        assert_eq!(cli.database.as_deref(), Some("site.db"));
        match cli.command {
            Command::Atterberg(AtterbergCommand::Run {
                project_number,
                monitor,
                archive,
            }) => {
                assert_eq!(project_number, "P-1");
                assert!(monitor);
                assert!(!archive);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_sample_add_with_flattened_fields() {
        let cli = Cli::parse_from([
            "geostor", "sample", "add", "3", "U1", "--type", "U", "--top", "1.5", "--base", "1.95", "-v",
        ]);
        assert!(cli.verbose);
        let Command::Sample(SampleCommand::Add {
            location_id,
            top_depth,
            fields,
            ..
        }) = cli.command
        else {
            panic!("expected sample add");
        };
        assert_eq!(location_id, 3);
        assert_eq!(top_depth, 1.5);
        assert_eq!(SampleFields::from(fields).base_depth, Some(1.95));
    }

    #[test]
    fn test_parse_trial_add_ll() {
        let cli = Cli::parse_from(["geostor", "trial", "add-ll", "7", "1", "28", "20.1", "35.2", "31.0"]);
        assert!(matches!(
            cli.command,
            Command::Trial(TrialCommand::AddLl { sample_id: 7, trial: 1, .. })
        ));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
