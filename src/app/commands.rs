//! Handlers behind each `geostor` subcommand.

use crate::adapters::{Database, LocalStorage};
use crate::app::export::export_project;
use crate::app::import::{import_ags_abbreviations, import_trials};
use crate::app::pipelines::atterberg_pipeline::AtterbergPipeline;
use crate::config::cli::{
    AbbrCommand, AtterbergCommand, Command, GeologyCommand, LabCommand, LocationCommand,
    ProjectCommand, SampleCommand, TrialCommand,
};
use crate::config::toml_config::GeostorConfig;
use crate::core::PipelineEngine;
use crate::domain::model::{
    LiquidLimitTrial, NewSample, PlasticLimitTrial, Project, SampleUpdate,
};
use crate::utils::error::{GeostorError, Result};
use serde::Serialize;
use std::path::PathBuf;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_project_line(p: &Project) {
    println!(
        "{:>5}  {:<12}  {}",
        p.id,
        p.number.as_deref().unwrap_or("-"),
        p.name
    );
}

fn or_dash(value: Option<impl ToString>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn open(config: &GeostorConfig) -> Result<Database> {
    Database::open_existing(&config.database.path)
}

pub async fn execute(command: Command, config: &GeostorConfig) -> Result<()> {
    match command {
        Command::Init { ags_csv, force } => {
            let db = Database::initialize(&config.database.path, force)?;
            println!("✅ Database created at {}", config.database.path);
            let csv = ags_csv.or_else(|| config.database.ags_csv.as_ref().map(PathBuf::from));
            if let Some(csv) = csv {
                let summary = import_ags_abbreviations(&db, &csv)?;
                println!(
                    "📚 Imported {} AGS abbreviations ({} skipped)",
                    summary.inserted, summary.skipped
                );
            }
            Ok(())
        }
        Command::Verify => {
            open(config)?.verify_schema()?;
            println!("✅ Database schema verified: {}", config.database.path);
            Ok(())
        }
        Command::Project(cmd) => project(cmd, &open(config)?),
        Command::Location(cmd) => location(cmd, &open(config)?),
        Command::Sample(cmd) => sample(cmd, &open(config)?),
        Command::Geology(cmd) => geology(cmd, &open(config)?),
        Command::Lab(cmd) => lab(cmd, &open(config)?),
        Command::Abbr(cmd) => abbr(cmd, &open(config)?),
        Command::Trial(cmd) => trial(cmd, &open(config)?),
        Command::Atterberg(cmd) => atterberg(cmd, &open(config)?, config).await,
        Command::Export { project_number } => {
            let db = open(config)?;
            let storage = LocalStorage::new(&config.output.path);
            let path = export_project(&db, &storage, &project_number, &config.output.formats).await?;
            println!("📦 Export written to {}", path);
            Ok(())
        }
    }
}

fn project(cmd: ProjectCommand, db: &Database) -> Result<()> {
    match cmd {
        ProjectCommand::Add { name, fields } => {
            let id = db.create_project(&name, &fields.into_fields(None))?;
            println!("✅ Project '{}' created with ID {}", name, id);
        }
        ProjectCommand::List => {
            let projects = db.list_projects()?;
            if projects.is_empty() {
                println!("No projects found");
            }
            projects.iter().for_each(print_project_line);
        }
        ProjectCommand::Search { text } => {
            let projects = db.search_projects(&text)?;
            println!("{} project(s) matching '{}'", projects.len(), text);
            projects.iter().for_each(print_project_line);
        }
        ProjectCommand::Show { id } => match db.get_project(id)? {
            Some(p) => print_json(&p)?,
            None => {
                return Err(GeostorError::NotFound {
                    entity: "Project",
                    id,
                })
            }
        },
        ProjectCommand::Update { id, name, fields } => {
            db.update_project(id, &fields.into_fields(name))?;
            println!("✅ Project {} updated", id);
        }
        ProjectCommand::Delete { id } => {
            db.delete_project(id)?;
            println!("🗑️ Project {} deleted", id);
        }
    }
    Ok(())
}

fn location(cmd: LocationCommand, db: &Database) -> Result<()> {
    match cmd {
        LocationCommand::Add {
            project_id,
            name,
            fields,
        } => {
            let id = db.create_location(project_id, &name, &fields.into())?;
            println!("✅ Location '{}' created with ID {}", name, id);
        }
        LocationCommand::List { project } => {
            for loc in db.list_locations(project)? {
                println!(
                    "{:>5}  {:<10}  {:<6}  depth {}",
                    loc.id,
                    loc.name,
                    or_dash(loc.details.location_type.as_deref()),
                    or_dash(loc.details.final_depth)
                );
            }
        }
        LocationCommand::Show { id } => match db.get_location(id)? {
            Some(loc) => print_json(&loc)?,
            None => {
                return Err(GeostorError::NotFound {
                    entity: "Location",
                    id,
                })
            }
        },
        LocationCommand::Update { id, name, fields } => {
            db.update_location(id, name.as_deref(), &fields.into())?;
            println!("✅ Location {} updated", id);
        }
        LocationCommand::Delete { id } => {
            db.delete_location(id)?;
            println!("🗑️ Location {} deleted", id);
        }
    }
    Ok(())
}

fn sample(cmd: SampleCommand, db: &Database) -> Result<()> {
    match cmd {
        SampleCommand::Add {
            location_id,
            reference,
            sample_type,
            top_depth,
            fields,
        } => {
            let id = db.create_sample(&NewSample {
                location_id,
                reference: reference.clone(),
                sample_type,
                top_depth,
                details: fields.into(),
            })?;
            println!("✅ Sample '{}' created with ID {}", reference, id);
        }
        SampleCommand::List { location_id } => {
            for s in db.list_samples(location_id)? {
                println!(
                    "{:>5}  {:<8}  {:<4}  {:.2} - {}",
                    s.id,
                    s.reference,
                    s.sample_type,
                    s.top_depth,
                    or_dash(s.details.base_depth)
                );
            }
        }
        SampleCommand::Show { id } => match db.get_sample(id)? {
            Some(s) => print_json(&s)?,
            None => return Err(GeostorError::NotFound { entity: "Sample", id }),
        },
        SampleCommand::Update {
            id,
            reference,
            sample_type,
            top_depth,
            fields,
        } => {
            db.update_sample(
                id,
                &SampleUpdate {
                    reference,
                    sample_type,
                    top_depth,
                    details: fields.into(),
                },
            )?;
            println!("✅ Sample {} updated", id);
        }
        SampleCommand::Delete { id } => {
            db.delete_sample(id)?;
            println!("🗑️ Sample {} deleted", id);
        }
    }
    Ok(())
}

fn geology(cmd: GeologyCommand, db: &Database) -> Result<()> {
    match cmd {
        GeologyCommand::Add(args) => {
            let location_id = args.location_id;
            let id = db.create_geology(location_id, &args.into())?;
            println!("✅ Geology layer {} added to location {}", id, location_id);
        }
        GeologyCommand::List { location_id } => {
            for g in db.list_geology(location_id)? {
                println!(
                    "{:>6.2} - {:<6.2}  {:<12}  {}",
                    g.top_depth,
                    g.base_depth,
                    or_dash(g.legend.as_deref()),
                    g.description.as_deref().unwrap_or("")
                );
            }
        }
    }
    Ok(())
}

fn lab(cmd: LabCommand, db: &Database) -> Result<()> {
    match cmd {
        LabCommand::Add(args) => {
            let sample_id = args.sample_id;
            let id = db.create_lab_test(sample_id, &args.into())?;
            println!("✅ Laboratory test {} added to sample {}", id, sample_id);
        }
        LabCommand::List { sample_id } => {
            for t in db.list_lab_tests(sample_id)? {
                println!(
                    "{:>5}  {:<8}  {} {}",
                    t.id,
                    t.test_type,
                    or_dash(t.test_result),
                    t.test_unit.as_deref().unwrap_or("")
                );
            }
        }
    }
    Ok(())
}

fn abbr(cmd: AbbrCommand, db: &Database) -> Result<()> {
    match cmd {
        AbbrCommand::Import { csv } => {
            let summary = import_ags_abbreviations(db, &csv)?;
            println!(
                "📚 Imported {} abbreviations ({} skipped)",
                summary.inserted, summary.skipped
            );
        }
        AbbrCommand::List { heading } => {
            let codes = db.get_ags_codes_map(&heading)?;
            if codes.is_empty() {
                println!("No codes found for heading {}", heading);
            }
            for (code, description) in codes {
                println!("{:<10}  {}", code, description);
            }
        }
        AbbrCommand::Describe { heading, code } => match db.get_ags_code_description(&heading, &code)? {
            Some(description) => println!("{}", description),
            None => println!("No description for {} under {}", code, heading),
        },
        AbbrCommand::Add {
            heading,
            code,
            description,
        } => {
            db.add_custom_abbreviation(&heading, &code, description.as_deref())?;
            println!("✅ Added {} to {}", code, heading);
        }
    }
    Ok(())
}

fn trial(cmd: TrialCommand, db: &Database) -> Result<()> {
    match cmd {
        TrialCommand::AddLl {
            sample_id,
            trial,
            drops,
            tare,
            tare_moist,
            tare_dry,
        } => {
            db.add_liquid_limit_trial(
                sample_id,
                &LiquidLimitTrial {
                    trial,
                    drops,
                    tare,
                    tare_moist,
                    tare_dry,
                },
            )?;
            println!("✅ Liquid limit trial {} added to sample {}", trial, sample_id);
        }
        TrialCommand::AddPl {
            sample_id,
            trial,
            tare,
            tare_moist,
            tare_dry,
        } => {
            db.add_plastic_limit_trial(
                sample_id,
                &PlasticLimitTrial {
                    trial,
                    tare,
                    tare_moist,
                    tare_dry,
                },
            )?;
            println!("✅ Plastic limit trial {} added to sample {}", trial, sample_id);
        }
        TrialCommand::Import { csv } => {
            let summary = import_trials(db, &csv)?;
            println!("🧪 Imported {} trials", summary.inserted);
        }
        TrialCommand::Deactivate { sample_id } => {
            let count = db.deactivate_trials(sample_id)?;
            println!("Deactivated {} trials of sample {}", count, sample_id);
        }
    }
    Ok(())
}

async fn atterberg(cmd: AtterbergCommand, db: &Database, config: &GeostorConfig) -> Result<()> {
    match cmd {
        AtterbergCommand::Run {
            project_number,
            monitor,
            archive,
        } => {
            if monitor {
                tracing::info!("🔍 System monitoring enabled");
            }
            let mut config = config.clone();
            config.output.archive |= archive;

            let storage = LocalStorage::new(&config.output.path);
            let pipeline = AtterbergPipeline::new(db.clone(), storage, config, project_number);
            let engine = PipelineEngine::new_with_monitoring(pipeline, monitor);

            let output_path = engine.run().await?;
            println!("✅ Atterberg analysis completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        AtterbergCommand::Show { project_number } => {
            let results = db.list_atterberg_results(&project_number)?;
            if results.is_empty() {
                return Err(GeostorError::NoData {
                    message: format!("No Atterberg results for project number: {}", project_number),
                });
            }
            println!(
                "{:<10}  {:<8}  {:>4}  {:>4}  {:>4}  {}",
                "Location", "Sample", "LL", "PL", "PI", "Class"
            );
            for r in results {
                println!(
                    "{:<10}  {:<8}  {:>4}  {:>4}  {:>4}  {}",
                    r.location_name,
                    r.sample_reference,
                    or_dash(r.liquid_limit),
                    or_dash(r.plastic_limit),
                    or_dash(r.plasticity_index),
                    r.soil_description
                );
            }
        }
    }
    Ok(())
}
