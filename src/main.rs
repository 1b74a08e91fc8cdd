//! Study Delta command line tool
//!
//! Inspects and re-encodes study memento files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use clap::{Arg, ArgAction, ArgMatches, Command};
use study_delta::format::load_from_path;
use study_delta::{Compression, Config, Error, Result, StudyRecord};
use tracing::info;

fn main() -> Result<()> {
    let matches = Command::new("study-delta")
        .version(study_delta::VERSION)
        .about("Inspect and re-encode delta-encoded study mementos.")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Configuration file path")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .global(true)
                .help("Log level (trace, debug, info, warn, error)")
        )
        .subcommand(
            Command::new("inspect")
                .about("Print study level aggregates of a memento")
                .arg(Arg::new("file").required(true).value_name("FILE"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print as JSON")
                )
        )
        .subcommand(
            Command::new("recode")
                .about("Load a memento and write it again with the current settings")
                .arg(Arg::new("input").required(true).value_name("IN"))
                .arg(Arg::new("output").required(true).value_name("OUT"))
                .arg(
                    Arg::new("compression")
                        .long("compression")
                        .value_name("FILTER")
                        .help("Output filter (none, gzip, deflate)")
                )
                .arg(
                    Arg::new("compact")
                        .long("compact")
                        .action(ArgAction::SetTrue)
                        .help("Write instances as pre-rendered fragments")
                )
                .arg(
                    Arg::new("max-tag-length")
                        .long("max-tag-length")
                        .value_name("N")
                        .help("Largest value written in full, in bytes")
                )
        )
        .get_matches();

    // Load configuration
    let mut config = if let Some(config_path) = matches.get_one::<String>("config") {
        Config::from_file(config_path)?
    } else {
        Config::load()?
    };

    if let Some(level) = matches.get_one::<String>("log-level") {
        config.logging.level = level.clone();
    }
    config.validate()?;

    study_delta::init(&config.logging)?;

    match matches.subcommand() {
        Some(("inspect", sub)) => inspect(sub),
        Some(("recode", sub)) => recode(&mut config, sub),
        _ => Err(Error::invalid_input("Unknown command")),
    }
}

/// Read a memento file, choosing the filter from its name
fn load_study(path: &str) -> Result<StudyRecord> {
    let path = Path::new(path);
    let root = load_from_path(path, Compression::for_path(path))?;
    StudyRecord::ingest(&root)
}

fn inspect(matches: &ArgMatches) -> Result<()> {
    let file = matches
        .get_one::<String>("file")
        .ok_or_else(|| Error::invalid_input("Missing input file"))?;
    let mut study = load_study(file)?;

    let patient_name = study.patient_name();
    let patient_id = study.patient_id();
    let series: Vec<(String, usize)> = study
        .iter_series()
        .map(|s| (s.series_instance_uid().to_string(), s.len()))
        .collect();

    if matches.get_flag("json") {
        let summary = serde_json::json!({
            "study_instance_uid": study.study_instance_uid(),
            "patient_name": patient_name,
            "patient_id": patient_id,
            "number_of_series": study.number_of_series(),
            "number_of_instances": study.number_of_instances(),
            "study_size": study.study_size(),
            "series": series
                .iter()
                .map(|(uid, count)| serde_json::json!({ "series_instance_uid": uid, "instances": count }))
                .collect::<Vec<_>>(),
        });
        let text = serde_json::to_string_pretty(&summary)
            .map_err(|e| Error::invalid_input(format!("Failed to render summary: {}", e)))?;
        println!("{}", text);
        return Ok(());
    }

    println!("Study:      {}", study.study_instance_uid());
    println!("Patient:    {}", patient_name.as_deref().unwrap_or("-"));
    println!("Patient ID: {}", patient_id.as_deref().unwrap_or("-"));
    println!("Series:     {}", study.number_of_series());
    println!("Instances:  {}", study.number_of_instances());
    println!("Size:       {} bytes", study.study_size());
    for (uid, count) in &series {
        println!("  {} ({} instances)", uid, count);
    }
    Ok(())
}

fn recode(config: &mut Config, matches: &ArgMatches) -> Result<()> {
    let input = matches
        .get_one::<String>("input")
        .ok_or_else(|| Error::invalid_input("Missing input file"))?;
    let output = matches
        .get_one::<String>("output")
        .ok_or_else(|| Error::invalid_input("Missing output file"))?;

    // Apply CLI overrides
    if let Some(filter) = matches.get_one::<String>("compression") {
        config.stream.compression = filter.parse()?;
    }
    if matches.get_flag("compact") {
        config.output.compact = true;
    }
    if let Some(max) = matches.get_one::<String>("max-tag-length") {
        config.output.max_tag_length = max
            .parse()
            .map_err(|e| Error::config(format!("Invalid max tag length: {}", e)))?;
    }

    let mut study = load_study(input)?;
    // Loaded mementos reflect the settings they were written with
    study.invalidate_mementos();

    let out_path = Path::new(output);
    let compression = match Compression::for_path(out_path) {
        Compression::Gzip => Compression::Gzip,
        _ => config.stream.compression,
    };

    let mut sink = BufWriter::new(File::create(out_path)?);
    study.write_to(&mut sink, &config.output, compression)?;
    sink.flush()?;

    info!(
        study = %study.study_instance_uid(),
        instances = study.number_of_instances(),
        output = %out_path.display(),
        "Recoded study memento"
    );
    Ok(())
}
