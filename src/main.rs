use clap::{Arg, Command};
use cloakscan::verdict::Disposition;
use cloakscan::{Catalogue, CloakAnalyzer, Config};
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    let matches = Command::new("cloakscan")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Detects cloaked spam in HTML email bodies")
        .long_about(
            "Cloakscan analyzes extracted HTML email bodies for cloaking:\n\
             text rendered invisible to the reader through CSS while staying\n\
             present for automated filters. It resolves the CSS cascade per\n\
             element, matches 16 known invisible-rendering configurations,\n\
             and compares the visible and hidden text partitions.",
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-configs")
                .long("list-configs")
                .help("List the catalogued invisible configurations and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Emit one JSON verdict per input file")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging with per-node match details")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("inputs")
                .value_name("PATH")
                .help("HTML files or directories of .html files to scan")
                .num_args(0..),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(path) = matches.get_one::<String>("generate-config") {
        match Config::default().to_file(path) {
            Ok(()) => {
                println!("Default configuration written to {path}");
                return;
            }
            Err(e) => {
                eprintln!("Error writing configuration: {e}");
                process::exit(1);
            }
        }
    }

    if matches.get_flag("list-configs") {
        for config in Catalogue::standard().iter() {
            println!("{:<24} {}", config.id, config.description);
        }
        return;
    }

    let config = match matches.get_one::<String>("config") {
        Some(path) => match Config::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading configuration: {e}");
                process::exit(1);
            }
        },
        None => Config::default(),
    };

    if matches.get_flag("test-config") {
        match CloakAnalyzer::new(config) {
            Ok(_) => {
                println!("Configuration is valid.");
                return;
            }
            Err(e) => {
                eprintln!("Configuration validation failed: {e}");
                process::exit(1);
            }
        }
    }

    let inputs: Vec<String> = matches
        .get_many::<String>("inputs")
        .map(|v| v.cloned().collect())
        .unwrap_or_default();
    if inputs.is_empty() {
        eprintln!("No input files. Pass HTML files or directories to scan.");
        process::exit(2);
    }

    let analyzer = match CloakAnalyzer::new(config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let files = collect_input_files(&inputs);
    if files.is_empty() {
        eprintln!("No HTML files found under the given paths.");
        process::exit(2);
    }

    let as_json = matches.get_flag("json");
    let mut cloaked = 0usize;
    let mut failed = 0usize;

    // Each file is independent; a bad one never stops the batch.
    for file in &files {
        let html = match std::fs::read_to_string(file) {
            Ok(h) => h,
            Err(e) => {
                log::warn!("skipping {}: {e}", file.display());
                failed += 1;
                continue;
            }
        };
        let verdict = analyzer.analyze(&html);
        if verdict.disposition == Disposition::Cloaked {
            cloaked += 1;
        }
        if as_json {
            let record = serde_json::json!({
                "file": file.display().to_string(),
                "verdict": verdict,
            });
            println!("{record}");
        } else {
            print_verdict(file, &verdict);
        }
    }

    if !as_json {
        println!(
            "\n{} file(s) scanned, {} cloaked, {} unreadable",
            files.len() - failed,
            cloaked,
            failed
        );
    }
    if cloaked > 0 {
        process::exit(3);
    }
}

fn collect_input_files(inputs: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            match std::fs::read_dir(path) {
                Ok(entries) => {
                    let mut dir_files: Vec<PathBuf> = entries
                        .filter_map(|e| e.ok())
                        .map(|e| e.path())
                        .filter(|p| {
                            p.extension()
                                .map(|ext| ext == "html" || ext == "htm")
                                .unwrap_or(false)
                        })
                        .collect();
                    dir_files.sort();
                    files.extend(dir_files);
                }
                Err(e) => log::warn!("cannot read directory {input}: {e}"),
            }
        } else {
            files.push(path.to_path_buf());
        }
    }
    files
}

fn print_verdict(file: &Path, verdict: &cloakscan::EmailVerdict) {
    match verdict.disposition {
        Disposition::Clean => println!("CLEAN    {}", file.display()),
        Disposition::Cloaked => {
            println!("CLOAKED  {}", file.display());
            for reason in &verdict.reasons {
                println!("         reason: {reason}");
            }
            let mut seen = Vec::new();
            for e in &verdict.evidence {
                if !seen.contains(&e.config) {
                    seen.push(e.config);
                    println!("         config: {} ({:?})", e.config, e.excerpt);
                }
            }
        }
    }
    for warning in &verdict.warnings {
        log::debug!("{}: {warning}", file.display());
    }
}
