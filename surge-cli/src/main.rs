use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use surge_config::{ConfigLoader, LogLevel, SurgeConfig};
use surge_logging::init_logging;
use surge_runner::{execute, finalize_run, initialize_run, Shutdown};
use tracing::{error, info, warn};

mod cli;
use cli::{Cli, Commands, ConfigCommands, ProfilesCommands, RunArgs};

/// Load configuration from file or use defaults
fn load_config(config_path: Option<&PathBuf>) -> Result<SurgeConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => {
            if path.exists() {
                loader
                    .from_file(path)
                    .with_context(|| format!("Failed to load configuration from {:?}", path))
            } else {
                Err(anyhow::anyhow!("Configuration file not found: {:?}", path))
            }
        }
        None => loader
            .from_env()
            .context("Failed to load configuration from environment"),
    }
}

/// Apply `run` flags on top of the loaded configuration and re-validate
fn apply_run_overrides(config: &mut SurgeConfig, args: &RunArgs) -> Result<String> {
    if let Some(ref environment) = args.environment {
        config.target.environment = environment.clone();
    }

    let profile_name = args.profile.clone().unwrap_or_else(|| config.run.profile.clone());
    config.profile(&profile_name)?;
    config.run.profile = profile_name.clone();

    if let Some(profile) = config.profiles.get_mut(&profile_name) {
        if let Some(rate) = args.rate {
            profile.load.override_rate(rate);
        }
        if let Some(duration) = args.duration {
            profile.load.override_duration(duration);
        }
    }

    if let Some(ref report) = args.report {
        config.report.path = Some(report.clone());
    }
    if args.quiet {
        config.report.console = false;
    }

    config.validate_all().context("Invalid run configuration")?;
    Ok(profile_name)
}

async fn handle_run(mut config: SurgeConfig, args: &RunArgs) -> Result<ExitCode> {
    let profile_name = apply_run_overrides(&mut config, args)?;

    let shutdown = Shutdown::new();
    shutdown.listen_for_ctrl_c();

    let mut run = initialize_run(&config, &profile_name)
        .await
        .context("Failed to initialize run")?;
    if let Some(seed) = args.seed {
        run = run.with_seed(seed);
    }

    let schedule = execute(&run, &shutdown).await;
    let report = finalize_run(run, schedule).await;

    if config.report.console {
        report.print_console();
    }
    if let Some(ref path) = config.report.path {
        report.write_json(path)?;
        info!(path = %path.display(), "Report written");
    }

    if report.passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(2))
    }
}

fn handle_profiles_list(config: &SurgeConfig) {
    println!(
        "{:<12} {:<14} {:>10} {:>10} {:>8}  {}",
        "profile".bright_cyan().bold(),
        "executor".bright_cyan().bold(),
        "peak rate".bright_cyan().bold(),
        "duration".bright_cyan().bold(),
        "workers".bright_cyan().bold(),
        "description".bright_cyan().bold()
    );
    for (name, profile) in &config.profiles {
        let marker = if *name == config.run.profile { "*" } else { " " };
        let load = &profile.load;
        println!(
            "{}{:<11} {:<14} {:>10} {:>10} {:>8}  {}",
            marker,
            name,
            load.executor_kind().to_string(),
            format!("{}", load.peak_rate()),
            humantime::format_duration(load.total_duration()).to_string(),
            format!("{}/{}", load.preallocated_workers, load.max_workers),
            profile.description.dimmed()
        );
    }
}

fn print_value<T: serde::Serialize>(value: &T, format: &str) -> Result<()> {
    match format.to_lowercase().as_str() {
        "yaml" | "yml" => {
            let yaml_output = serde_yaml::to_string(value).context("Failed to serialize to YAML")?;
            println!("{}", yaml_output);
        }
        "json" => {
            let json_output = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
            println!("{}", json_output);
        }
        _ => {
            return Err(anyhow::anyhow!(
                "Unknown output format: {}. Valid formats: yaml, json",
                format
            ));
        }
    }
    Ok(())
}

fn handle_config_validate(config_file: &PathBuf) -> Result<()> {
    info!("Validating configuration file: {:?}", config_file);

    match load_config(Some(config_file)) {
        Ok(config) => {
            println!("{} Configuration file is valid", "✓".bright_green().bold());
            println!("  profiles: {}", config.profiles.keys().cloned().collect::<Vec<_>>().join(", "));
            Ok(())
        }
        Err(e) => {
            println!("{} Configuration validation failed: {:#}", "✗".bright_red().bold(), e);
            error!("Configuration validation failed: {:#}", e);
            Err(e)
        }
    }
}

fn handle_config_generate(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(anyhow::anyhow!(
            "Output file already exists: {:?}. Use --force to overwrite.",
            output
        ));
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    fs::write(output, SurgeConfig::generate_sample()).context("Failed to write configuration file")?;

    println!("{} Sample configuration generated at: {:?}", "✓".bright_green().bold(), output);
    println!("  Validate with: surge config validate --config-file {:?}", output);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;

    let level_override = cli
        .log_level
        .as_deref()
        .map(LogLevel::from_str)
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;
    let _logging = init_logging(&config.logging, level_override)?;

    match &cli.command {
        Some(Commands::Run(args)) => handle_run(config, args).await,
        Some(Commands::Profiles { profiles_cmd }) => {
            match profiles_cmd {
                ProfilesCommands::List => handle_profiles_list(&config),
                ProfilesCommands::Show { name, format } => print_value(config.profile(name)?, format)?,
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Config { config_cmd }) => {
            match config_cmd {
                ConfigCommands::Validate { config_file } => handle_config_validate(config_file)?,
                ConfigCommands::Generate { output, force } => handle_config_generate(output, *force)?,
                ConfigCommands::Show { format } => {
                    if cli.config.is_none() {
                        warn!("No --config given, showing defaults with environment overrides");
                    }
                    print_value(&config.redacted(), format)?
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        None => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            cmd.print_help().context("Failed to print help")?;
            println!();
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_run_overrides_apply_to_selected_profile() {
        let mut config = SurgeConfig::default();
        let args = RunArgs {
            profile: Some("steady".to_string()),
            rate: Some(20.0),
            duration: Some(Duration::from_secs(30)),
            quiet: true,
            ..RunArgs::default()
        };

        let name = apply_run_overrides(&mut config, &args).unwrap();
        assert_eq!(name, "steady");
        let load = &config.profile("steady").unwrap().load;
        assert_eq!(load.peak_rate(), 20.0);
        assert_eq!(load.total_duration(), Duration::from_secs(30));
        assert!(!config.report.console);
    }

    #[test]
    fn test_unknown_profile_rejected() {
        let mut config = SurgeConfig::default();
        let args = RunArgs {
            profile: Some("soak".to_string()),
            ..RunArgs::default()
        };
        let err = apply_run_overrides(&mut config, &args).unwrap_err();
        assert!(format!("{:#}", err).contains("soak"));
    }

    #[test]
    fn test_generate_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surge.yaml");
        handle_config_generate(&path, false).unwrap();
        assert!(handle_config_generate(&path, false).is_err());
        handle_config_generate(&path, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.run.profile, "smoke");
    }
}
