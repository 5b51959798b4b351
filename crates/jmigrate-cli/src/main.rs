//! `jmigrate` - run a Java/Maven migration from the terminal

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{builder::PossibleValuesParser, value_parser, Arg, ArgAction, ArgMatches, Command};
use jmigrate_core::{FailureReason, MigrationConfig, MigrationOrchestrator, MigrationResult};
use jmigrate_gateway::{
    Advisor, AutoApprove, Confirmation, ConfirmationChannel, DescriptorParser, Gateway,
    GeminiAdvisor, HttpParser, OfflineAdvisor, TerminalConfirmation, TransformEngine,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn cli() -> Command {
    let config = Arg::new("config")
        .long("config")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("TOML configuration file");

    Command::new("jmigrate")
        .version(jmigrate_core::VERSION)
        .about("Human-in-the-loop migration of Java/Maven projects")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Run one migration")
                .arg(
                    Arg::new("project")
                        .value_name("PROJECT_PATH")
                        .value_parser(value_parser!(PathBuf))
                        .help("Project root; asked for interactively when omitted"),
                )
                .arg(config.clone())
                .arg(
                    Arg::new("engine")
                        .long("engine")
                        .value_parser(PossibleValuesParser::new(["openrewrite", "moderne"]))
                        .help("Transformation engine"),
                )
                .arg(
                    Arg::new("auto-approve")
                        .long("auto-approve")
                        .action(ArgAction::SetTrue)
                        .help("Answer every checkpoint with its first option"),
                )
                .arg(
                    Arg::new("no-preview")
                        .long("no-preview")
                        .action(ArgAction::SetTrue)
                        .help("Skip the dry-run preview before confirmation"),
                )
                .arg(
                    Arg::new("log-json")
                        .long("log-json")
                        .action(ArgAction::SetTrue)
                        .help("Emit logs as JSON lines"),
                ),
        )
        .subcommand(
            Command::new("parse-source")
                .about("Parse one Java source file")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(config),
        )
        .subcommand(Command::new("recipes").about("List each engine's recipe catalog"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    if let Err(err) = result {
        eprintln!("tracing already initialized: {err}");
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Defaults, file, environment (through `lookup`), then command-line flags
fn load_config(args: &ArgMatches, lookup: impl Fn(&str) -> Option<String>) -> Result<MigrationConfig> {
    let path = args.get_one::<PathBuf>("config");
    let mut config = MigrationConfig::load(path.map(PathBuf::as_path), lookup)
        .with_context(|| match path {
            Some(path) => format!("loading configuration from {}", path.display()),
            None => "loading default configuration".to_string(),
        })?;

    if let Ok(Some(engine)) = args.try_get_one::<String>("engine") {
        let engine: TransformEngine = engine.parse().map_err(anyhow::Error::msg)?;
        config = config.with_engine(engine);
    }
    if args.try_get_one::<bool>("no-preview").ok().flatten().copied().unwrap_or(false) {
        config = config.with_preview(false);
    }
    config.validate()?;
    Ok(config)
}

fn advisor(config: &MigrationConfig) -> Result<Arc<dyn Advisor>> {
    let settings = &config.advisor;
    match settings.gemini_key() {
        Some(key) => {
            let advisor =
                GeminiAdvisor::with_base_url(key, &settings.model, &settings.base_url, settings.policy())?;
            info!(model = advisor.model(), "using Gemini advisory");
            Ok(Arc::new(advisor))
        }
        None => {
            warn!("no advisory API key configured; reasoning will be summarized offline");
            Ok(Arc::new(OfflineAdvisor))
        }
    }
}

async fn ask_project_path() -> Result<PathBuf> {
    let answer = TerminalConfirmation::stdio()
        .confirm("Enter the path to your Java/Maven project", &[])
        .await?;
    match answer {
        Confirmation::Selected(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => bail!("no project path given"),
    }
}

fn exit_code(result: &MigrationResult) -> i32 {
    match result.failure_reason() {
        None => 0,
        Some(FailureReason::NoMigrationPath) => 2,
        Some(_) => 1,
    }
}

fn print_outcome(result: &MigrationResult) {
    match result {
        MigrationResult::Success {
            report_path,
            target,
            history,
            ..
        } => {
            println!("Migration completed successfully.");
            println!("  Applied: {} -> {} ({})", target.kind, target.target_version, target.recipe);
            println!("  Stages: {}", history.len());
            println!("  Report: {}", report_path.display());
        }
        MigrationResult::Failure {
            reason, reasoning, ..
        } => {
            println!("Migration did not complete: {reason}");
            if let Some(reasoning) = reasoning {
                println!("\nAnalysis:\n{reasoning}");
            }
        }
    }
}

async fn run(args: &ArgMatches) -> Result<i32> {
    init_tracing(args.get_flag("log-json"));
    let config = load_config(args, env_lookup)?;

    let project = match args.get_one::<PathBuf>("project") {
        Some(path) => path.clone(),
        None => ask_project_path().await?,
    };
    if !project.is_dir() {
        bail!("{} is not a directory", project.display());
    }

    let confirmation: Arc<dyn ConfirmationChannel> = if args.get_flag("auto-approve") {
        Arc::new(AutoApprove)
    } else {
        Arc::new(TerminalConfirmation::stdio())
    };
    let gateway = Gateway::http(
        &config.services,
        config.transport.policy(),
        advisor(&config)?,
        confirmation,
    )?;

    let orchestrator = MigrationOrchestrator::new(gateway, config.migration);
    let result = orchestrator.run_migration(&project).await;
    print_outcome(&result);
    Ok(exit_code(&result))
}

async fn parse_source(args: &ArgMatches) -> Result<()> {
    init_tracing(false);
    let config = load_config(args, env_lookup)?;
    let Some(file) = args.get_one::<PathBuf>("file") else {
        bail!("missing FILE");
    };

    let parser = HttpParser::new(&config.services.file_parser, config.transport.policy())?;
    let analysis = parser
        .parse_source(absolute(file)?.as_path())
        .await
        .with_context(|| format!("parsing {}", file.display()))?;

    println!("Package: {}", analysis.package_name);
    println!("Class: {}", analysis.class_name);
    println!("Imports:");
    for import in &analysis.imports {
        println!("  {import}");
    }
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    })
}

fn recipes() {
    for engine in TransformEngine::ALL {
        println!("{engine}:");
        for (name, description) in engine.catalog() {
            println!("  {name:<60} {description}");
        }
        println!();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("run", args)) => {
            let code = run(args).await?;
            std::process::exit(code);
        }
        Some(("parse-source", args)) => parse_source(args).await,
        Some(("recipes", _)) => {
            recipes();
            Ok(())
        }
        _ => Ok(()),
    }
}
