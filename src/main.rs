use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sss_classifier::config::EffectiveConfig;
use sss_classifier::scoring::{Classification, Features};

const EXIT_SUCCESS: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_CLASSIFY: i32 = 2;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify one dish (default if no subcommand)
    Classify(ClassifyArgs),
    /// Classify every configured preset
    Presets,
    /// Answer one question per attribute and watch the result change
    Quiz,
    /// Write a config file with the built-in defaults
    Init {
        /// Overwrite an existing file without asking
        #[arg(long)]
        force: bool,
    },
    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show {
        /// Print JSON instead of YAML
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug, Default)]
struct ClassifyArgs {
    /// Start from a named preset (e.g. "Tomato Soup")
    #[arg(short, long)]
    preset: Option<String>,

    /// Set a feature, e.g. --set temperature=hot --set submersion=0.8
    #[arg(short = 's', long = "set", value_name = "NAME=VALUE")]
    features: Vec<String>,

    /// Override a weight, e.g. --weight bread_presence=0.5
    #[arg(short, long = "weight", value_name = "NAME=WEIGHT")]
    weights: Vec<String>,

    /// Dish name shown in the report (defaults to the preset name)
    #[arg(short, long)]
    name: Option<String>,

    /// Print the canonical JSON result
    #[arg(long)]
    json: bool,

    /// Include the per-attribute breakdown
    #[arg(long)]
    breakdown: bool,

    /// Also write a plain-text report to this file
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(name = "sss")]
#[command(about = "Is it a soup, a salad or a sandwich?", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/sss/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Classify(ClassifyArgs::default()));

    // Init writes the config, so it must not require one to load.
    if let Commands::Init { force } = command {
        match sss_classifier::config::init::run_init_wizard(cli.config, force) {
            Ok(_) => std::process::exit(EXIT_SUCCESS),
            Err(e) => {
                eprintln!("Init failed: {:#}", e);
                std::process::exit(EXIT_CONFIG);
            }
        }
    }

    let config = match sss_classifier::config::load_config(cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };
    let effective = config.effective();

    // Validate config at startup
    if let Err(errors) = sss_classifier::config::validate_config(&effective) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }
    log::debug!(
        "{} categories, {} attributes, {} presets, threshold {}",
        effective.table.categories.len(),
        effective.table.attributes.len(),
        effective.presets.len(),
        effective.options.ambiguity_threshold
    );

    let use_colors = sss_classifier::output::should_use_colors();

    let code = match command {
        Commands::Classify(args) => run_classify(&effective, args, use_colors),
        Commands::Presets => run_presets(&effective, use_colors),
        Commands::Quiz => run_quiz(&effective, use_colors),
        Commands::Config { action } => run_config(&config, action),
        Commands::Init { .. } => EXIT_SUCCESS,
    };
    std::process::exit(code);
}

fn run_classify(config: &EffectiveConfig, args: ClassifyArgs, use_colors: bool) -> i32 {
    let mut features = Features::new();
    let mut name = args.name.clone();

    if let Some(ref preset_name) = args.preset {
        match config.preset(preset_name) {
            Some(preset) => {
                log::debug!("Using preset '{}'", preset.name);
                features = preset.features.clone();
                name.get_or_insert_with(|| preset.name.clone());
            }
            None => {
                let known: Vec<&str> = config.presets.iter().map(|p| p.name.as_str()).collect();
                eprintln!(
                    "Unknown preset '{}'. Available: {}",
                    preset_name,
                    known.join(", ")
                );
                return EXIT_CONFIG;
            }
        }
    }

    if let Err(e) = features.apply_assignments(&args.features) {
        eprintln!("Invalid feature: {:#}", e);
        return EXIT_CLASSIFY;
    }

    let weights = match config.with_weight_overrides(&args.weights) {
        Ok(w) => w,
        Err(errors) => {
            eprintln!("Invalid weights:");
            for error in errors {
                eprintln!("  - {}", error);
            }
            return EXIT_CLASSIFY;
        }
    };

    let result = match sss_classifier::scoring::classify(
        &features,
        &weights,
        &config.table,
        &config.options,
    ) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Classification failed: {}", e);
            return EXIT_CLASSIFY;
        }
    };
    log_substitutions(&result);

    let name = name.unwrap_or_else(|| "Custom Food".to_string());

    if args.json {
        match sss_classifier::output::format_json(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize result: {}", e);
                return EXIT_FAILURE;
            }
        }
    } else {
        println!(
            "{}",
            sss_classifier::output::format_report(&name, &result, &config.table, use_colors)
        );
        if args.breakdown {
            println!();
            println!(
                "{}",
                sss_classifier::output::format_breakdown(&result, &config.table)
            );
        }
    }

    if let Some(path) = args.export {
        let text = sss_classifier::output::format_export(&name, &result);
        if let Err(e) = sss_classifier::output::write_export(&path, &text) {
            eprintln!("Export failed: {:#}", e);
            return EXIT_FAILURE;
        }
        eprintln!("Wrote {}", path.display());
    }

    EXIT_SUCCESS
}

fn run_presets(config: &EffectiveConfig, use_colors: bool) -> i32 {
    let mut results = Vec::with_capacity(config.presets.len());
    for preset in &config.presets {
        match sss_classifier::scoring::classify(
            &preset.features,
            &config.weights,
            &config.table,
            &config.options,
        ) {
            Ok(result) => results.push((preset.name.as_str(), result)),
            Err(e) => {
                eprintln!("Preset '{}' failed: {}", preset.name, e);
                return EXIT_CLASSIFY;
            }
        }
    }

    let rows: Vec<(&str, &Classification)> = results.iter().map(|(n, r)| (*n, r)).collect();
    println!(
        "{}",
        sss_classifier::output::format_summary_table(&rows, use_colors)
    );
    EXIT_SUCCESS
}

fn run_quiz(config: &EffectiveConfig, use_colors: bool) -> i32 {
    let mut session = sss_classifier::quiz::QuizSession::new(
        &config.table,
        &config.weights,
        config.options,
    );
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();

    let result = match sss_classifier::quiz::run_quiz(
        &mut session,
        &mut stdin.lock(),
        &mut stdout.lock(),
        use_colors,
    ) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Quiz failed: {:#}", e);
            return EXIT_CLASSIFY;
        }
    };
    log_substitutions(&result);

    println!(
        "{}",
        sss_classifier::output::format_report("Your dish", &result, &config.table, use_colors)
    );
    EXIT_SUCCESS
}

fn run_config(config: &sss_classifier::config::Config, action: ConfigAction) -> i32 {
    let ConfigAction::Show { json } = action;

    // Spell out every default so the output is a complete, editable config.
    let effective = config.effective();
    let shown = sss_classifier::config::Config {
        ambiguity_threshold: Some(effective.options.ambiguity_threshold),
        validation: Some(effective.options.validation),
        table: Some(effective.table),
        weights: Some(effective.weights),
        presets: Some(effective.presets),
    };

    let rendered = if json {
        serde_json::to_string_pretty(&shown).map_err(anyhow::Error::from)
    } else {
        serde_saphyr::to_string(&shown).map_err(anyhow::Error::from)
    };
    match rendered {
        Ok(text) => {
            println!("{}", text);
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to render config: {}", e);
            EXIT_FAILURE
        }
    }
}

fn log_substitutions(result: &Classification) {
    for input in &result.resolved_inputs {
        match input.source {
            sss_classifier::scoring::InputSource::Clamped { .. }
            | sss_classifier::scoring::InputSource::Substituted { .. } => {
                log::warn!("{}: {}", input.attribute, input.describe());
            }
            _ => {}
        }
    }
    for name in &result.ignored_features {
        log::warn!("Ignoring unknown attribute '{}'", name);
    }
}
