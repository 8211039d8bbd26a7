use clap::Parser;
use color_eyre::Result;
use reviewlens::error_display::user_message_from_report;
use reviewlens::{
    analyze_file, init_tracing, statistics, AppConfig, Args, ConfigManager, OpenOptions, Report,
    Selection, APP_NAME,
};

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        match ConfigManager::new(APP_NAME) {
            Ok(config_manager) => match config_manager.write_default_config(args.force) {
                Ok(config_path) => {
                    println!("Configuration file written to: {}", config_path.display());
                    return Ok(Some(()));
                }
                Err(e) => {
                    eprintln!("Error writing configuration file: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error initializing config manager: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(None)
}

fn run(args: &Args, config: &AppConfig) -> Result<()> {
    let Some(path) = args.path.as_deref() else {
        return Err(color_eyre::eyre::eyre!("No input file given"));
    };
    let options = OpenOptions::from_args_and_config(args, config);
    let table = analyze_file(path, &options)?;

    if let Some(export_path) = &args.export_clean {
        table.write_csv(export_path)?;
        eprintln!("Cleaned table written to: {}", export_path.display());
    }

    let overall_label = &config.analysis.overall_label;
    if args.list_users {
        for user in statistics::user_options(&table, overall_label) {
            println!("{}", user);
        }
        return Ok(());
    }

    let selection = args
        .user
        .as_deref()
        .map(|user| Selection::from_label(user, overall_label))
        .unwrap_or_default();
    let report = Report::build(&table, &selection, &config.analysis)?;
    let format = args.format.unwrap_or_else(|| config.output_format());
    println!("{}", report.render(format, config.output.pretty_json)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;

    let config = match AppConfig::load(APP_NAME) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(args.debug || config.debug.enabled);

    if let Err(e) = run(&args, &config) {
        eprintln!("Error: {}", user_message_from_report(&e, args.path.as_deref()));
        std::process::exit(1);
    }
    Ok(())
}
