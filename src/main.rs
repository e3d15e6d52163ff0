//! Venturer CLI entry point.

use clap::Parser;
use std::process::ExitCode;
use vt::cli::commands::{self, Context};
use vt::cli::{Cli, Commands, OutputFormat};
use vt::error::Error;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.silent {
        vt::SILENT.store(true, std::sync::atomic::Ordering::Relaxed);
    }
    if cli.format == OutputFormat::Csv {
        vt::CSV_OUTPUT.store(true, std::sync::atomic::Ordering::Relaxed);
    }
    if cli.no_color || std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR --format json OR non-TTY stdout
    let json = cli.json
        || cli.format == OutputFormat::Json
        || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info,hyper=info,reqwest=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let ctx = Context {
        db: cli.db.as_deref(),
        actor: cli.actor.as_deref(),
        user: cli.user.as_deref(),
        json,
    };

    match &cli.command {
        Commands::Init { force, admin } => commands::init::execute(&ctx, *force, admin.as_deref()),
        Commands::Version => commands::version::execute(json),
        Commands::Completions { shell } => commands::completions::execute(shell),
        Commands::Config { command } => commands::config::execute(command, &ctx),

        // Hierarchy
        Commands::Venture { command } => commands::venture::execute(command, &ctx),
        Commands::Project { command } => commands::project::execute(command, &ctx),
        Commands::Milestone { command } => commands::milestone::execute(command, &ctx),
        Commands::Workstream { command } => commands::workstream::execute(command, &ctx),
        Commands::Item { command } => commands::item::execute(command, &ctx),
        Commands::Assoc { command } => commands::assoc::execute(command, &ctx),

        // Collaboration
        Commands::Team { command } => commands::team::execute(command, &ctx),
        Commands::User { command } => commands::user::execute(command, &ctx),

        Commands::Template { command } => commands::template::execute(command, &ctx),
        Commands::Report(args) => commands::report::execute(args, &ctx),
        Commands::Serve { bind } => commands::serve::execute(&ctx, bind.as_deref()),
        Commands::History {
            entity_type,
            id,
            limit,
        } => commands::history::execute(&ctx, entity_type, id, *limit),
    }
}
