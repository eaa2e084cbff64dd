use blueprints::cli::{Cli, Commands, GlobalOpts};
use blueprints::core::Config;
use clap::Parser;
use miette::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    // Install miette's fancy error handler
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    let mut config = Config::load();
    init_tracing(&global, &config);
    if let Some(database) = &global.database {
        config.database = Some(database.clone());
    }

    match cli.command {
        Commands::Create(args) => blueprints::cli::commands::create::run(args, &global, &config),
        Commands::Update(args) => blueprints::cli::commands::update::run(args, &global, &config),
        Commands::Delete(args) => blueprints::cli::commands::delete::run(args, &global, &config),
        Commands::Show(args) => blueprints::cli::commands::show::run(args, &global, &config),
        Commands::List(args) => blueprints::cli::commands::list::run(args, &global, &config),
        Commands::Load(args) => blueprints::cli::commands::load::run(args, &global, &config),
        Commands::Validate(args) => blueprints::cli::commands::validate::run(args, &global),
    }
}

/// Log to stderr; RUST_LOG wins over the configured directive
fn init_tracing(global: &GlobalOpts, config: &Config) {
    let fallback = if global.verbose {
        "debug".to_string()
    } else {
        config.log.clone().unwrap_or_else(|| "warn".to_string())
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
