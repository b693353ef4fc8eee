use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use gel_core::kernel::bootstrap::Application;
use gel_core::kernel::constants::{CONFIG_DIR_NAME, REQUIRED_PLUGINS};
use gel_core::kernel::error::Result;
use gel_core::plugin_system::{DependencyRollback, EngineConfig};

use core_settings::SettingsPlugin;

/// Eina: a plugin based music player
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Print "pong" and exit
    #[arg(long)]
    ping: bool,

    /// Extra plugin directory, searched before the default ones
    #[arg(long = "plugins-path", value_name = "DIR")]
    plugins_paths: Vec<PathBuf>,

    /// Settings directory [default: $HOME/.eina]
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Unload dependencies pulled in by a plugin that then failed to load
    #[arg(long)]
    rollback_dependencies: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage plugins
    Plugin {
        #[command(subcommand)]
        command: PluginCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PluginCommand {
    /// List known plugins and their state
    List {},
    /// Load and activate a plugin, by name or module path, and remember it
    Enable {
        reference: String,
    },
    /// Deactivate and unload a plugin and forget it
    Disable {
        name: String,
    },
}

fn default_config_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

fn build_application(args: &CliArgs) -> Result<Application> {
    let mut config = EngineConfig::default();
    if args.rollback_dependencies {
        config.rollback = DependencyRollback::Unload;
    }
    for path in args.plugins_paths.iter().rev() {
        config.search_paths.retain(|p| p != path);
        config.search_paths.insert(0, path.clone());
    }

    let config_dir = args.config_dir.clone().unwrap_or_else(default_config_dir);
    let mut app = Application::new(config_dir, config)?;
    app.engine_mut().set_args(std::env::args().collect());

    app.register_builtin(core_logging::descriptor(), core_logging::create)?;
    let settings = app.settings();
    app.register_builtin(core_settings::descriptor(), SettingsPlugin::factory(settings))?;
    Ok(app)
}

fn list_plugins(app: &Application) {
    println!("Known plugins:");
    let engine = app.engine();
    let mut any = false;
    for descriptor in engine.catalog() {
        any = true;
        let state = if engine.is_enabled(descriptor.name()) {
            "enabled"
        } else if engine.is_loaded(descriptor.name()) {
            "loaded"
        } else {
            "available"
        };
        let origin = if descriptor.is_builtin() { "builtin".to_string() } else { descriptor.reference() };
        println!(
            "  - {} {} [{}] ({}){}",
            descriptor.name(),
            descriptor.version(),
            state,
            origin,
            descriptor.short_description().map(|d| format!(": {d}")).unwrap_or_default()
        );
    }
    if !any {
        println!("  No plugins found.");
    }
}

async fn run(args: CliArgs) -> Result<()> {
    println!("Initializing application...");
    let mut app = build_application(&args)?;
    app.startup(REQUIRED_PLUGINS).await?;

    let outcome = match &args.command {
        Some(Commands::Plugin { command }) => match command {
            PluginCommand::List {} => {
                list_plugins(&app);
                Ok(())
            }
            PluginCommand::Enable { reference } => app.enable(reference).map(|name| {
                println!("Plugin '{}' enabled.", name);
            }),
            PluginCommand::Disable { name } => app.disable(name).map(|()| {
                println!("Plugin '{}' disabled.", name);
            }),
        },
        None => {
            log::info!("{} plugin(s) running", app.engine().plugins().len());
            Ok(())
        }
    };

    println!("Shutting down application...");
    let shutdown = app.shutdown();
    outcome.and(shutdown)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if args.ping {
        println!("pong");
        return ExitCode::SUCCESS;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
