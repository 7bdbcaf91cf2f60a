//! Mountain operator tool
//!
//! Server-side chores that run against the database directly:
//! - create the first admin account
//! - grant the default role permissions
//! - print a default config file

use anyhow::Context;
use clap::{Parser, Subcommand};
use mountain::config::{generate_default_config, Config};
use mountain::db::Database;
use mountain::setup::{self, AdminBootstrap};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mountain")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mountain CMS operator tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: standard locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the admin account unless one already exists
    CreateAdmin,

    /// Grant all menus to admin and the article menus to editor
    InitPermissions,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref())?;
    config.logging.init_tracing();

    match cli.command {
        Commands::CreateAdmin => {
            let db = open_database(&config)?;
            match setup::create_admin(&db, &config.admin)? {
                AdminBootstrap::AlreadyPresent => {
                    println!("An admin account already exists, nothing to do");
                }
                AdminBootstrap::Created { user, password } => {
                    println!("============================================");
                    println!("Admin account created");
                    println!("============================================");
                    println!("Username: {}", user.username);
                    println!("Email:    {}", user.email);
                    println!("Password: {}", password);
                    println!("============================================");
                    println!("Store these credentials safely and change the password after first login.");
                }
            }
        }

        Commands::InitPermissions => {
            let db = open_database(&config)?;
            let summary = setup::init_permissions(&db)?;
            println!("admin: {} menu(s) granted", summary.admin_menus);
            match summary.editor_menus {
                Some(count) => println!("editor: {} menu(s) granted", count),
                None => println!("editor: role not found, skipped"),
            }
            for name in &summary.missing_menus {
                println!("menu '{}' not found, skipped", name);
            }
            println!("Permissions initialised");
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, &content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

fn open_database(config: &Config) -> anyhow::Result<Database> {
    let path = PathBuf::from(&config.database.path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory {}", parent.display()))?;
    }
    tracing::debug!("Opening database {:?}", path);
    Database::open(&path).with_context(|| format!("opening database {}", path.display()))
}
