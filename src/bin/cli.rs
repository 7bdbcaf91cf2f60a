//! Mountain CLI
//!
//! Command-line client for a running Mountain API:
//! - Admin login/logout (token kept in the session file)
//! - Columns, articles, users, roles, menus and backend accounts
//! - Uploads
//! - The public mini-program endpoints

use clap::{Parser, Subcommand};
use mountain::client::guard::RouteGuard;
use mountain::client::{format_date, AdminClient, FileTokenStore, MpClient, Session, TokenStore};
use mountain::config::Config;
use mountain::models::{ArticleFilter, ArticleInput, BackendUserInput, ColumnInput, Menu};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mountain-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Command-line client for the Mountain CMS API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL (default: client.base_url from the config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Config file (default: standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in as a backend user and store the token
    Login {
        username: String,
        #[arg(short, long)]
        password: String,
    },

    /// Forget the stored token
    Logout,

    /// Change the logged-in account's password
    ChangePassword { old: String, new: String },

    /// Show which admin view a path leads to with the current token
    Route { path: String },

    /// Columns
    Columns {
        #[command(subcommand)]
        action: ColumnAction,
    },

    /// Articles
    Articles {
        #[command(subcommand)]
        action: ArticleAction,
    },

    /// Mini-program users
    Users,

    /// Roles
    Roles,

    /// Menu tree (all menus, or the ones visible to the logged-in account)
    Menus {
        #[arg(long)]
        mine: bool,
    },

    /// Backend accounts
    BackendUsers {
        #[command(subcommand)]
        action: BackendUserAction,
    },

    /// Upload an image or video
    Upload {
        path: PathBuf,
        #[arg(long)]
        video: bool,
    },

    /// Public mini-program endpoints
    Mp {
        #[command(subcommand)]
        action: MpAction,
    },
}

#[derive(Subcommand)]
pub enum ColumnAction {
    List,
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "0")]
        sort_order: i64,
    },
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum ArticleAction {
    List {
        #[arg(long)]
        column: Option<i64>,
        #[arg(long)]
        status: Option<i64>,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "20")]
        page_size: u32,
    },
    Create {
        #[arg(long)]
        column: i64,
        #[arg(long)]
        title: String,
        /// HTML body file
        #[arg(long)]
        content: Option<PathBuf>,
        #[arg(long, default_value = "")]
        author: String,
    },
    Publish { id: i64 },
    Unpublish { id: i64 },
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum BackendUserAction {
    List,
    Create {
        username: String,
        email: String,
        #[arg(long)]
        role: i64,
    },
    ResetPassword { id: i64 },
}

#[derive(Subcommand)]
pub enum MpAction {
    Columns,
    Articles {
        column: i64,
        #[arg(long, default_value = "1")]
        page: u32,
    },
    Article { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref())?;

    let base_url = cli.api_url.clone().unwrap_or_else(|| config.client.base_url.clone());
    let timeout = config.client.request_timeout_ms;
    let json = cli.format == "json";

    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&config.client.token_path));
    let admin = AdminClient::new(&base_url, timeout, Arc::new(Session::new(Arc::clone(&store))))?;

    let outcome = run(cli.command, &admin, &base_url, timeout, store.as_ref(), json).await;
    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        if e.downcast_ref::<mountain::ClientError>().is_some_and(|c| c.is_unauthorized()) {
            eprintln!("Log in again with: mountain-cli login <username> -p <password>");
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(
    command: Commands,
    admin: &AdminClient,
    base_url: &str,
    timeout: u64,
    store: &dyn TokenStore,
    json: bool,
) -> anyhow::Result<()> {
    match command {
        Commands::Login { username, password } => {
            let login = admin.login(&username, &password).await?;
            println!(
                "Logged in as {} ({})",
                login.user.username,
                login.user.role_name.as_deref().unwrap_or("-")
            );
        }

        Commands::Logout => {
            admin.logout()?;
            println!("Logged out");
        }

        Commands::ChangePassword { old, new } => {
            let response = admin.change_password(&old, &new).await?;
            println!("{}", response.message);
        }

        Commands::Route { path } => {
            let guard = RouteGuard::new(store);
            println!("{:?} -> {}", guard.check(&path), guard.destination(&path));
        }

        Commands::Columns { action } => match action {
            ColumnAction::List => {
                let columns = admin.columns().await?;
                if json {
                    return print_json(&columns);
                }
                println!("{:<6} {:<24} {:<6} {}", "ID", "Name", "Sort", "Description");
                println!("{}", "-".repeat(60));
                for c in columns {
                    println!("{:<6} {:<24} {:<6} {}", c.id, c.name, c.sort_order, c.description);
                }
            }
            ColumnAction::Create {
                name,
                description,
                sort_order,
            } => {
                let column = admin
                    .create_column(&ColumnInput {
                        name,
                        description,
                        sort_order,
                    })
                    .await?;
                println!("Created column {} ({})", column.name, column.id);
            }
            ColumnAction::Delete { id } => {
                admin.delete_column(id).await?;
                println!("Deleted column {}", id);
            }
        },

        Commands::Articles { action } => match action {
            ArticleAction::List {
                column,
                status,
                page,
                page_size,
            } => {
                let filter = ArticleFilter {
                    column_id: column,
                    status,
                };
                let result = admin.articles(filter, page, page_size).await?;
                if json {
                    return print_json(&result);
                }
                println!(
                    "{:<6} {:<32} {:<16} {:<10} {:<6} {}",
                    "ID", "Title", "Column", "Status", "Views", "Created"
                );
                println!("{}", "-".repeat(84));
                for a in &result.list {
                    println!(
                        "{:<6} {:<32} {:<16} {:<10} {:<6} {}",
                        a.id,
                        truncate(&a.title, 30),
                        a.column_name.as_deref().unwrap_or("-"),
                        if a.status == 1 { "published" } else { "draft" },
                        a.view_count,
                        format_date(&a.created_at.to_rfc3339())
                    );
                }
                println!();
                println!("Page {} of {} article(s)", result.page, result.total);
            }
            ArticleAction::Create {
                column,
                title,
                content,
                author,
            } => {
                let content = match content {
                    Some(path) => std::fs::read_to_string(&path)?,
                    None => String::new(),
                };
                let article = admin
                    .create_article(&ArticleInput {
                        column_id: column,
                        title,
                        content,
                        author,
                        ..ArticleInput::default()
                    })
                    .await?;
                println!("Created draft {} ({})", article.title, article.id);
            }
            ArticleAction::Publish { id } => {
                admin.set_article_status(id, 1).await?;
                println!("Published article {}", id);
            }
            ArticleAction::Unpublish { id } => {
                admin.set_article_status(id, 0).await?;
                println!("Article {} is a draft again", id);
            }
            ArticleAction::Delete { id } => {
                admin.delete_article(id).await?;
                println!("Deleted article {}", id);
            }
        },

        Commands::Users => {
            let users = admin.users().await?;
            if json {
                return print_json(&users);
            }
            println!("{:<6} {:<16} {:<16} {}", "ID", "Phone", "Name", "OpenID");
            println!("{}", "-".repeat(70));
            for u in users {
                println!(
                    "{:<6} {:<16} {:<16} {}",
                    u.id,
                    u.phone.as_deref().unwrap_or("-"),
                    u.name.as_deref().unwrap_or("-"),
                    u.openid
                );
            }
        }

        Commands::Roles => {
            let roles = admin.roles(1, 100).await?;
            if json {
                return print_json(&roles);
            }
            println!("{:<6} {:<12} {:<20} {}", "ID", "Name", "Display", "Status");
            println!("{}", "-".repeat(50));
            for r in roles.list {
                println!("{:<6} {:<12} {:<20} {}", r.id, r.name, r.display_name, r.status);
            }
        }

        Commands::Menus { mine } => {
            let menus = if mine {
                admin.current_menus().await?
            } else {
                admin.menu_tree().await?
            };
            if json {
                return print_json(&menus);
            }
            print_menu_tree(&menus, 0);
        }

        Commands::BackendUsers { action } => match action {
            BackendUserAction::List => {
                let users = admin.backend_users(1, 100).await?;
                if json {
                    return print_json(&users);
                }
                println!("{:<6} {:<16} {:<28} {:<12} {}", "ID", "Username", "Email", "Role", "Status");
                println!("{}", "-".repeat(72));
                for u in users.list {
                    println!(
                        "{:<6} {:<16} {:<28} {:<12} {}",
                        u.id,
                        u.username,
                        u.email,
                        u.role_name.as_deref().unwrap_or("-"),
                        u.status
                    );
                }
            }
            BackendUserAction::Create {
                username,
                email,
                role,
            } => {
                let created = admin
                    .create_backend_user(&BackendUserInput {
                        username,
                        email,
                        role_id: role,
                    })
                    .await?;
                println!("Created {} (id {})", created.user.username, created.user.id);
                println!("Password: {}", created.password);
            }
            BackendUserAction::ResetPassword { id } => {
                let reset = admin.reset_password(id).await?;
                println!("New password for {}: {}", reset.id, reset.password);
            }
        },

        Commands::Upload { path, video } => {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let bytes = std::fs::read(&path)?;
            let uploaded = if video {
                admin.upload_video(&filename, bytes).await?
            } else {
                admin.upload_image(&filename, bytes).await?
            };
            if json {
                return print_json(&uploaded);
            }
            println!("{} ({} bytes)", uploaded.url, uploaded.size);
        }

        Commands::Mp { action } => {
            let mp = MpClient::new(base_url, timeout)?;
            match action {
                MpAction::Columns => {
                    let columns = mp.columns().await?;
                    if json {
                        return print_json(&columns);
                    }
                    for c in columns {
                        println!("{:<6} {}", c.id, c.name);
                    }
                }
                MpAction::Articles { column, page } => {
                    let result = mp
                        .column_articles(column, page, mountain::client::mp::DEFAULT_PAGE_SIZE)
                        .await?;
                    if json {
                        return print_json(&result);
                    }
                    for a in &result.list {
                        println!(
                            "{:<6} {:<40} {}",
                            a.id,
                            truncate(&a.title, 38),
                            format_date(&a.created_at.to_rfc3339())
                        );
                    }
                    println!("{} of {} shown", result.list.len(), result.total);
                }
                MpAction::Article { id } => {
                    let article = mp.article(id).await?;
                    if json {
                        return print_json(&article);
                    }
                    println!("{}", article.title);
                    println!(
                        "{} | {} views | {}",
                        if article.author.is_empty() { "-" } else { &article.author },
                        article.view_count,
                        format_date(&article.created_at.to_rfc3339())
                    );
                    println!();
                    println!("{}", article.content);
                    for image in &article.images {
                        println!("[image] {}", image);
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_menu_tree(menus: &[Menu], depth: usize) {
    for menu in menus {
        println!(
            "{}{:<4} {:<20} {}",
            "  ".repeat(depth),
            menu.id,
            menu.title,
            menu.path
        );
        print_menu_tree(&menu.children, depth + 1);
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
