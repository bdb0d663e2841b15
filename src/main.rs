use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use taxonomist_lib::commands::{organize_commands, settings_commands};
use taxonomist_lib::config::TaxonomyConfig;
use taxonomist_lib::models::folder_node::FolderNode;
use taxonomist_lib::models::organize::OrganizeProgress;
use taxonomist_lib::AppState;

#[derive(Parser)]
#[command(name = "taxonomist", about = "Sort bookmarks into an LLM-chosen folder taxonomy")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify and move every link, then remove empty folders.
    OrganizeAll,
    /// Classify and move a single existing link.
    Organize { link_id: String },
    /// Create a new link directly inside its classified folder.
    Add { url: String, title: String },
    /// Print the classification for a link without touching the store.
    Classify { url: String, title: String },
    /// Remove empty folders under every container; the containers themselves stay.
    Cleanup,
    /// Print the folder tree.
    Tree {
        /// Print as JSON instead of an indented outline.
        #[arg(long)]
        json: bool,
    },
    /// Recent audit log entries.
    Log {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    #[command(subcommand)]
    ApiKey(ApiKeyCommand),
    #[command(subcommand)]
    Provider(ProviderCommand),
    #[command(subcommand)]
    Model(ModelCommand),
}

#[derive(Subcommand)]
enum ApiKeyCommand {
    /// Store the key in the OS keychain.
    Set { key: String },
    Status,
    Delete,
}

#[derive(Subcommand)]
enum ProviderCommand {
    /// openai, openrouter, groq, gemini or copilot.
    Set { name: String },
    Clear,
    /// Show the provider and model the next call would use.
    Status,
}

#[derive(Subcommand)]
enum ModelCommand {
    Set { model: String },
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    taxonomist_lib::init_tracing();
    let cli = Cli::parse();
    let config = TaxonomyConfig::from_env()?;
    let state = AppState::open(config)?;

    match cli.command {
        Command::OrganizeAll => {
            let (tx, mut rx) = mpsc::unbounded_channel::<OrganizeProgress>();
            let printer = tokio::spawn(async move {
                while let Some(p) = rx.recv().await {
                    eprintln!("[{}/{}] {}", p.processed, p.total, p.message);
                }
            });
            let result = organize_commands::organize_all(&state, Some(&tx)).await;
            drop(tx);
            let _ = printer.await;
            let summary = result?;
            println!(
                "{} links: {} moved, {} unchanged, {} failed; {} empty folders removed",
                summary.total,
                summary.moved,
                summary.unchanged,
                summary.failed,
                summary.removed_folders
            );
        }
        Command::Organize { link_id } => {
            let placed = organize_commands::organize_link(&state, &link_id).await?;
            println!("{}", serde_json::to_string_pretty(&placed)?);
        }
        Command::Add { url, title } => {
            let placed = organize_commands::add_link(&state, &url, &title).await?;
            println!("{}", serde_json::to_string_pretty(&placed)?);
        }
        Command::Classify { url, title } => {
            let result = organize_commands::classify_preview(&state, &url, &title).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Cleanup => {
            let removed = organize_commands::cleanup(&state).await?;
            println!("{removed} empty folders removed");
        }
        Command::Tree { json } => {
            let tree = organize_commands::get_tree(&state).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tree)?);
            } else {
                print_outline(&tree, 0);
            }
        }
        Command::Log { limit } => {
            for entry in organize_commands::get_audit_log(&state, limit)? {
                println!(
                    "{}  {:<14} {}",
                    entry.created_at,
                    entry.action,
                    entry.summary.unwrap_or_default()
                );
            }
        }
        Command::ApiKey(cmd) => match cmd {
            ApiKeyCommand::Set { key } => {
                settings_commands::save_api_key(&state, &key)?;
                println!("API key saved");
            }
            ApiKeyCommand::Status => {
                let present = settings_commands::has_api_key(&state).await?;
                println!("{}", if present { "configured" } else { "not configured" });
            }
            ApiKeyCommand::Delete => {
                settings_commands::delete_api_key(&state)?;
                println!("API key deleted");
            }
        },
        Command::Provider(cmd) => match cmd {
            ProviderCommand::Set { name } => settings_commands::set_provider(&state, Some(&name))?,
            ProviderCommand::Clear => settings_commands::set_provider(&state, None)?,
            ProviderCommand::Status => {
                let status = settings_commands::provider_status(&state).await?;
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
        },
        Command::Model(cmd) => match cmd {
            ModelCommand::Set { model } => settings_commands::set_model(&state, Some(&model)).await?,
            ModelCommand::Clear => settings_commands::set_model(&state, None).await?,
        },
    }
    Ok(())
}

fn print_outline(node: &FolderNode, depth: usize) {
    let indent = "  ".repeat(depth);
    match &node.url {
        Some(url) => println!("{indent}- {} <{url}>", node.title),
        None => println!("{indent}{}/", node.title),
    }
    for child in &node.children {
        print_outline(child, depth + 1);
    }
}
