//! Sync subcommand for the research project list.
//!
//! The list lives in the local database; it can be pushed to and pulled from
//! a JSON file in a GitHub repository, or exported and imported as a file.

use std::path::PathBuf;

use chrono::Utc;
use clap::Subcommand;
use labdesk_core::storage::Database;
use labdesk_core::sync::{
    export_projects, forget_token, import_projects, load_projects, resolve_token, save_projects,
    store_token,
};
use labdesk_core::{Config, GitHubSync, SyncTracker};
use serde_json::json;

#[derive(Subcommand)]
pub enum SyncAction {
    /// Upload the local project list to GitHub
    Push {
        /// Only push when auto-sync is on, the list changed and the interval elapsed
        #[arg(long)]
        auto: bool,
    },
    /// Replace the local project list with the one on GitHub
    Pull,
    /// Show sync configuration and whether local changes are unsynced
    Status,
    /// Write the local project list to a JSON file
    Export {
        path: PathBuf,
    },
    /// Replace the local project list with a JSON file
    Import {
        path: PathBuf,
    },
    /// Store a GitHub token in the OS keyring
    Login {
        token: String,
    },
    /// Remove the stored GitHub token
    Logout,
}

/// Run the sync command.
pub fn run(action: SyncAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let db = Database::open()?;

    match action {
        SyncAction::Push { auto } => {
            let projects = load_projects(&db)?;
            let mut tracker = SyncTracker::load(&db)?;
            if auto && !tracker.auto_sync_due(&config.sync, &projects, Utc::now()) {
                println!("nothing to sync");
                return Ok(());
            }
            let client = GitHubSync::from_settings(&config.sync)?;
            let sha = super::block_on(client.push(&projects))??;
            tracker.mark_synced(&projects, Utc::now());
            tracker.save(&db)?;
            println!("pushed {} ({sha})", config.sync.file_path);
        }
        SyncAction::Pull => {
            let client = GitHubSync::from_settings(&config.sync)?;
            match super::block_on(client.pull())?? {
                Some(projects) => {
                    save_projects(&db, &projects)?;
                    let mut tracker = SyncTracker::load(&db)?;
                    tracker.mark_synced(&projects, Utc::now());
                    tracker.save(&db)?;
                    let count = projects.as_array().map_or(0, Vec::len);
                    println!("pulled {count} projects");
                }
                None => println!("{} does not exist yet", config.sync.file_path),
            }
        }
        SyncAction::Status => {
            let projects = load_projects(&db)?;
            let tracker = SyncTracker::load(&db)?;
            let token = match resolve_token() {
                Ok(token) => token.is_some(),
                Err(e) => {
                    tracing::warn!("could not read GitHub token: {e}");
                    false
                }
            };
            let status = json!({
                "repo": config.sync.repo,
                "file_path": config.sync.file_path,
                "branch": config.sync.branch,
                "token": token,
                "auto_sync": config.sync.auto_sync,
                "unsynced_changes": tracker.has_unsynced_changes(&projects),
                "last_sync_at": tracker.last_sync_at,
                "auto_sync_due": tracker.auto_sync_due(&config.sync, &projects, Utc::now()),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        SyncAction::Export { path } => {
            let projects = load_projects(&db)?;
            export_projects(&path, &projects)?;
            println!("exported to {}", path.display());
        }
        SyncAction::Import { path } => {
            let projects = import_projects(&path)?;
            save_projects(&db, &projects)?;
            let count = projects.as_array().map_or(0, Vec::len);
            println!("imported {count} projects");
        }
        SyncAction::Login { token } => {
            store_token(&token)?;
            println!("token stored");
        }
        SyncAction::Logout => {
            forget_token()?;
            println!("token removed");
        }
    }
    Ok(())
}
