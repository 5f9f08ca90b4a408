use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use labdesk_core::folding::{render_html, render_outline, CollapseState};
use labdesk_core::storage::{Database, KvStore};
use labdesk_core::Config;
use tracing::warn;

const COLLAPSE_STATE_KEY: &str = "notes-collapse-state";

#[derive(Subcommand)]
pub enum NotesAction {
    /// Render a notes file with the saved fold state
    Render {
        /// Markdown file, or `-` for stdin
        file: PathBuf,
        /// Pane whose fold state applies (config `notes.default_pane` if omitted)
        #[arg(long)]
        pane: Option<String>,
        /// Emit HTML instead of a terminal outline
        #[arg(long)]
        html: bool,
    },
    /// Collapse every heading of a notes file
    Collapse {
        file: PathBuf,
        #[arg(long)]
        pane: Option<String>,
        /// Only collapse `#` headings
        #[arg(long)]
        top_level: bool,
    },
    /// Expand every section in a pane
    Expand {
        #[arg(long)]
        pane: Option<String>,
    },
    /// Flip one section between collapsed and expanded
    Toggle {
        /// Section id, e.g. `related-work`
        section: String,
        #[arg(long)]
        pane: Option<String>,
    },
}

fn read_notes(file: &Path) -> std::io::Result<String> {
    if file.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(file)
    }
}

fn load_state(db: &Database) -> Result<CollapseState, Box<dyn std::error::Error>> {
    let Some(raw) = db.get(COLLAPSE_STATE_KEY)? else {
        return Ok(CollapseState::new());
    };
    Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!("ignoring malformed collapse state: {e}");
        CollapseState::new()
    }))
}

fn save_state(db: &Database, state: &CollapseState) -> Result<(), Box<dyn std::error::Error>> {
    db.set(COLLAPSE_STATE_KEY, &serde_json::to_string(state)?)?;
    Ok(())
}

pub fn run(action: NotesAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let db = Database::open()?;
    let mut state = load_state(&db)?;
    let default_pane = config.notes.default_pane;

    match action {
        NotesAction::Render { file, pane, html } => {
            let text = read_notes(&file)?;
            let pane = pane.unwrap_or(default_pane);
            if html {
                print!("{}", render_html(&text, &pane, &state));
            } else {
                print!(
                    "{}",
                    render_outline(&text, &pane, &state, config.notes.indent as usize)
                );
            }
        }
        NotesAction::Collapse {
            file,
            pane,
            top_level,
        } => {
            let text = read_notes(&file)?;
            let pane = pane.unwrap_or(default_pane);
            if top_level {
                state.collapse_top_level(&pane, &text);
            } else {
                state.collapse_all(&pane, &text);
            }
            save_state(&db, &state)?;
            println!("{} sections collapsed in {pane}", state.collapsed_count(&pane));
        }
        NotesAction::Expand { pane } => {
            let pane = pane.unwrap_or(default_pane);
            state.expand_all(&pane);
            save_state(&db, &state)?;
            println!("all sections expanded in {pane}");
        }
        NotesAction::Toggle { section, pane } => {
            let pane = pane.unwrap_or(default_pane);
            let collapsed = state.toggle(&pane, &section);
            save_state(&db, &state)?;
            println!(
                "{section}: {}",
                if collapsed { "collapsed" } else { "expanded" }
            );
        }
    }
    Ok(())
}
