use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskboard::Label;

#[derive(Parser, Debug)]
#[command(name = "taskboard")]
#[command(version)]
#[command(about = "Manage boards, lists and cards from the command line")]
#[command(long_about = "
taskboard keeps boards of ordered lists and cards in a directory of JSON files.
Every command prints its result as JSON on stdout; logs go to stderr.

Moves made with `list move` and `card move` go through the same planner as a
drag and drop: one record is rewritten, and moving an item to the slot it
already occupies writes nothing.

Example usage:
  taskboard board create \"Launch\"
  taskboard list add <board> \"To Do\"
  taskboard card add <list> \"Write release notes\"
  taskboard card move <board> <card> <list> 0
  taskboard activity <board> --limit 10
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Storage directory (overrides configuration)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Configuration file (toml, yaml or json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Acting user recorded in the activity log
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create, show and share boards
    Board {
        #[command(subcommand)]
        command: BoardCommands,
    },
    /// Manage the lists of a board
    List {
        #[command(subcommand)]
        command: ListCommands,
    },
    /// Manage cards
    Card {
        #[command(subcommand)]
        command: CardCommands,
    },
    /// Show a board's activity, newest first
    Activity {
        board: String,
        /// Maximum number of events
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Rewrite every order key on a board to 100, 200, ...
    Respace { board: String },
}

#[derive(Subcommand, Debug)]
pub enum BoardCommands {
    /// Create a board owned by the acting user
    Create { title: String },
    /// List the boards the acting user can see
    List,
    /// Show a board with its lists and cards
    Show { board: String },
    /// Give another user access to a board
    AddMember { board: String, user: String },
}

#[derive(Subcommand, Debug)]
pub enum ListCommands {
    /// Append a list to a board
    Add { board: String, title: String },
    /// Rename a list
    Rename { list: String, title: String },
    /// Delete a list and its cards
    Delete { list: String },
    /// Move a list to a position on its board
    Move {
        board: String,
        list: String,
        index: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum CardCommands {
    /// Append a card to a list
    Add {
        list: String,
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Show a card
    Show { card: String },
    /// Edit a card
    Update {
        card: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Toggle a label, given as name or name:color
        #[arg(long = "label", value_parser = parse_label)]
        labels: Vec<Label>,
        /// Remove every label before toggling
        #[arg(long)]
        clear_labels: bool,
        /// Due date, RFC 3339
        #[arg(long, value_parser = parse_due, conflicts_with = "clear_due")]
        due: Option<DateTime<Utc>>,
        #[arg(long)]
        clear_due: bool,
    },
    /// Move a card to a position in a list
    Move {
        board: String,
        card: String,
        list: String,
        index: usize,
    },
    /// Delete a card
    Delete { card: String },
}

fn parse_label(value: &str) -> Result<Label, String> {
    let (name, color) = match value.split_once(':') {
        Some((name, color)) => (name.trim(), Some(color.trim())),
        None => (value.trim(), None),
    };
    if name.is_empty() {
        return Err("label name is empty".to_string());
    }
    let label = Label::new(name);
    match color {
        Some(color) => {
            let hex = color.trim_start_matches('#');
            if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(format!("'{color}' is not a 6-digit hex color"));
            }
            Ok(label.with_color(hex))
        }
        None => Ok(label),
    }
}

fn parse_due(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|due| due.with_timezone(&Utc))
        .map_err(|e| format!("'{value}' is not an RFC 3339 timestamp: {e}"))
}
