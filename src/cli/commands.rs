use clap::{Args, Parser, Subcommand};

use crate::model::view_mode::ViewMode;

#[derive(Parser)]
#[command(name = "pl", about = concat!("promptlist v", env!("CARGO_PKG_VERSION"), " - todo lists, optionally written for you"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data directory
    #[arg(short = 'D', long = "data-dir", global = true)]
    pub data_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default config.toml into the data directory
    Init(InitArgs),
    /// Show all lists as cards
    Lists,
    /// Show one list
    Show(ShowArgs),
    /// Show item totals across all lists
    Stats,
    /// Create a list
    New(NewArgs),
    /// Rename a list
    Rename(RenameArgs),
    /// Delete a list
    Rm(ListArg),
    /// Add an item to a list
    Add(AddArgs),
    /// Change an item's text
    Edit(EditArgs),
    /// Delete an item
    Del(ItemArgs),
    /// Flip an item between open and done
    Toggle(ItemArgs),
    /// Generate items from a prompt and add them to a list
    Gen(GenArgs),
    /// Inspect or change which list is expanded
    View(ViewCmd),
}

// ---------------------------------------------------------------------------
// List args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing config.toml
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ListArg {
    /// List id or name
    pub list: String,
}

#[derive(Args)]
pub struct ShowArgs {
    /// List id or name
    pub list: String,
    /// Render in this mode instead of the list's current view mode
    #[arg(long)]
    pub mode: Option<ViewMode>,
}

#[derive(Args)]
pub struct NewArgs {
    /// Name of the new list
    pub name: String,
}

#[derive(Args)]
pub struct RenameArgs {
    /// List id or name
    pub list: String,
    /// New name
    pub name: String,
}

// ---------------------------------------------------------------------------
// Item args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// List id or name
    pub list: String,
    /// Item text
    pub text: String,
}

#[derive(Args)]
pub struct EditArgs {
    /// List id or name
    pub list: String,
    /// Item id or 1-based position
    pub item: String,
    /// New text
    pub text: String,
}

#[derive(Args)]
pub struct ItemArgs {
    /// List id or name
    pub list: String,
    /// Item id or 1-based position
    pub item: String,
}

#[derive(Args)]
pub struct GenArgs {
    /// List id or name
    pub list: String,
    /// What the items should be about
    pub prompt: String,
    /// Print the generated items without adding them
    #[arg(long)]
    pub dry_run: bool,
}

// ---------------------------------------------------------------------------
// View mode args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ViewCmd {
    #[command(subcommand)]
    pub action: Option<ViewAction>,
}

#[derive(Subcommand)]
pub enum ViewAction {
    /// Show which list is expanded (default)
    Status,
    /// Set a list's view mode
    Set(ViewSetArgs),
    /// Cycle compact → medium → large → compact
    Toggle(ListArg),
    /// Expand a medium list to large
    Large(ListArg),
    /// Collapse the expanded list
    Close,
    /// Forget all view modes
    Reset,
}

#[derive(Args)]
pub struct ViewSetArgs {
    /// List id or name
    pub list: String,
    /// compact, medium, or large
    pub mode: ViewMode,
}
