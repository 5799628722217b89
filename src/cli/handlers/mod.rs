mod init;
pub use init::cmd_init;

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::{self, ConfigError};
use crate::io::kv::FileStore;
use crate::io::lock::{DataLock, LockError};
use crate::model::config::AppConfig;
use crate::model::item::ItemPatch;
use crate::model::list::{ListPatch, TodoList};
use crate::model::text::{ItemText, ListName};
use crate::model::view_mode::ViewMode;
use crate::ops::generate::{GenerateRequest, GenerationSource, Generator, handle_generate};
use crate::ops::list_ops::{ListRepository, find_item, find_list};
use crate::ops::view_ops::ViewModes;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;

    if let Commands::Init(args) = cli.command {
        return cmd_init(cli.data_dir.as_deref(), args);
    }

    let app = App::open(cli.data_dir.as_deref())?;
    debug!(data_dir = %app.data_dir.display(), "opened data directory");

    match cli.command {
        // Handled above
        Commands::Init(_) => Ok(()),

        // Read commands
        Commands::Lists => cmd_lists(&app, json),
        Commands::Show(args) => cmd_show(&app, args, json),
        Commands::Stats => cmd_stats(&app, json),

        // List writes
        Commands::New(args) => cmd_new(&app, args, json),
        Commands::Rename(args) => cmd_rename(&app, args, json),
        Commands::Rm(args) => cmd_rm(&app, args, json),

        // Item writes
        Commands::Add(args) => cmd_add(&app, args, json),
        Commands::Edit(args) => cmd_edit(&app, args, json),
        Commands::Del(args) => cmd_del(&app, args, json),
        Commands::Toggle(args) => cmd_toggle(&app, args, json),

        // Generation
        Commands::Gen(args) => cmd_gen(&app, args, json),

        // View modes
        Commands::View(cmd) => cmd_view(&app, cmd.action.unwrap_or(ViewAction::Status), json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Everything a command needs: where the data lives and how to behave
struct App {
    data_dir: PathBuf,
    config: AppConfig,
}

impl App {
    fn open(data_dir: Option<&str>) -> Result<Self, ConfigError> {
        let data_dir = config_io::resolve_data_dir(data_dir)?;
        let config = config_io::read_config(&data_dir)?;
        Ok(App { data_dir, config })
    }

    fn repository(&self) -> ListRepository<FileStore> {
        ListRepository::new(FileStore::new(&self.data_dir))
    }

    fn view_modes(&self) -> ViewModes<FileStore> {
        ViewModes::load(FileStore::new(&self.data_dir))
    }

    /// Serialize writers against other `pl` processes
    fn lock(&self) -> Result<DataLock, LockError> {
        let timeout = Duration::from_millis(self.config.storage.lock_timeout_ms);
        DataLock::acquire(&self.data_dir, timeout)
    }
}

/// Resolve a list reference (id or name) against the current lists
fn resolve_list(repo: &ListRepository<FileStore>, reference: &str) -> Result<TodoList, Box<dyn std::error::Error>> {
    let lists = repo.lists();
    Ok(find_list(&lists, reference)?.clone())
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_lists(app: &App, json: bool) -> CmdResult {
    let lists = app.repository().lists();
    let views = app.view_modes();

    if json {
        let summaries: Vec<ListSummaryJson> = lists
            .iter()
            .map(|l| list_summary(l, views.mode(&l.id)))
            .collect();
        return print_json(&summaries);
    }

    if lists.is_empty() {
        println!("no lists yet (try `pl new <name>`)");
        return Ok(());
    }
    let cards: Vec<String> = lists
        .iter()
        .map(|l| format!("{}  {}", l.id, render_compact(l)))
        .collect();
    print!("{}", cards.join("\n"));
    Ok(())
}

fn cmd_show(app: &App, args: ShowArgs, json: bool) -> CmdResult {
    let list = resolve_list(&app.repository(), &args.list)?;
    let mode = args.mode.unwrap_or_else(|| app.view_modes().mode(&list.id));

    if json {
        return print_json(&ShownListJson { list: &list, mode });
    }
    print!("{}", render_list(&list, mode));
    Ok(())
}

fn cmd_stats(app: &App, json: bool) -> CmdResult {
    let stats = collection_stats(&app.repository().lists());
    if json {
        return print_json(&stats);
    }
    print!("{}", render_stats(&stats));
    Ok(())
}

// ---------------------------------------------------------------------------
// List writes
// ---------------------------------------------------------------------------

fn cmd_new(app: &App, args: NewArgs, json: bool) -> CmdResult {
    let name = ListName::parse(&args.name)?;
    let _lock = app.lock()?;

    let list = app.repository().create_list(name);
    if json {
        return print_json(&list);
    }
    println!("{}", list.id);
    Ok(())
}

fn cmd_rename(app: &App, args: RenameArgs, json: bool) -> CmdResult {
    let name = ListName::parse(&args.name)?;
    let _lock = app.lock()?;

    let mut repo = app.repository();
    let list = resolve_list(&repo, &args.list)?;
    let updated = repo
        .update_list(&list.id, ListPatch::rename(name))
        .ok_or_else(|| format!("list not found: {}", args.list))?;
    if json {
        return print_json(&updated);
    }
    println!("{}  {}", updated.id, updated.name);
    Ok(())
}

fn cmd_rm(app: &App, args: ListArg, json: bool) -> CmdResult {
    let _lock = app.lock()?;

    let mut repo = app.repository();
    let list = resolve_list(&repo, &args.list)?;
    let deleted = repo.delete_list(&list.id);
    app.view_modes().forget(&list.id);

    if json {
        return print_json(&serde_json::json!({ "id": list.id, "deleted": deleted }));
    }
    println!("deleted {} ({})", list.name, list.id);
    Ok(())
}

// ---------------------------------------------------------------------------
// Item writes
// ---------------------------------------------------------------------------

fn cmd_add(app: &App, args: AddArgs, json: bool) -> CmdResult {
    let text = ItemText::parse(&args.text)?;
    let _lock = app.lock()?;

    let mut repo = app.repository();
    let list = resolve_list(&repo, &args.list)?;
    let item = repo
        .add_item(&list.id, text)
        .ok_or_else(|| format!("list not found: {}", args.list))?;
    if json {
        return print_json(&item);
    }
    println!("{}", item.id);
    Ok(())
}

fn cmd_edit(app: &App, args: EditArgs, json: bool) -> CmdResult {
    let text = ItemText::parse(&args.text)?;
    let _lock = app.lock()?;

    let mut repo = app.repository();
    let list = resolve_list(&repo, &args.list)?;
    let item_id = find_item(&list, &args.item)?.id.clone();
    let item = repo
        .update_item(&list.id, &item_id, ItemPatch::text(text))
        .ok_or_else(|| format!("item not found: {}", args.item))?;
    if json {
        return print_json(&item);
    }
    println!("{}", render_item(&item));
    Ok(())
}

fn cmd_del(app: &App, args: ItemArgs, json: bool) -> CmdResult {
    let _lock = app.lock()?;

    let mut repo = app.repository();
    let list = resolve_list(&repo, &args.list)?;
    let item = find_item(&list, &args.item)?.clone();
    let deleted = repo.delete_item(&list.id, &item.id);

    if json {
        return print_json(&serde_json::json!({ "id": item.id, "deleted": deleted }));
    }
    println!("deleted {} ({})", item.text, item.id);
    Ok(())
}

fn cmd_toggle(app: &App, args: ItemArgs, json: bool) -> CmdResult {
    let _lock = app.lock()?;

    let mut repo = app.repository();
    let list = resolve_list(&repo, &args.list)?;
    let item_id = find_item(&list, &args.item)?.id.clone();
    let item = repo
        .toggle_item(&list.id, &item_id)
        .ok_or_else(|| format!("item not found: {}", args.item))?;
    if json {
        return print_json(&item);
    }
    println!("{}", render_item(&item));
    Ok(())
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

fn cmd_gen(app: &App, args: GenArgs, json: bool) -> CmdResult {
    let list = resolve_list(&app.repository(), &args.list)?;
    let generator = Generator::from_config(&app.config.generation);
    let request = GenerateRequest {
        list_id: list.id.clone(),
        prompt: args.prompt.clone(),
    };

    // The network call happens without holding the data lock
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let response = runtime.block_on(handle_generate(&generator, &request));

    if !response.success {
        let message = response.error.unwrap_or_else(|| "generation failed".to_string());
        return Err(message.into());
    }
    let todos = response.todos.unwrap_or_default();
    let source = response.source.unwrap_or(GenerationSource::Fallback);

    let added = if args.dry_run {
        false
    } else {
        let _lock = app.lock()?;
        app.repository().add_items(&list.id, todos.clone())
    };
    if !args.dry_run && !added {
        return Err(format!("list was deleted during generation: {}", list.id).into());
    }

    if json {
        return print_json(&GeneratedJson {
            list_id: &list.id,
            source,
            added,
            todos: &todos,
        });
    }
    for item in &todos {
        println!("  {} {}", checkbox(item.completed), item.text);
    }
    if source == GenerationSource::Fallback {
        println!("(generated from built-in templates)");
    }
    if !added {
        println!("dry run: nothing added to {}", list.name);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// View modes
// ---------------------------------------------------------------------------

fn cmd_view(app: &App, action: ViewAction, json: bool) -> CmdResult {
    let changes_state = !matches!(action, ViewAction::Status);
    let _lock = if changes_state { Some(app.lock()?) } else { None };
    let mut views = app.view_modes();

    match action {
        ViewAction::Status => {}
        ViewAction::Set(args) => {
            let list = resolve_list(&app.repository(), &args.list)?;
            views.set_mode(&list.id, args.mode);
        }
        ViewAction::Toggle(args) => {
            let list = resolve_list(&app.repository(), &args.list)?;
            views.toggle(&list.id);
        }
        ViewAction::Large(args) => {
            let list = resolve_list(&app.repository(), &args.list)?;
            if !views.transition_to_large(&list.id) {
                return Err(format!(
                    "{} is {}, only a medium list can be expanded to large",
                    list.name,
                    views.mode(&list.id)
                )
                .into());
            }
        }
        ViewAction::Close => {
            if views.close_overlay().is_none() && !json {
                println!("no list is expanded");
                return Ok(());
            }
        }
        ViewAction::Reset => views.reset(),
    }

    let status = ViewStatusJson {
        active_overlay: views.active_overlay().map(str::to_string),
        mode: views
            .active_overlay()
            .map(|id| views.mode(id))
            .unwrap_or(ViewMode::Compact),
        entries: views.states(),
    };
    if json {
        return print_json(&status);
    }
    match status.active_overlay {
        Some(id) => {
            let name = app
                .repository()
                .get_list(&id)
                .map(|l| l.name)
                .unwrap_or_else(|| "(deleted list)".to_string());
            println!("{}  {}  {}", id, name, status.mode);
        }
        None => println!("all lists compact"),
    }
    Ok(())
}
