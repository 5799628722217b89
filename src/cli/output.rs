use serde::Serialize;

use crate::model::item::Item;
use crate::model::list::TodoList;
use crate::model::view_mode::ViewMode;
use crate::ops::generate::GenerationSource;

/// Items previewed on a compact card
const CARD_PREVIEW: usize = 3;

/// Width of the progress bar, in cells
const BAR_WIDTH: usize = 20;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ListSummaryJson<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub total: usize,
    pub completed: usize,
    pub mode: ViewMode,
}

#[derive(Serialize)]
pub struct ShownListJson<'a> {
    #[serde(flatten)]
    pub list: &'a TodoList,
    pub mode: ViewMode,
}

#[derive(Serialize)]
pub struct GeneratedJson<'a> {
    pub list_id: &'a str,
    pub source: GenerationSource,
    pub added: bool,
    pub todos: &'a [Item],
}

#[derive(Serialize)]
pub struct ViewStatusJson {
    pub active_overlay: Option<String>,
    pub mode: ViewMode,
    /// Persisted `[listId, mode]` pairs
    pub entries: Vec<(String, ViewMode)>,
}

#[derive(Serialize)]
pub struct StatsJson {
    pub lists: Vec<ListStatsJson>,
    pub totals: CountsJson,
}

#[derive(Serialize)]
pub struct ListStatsJson {
    pub id: String,
    pub name: String,
    pub stats: CountsJson,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountsJson {
    pub total: usize,
    pub completed: usize,
    pub percent: u32,
}

impl CountsJson {
    fn new(total: usize, completed: usize) -> Self {
        CountsJson {
            total,
            completed,
            percent: (fraction(completed, total) * 100.0).round() as u32,
        }
    }
}

fn fraction(completed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64
    }
}

/// Per-list counts plus totals across every list
pub fn collection_stats(lists: &[TodoList]) -> StatsJson {
    let mut total = 0;
    let mut completed = 0;
    let entries = lists
        .iter()
        .map(|list| {
            let done = list.completed_count();
            total += list.items.len();
            completed += done;
            ListStatsJson {
                id: list.id.clone(),
                name: list.name.clone(),
                stats: CountsJson::new(list.items.len(), done),
            }
        })
        .collect();
    StatsJson {
        lists: entries,
        totals: CountsJson::new(total, completed),
    }
}

pub fn list_summary<'a>(list: &'a TodoList, mode: ViewMode) -> ListSummaryJson<'a> {
    ListSummaryJson {
        id: &list.id,
        name: &list.name,
        total: list.items.len(),
        completed: list.completed_count(),
        mode,
    }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

pub fn checkbox(completed: bool) -> &'static str {
    if completed { "[x]" } else { "[ ]" }
}

/// `[#####---------------]  25%`
pub fn progress_bar(progress: f64) -> String {
    let progress = progress.clamp(0.0, 1.0);
    let filled = (progress * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        (progress * 100.0).round() as u32
    )
}

/// Render a list the way its view mode shows it
pub fn render_list(list: &TodoList, mode: ViewMode) -> String {
    match mode {
        ViewMode::Compact => render_compact(list),
        ViewMode::Medium => render_medium(list),
        ViewMode::Large => render_large(list),
    }
}

/// Card: name, counts, progress, the first few items
pub fn render_compact(list: &TodoList) -> String {
    let total = list.items.len();
    let mut out = format!("{}  {}/{}\n", list.name, list.completed_count(), total);
    if total == 0 {
        out.push_str("  (no items)\n");
        return out;
    }
    out.push_str(&progress_bar(list.progress()));
    out.push('\n');
    for item in list.items.iter().take(CARD_PREVIEW) {
        out.push_str(&format!("  {} {}\n", checkbox(item.completed), item.text));
    }
    if total > CARD_PREVIEW {
        out.push_str(&format!("  +{} more\n", total - CARD_PREVIEW));
    }
    out
}

/// Overlay: every item with its position and id
pub fn render_medium(list: &TodoList) -> String {
    let mut out = format!("{}  ({})\n", list.name, list.id);
    out.push_str(&progress_bar(list.progress()));
    out.push('\n');
    if list.items.is_empty() {
        out.push_str("  (no items)\n");
    }
    for (i, item) in list.items.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}. {} {}  {}\n",
            i + 1,
            checkbox(item.completed),
            item.text,
            item.id
        ));
    }
    out
}

/// Overlay with the generation hint
pub fn render_large(list: &TodoList) -> String {
    let mut out = render_medium(list);
    out.push_str(&format!("\n  generate more: pl gen {} \"<prompt>\"\n", list.id));
    out
}

pub fn render_stats(stats: &StatsJson) -> String {
    let name_w = stats
        .lists
        .iter()
        .map(|l| l.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(5); // "Total"
    let row = |name: &str, counts: &CountsJson| {
        format!("{:<name_w$}  {:>4}  {:>5}\n", name, counts.completed, counts.total)
    };

    let mut out = format!("{:<name_w$}  {:>4}  {:>5}\n", "List", "done", "total");
    for entry in &stats.lists {
        out.push_str(&row(&entry.name, &entry.stats));
    }
    out.push_str(&row("Total", &stats.totals));
    out.push_str(&progress_bar(fraction(stats.totals.completed, stats.totals.total)));
    out.push('\n');
    out
}

pub fn render_item(item: &Item) -> String {
    format!("{} {}  {}", checkbox(item.completed), item.text, item.id)
}
