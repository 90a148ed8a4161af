use colored::Colorize;
use itertools::Itertools;
use serde::Serialize;

use crate::filter::FilterField;
use crate::model::record::format_number;
use crate::model::{CollectionKind, Record};
use crate::pagination::PageSlot;
use crate::view::ListView;

const MAX_CELL_WIDTH: usize = 36;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "table" | "text" | "txt" => Some(Self::Table),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Table);
    }
    None
}

pub fn columns(kind: CollectionKind) -> &'static [&'static str] {
    match kind {
        CollectionKind::Users => &["ID", "Name", "Age", "Gender", "Email", "Username"],
        CollectionKind::Products => &[
            "ID", "Title", "Brand", "Category", "Price", "Stock", "Rating",
        ],
    }
}

fn opt(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

pub fn cells(record: &Record) -> Vec<String> {
    match record {
        Record::User(u) => vec![
            u.id.to_string(),
            match u.full_name() {
                name if name.is_empty() => "-".to_string(),
                name => name,
            },
            u.age.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string()),
            opt(u.gender.as_deref()),
            opt(u.email.as_deref()),
            opt(u.username.as_deref()),
        ],
        Record::Product(p) => vec![
            p.id.to_string(),
            opt(p.title.as_deref()),
            opt(p.brand.as_deref()),
            opt(p.category.as_deref()),
            p.price
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "-".to_string()),
            p.stock.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
            p.rating.map(format_number).unwrap_or_else(|| "-".to_string()),
        ],
    }
}

fn clip(value: &str) -> String {
    if value.chars().count() <= MAX_CELL_WIDTH {
        return value.to_string();
    }
    let mut out: String = value.chars().take(MAX_CELL_WIDTH - 3).collect();
    out.push_str("...");
    out
}

fn pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    format!("{value}{}", " ".repeat(width.saturating_sub(len)))
}

pub fn render_table(kind: CollectionKind, rows: &[Record]) -> String {
    let headers = columns(kind);
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|r| cells(r).iter().map(|c| clip(c)).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            body.iter()
                .filter_map(|row| row.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(h, *w))
        .join("  ");
    out.push_str(&header_line.trim_end().bold().to_string());
    out.push('\n');
    out.push_str(&widths.iter().map(|w| "-".repeat(*w)).join("  "));
    out.push('\n');

    if body.is_empty() {
        out.push_str(&"(no matching records)".dimmed().to_string());
        out.push('\n');
        return out;
    }
    for row in &body {
        let line = row.iter().zip(&widths).map(|(c, w)| pad(c, *w)).join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// `« Prev  1 ... 8 9 [10] 11 12 ... 20  Next »`
pub fn render_pagination_bar(
    window: &[PageSlot],
    current: u32,
    has_prev: bool,
    has_next: bool,
) -> String {
    let pages = window
        .iter()
        .map(|slot| match slot {
            PageSlot::Page(n) if *n == current => format!("[{n}]").bold().to_string(),
            other => other.to_string(),
        })
        .join(" ");
    let prev = if has_prev {
        "« Prev".to_string()
    } else {
        "« Prev".dimmed().to_string()
    };
    let next = if has_next {
        "Next »".to_string()
    } else {
        "Next »".dimmed().to_string()
    };
    format!("{prev}  {pages}  {next}")
}

pub fn summarize_filters(view: &ListView) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    let filters = view.filters();
    if filters.has_search() {
        parts.push(format!("search={}", filters.search().trim()));
    }
    for (field, value) in filters.filters() {
        parts.push(format!("{}={value}", field.label()));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

pub fn render_view(view: &ListView) -> String {
    let paginator = view.paginator();
    let mut out = String::new();
    out.push_str(&format!(
        ":: {} :: page size {}",
        view.kind().title().bold().yellow(),
        paginator.page_size()
    ));
    out.push('\n');
    if let Some(summary) = summarize_filters(view) {
        out.push_str(&format!(":: filters :: {summary}"));
        out.push('\n');
    }
    if view.is_waiting_on_query() {
        out.push_str(&":: waiting for filtered results ...".dimmed().to_string());
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&render_table(view.kind(), view.rows()));

    if view.show_pagination() {
        out.push('\n');
        out.push_str(&render_pagination_bar(
            &view.window(),
            paginator.current_page(),
            paginator.has_previous(),
            paginator.has_next(),
        ));
        out.push('\n');
        let showing = match paginator.item_range() {
            Some((start, end)) => format!("showing {start}-{end} of {}", paginator.total_items()),
            None => "no records".to_string(),
        };
        out.push_str(&format!(
            "page {} / {} :: {showing}",
            paginator.current_page(),
            paginator.total_pages()
        ));
        out.push('\n');
    } else {
        out.push('\n');
        out.push_str(&format!("{} matching records", view.rows().len()));
        out.push('\n');
    }
    out
}

#[derive(Serialize)]
struct ViewDump<'a> {
    collection: CollectionKind,
    page: u32,
    page_size: u32,
    total_pages: u32,
    total_items: u64,
    search: &'a str,
    filters: Vec<(FilterField, &'a str)>,
    show_pagination: bool,
    window: Vec<PageSlot>,
    rows: &'a [Record],
}

pub fn render_json(view: &ListView) -> Vec<u8> {
    let paginator = view.paginator();
    let dump = ViewDump {
        collection: view.kind(),
        page: paginator.current_page(),
        page_size: paginator.page_size().get(),
        total_pages: paginator.total_pages(),
        total_items: paginator.total_items(),
        search: view.filters().search(),
        filters: view.filters().filters().collect(),
        show_pagination: view.show_pagination(),
        window: view.window(),
        rows: view.rows(),
    };
    serde_json::to_vec_pretty(&dump).unwrap_or_else(|_| b"{}\n".to_vec())
}

pub fn render(view: &ListView, format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Table => render_view(view).into_bytes(),
        OutputFormat::Json => render_json(view),
    }
}
