use crate::cli::args::CliArgs;
use crate::filter::{FilterField, SearchMode};
use crate::model::{parse_page, CollectionKind, PageSize};
use crate::render::OutputFormat;

/// Split a `FIELD=VALUE` filter argument.
pub fn parse_filter_arg(raw: &str) -> Result<(FilterField, String), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| "expected FIELD=VALUE".to_string())?;
    let field = FilterField::parse(field).ok_or_else(|| {
        format!(
            "unknown field '{}', expected one of name, email, gender, brand, category",
            field.trim()
        )
    })?;
    let value = value.trim();
    if value.is_empty() {
        return Err("filter value must not be empty".to_string());
    }
    Ok((field, value.to_string()))
}

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(raw) = args.kind.as_deref() {
        CollectionKind::parse(raw)
            .ok_or_else(|| format!("invalid --kind '{raw}', expected users or products"))?;
    }
    if let Some(raw) = args.page.as_deref() {
        parse_page(raw).map_err(|e| format!("invalid --page '{raw}': {e}"))?;
    }
    if let Some(size) = args.size {
        PageSize::try_from(size).map_err(|e| format!("invalid --size '{size}': {e}"))?;
    }
    if let Some(raw) = args.search_mode.as_deref() {
        SearchMode::parse(raw)
            .ok_or_else(|| format!("invalid --search-mode '{raw}', expected local or remote"))?;
    }
    if let Some(raw) = args.output_format.as_deref() {
        OutputFormat::parse(raw)
            .ok_or_else(|| format!("invalid --format '{raw}', expected table or json"))?;
    }
    for raw in args.filter.iter() {
        parse_filter_arg(raw).map_err(|e| format!("invalid --filter '{raw}': {e}"))?;
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive number of seconds".to_string());
        }
    }
    if let Some(max_pages) = args.max_pages {
        if max_pages == 0 {
            return Err("invalid max-pages, expected positive integer".to_string());
        }
    }
    if args.interactive && args.output.is_some() {
        return Err("--output is only supported without --interactive".to_string());
    }
    Ok(())
}
