use crate::filter::FilterField;
use crate::model::{parse_page, CollectionKind, PageSize};

/// One line typed at the interactive prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewCommand {
    Next,
    Previous,
    Page(u32),
    Size(PageSize),
    Search(String),
    Filter { field: FilterField, value: String },
    Unfilter(FilterField),
    ClearFilters,
    Switch(CollectionKind),
    Refresh,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  n, next                 next page
  p, prev                 previous page
  page N                  jump to page N
  size N                  rows per page (5, 10, 20, 50)
  search [TERM]           free-text search; no term clears it
  filter FIELD VALUE      structured filter (name, email, gender, brand, category)
  unfilter FIELD          drop one structured filter
  clear                   drop search and all filters
  users, products         switch collection
  r, refresh              redraw the current view
  h, help                 this text
  q, quit                 leave
";

/// Parse one prompt line. Blank lines parse to `None`.
pub fn parse(line: &str) -> Result<Option<ViewCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    let command = match head.to_lowercase().as_str() {
        "n" | "next" => ViewCommand::Next,
        "p" | "prev" | "previous" => ViewCommand::Previous,
        "page" | "g" => ViewCommand::Page(parse_page(rest).map_err(|e| e.to_string())?),
        "size" | "s" => ViewCommand::Size(rest.parse::<PageSize>().map_err(|e| e.to_string())?),
        "search" | "/" => ViewCommand::Search(rest.to_string()),
        "filter" | "f" => {
            let (field, value) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "usage: filter FIELD VALUE".to_string())?;
            ViewCommand::Filter {
                field: parse_field(field)?,
                value: value.trim().to_string(),
            }
        }
        "unfilter" | "u" => ViewCommand::Unfilter(parse_field(rest)?),
        "clear" | "c" => ViewCommand::ClearFilters,
        "users" => ViewCommand::Switch(CollectionKind::Users),
        "products" => ViewCommand::Switch(CollectionKind::Products),
        "r" | "refresh" => ViewCommand::Refresh,
        "h" | "help" | "?" => ViewCommand::Help,
        "q" | "quit" | "exit" => ViewCommand::Quit,
        other => return Err(format!("unknown command '{other}', type 'help'")),
    };
    Ok(Some(command))
}

fn parse_field(raw: &str) -> Result<FilterField, String> {
    FilterField::parse(raw).ok_or_else(|| format!("unknown filter field '{}'", raw.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("next", ViewCommand::Next)]
    #[case(" P ", ViewCommand::Previous)]
    #[case("page 12", ViewCommand::Page(12))]
    #[case("size 20", ViewCommand::Size(PageSize::Twenty))]
    #[case("search red lipstick", ViewCommand::Search("red lipstick".to_string()))]
    #[case("search", ViewCommand::Search(String::new()))]
    #[case(
        "filter category home decoration",
        ViewCommand::Filter {
            field: FilterField::Category,
            value: "home decoration".to_string(),
        }
    )]
    #[case("unfilter brand", ViewCommand::Unfilter(FilterField::Brand))]
    #[case("clear", ViewCommand::ClearFilters)]
    #[case("products", ViewCommand::Switch(CollectionKind::Products))]
    #[case("quit", ViewCommand::Quit)]
    fn parses_commands(#[case] line: &str, #[case] expected: ViewCommand) {
        assert_eq!(parse(line).unwrap(), Some(expected));
    }

    #[test]
    fn blank_line_is_nothing() {
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[rstest]
    #[case("page 0")]
    #[case("page")]
    #[case("size 7")]
    #[case("filter gender")]
    #[case("filter colour red")]
    #[case("jump 3")]
    fn rejects_malformed_input(#[case] line: &str) {
        assert!(parse(line).is_err());
    }
}
