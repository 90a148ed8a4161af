use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "catalog-browser",
    version,
    about = "paginated, filterable browser for the dummyjson catalogs",
    long_about = "catalog-browser lists the dummyjson users and products collections page \
        by page, with free-text search and structured filters.\n\nExamples:\
        \n  catalog-browser -k products -s 10 -p 3\
        \n  catalog-browser -k users -q emily\
        \n  catalog-browser -k products -F category=beauty -o beauty.json\
        \n  catalog-browser -i\n\nTip: Use --config to persist page size and filter policy \
        and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase verbosity (-v, -vv, -vvv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'c',
        long = "clr",
        visible_alias = "color",
        help_heading = "Output",
        help = "Enable colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Also write the rendered view to a file."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'A',
        long = "fmt",
        visible_alias = "format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format (table or json)."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'k',
        long = "kd",
        visible_alias = "kind",
        value_name = "COLLECTION",
        help_heading = "Browse",
        help = "Collection to show (users or products)."
    )]
    pub kind: Option<String>,

    #[arg(
        short = 'p',
        long = "pg",
        visible_alias = "page",
        value_name = "N",
        help_heading = "Browse",
        help = "Page to show (1-based)."
    )]
    pub page: Option<String>,

    #[arg(
        short = 's',
        long = "sz",
        visible_alias = "size",
        value_name = "N",
        help_heading = "Browse",
        help = "Rows per page (5, 10, 20 or 50)."
    )]
    pub size: Option<u32>,

    #[arg(
        short = 'i',
        long = "it",
        visible_alias = "interactive",
        help_heading = "Browse",
        help = "Start an interactive session (type 'help' for commands)."
    )]
    pub interactive: bool,

    #[arg(
        short = 'q',
        long = "sq",
        visible_alias = "search",
        value_name = "TERM",
        help_heading = "Filters",
        help = "Free-text search over the visible collection."
    )]
    pub search: Option<String>,

    #[arg(
        short = 'F',
        long = "flt",
        visible_alias = "filter",
        value_name = "FIELD=VALUE",
        action = ArgAction::Append,
        help_heading = "Filters",
        help = "Structured filter, e.g. gender=female or category=beauty (repeatable)."
    )]
    pub filter: Vec<String>,

    #[arg(
        long = "sm",
        visible_alias = "search-mode",
        value_name = "MODE",
        help_heading = "Filters",
        help = "Where search runs: local (current page) or remote (search endpoint)."
    )]
    pub search_mode: Option<String>,

    #[arg(
        long = "sp",
        visible_alias = "suppress-pagination",
        num_args = 0..=1,
        default_missing_value = "true",
        help_heading = "Filters",
        help = "Hide the pagination bar while a structured filter is active."
    )]
    pub suppress_pagination: Option<bool>,

    #[arg(
        long = "xf",
        visible_alias = "exclusive-filters",
        num_args = 0..=1,
        default_missing_value = "true",
        help_heading = "Filters",
        help = "Allow only one structured filter at a time (default true)."
    )]
    pub exclusive_filters: Option<bool>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.catalog-browser/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "ic",
        visible_alias = "init-config",
        help_heading = "Input",
        help = "Write a default config file and exit."
    )]
    pub init_config: bool,

    #[arg(
        short = 'u',
        long = "bu",
        visible_alias = "base-url",
        value_name = "URL",
        help_heading = "HTTP",
        help = "API root (defaults to https://dummyjson.com)."
    )]
    pub base_url: Option<String>,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'x',
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "HTTP proxy URL (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,

    #[arg(
        long = "ua",
        visible_alias = "user-agent",
        value_name = "AGENT",
        help_heading = "HTTP",
        help = "User-Agent header sent with every request."
    )]
    pub user_agent: Option<String>,

    #[arg(
        long = "cs",
        visible_alias = "cancel-stale",
        num_args = 0..=1,
        default_missing_value = "true",
        help_heading = "HTTP",
        help = "Abort superseded in-flight page fetches (default true)."
    )]
    pub cancel_stale: Option<bool>,

    #[arg(
        short = 'm',
        long = "mp",
        visible_alias = "max-pages",
        value_name = "N",
        help_heading = "Pagination",
        help = "Number of page buttons shown in the pagination bar."
    )]
    pub max_pages: Option<u32>,
}
