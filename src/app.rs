use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::args::CliArgs;
use crate::cli::command::{self, ViewCommand};
use crate::cli::validation;
use crate::client::{http, CollectionSource};
use crate::config::{self, ConfigFile};
use crate::context::{self, AppContext};
use crate::filter::{FilterField, SearchMode};
use crate::model::{parse_page, CollectionKind, PageSize};
use crate::pagination::DEFAULT_MAX_VISIBLE;
use crate::render::{self, OutputFormat};
use crate::store::{DataStore, FetchOutcome, StoreEvent};
use crate::view::{ListView, Navigation, PageFetch, PendingQuery, QueryCompletion};

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<12}: {}", label, value);
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn render_custom_help() -> String {
    let cmd = CliArgs::command();
    let mut out = String::new();

    out.push_str(cmd.get_name());
    if let Some(version) = cmd.get_version() {
        out.push(' ');
        out.push_str(version);
    }
    out.push('\n');
    if let Some(long_about) = cmd.get_long_about().or(cmd.get_about()) {
        out.push_str(&long_about.to_string());
        out.push('\n');
    }
    out.push_str(&format!("\nUsage: {} [OPTIONS]\n\n", cmd.get_name()));

    let mut sections: Vec<(String, Vec<&clap::Arg>)> = Vec::new();
    let mut section_idx: HashMap<String, usize> = HashMap::new();
    for arg in cmd.get_arguments().filter(|a| !a.is_hide_set()) {
        let heading = arg.get_help_heading().unwrap_or("Options").to_string();
        let idx = *section_idx.entry(heading.clone()).or_insert_with(|| {
            sections.push((heading, Vec::new()));
            sections.len() - 1
        });
        sections[idx].1.push(arg);
    }

    for (heading, args) in sections {
        out.push_str(&heading);
        out.push_str(":\n");
        for arg in args {
            let mut parts: Vec<String> = Vec::new();
            if let Some(short) = arg.get_short() {
                parts.push(format!("-{short}"));
            }
            if let Some(long) = arg.get_long() {
                parts.push(format!("--{long}"));
            }
            if let Some(aliases) = arg.get_visible_aliases() {
                parts.extend(aliases.into_iter().map(|alias| format!("--{alias}")));
            }
            let mut flags = parts.join(", ");

            if arg.get_action().takes_values() {
                let value_name = arg
                    .get_value_names()
                    .and_then(|names| names.first())
                    .map(|name| name.as_str())
                    .unwrap_or("VALUE");
                let optional = arg.get_num_args().map(|r| r.min_values()).unwrap_or(1) == 0;
                if optional {
                    flags.push_str(&format!(" [<{value_name}>]"));
                } else {
                    flags.push_str(&format!(" <{value_name}>"));
                }
            }

            out.push_str(&format!("  {flags}\n"));
            if let Some(help) = arg.get_help() {
                let help = help.to_string();
                if !help.trim().is_empty() {
                    out.push_str(&format!("          {}\n", help.trim()));
                }
            }
            out.push('\n');
        }
    }

    out
}

/// Install the stderr subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,catalog_browser={level}")));
    if let Err(e) = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
}

#[derive(Clone, Debug)]
struct RunConfig {
    options: context::Options,
    kind: CollectionKind,
    page: u32,
    search: Option<String>,
    filters: Vec<(FilterField, String)>,
    interactive: bool,
    output: Option<String>,
    output_format: OutputFormat,
    no_color: bool,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };

    let kind_raw = args.kind.or(cfg.kind).unwrap_or_else(|| "users".to_string());
    let kind = CollectionKind::parse(&kind_raw)
        .ok_or_else(|| format!("invalid kind '{kind_raw}', expected users or products"))?;

    let page = match args.page.as_deref() {
        Some(raw) => parse_page(raw).map_err(|e| format!("invalid --page '{raw}': {e}"))?,
        None => 1,
    };

    let size_raw = args.size.or(cfg.page_size).unwrap_or(PageSize::default().get());
    let page_size =
        PageSize::try_from(size_raw).map_err(|e| format!("invalid page_size: {e}"))?;

    let max_visible_pages = args
        .max_pages
        .or(cfg.max_visible_pages)
        .unwrap_or(DEFAULT_MAX_VISIBLE);
    if max_visible_pages == 0 {
        return Err("invalid max_visible_pages, expected positive integer".to_string());
    }

    let timeout_seconds = args.timeout.or(cfg.timeout).unwrap_or(10);
    if timeout_seconds == 0 {
        return Err("invalid timeout, expected positive number of seconds".to_string());
    }

    let base_url = args
        .base_url
        .or(cfg.base_url)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| http::DEFAULT_BASE_URL.to_string());
    let proxy = args
        .proxy
        .or(cfg.proxy)
        .filter(|p| !p.trim().is_empty());
    let user_agent = args.user_agent.or(cfg.user_agent);

    let search_mode = match args.search_mode.or(cfg.search_mode) {
        Some(raw) => SearchMode::parse(&raw)
            .ok_or_else(|| format!("invalid search_mode '{raw}', expected local or remote"))?,
        None => SearchMode::Local,
    };
    let suppress_pagination_when_filtered = args
        .suppress_pagination
        .or(cfg.suppress_pagination_when_filtered)
        .unwrap_or(false);
    let exclusive_filters = args
        .exclusive_filters
        .or(cfg.exclusive_filters)
        .unwrap_or(true);
    let cancel_superseded_fetches = args
        .cancel_stale
        .or(cfg.cancel_superseded_fetches)
        .unwrap_or(true);

    let filters = args
        .filter
        .iter()
        .map(|raw| {
            validation::parse_filter_arg(raw).map_err(|e| format!("invalid --filter '{raw}': {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if let Some((field, _)) = filters.iter().find(|(field, _)| !field.applies_to(kind)) {
        return Err(format!("filter '{field}' does not apply to {kind}"));
    }
    if exclusive_filters && filters.len() > 1 {
        return Err(
            "exclusive filters keep one --filter; pass --exclusive-filters false to combine"
                .to_string(),
        );
    }
    let search = args.search.filter(|s| !s.trim().is_empty());

    let output = if args.interactive {
        None
    } else {
        args.output
            .or(cfg.output)
            .map(|p| config::expand_tilde_string(&p))
    };
    let output_format = match args.output_format.or(cfg.output_format) {
        Some(raw) => OutputFormat::parse(&raw)
            .ok_or_else(|| format!("invalid output_format '{raw}', expected table or json"))?,
        None => output
            .as_deref()
            .and_then(render::infer_format_from_path)
            .unwrap_or(OutputFormat::Table),
    };

    Ok(RunConfig {
        options: context::Options {
            base_url,
            timeout_seconds,
            proxy,
            user_agent,
            page_size,
            max_visible_pages,
            search_mode,
            exclusive_filters,
            suppress_pagination_when_filtered,
            cancel_superseded_fetches,
        },
        kind,
        page,
        search,
        filters,
        interactive: args.interactive,
        output,
        output_format,
        no_color,
    })
}

fn spinner(message: String) -> Result<ProgressBar, String> {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_style(
        ProgressStyle::with_template(":: {spinner} {msg} [{elapsed}]")
            .map_err(|e| format!("failed to build progress bar style: {e}"))?,
    );
    pb.set_message(message);
    Ok(pb)
}

async fn write_output_file(path: &str, rendered: &[u8]) -> Result<(), String> {
    let mut outfile = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(|e| format!("failed to open output file: {e}"))?;
    outfile
        .write_all(rendered)
        .await
        .map_err(|_| "failed to write output file".to_string())?;
    Ok(())
}

async fn run_once(ctx: &AppContext, run: &RunConfig) -> Result<(), String> {
    let now = Instant::now();
    let pb = spinner(format!("loading {}", run.kind))?;

    let mut view = ctx.view(run.kind);
    if let FetchOutcome::Failed(error) = view.mount().await {
        pb.suspend(|| eprintln!(":: could not load {}: {error}", run.kind));
    }
    if run.page > 1 {
        if let Navigation::Ignored = view.go_to_page(run.page).await {
            pb.suspend(|| {
                eprintln!(
                    ":: page {} is out of range (1-{}), showing page {}",
                    run.page,
                    view.paginator().total_pages(),
                    view.paginator().current_page()
                )
            });
        }
    }
    if let Some(term) = run.search.as_deref() {
        view.search(term).await;
    }
    for (field, value) in run.filters.iter() {
        view.set_filter(*field, value)
            .await
            .map_err(|e| e.to_string())?;
    }
    pb.finish_and_clear();
    debug!(elapsed_ms = now.elapsed().as_millis() as u64, "view ready");

    if let Some(path) = run.output.as_deref() {
        colored::control::set_override(false);
        let rendered = render::render(&view, run.output_format);
        if !run.no_color {
            colored::control::unset_override();
        }
        write_output_file(path, &rendered).await?;
        info!(path, "wrote output file");
        print!("{}", render::render_view(&view));
    } else {
        let rendered = render::render(&view, run.output_format);
        print!("{}", String::from_utf8_lossy(&rendered));
        if run.output_format == OutputFormat::Json {
            println!();
        }
    }
    Ok(())
}

/// What the interactive loop should do after handling an input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Idle,
    Redraw,
    Quit,
}

/// Interactive state: the mounted view plus the handles needed to run its
/// work in the background.
struct Session {
    store: Arc<DataStore>,
    source: Arc<dyn CollectionSource>,
    queries: mpsc::Sender<QueryCompletion>,
    view: ListView,
    initial_page: Option<u32>,
}

impl Session {
    fn new(ctx: &AppContext, kind: CollectionKind, queries: mpsc::Sender<QueryCompletion>) -> Self {
        Self {
            store: ctx.store(),
            source: ctx.source(),
            queries,
            view: ctx.view(kind),
            initial_page: None,
        }
    }

    fn spawn_fetch(&self, fetch: PageFetch) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            fetch.run(&store).await;
        });
    }

    fn spawn_query(&self, pending: Option<PendingQuery>) {
        let Some(pending) = pending else {
            return;
        };
        let source = Arc::clone(&self.source);
        let tx = self.queries.clone();
        tokio::spawn(async move {
            let completion = pending.run(source.as_ref()).await;
            let _ = tx.send(completion).await;
        });
    }

    async fn mount(&mut self) {
        let fetch = self.view.prepare_mount().await;
        self.spawn_fetch(fetch);
    }

    async fn switch(&mut self, ctx: &AppContext, kind: CollectionKind) {
        self.view = ctx.view(kind);
        self.initial_page = None;
        self.mount().await;
    }

    async fn handle(&mut self, ctx: &AppContext, cmd: ViewCommand) -> Result<Step, String> {
        match cmd {
            ViewCommand::Next | ViewCommand::Previous | ViewCommand::Page(_) => {
                let fetch = match cmd {
                    ViewCommand::Next => self.view.request_next(),
                    ViewCommand::Previous => self.view.request_previous(),
                    ViewCommand::Page(page) => self.view.request_page(page),
                    _ => None,
                };
                match fetch {
                    Some(fetch) => {
                        self.spawn_fetch(fetch);
                        Ok(Step::Idle)
                    }
                    None => Err(format!(
                        "no such page, showing {} of {}",
                        self.view.paginator().current_page(),
                        self.view.paginator().total_pages()
                    )),
                }
            }
            ViewCommand::Size(size) => {
                let fetch = self.view.request_page_size(size).await;
                self.spawn_fetch(fetch);
                Ok(Step::Idle)
            }
            ViewCommand::Search(term) => {
                let pending = self.view.request_search(&term);
                self.spawn_query(pending);
                Ok(Step::Redraw)
            }
            ViewCommand::Filter { field, value } => {
                let pending = self
                    .view
                    .request_filter(field, &value)
                    .map_err(|e| e.to_string())?;
                self.spawn_query(pending);
                Ok(Step::Redraw)
            }
            ViewCommand::Unfilter(field) => {
                let pending = self
                    .view
                    .request_clear_filter(field)
                    .map_err(|e| e.to_string())?;
                self.spawn_query(pending);
                Ok(Step::Redraw)
            }
            ViewCommand::ClearFilters => {
                let pending = self.view.request_clear_all();
                self.spawn_query(pending);
                Ok(Step::Redraw)
            }
            ViewCommand::Switch(kind) => {
                if kind != self.view.kind() {
                    self.switch(ctx, kind).await;
                }
                Ok(Step::Idle)
            }
            ViewCommand::Refresh => {
                self.spawn_fetch(self.view.current_fetch());
                Ok(Step::Idle)
            }
            ViewCommand::Help => {
                print!("{}", command::HELP);
                Ok(Step::Idle)
            }
            ViewCommand::Quit => Ok(Step::Quit),
        }
    }

    async fn on_event(&mut self, event: Result<StoreEvent, RecvError>) -> Step {
        match event {
            Ok(StoreEvent::CollectionUpdated(kind)) if kind == self.view.kind() => {
                self.view.sync_from_store().await;
                if let Some(page) = self.initial_page.take() {
                    if let Some(fetch) = self.view.request_page(page) {
                        self.spawn_fetch(fetch);
                        return Step::Idle;
                    }
                    warn!(page, "requested start page is out of range");
                }
                Step::Redraw
            }
            Ok(StoreEvent::FetchFailed { kind, message }) if kind == self.view.kind() => {
                self.view.sync_from_store().await;
                eprintln!(":: could not load {kind}: {message}");
                Step::Redraw
            }
            Ok(StoreEvent::ShutDown) => Step::Quit,
            Ok(_) => Step::Idle,
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "store events lagged, resyncing");
                self.view.sync_from_store().await;
                Step::Redraw
            }
            Err(RecvError::Closed) => Step::Quit,
        }
    }

    fn on_query(&mut self, completion: QueryCompletion) -> Step {
        if self.view.apply_query(completion) {
            Step::Redraw
        } else {
            Step::Idle
        }
    }

    fn redraw(&self) {
        println!();
        print!("{}", render::render_view(&self.view));
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

async fn run_interactive(ctx: &AppContext, run: &RunConfig) -> Result<(), String> {
    let options = ctx.options();
    format_kv_line("API", &options.base_url);
    format_kv_line("Collection", run.kind.title());
    format_kv_line("Page size", &options.page_size.to_string());
    format_kv_line(
        "Search",
        match options.search_mode {
            SearchMode::Local => "local",
            SearchMode::Remote => "remote",
        },
    );
    format_kv_line("Exclusive", format_bool(options.exclusive_filters));
    println!(":: type 'help' for commands");

    let mut events = ctx.store().subscribe();
    let (query_tx, mut query_rx) = mpsc::channel::<QueryCompletion>(64);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut session = Session::new(ctx, run.kind, query_tx);
    session.mount().await;
    session.initial_page = (run.page > 1).then_some(run.page);
    if let Some(term) = run.search.as_deref() {
        let pending = session.view.request_search(term);
        session.spawn_query(pending);
    }
    for (field, value) in run.filters.iter() {
        let pending = session
            .view
            .request_filter(*field, value)
            .map_err(|e| e.to_string())?;
        session.spawn_query(pending);
    }

    loop {
        let step = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => match command::parse(&line) {
                    Ok(Some(cmd)) => match session.handle(ctx, cmd).await {
                        Ok(step) => step,
                        Err(msg) => {
                            eprintln!(":: {msg}");
                            Step::Idle
                        }
                    },
                    Ok(None) => Step::Idle,
                    Err(msg) => {
                        debug!(input = %line.trim(), "rejected command");
                        eprintln!(":: {msg}");
                        Step::Idle
                    }
                },
                Ok(None) => Step::Quit,
                Err(e) => return Err(format!("failed to read stdin: {e}")),
            },
            event = events.recv() => session.on_event(event).await,
            Some(completion) = query_rx.recv() => session.on_query(completion),
        };
        match step {
            Step::Quit => break,
            Step::Redraw => {
                session.redraw();
                prompt();
            }
            Step::Idle => prompt(),
        }
    }
    println!();
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }

    let ctx = AppContext::new(run.options.clone()).map_err(|e| e.to_string())?;
    let result = if run.interactive {
        run_interactive(&ctx, &run).await
    } else {
        run_once(&ctx, &run).await
    };
    ctx.shutdown().await;
    result
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", render_custom_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    init_tracing(args.verbose);

    let user_config_path = args.config.clone().map(|p| config::expand_tilde(&p));
    if args.init_config {
        let path = user_config_path
            .or_else(config::default_config_path)
            .ok_or_else(|| "could not determine a home directory for the config".to_string())?;
        if config::ensure_default_config_file(&path)? {
            println!(":: wrote default config to {}", path.display());
        } else {
            println!(":: config already exists at {}", path.display());
        }
        return Ok(());
    }

    let cfg = match user_config_path.as_ref() {
        Some(path) => config::load_config(path, false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;
    debug!(?run, "resolved run configuration");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
