use std::fs;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseButton, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, ListState, Paragraph};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing::{debug, error, info};
use tui_textarea::TextArea;
use url::Url;

use tempus_console::action::Action;
use tempus_console::components::{
    ClickTarget, Component, ResultsList, SearchSettings, TableExporter, UserSearch,
    setup_user_search,
};
use tempus_console::config::Config;
use tempus_console::core::{InputElement, Page, Selection};
use tempus_console::dialog::{
    ConfirmDialog, ConfirmRequest, RequestKind, StderrNotifier, confirm_then_submit,
};
use tempus_console::services::{DirectoryDownloads, HttpUserDirectory};

const SEARCH_INPUT_ID: &str = "usuario_q";
const SEARCH_HIDDEN_ID: &str = "usuario_id";
const SEARCH_FORM_ID: &str = "filtros";
const CONFIRM_FORM_ID: &str = "confirmacion";

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Tempus console tools: table export, user search and confirmation prompts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable file logging at the given level (overrides RUST_LOG)
    #[arg(long = "logging", value_enum, global = true)]
    logging: Option<LogLevel>,
    /// Path to a config file (overrides ~/.tempus-config.json5)
    #[arg(long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export the first table of a saved page as CSV
    Export(ExportArgs),
    /// Interactive user search; prints `id<TAB>text` of the selection
    Search(SearchArgs),
    /// Ask for confirmation; exits 0 when accepted, 1 otherwise
    Confirm {
        #[command(subcommand)]
        kind: ConfirmKind,
    },
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Saved HTML page holding the table
    #[arg(long, value_name = "HTML")]
    page: PathBuf,
    /// Name of the downloaded file
    #[arg(long)]
    filename: String,
    /// Keep the trailing (actions) column
    #[arg(long)]
    keep_last_column: bool,
    /// Where to save the file (defaults to the configured or user downloads dir)
    #[arg(long, value_name = "DIR")]
    download_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Finish as soon as a user is selected or the input is cleared
    #[arg(long)]
    auto_submit: bool,
    /// Console base URL (overrides the config)
    #[arg(long, value_name = "URL")]
    base_url: Option<Url>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Tipo {
    Vacaciones,
    Baja,
}

impl From<Tipo> for RequestKind {
    fn from(tipo: Tipo) -> Self {
        match tipo {
            Tipo::Vacaciones => RequestKind::Vacaciones,
            Tipo::Baja => RequestKind::Baja,
        }
    }
}

#[derive(Subcommand, Debug)]
enum ConfirmKind {
    /// Cancel a vacation request
    CancelVacation {
        #[arg(long)]
        estado: String,
        #[arg(long)]
        fechas: String,
    },
    /// Cancel a leave request
    CancelLeave {
        #[arg(long)]
        fechas: String,
    },
    /// Delete a clock-in record
    DeleteClockIn {
        #[arg(long)]
        fecha: String,
    },
    /// Approve a vacation or leave request
    Approve {
        #[arg(long, value_enum)]
        tipo: Tipo,
        #[arg(long)]
        usuario: String,
        #[arg(long)]
        fechas: String,
        #[arg(long)]
        dias: String,
    },
    /// Reject a vacation or leave request
    Reject {
        #[arg(long, value_enum)]
        tipo: Tipo,
        #[arg(long)]
        usuario: String,
        #[arg(long)]
        fechas: String,
    },
}

impl ConfirmKind {
    fn request(&self) -> ConfirmRequest {
        match self {
            Self::CancelVacation { estado, fechas } => ConfirmRequest::cancel_vacation(estado, fechas),
            Self::CancelLeave { fechas } => ConfirmRequest::cancel_leave(fechas),
            Self::DeleteClockIn { fecha } => ConfirmRequest::delete_clock_in(fecha),
            Self::Approve { tipo, usuario, fechas, dias } => {
                ConfirmRequest::approve_request((*tipo).into(), usuario, fechas, dias)
            }
            Self::Reject { tipo, usuario, fechas } => {
                ConfirmRequest::reject_request((*tipo).into(), usuario, fechas)
            }
        }
    }
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let level = cli.logging.map(tracing::Level::from);
    tempus_console::logging::init_with(None, level)?;

    let config = Config::from_path(cli.config.as_ref()).wrap_err("could not load configuration")?;
    debug!("Loaded config: {config:?}");

    match cli.command {
        Command::Export(args) => run_export(&config, args),
        Command::Search(args) => run_search(config, args),
        Command::Confirm { kind } => run_confirm(&config, &kind),
    }
}

fn run_export(config: &Config, args: ExportArgs) -> Result<ExitCode> {
    let html = fs::read_to_string(&args.page)
        .wrap_err_with(|| format!("could not read {}", args.page.display()))?;
    let page = Page::parse_html(&html);

    let sink = match args.download_dir.or_else(|| config.download_dir()) {
        Some(dir) => DirectoryDownloads::new(dir),
        None => DirectoryDownloads::user_default()
            .ok_or_else(|| eyre!("no downloads directory; pass --download-dir"))?,
    };
    let trim = config.export.trim_last_column && !args.keep_last_column;

    let exporter = TableExporter::new(sink, StderrNotifier);
    match exporter.export_table_to_csv(&page, &args.filename, trim)? {
        Some(path) => {
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        None => Ok(ExitCode::FAILURE),
    }
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
    Ok(())
}

/// Result of a terminal session once the terminal is handed back. A failed
/// restore is logged when the session already failed, so the session error
/// is the one reported.
fn finish_with<T>(res: Result<T>, restore: impl FnOnce() -> Result<()>) -> Result<T> {
    match (res, restore()) {
        (Err(e), Err(restore_err)) => {
            error!("Failed to restore terminal: {restore_err}");
            Err(e)
        }
        (Ok(_), Err(restore_err)) => Err(restore_err),
        (res, Ok(())) => res,
    }
}

fn run_confirm(config: &Config, kind: &ConfirmKind) -> Result<ExitCode> {
    let (tx, mut rx) = unbounded_channel();
    let mut dialog = ConfirmDialog::new(config.styles.clone());
    confirm_then_submit(&mut dialog, kind.request(), CONFIRM_FORM_ID, tx);

    let mut terminal = init_terminal()?;
    let res = confirm_loop(&mut terminal, &mut dialog);
    finish_with(res, restore_terminal)?;

    let accepted = matches!(rx.try_recv(), Ok(Action::SubmitForm(form)) if form == CONFIRM_FORM_ID);
    info!("Confirmation accepted: {accepted}");
    Ok(if accepted { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn confirm_loop(terminal: &mut Tui, dialog: &mut ConfirmDialog) -> Result<()> {
    while dialog.is_open() {
        terminal.draw(|f| {
            let area = f.area();
            if let Err(e) = dialog.draw(f, area) {
                error!("Failed to draw confirmation: {e}");
            }
        })?;
        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
        {
            if let Some(action) = dialog.handle_key_event(key)? {
                debug!("Confirmation action: {action}");
            }
        }
    }
    Ok(())
}

fn run_search(config: Config, args: SearchArgs) -> Result<ExitCode> {
    let mut search_cfg = config.search.clone();
    if let Some(base_url) = args.base_url {
        search_cfg.base_url = base_url;
    }
    let directory = HttpUserDirectory::from_config(&search_cfg)?;
    info!("Searching users at {}", directory.endpoint());

    let page = Page::new()
        .with_input(InputElement::text(SEARCH_INPUT_ID).in_form(SEARCH_FORM_ID))
        .with_input(InputElement::hidden(SEARCH_HIDDEN_ID).in_form(SEARCH_FORM_ID))
        .into_shared();

    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    let widget = setup_user_search(
        page,
        Arc::new(directory),
        SEARCH_INPUT_ID,
        SEARCH_HIDDEN_ID,
        args.auto_submit,
        SearchSettings::from(&search_cfg),
    )
    .ok_or_else(|| eyre!("search inputs missing from page"))?;
    let (tx, rx) = unbounded_channel();
    widget.register_action_handler(tx);

    let mut terminal = init_terminal()?;
    let res = SearchScreen::new(widget, rx).run(&mut terminal);
    let selection = finish_with(res, restore_terminal)?;
    if selection.is_empty() {
        return Ok(ExitCode::FAILURE);
    }
    println!("{}\t{}", selection.id, selection.text);
    Ok(ExitCode::SUCCESS)
}

fn text_input(text: &str) -> TextArea<'static> {
    let mut input = TextArea::new(vec![text.to_string()]);
    input.move_cursor(tui_textarea::CursorMove::End);
    input.set_block(Block::default().borders(Borders::ALL).title("Usuario"));
    input.set_cursor_line_style(Style::default());
    input
}

/// Terminal front-end for one user search widget
struct SearchScreen {
    widget: UserSearch,
    actions: UnboundedReceiver<Action>,
    input: TextArea<'static>,
    list_state: ListState,
    input_area: Rect,
    panel_area: Rect,
    done: bool,
}

impl SearchScreen {
    fn new(widget: UserSearch, actions: UnboundedReceiver<Action>) -> Self {
        Self {
            widget,
            actions,
            input: text_input(""),
            list_state: ListState::default(),
            input_area: Rect::default(),
            panel_area: Rect::default(),
            done: false,
        }
    }

    fn text(&self) -> String {
        self.input.lines().first().cloned().unwrap_or_default()
    }

    fn run(mut self, terminal: &mut Tui) -> Result<Selection> {
        while !self.done {
            self.draw(terminal)?;
            self.drain_actions();
            if !event::poll(Duration::from_millis(50))? {
                continue;
            }
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key(key),
                Event::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
                    let at = Position::new(mouse.column, mouse.row);
                    let target = if self.input_area.contains(at) {
                        ClickTarget::Input
                    } else if self.panel_area.contains(at) {
                        ClickTarget::Panel
                    } else {
                        ClickTarget::Outside
                    };
                    let panel = tempus_console::components::render(&self.widget.view());
                    let clicked = ResultsList::new(&panel).entry_at(
                        self.panel_area,
                        &self.list_state,
                        mouse.row,
                    );
                    self.widget.handle_click(target);
                    if target == ClickTarget::Panel
                        && let Some(index) = clicked
                    {
                        self.widget.select(index);
                    }
                }
                _ => {}
            }
        }
        Ok(self.widget.selection())
    }

    fn on_key(&mut self, key: KeyEvent) {
        let panel_open = self.widget.view().panel_open;
        match key.code {
            KeyCode::Esc => self.done = true,
            KeyCode::Down if panel_open => self.list_state.select_next(),
            KeyCode::Up if panel_open => self.list_state.select_previous(),
            KeyCode::Enter => {
                if panel_open
                    && let Some(index) = self.list_state.selected()
                {
                    self.widget.select(index);
                } else {
                    self.widget.handle_change(&self.text());
                    self.done = !self.widget.selection().is_empty() || self.text().is_empty();
                }
            }
            _ => {
                let before = self.text();
                self.input.input(key);
                let after = self.text();
                if before != after {
                    self.widget.handle_input(&after);
                }
            }
        }
    }

    fn drain_actions(&mut self) {
        while let Ok(action) = self.actions.try_recv() {
            debug!("Search action: {action}");
            match action {
                Action::ResultsUpdated(_) => self.list_state.select(Some(0)),
                Action::SelectionChanged { .. } => {
                    self.input = text_input(&self.widget.selection().text);
                    self.list_state.select(None);
                }
                Action::SubmitForm(_) => self.done = true,
                _ => {}
            }
        }
    }

    fn draw(&mut self, terminal: &mut Tui) -> Result<()> {
        let panel = tempus_console::components::render(&self.widget.view());
        let selection = self.widget.selection();
        terminal.draw(|f| {
            let [input_area, panel_area, status_area] = Layout::vertical([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .areas(f.area());
            self.input_area = input_area;

            let list = ResultsList::new(&panel);
            self.panel_area = Rect {
                height: list.height().min(panel_area.height),
                ..panel_area
            };
            f.render_widget(&self.input, input_area);
            f.render_stateful_widget(list, self.panel_area, &mut self.list_state);

            let status = if selection.is_empty() {
                "Sin selección  ↑/↓ elegir  Enter confirmar  Esc salir".to_string()
            } else {
                format!("Seleccionado: {} ({})", selection.text, selection.id)
            };
            f.render_widget(
                Paragraph::new(status).style(Style::default().fg(Color::DarkGray)),
                status_area,
            );
        })?;
        Ok(())
    }
}
