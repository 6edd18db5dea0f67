use std::{cmp, future::Future, io, iter, thread, time::Duration};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gamedb_core::{
    dashboard::{DashboardController, DashboardState, DashboardSummary},
    error::ApiError,
    models::{Item, ItemId, ResourceKind},
    resource::{
        ApiClient, ControllerHandle, ListController, ListState, Mutation, Notice, NoticeLevel,
        ResourceApi, ResourceClient,
    },
    session::SessionGuard,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        BarChart, Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, TableState,
        Wrap,
    },
    Frame, Terminal,
};
use tokio::{spawn, sync::mpsc};
use tracing::{debug, error, info, warn};

use crate::form::{FormMode, FormModal, TextInput};

const TICK_RATE: Duration = Duration::from_millis(250);
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Login,
    Dashboard,
    List(ResourceKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginField {
    Username,
    Password,
}

#[derive(Debug)]
struct LoginForm {
    username: TextInput,
    password: TextInput,
    focus: LoginField,
    pending: bool,
    error: Option<String>,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            username: TextInput::default(),
            password: TextInput::default(),
            focus: LoginField::Username,
            pending: false,
            error: None,
        }
    }
}

impl LoginForm {
    fn focused(&mut self) -> &mut TextInput {
        match self.focus {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        };
    }
}

enum MutationRequest {
    Create(Item),
    Update(ItemId, Item),
    Delete(ItemId),
}

/// One open resource screen.
struct ListScreen {
    controller: ListController<ResourceClient>,
    cursor: usize,
    searching: bool,
    search: TextInput,
    form: Option<FormModal>,
    busy: bool,
}

impl ListScreen {
    fn new(controller: ListController<ResourceClient>) -> Self {
        Self {
            controller,
            cursor: 0,
            searching: false,
            search: TextInput::default(),
            form: None,
            busy: false,
        }
    }

    fn kind(&self) -> ResourceKind {
        self.controller.kind()
    }

    fn visible_len(&self) -> usize {
        self.controller.store().current_items().len()
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.visible_len().saturating_sub(1));
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.visible_len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = (self.cursor as isize + delta).clamp(0, len as isize - 1) as usize;
    }

    fn current_item(&self) -> Option<&Item> {
        self.controller
            .store()
            .current_items()
            .get(self.cursor)
            .copied()
    }

    fn current_id(&self) -> Option<ItemId> {
        self.current_item()
            .and_then(|item| item.id(self.kind().id_key()))
    }

    fn sync_search(&mut self) {
        let term = self.search.value().to_string();
        self.controller.store_mut().set_search_term(term);
        self.cursor = 0;
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    LoginFinished(Result<(), ApiError>),
    DashboardLoaded(Result<Vec<Item>, ApiError>),
    Listed {
        handle: ControllerHandle,
        result: Result<Vec<Item>, ApiError>,
    },
    Mutated {
        handle: ControllerHandle,
        mutation: Mutation,
        result: Result<(), ApiError>,
    },
}

/// Terminal front end for the catalog admin client.
pub struct GamedbApp {
    api: ApiClient,
    session: SessionGuard,
    screen: Screen,
    login: LoginForm,
    dashboard: DashboardController<ResourceClient>,
    list: Option<ListScreen>,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    status: String,
    tone: Tone,
    theme: Theme,
    ticks: usize,
    should_quit: bool,
}

impl GamedbApp {
    pub fn new(api: ApiClient) -> Self {
        let session = api.session().clone();
        let screen = if session.is_authenticated() {
            Screen::Dashboard
        } else {
            Screen::Login
        };
        let dashboard =
            DashboardController::new(api.resource(ResourceKind::Games), session.clone());
        Self {
            api,
            session,
            screen,
            login: LoginForm::default(),
            dashboard,
            list: None,
            event_tx: None,
            status: "Ready".to_string(),
            tone: Tone::Info,
            theme: Theme::default(),
            ticks: 0,
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        if self.screen == Screen::Dashboard {
            self.set_status("Restored previous session", Tone::Info);
            self.start_dashboard_load();
        }

        let result = self.event_loop(&mut terminal, &mut event_rx).await;
        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        event_rx: &mut mpsc::Receiver<AppEvent>,
    ) -> Result<()> {
        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }
            let Some(event) = event_rx.recv().await else {
                break;
            };
            self.process_app_event(event);
        }
        Ok(())
    }

    fn process_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Input(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                self.handle_key(key)
            }
            AppEvent::Input(_) => {}
            AppEvent::Tick => self.ticks = self.ticks.wrapping_add(1),
            AppEvent::LoginFinished(result) => self.finish_login(result),
            AppEvent::DashboardLoaded(result) => self.finish_dashboard(result),
            AppEvent::Listed { handle, result } => self.finish_list(handle, result),
            AppEvent::Mutated {
                handle,
                mutation,
                result,
            } => self.finish_mutation(handle, mutation, result),
        }
    }

    fn spawn_request<F>(&self, request: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let Some(sender) = self.event_tx.clone() else {
            error!("event_channel_missing");
            return;
        };
        spawn(async move {
            let event = request.await;
            let _ = sender.send(event).await;
        });
    }

    fn set_status(&mut self, message: impl Into<String>, tone: Tone) {
        self.status = message.into();
        self.tone = tone;
    }

    fn show_notice(&mut self, notice: Notice) {
        let tone = match notice.level {
            NoticeLevel::Success => Tone::Success,
            NoticeLevel::Error => Tone::Error,
        };
        self.set_status(notice.message, tone);
    }

    fn to_login(&mut self, message: &str, tone: Tone) {
        self.list = None;
        self.screen = Screen::Login;
        self.login.password.clear();
        self.login.pending = false;
        self.login.focus = if self.login.username.value().is_empty() {
            LoginField::Username
        } else {
            LoginField::Password
        };
        self.set_status(message, tone);
    }

    fn logout(&mut self) {
        if let Err(err) = self.session.logout() {
            warn!(?err, "failed to clear stored session");
        }
        self.to_login("Logged out", Tone::Info);
    }

    fn submit_login(&mut self) {
        if self.login.pending {
            return;
        }
        let username = self.login.username.value().trim().to_string();
        let password = self.login.password.value().to_string();
        if username.is_empty() || password.is_empty() {
            self.login.error = Some("Username and password are required".to_string());
            return;
        }
        self.login.pending = true;
        self.login.error = None;
        info!(%username, "logging in");
        let auth = self.api.auth();
        let session = self.session.clone();
        self.spawn_request(async move {
            AppEvent::LoginFinished(session.login(&auth, &username, &password).await)
        });
    }

    fn finish_login(&mut self, result: Result<(), ApiError>) {
        self.login.pending = false;
        match result {
            Ok(()) => {
                self.login.password.clear();
                self.login.error = None;
                self.screen = Screen::Dashboard;
                self.set_status("Logged in", Tone::Success);
                self.start_dashboard_load();
            }
            Err(err) => {
                self.login.password.clear();
                self.login.focus = LoginField::Password;
                self.login.error = Some(err.to_string());
            }
        }
    }

    fn start_dashboard_load(&mut self) {
        self.dashboard.begin_load();
        let client = self.dashboard.api().clone();
        self.spawn_request(async move { AppEvent::DashboardLoaded(client.list().await) });
    }

    fn finish_dashboard(&mut self, result: Result<Vec<Item>, ApiError>) {
        self.dashboard.apply_list(result);
        if *self.dashboard.state() == DashboardState::LoggedOut {
            self.to_login("Session expired, please log in again", Tone::Error);
        }
    }

    fn open_list(&mut self, kind: ResourceKind) {
        info!(resource = kind.endpoint(), "opening resource");
        let controller = ListController::new(self.api.resource(kind), self.session.clone());
        self.list = Some(ListScreen::new(controller));
        self.screen = Screen::List(kind);
        self.set_status(format!("Loading {}", kind.endpoint()), Tone::Info);
        self.start_list_load();
    }

    fn close_list(&mut self) {
        self.list = None;
        self.screen = Screen::Dashboard;
        self.start_dashboard_load();
    }

    fn start_list_load(&mut self) {
        let Some(list) = self.list.as_mut() else {
            return;
        };
        if !list.controller.is_active() {
            return;
        }
        list.controller.begin_load();
        let handle = list.controller.handle();
        let client = list.controller.api().clone();
        self.spawn_request(async move {
            let result = client.list().await;
            AppEvent::Listed { handle, result }
        });
    }

    fn finish_list(&mut self, handle: ControllerHandle, result: Result<Vec<Item>, ApiError>) {
        if !handle.is_alive() {
            debug!(
                resource = handle.kind().endpoint(),
                "dropping response for closed screen"
            );
            return;
        }
        let Some(list) = self.list.as_mut() else {
            return;
        };
        list.controller.apply_list(result);
        list.clamp_cursor();
        let notice = list.controller.take_notice();
        let logged_out = *list.controller.state() == ListState::LoggedOut;
        let count = list.controller.store().len();
        let kind = list.kind();
        if let Some(notice) = notice {
            self.show_notice(notice);
        } else if self.tone == Tone::Info {
            self.set_status(format!("Loaded {count} {}", kind.endpoint()), Tone::Info);
        }
        if logged_out {
            self.to_login("Session expired, please log in again", Tone::Error);
        }
    }

    fn start_mutation(&mut self, request: MutationRequest) {
        let Some(list) = self.list.as_mut() else {
            return;
        };
        if !list.controller.is_active() || list.busy {
            return;
        }
        list.busy = true;
        let handle = list.controller.handle();
        let client = list.controller.api().clone();
        self.spawn_request(async move {
            let (mutation, result) = match request {
                MutationRequest::Create(item) => {
                    (Mutation::Create, client.create(&item).await.map(|_| ()))
                }
                MutationRequest::Update(id, item) => {
                    (Mutation::Update, client.update(&id, &item).await)
                }
                MutationRequest::Delete(id) => (Mutation::Delete, client.delete(&id).await),
            };
            AppEvent::Mutated {
                handle,
                mutation,
                result,
            }
        });
    }

    fn finish_mutation(
        &mut self,
        handle: ControllerHandle,
        mutation: Mutation,
        result: Result<(), ApiError>,
    ) {
        if !handle.is_alive() {
            debug!(
                resource = handle.kind().endpoint(),
                ?mutation,
                "dropping result for closed screen"
            );
            return;
        }
        let Some(list) = self.list.as_mut() else {
            return;
        };
        list.busy = false;
        let resync = list.controller.apply_mutation(mutation, result);
        if mutation != Mutation::Delete {
            if resync {
                list.form = None;
            } else if let (Some(form), Some(notice)) =
                (list.form.as_mut(), list.controller.notice())
            {
                form.set_error(notice.message.clone());
            }
        }
        let notice = list.controller.take_notice();
        let logged_out = *list.controller.state() == ListState::LoggedOut;
        if let Some(notice) = notice {
            self.show_notice(notice);
        }
        if logged_out {
            self.to_login("Session expired, please log in again", Tone::Error);
        } else if resync {
            self.start_list_load();
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match self.screen {
            Screen::Login => self.handle_login_key(key),
            Screen::Dashboard => self.handle_dashboard_key(key),
            Screen::List(_) => self.handle_list_key(key),
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.login.toggle_focus()
            }
            KeyCode::Enter => match self.login.focus {
                LoginField::Username => self.login.focus = LoginField::Password,
                LoginField::Password => self.submit_login(),
            },
            code => edit_input(self.login.focused(), code, key.modifiers),
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') => {
                self.set_status("Refreshing dashboard", Tone::Info);
                self.start_dashboard_load();
            }
            KeyCode::Char('L') => self.logout(),
            KeyCode::Char(ch @ '1'..='6') => {
                let idx = ch as usize - '1' as usize;
                self.open_list(ResourceKind::ALL[idx]);
            }
            _ => {}
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) {
        let Some(list) = self.list.as_mut() else {
            self.screen = Screen::Dashboard;
            return;
        };
        if list.form.is_some() {
            self.handle_form_key(key);
        } else if list.controller.pending_delete().is_some() {
            self.handle_confirm_key(key);
        } else if list.searching {
            match key.code {
                KeyCode::Esc => {
                    list.searching = false;
                    list.search.clear();
                    list.sync_search();
                }
                KeyCode::Enter => list.searching = false,
                code => {
                    edit_input(&mut list.search, code, key.modifiers);
                    list.sync_search();
                }
            }
        } else {
            self.handle_browse_key(key);
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent) {
        let Some(list) = self.list.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => self.close_list(),
            KeyCode::Char('L') => self.logout(),
            KeyCode::Char('/') => list.searching = true,
            KeyCode::Char('j') | KeyCode::Down => list.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => list.move_cursor(-1),
            KeyCode::Char('n') | KeyCode::Right => {
                if list.controller.store_mut().next_page() {
                    list.cursor = 0;
                }
            }
            KeyCode::Char('p') | KeyCode::Left => {
                if list.controller.store_mut().prev_page() {
                    list.cursor = 0;
                }
            }
            KeyCode::Char('r') => {
                self.set_status("Reloading", Tone::Info);
                self.start_list_load();
            }
            KeyCode::Char('a') => {
                if list.controller.state() == &ListState::Loaded {
                    list.form = Some(FormModal::create(list.kind()));
                }
            }
            KeyCode::Char('e') => {
                let Some(id) = list.current_id() else {
                    self.set_status("Nothing selected", Tone::Info);
                    return;
                };
                if list.controller.select_for_edit(&id) {
                    if let Some(item) = list.controller.selected() {
                        list.form = Some(FormModal::edit(list.kind(), item));
                    }
                }
            }
            KeyCode::Char('d') => {
                let Some(id) = list.current_id() else {
                    self.set_status("Nothing selected", Tone::Info);
                    return;
                };
                list.controller.request_delete(&id);
            }
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let Some(list) = self.list.as_mut() else {
            return;
        };
        let Some(form) = list.form.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                list.form = None;
                list.controller.cancel_edit();
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.prev_field(),
            KeyCode::Enter => {
                if list.busy {
                    return;
                }
                let Ok(item) = form.submit() else {
                    return;
                };
                let request = if *form.mode() == FormMode::Create {
                    MutationRequest::Create(item)
                } else if let Some((id, payload)) = list.controller.edit_target(&item) {
                    MutationRequest::Update(id, payload)
                } else {
                    form.set_error("Item is no longer available");
                    return;
                };
                self.start_mutation(request);
            }
            code => edit_input(form.focused(), code, key.modifiers),
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let Some(list) = self.list.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                if let Some(id) = list.controller.take_pending_delete() {
                    self.start_mutation(MutationRequest::Delete(id));
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                list.controller.cancel_delete();
                self.set_status("Delete cancelled", Tone::Info);
            }
            _ => {}
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        match self.screen {
            Screen::Login => self.draw_login(frame),
            Screen::Dashboard => self.draw_dashboard(frame),
            Screen::List(_) => self.draw_list(frame),
        }
    }

    fn spinner(&self) -> &'static str {
        SPINNER[self.ticks % SPINNER.len()]
    }

    fn draw_login(&self, frame: &mut Frame) {
        let area = centered_rect(50, 10, frame.size());
        frame.render_widget(Clear, area);

        let label_style = |field| {
            if self.login.focus == field {
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.primary_fg)
            }
        };
        let masked = "*".repeat(self.login.password.value().chars().count());
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Username: ", label_style(LoginField::Username)),
                Span::raw(self.login.username.value().to_string()),
            ]),
            Line::from(vec![
                Span::styled("Password: ", label_style(LoginField::Password)),
                Span::raw(masked),
            ]),
            Line::from(""),
        ];
        if self.login.pending {
            lines.push(Line::from(format!("Logging in {}", self.spinner())));
        } else if let Some(err) = &self.login.error {
            lines.push(Line::from(Span::styled(
                err.clone(),
                Style::default().fg(self.theme.danger),
            )));
        } else if self.tone == Tone::Error {
            lines.push(Line::from(Span::styled(
                self.status.clone(),
                Style::default().fg(self.theme.warning),
            )));
        } else {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(""));
        lines.push(key_hints(&[("Enter", "log in"), ("Tab", "switch"), ("Esc", "quit")]));

        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Game Catalog Admin - Login"),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);

        let (row, input) = match self.login.focus {
            LoginField::Username => (0, &self.login.username),
            LoginField::Password => (1, &self.login.password),
        };
        let cursor_x = (area.x + 1 + 10 + input.cursor() as u16)
            .min(area.x + area.width.saturating_sub(2));
        frame.set_cursor(cursor_x, area.y + 1 + row);
    }

    fn draw_dashboard(&self, frame: &mut Frame) {
        let area = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(3),
            ])
            .split(area);

        let total = self
            .dashboard
            .summary()
            .map(|summary| summary.total_games.to_string())
            .unwrap_or_else(|| "-".to_string());
        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                "Dashboard",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("   Total games: {total}")),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chunks[0]);

        match self.dashboard.state() {
            DashboardState::Ready(summary) => self.render_summary(frame, chunks[1], summary),
            DashboardState::Error(message) => {
                let paragraph = Paragraph::new(vec![
                    Line::from(Span::styled(
                        message.clone(),
                        Style::default().fg(self.theme.danger),
                    )),
                    Line::from("Press r to retry"),
                ])
                .block(Block::default().borders(Borders::ALL))
                .wrap(Wrap { trim: true });
                frame.render_widget(paragraph, chunks[1]);
            }
            DashboardState::Idle | DashboardState::Loading | DashboardState::LoggedOut => {
                let paragraph = Paragraph::new(format!("Loading games {}", self.spinner()))
                    .block(Block::default().borders(Borders::ALL))
                    .alignment(Alignment::Center);
                frame.render_widget(paragraph, chunks[1]);
            }
        }

        let mut menu = ResourceKind::ALL
            .iter()
            .enumerate()
            .flat_map(|(idx, kind)| {
                [
                    Span::styled(
                        format!("{}", idx + 1),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!(" {}  ", kind.title())),
                ]
            })
            .collect::<Vec<_>>();
        menu.extend(key_hints(&[("r", "refresh"), ("L", "logout"), ("q", "quit")]).spans);
        self.render_status(frame, chunks[2], Line::from(menu));
    }

    fn render_summary(&self, frame: &mut Frame, area: Rect, summary: &DashboardSummary) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);

        let chart_block = Block::default()
            .borders(Borders::ALL)
            .title("Games per release year");
        if summary.by_year.is_empty() {
            frame.render_widget(
                Paragraph::new("No release data").block(chart_block),
                columns[0],
            );
        } else {
            let labels = summary
                .by_year
                .iter()
                .map(|(year, count)| (year.to_string(), count))
                .collect::<Vec<_>>();
            let data = labels
                .iter()
                .map(|(label, count)| (label.as_str(), *count))
                .collect::<Vec<_>>();
            let chart = BarChart::default()
                .block(chart_block)
                .data(data.as_slice())
                .bar_width(5)
                .bar_gap(1)
                .bar_style(Style::default().fg(self.theme.accent))
                .value_style(
                    Style::default()
                        .fg(Color::Black)
                        .bg(self.theme.accent)
                        .add_modifier(Modifier::BOLD),
                );
            frame.render_widget(chart, columns[0]);
        }

        let items = if summary.top_games.is_empty() {
            vec![ListItem::new("No rated games")]
        } else {
            summary
                .top_games
                .iter()
                .enumerate()
                .map(|(rank, game)| {
                    ListItem::new(Line::from(vec![
                        Span::styled(
                            format!("{}. ", rank + 1),
                            Style::default().fg(self.theme.muted),
                        ),
                        Span::raw(game.name.clone()),
                        Span::styled(
                            format!("  {}", game.score),
                            Style::default().fg(self.theme.success),
                        ),
                    ]))
                })
                .collect()
        };
        let top = List::new(items).block(Block::default().borders(Borders::ALL).title("Top rated"));
        frame.render_widget(top, columns[1]);
    }

    fn draw_list(&self, frame: &mut Frame) {
        let Some(list) = self.list.as_ref() else {
            return;
        };
        let area = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(1),
                Constraint::Length(3),
            ])
            .split(area);

        let kind = list.kind();
        let store = list.controller.store();
        let search_line = if list.searching {
            Span::styled(
                format!("Search: {}", list.search.value()),
                Style::default().fg(self.theme.accent),
            )
        } else if store.search_term().is_empty() {
            Span::styled("Press / to search", Style::default().fg(self.theme.muted))
        } else {
            Span::raw(format!("Search: {}", store.search_term()))
        };
        let counts = format!(" ({} of {})   ", store.filtered().len(), store.len());
        let offset = kind.title().len() + counts.len() + "Search: ".len();
        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                kind.title(),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(counts),
            search_line,
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chunks[0]);
        if list.searching {
            frame.set_cursor(
                (chunks[0].x + 1 + (offset + list.search.cursor()) as u16)
                    .min(chunks[0].x + chunks[0].width.saturating_sub(2)),
                chunks[0].y + 1,
            );
        }

        match list.controller.state() {
            ListState::Loaded => self.render_table(frame, chunks[1], list),
            ListState::Error(message) => {
                let paragraph = Paragraph::new(vec![
                    Line::from(Span::styled(
                        message.clone(),
                        Style::default().fg(self.theme.danger),
                    )),
                    Line::from("Press r to retry"),
                ])
                .block(Block::default().borders(Borders::ALL))
                .wrap(Wrap { trim: true });
                frame.render_widget(paragraph, chunks[1]);
            }
            ListState::Idle | ListState::Loading | ListState::LoggedOut => {
                let paragraph = Paragraph::new(format!(
                    "Loading {} {}",
                    kind.endpoint(),
                    self.spinner()
                ))
                .block(Block::default().borders(Borders::ALL))
                .alignment(Alignment::Center);
                frame.render_widget(paragraph, chunks[1]);
            }
        }

        frame.render_widget(self.pager(list), chunks[2]);
        let hints = key_hints(&[
            ("/", "search"),
            ("n/p", "page"),
            ("a", "add"),
            ("e", "edit"),
            ("d", "delete"),
            ("r", "reload"),
            ("Esc", "back"),
            ("L", "logout"),
        ]);
        self.render_status(frame, chunks[3], hints);

        if let Some(form) = &list.form {
            self.render_form(frame, form, list.busy);
        } else if let Some(id) = list.controller.pending_delete() {
            self.render_confirm(frame, list, id);
        }
    }

    fn render_table(&self, frame: &mut Frame, area: Rect, list: &ListScreen) {
        let kind = list.kind();
        let items = list.controller.store().current_items();
        let block = Block::default().borders(Borders::ALL);
        if items.is_empty() {
            let message = if list.controller.store().search_term().is_empty() {
                format!("No {} yet. Press a to add one.", kind.endpoint())
            } else {
                format!("No {} match the search", kind.endpoint())
            };
            frame.render_widget(
                Paragraph::new(message)
                    .block(block)
                    .alignment(Alignment::Center),
                area,
            );
            return;
        }

        let fields = kind.edit_fields();
        let header = Row::new(
            iter::once("ID")
                .chain(fields.iter().map(|field| field.label))
                .map(|label| Cell::from(label).style(Style::default().add_modifier(Modifier::BOLD))),
        );
        let rows = items.iter().map(|item| {
            Row::new(
                iter::once(kind.id_key())
                    .chain(fields.iter().map(|field| field.name))
                    .map(|name| Cell::from(item.text(name))),
            )
        });
        let share = (100 / fields.len().max(1)) as u16;
        let widths = iter::once(Constraint::Length(6))
            .chain(fields.iter().map(|_| Constraint::Percentage(share)))
            .collect::<Vec<_>>();
        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(self.theme.selection_bg)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");

        let mut state = TableState::default();
        state.select(Some(cmp::min(list.cursor, items.len() - 1)));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn pager(&self, list: &ListScreen) -> Paragraph<'static> {
        let store = list.controller.store();
        let current = store.current_page();
        let mut spans = vec![Span::raw(format!(
            " Page {current}/{}  ",
            store.page_count()
        ))];
        for page in store.page_window() {
            let style = if page == current {
                Style::default()
                    .fg(Color::Black)
                    .bg(self.theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.muted)
            };
            spans.push(Span::styled(format!(" {page} "), style));
        }
        Paragraph::new(Line::from(spans))
    }

    fn render_form(&self, frame: &mut Frame, form: &FormModal, busy: bool) {
        let label_width = form
            .rows()
            .map(|(field, _, _)| field.label.chars().count())
            .max()
            .unwrap_or(0);
        let height = (form.field_count() as u16 + 5).min(frame.size().height);
        let area = centered_rect(64, height, frame.size());
        frame.render_widget(Clear, area);

        let mut lines = form
            .rows()
            .map(|(field, shown, focused)| {
                let marker = if focused { "▶" } else { " " };
                let style = if focused {
                    Style::default().fg(self.theme.accent)
                } else {
                    Style::default().fg(self.theme.primary_fg)
                };
                Line::from(vec![
                    Span::styled(format!("{marker} {:<label_width$} : ", field.label), style),
                    Span::raw(shown),
                ])
            })
            .collect::<Vec<_>>();
        lines.push(Line::from(""));
        if busy {
            lines.push(Line::from(format!("Saving {}", self.spinner())));
        } else if let Some(err) = form.error() {
            lines.push(Line::from(Span::styled(
                err.to_string(),
                Style::default().fg(self.theme.danger),
            )));
        } else {
            lines.push(key_hints(&[("Enter", "save"), ("Tab", "next field"), ("Esc", "cancel")]));
        }

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(form.title()));
        frame.render_widget(paragraph, area);

        let cursor_x = (area.x + 1 + (label_width + 5 + form.focused_cursor()) as u16)
            .min(area.x + area.width.saturating_sub(2));
        frame.set_cursor(cursor_x, area.y + 1 + form.focus() as u16);
    }

    fn render_confirm(&self, frame: &mut Frame, list: &ListScreen, id: &ItemId) {
        let kind = list.kind();
        let name = list
            .controller
            .store()
            .get(id)
            .map(|item| item.text(kind.display_field()))
            .unwrap_or_else(|| id.to_string());
        let area = centered_rect(50, 6, frame.size());
        frame.render_widget(Clear, area);
        let paragraph = Paragraph::new(vec![
            Line::from(format!("Delete {} \"{name}\"?", kind.singular())),
            Line::from(""),
            key_hints(&[("y", "delete"), ("n", "cancel")]),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm")
                .border_style(Style::default().fg(self.theme.warning)),
        )
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect, hints: Line<'static>) {
        let color = match self.tone {
            Tone::Info => self.theme.primary_fg,
            Tone::Success => self.theme.success,
            Tone::Error => self.theme.danger,
        };
        let paragraph = Paragraph::new(vec![
            Line::from(Span::styled(self.status.clone(), Style::default().fg(color))),
            hints,
        ])
        .block(Block::default().borders(Borders::TOP))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn edit_input(input: &mut TextInput, code: KeyCode, modifiers: KeyModifiers) {
    match code {
        KeyCode::Left => input.move_cursor(-1),
        KeyCode::Right => input.move_cursor(1),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Char(ch) if modifiers.is_empty() || modifiers == KeyModifiers::SHIFT => {
            input.insert(ch)
        }
        _ => {}
    }
}

fn key_hints(pairs: &[(&'static str, &'static str)]) -> Line<'static> {
    let spans = pairs
        .iter()
        .flat_map(|(key, action)| {
            [
                Span::styled(*key, Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!(" {action}  ")),
            ]
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_fits_inside_area() {
        let area = Rect::new(0, 0, 40, 10);
        assert_eq!(centered_rect(20, 4, area), Rect::new(10, 3, 20, 4));
        assert_eq!(centered_rect(80, 20, area), area);
    }

    #[test]
    fn edit_input_ignores_control_chords() {
        let mut input = TextInput::default();
        edit_input(&mut input, KeyCode::Char('a'), KeyModifiers::NONE);
        edit_input(&mut input, KeyCode::Char('B'), KeyModifiers::SHIFT);
        edit_input(&mut input, KeyCode::Char('x'), KeyModifiers::CONTROL);
        assert_eq!(input.value(), "aB");
        edit_input(&mut input, KeyCode::Backspace, KeyModifiers::NONE);
        assert_eq!(input.value(), "a");
    }
}
