use crate::calendar::summary::{polar_to_cartesian, ArcSlice};
use crate::calendar::{
    layout_cell, occupancy_span, priority_color, summarize, CalendarCell, CellLayout,
    Granularity, NavigationState, Rgb, Step, SystemClock, TimelineBar,
};
use crate::config::{CalendarConfig, PieGeometry, Preferences};
use crate::model::{format_date, Task, TaskForm, TaskId};
use crate::refresh;
use crate::service::TaskService;
use anyhow::Result;
use chrono::{Datelike, Local};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Circle, Points};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::cmp::Reverse;
use std::io::{stdout, Stdout};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

type SavePreferences = Box<dyn FnMut(&Preferences) -> Result<()>>;

const COMPLETED_COLOR: Color = Color::Rgb(0x10, 0xb9, 0x81);
const PENDING_COLOR: Color = Color::Rgb(0x3b, 0x82, 0xf6);

pub fn run<S: TaskService>(
    service: S,
    source: String,
    prefs: Preferences,
    save_prefs: impl FnMut(&Preferences) -> Result<()> + 'static,
) -> Result<()> {
    let mut app = App::new(service, source, prefs, Box::new(save_prefs))?;
    let interval = Duration::from_secs(app.prefs.refresh_secs.max(1));
    let (ticker, ticks) = refresh::spawn(interval);
    let mut terminal = setup_terminal()?;
    let result = app.event_loop(&mut terminal, &ticks);
    teardown_terminal(&mut terminal)?;
    ticker.stop();
    result
}

struct App<S: TaskService> {
    service: S,
    source: String,
    tasks: Vec<Task>,
    prefs: Preferences,
    save_prefs: SavePreferences,
    nav: NavigationState,
    clock: SystemClock,
    view: ViewMode,
    list_selected: usize,
    list_offset: usize,
    detail_focus: bool,
    detail_selected: usize,
    last_sync: Instant,
    status: String,
    mode: Mode,
}

enum Mode {
    Normal,
    Creating(TaskFormState),
    Editing { task_id: TaskId, form: TaskFormState },
    ConfirmDelete { task_id: TaskId },
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum ViewMode {
    List,
    Calendar,
    Stats,
}

impl ViewMode {
    fn label(&self) -> &'static str {
        match self {
            ViewMode::List => "List",
            ViewMode::Calendar => "Calendar",
            ViewMode::Stats => "Stats",
        }
    }
}

#[derive(Copy, Clone)]
struct Palette {
    background: Rgb,
    text: Color,
    muted: Color,
    accent: Color,
    border: Color,
    highlight: Color,
}

impl Palette {
    fn for_mode(dark: bool) -> Self {
        if dark {
            Palette {
                background: Rgb(16, 18, 24),
                text: Color::White,
                muted: Color::DarkGray,
                accent: Color::Cyan,
                border: Color::DarkGray,
                highlight: Color::LightYellow,
            }
        } else {
            Palette {
                background: Rgb(255, 255, 255),
                text: Color::Black,
                muted: Color::Gray,
                accent: Color::Blue,
                border: Color::Gray,
                highlight: Color::Magenta,
            }
        }
    }

    fn background(&self) -> Color {
        rgb(self.background)
    }
}

const FORM_LABELS: [&str; 7] = [
    "Title",
    "Priority (1-5)",
    "Deadline (YYYY-MM-DD)",
    "Hours",
    "Minutes",
    "Start (YYYY-MM-DD, optional)",
    "Category (optional)",
];

struct TaskFormState {
    fields: [FieldValue; 7],
    active: usize,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_grapheme(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_grapheme(self.cursor, &self.value);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_grapheme(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl<S: TaskService> App<S> {
    fn new(
        mut service: S,
        source: String,
        prefs: Preferences,
        save_prefs: SavePreferences,
    ) -> Result<Self> {
        let tasks = service.list_tasks()?;
        let nav = NavigationState::new(Local::now().date_naive(), prefs.granularity);
        let status = format!("Loaded {} tasks from {}", tasks.len(), source);
        Ok(App {
            service,
            source,
            tasks,
            prefs,
            save_prefs,
            nav,
            clock: SystemClock,
            view: ViewMode::List,
            list_selected: 0,
            list_offset: 0,
            detail_focus: false,
            detail_selected: 0,
            last_sync: Instant::now(),
            status,
            mode: Mode::Normal,
        })
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        ticks: &Receiver<()>,
    ) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            // Skip background reloads while a dialog is open.
            if ticks.try_iter().count() > 0 && matches!(self.mode, Mode::Normal) {
                self.reload(false);
            }
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key)? {
                        tracing::debug!("quit requested");
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Creating(_) | Mode::Editing { .. } => self.handle_form_key(key),
            Mode::ConfirmDelete { .. } => self.handle_confirm_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('1') => self.set_view(ViewMode::List),
            KeyCode::Char('2') => self.set_view(ViewMode::Calendar),
            KeyCode::Char('3') => self.set_view(ViewMode::Stats),
            KeyCode::Char('n') => {
                let mut form = TaskForm::blank();
                if self.view == ViewMode::Calendar {
                    if let Some(date) = self.nav.selected_date() {
                        form.deadline = format_date(date);
                    }
                }
                self.mode = Mode::Creating(TaskFormState::from_form(form));
                self.status = "Creating new task (Tab/Shift-Tab move, Enter save, Esc cancel)".into();
            }
            KeyCode::Char('e') => match self.current_task() {
                Some(task) => {
                    let task_id = task.id;
                    let form = TaskFormState::from_form(TaskForm::from_task(task));
                    self.mode = Mode::Editing { task_id, form };
                    self.status = format!("Editing task {}", task_id);
                }
                None => self.status = self.nothing_selected(),
            },
            KeyCode::Char('d') => match self.current_task() {
                Some(task) => {
                    let task_id = task.id;
                    self.mode = Mode::ConfirmDelete { task_id };
                    self.status = format!("Delete task {}? (y to confirm, n/Esc to cancel)", task_id);
                }
                None => self.status = self.nothing_selected(),
            },
            KeyCode::Char('x') => match self.current_task() {
                Some(task) => {
                    let (id, completed) = (task.id, !task.completed);
                    self.apply("update completion", |service| {
                        service.set_completion(id, completed)?;
                        Ok(if completed {
                            format!("Completed task {}", id)
                        } else {
                            format!("Task {} is pending again", id)
                        })
                    });
                }
                None => self.status = self.nothing_selected(),
            },
            KeyCode::Char('o') => self.optimize(),
            KeyCode::Char('t') => {
                self.prefs.dark_mode = !self.prefs.dark_mode;
                self.save_preferences(if self.prefs.dark_mode {
                    "Dark theme"
                } else {
                    "Light theme"
                });
            }
            KeyCode::Char('r') => self.reload(true),
            _ => match self.view {
                ViewMode::List => self.handle_list_key(key),
                ViewMode::Calendar => self.handle_calendar_key(key),
                ViewMode::Stats => {}
            },
        }
        Ok(false)
    }

    fn handle_list_key(&mut self, key: KeyEvent) {
        let len = self.tasks.len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.list_selected = self.list_selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.list_selected + 1 < len {
                    self.list_selected += 1;
                }
            }
            KeyCode::Home | KeyCode::Char('g') => self.list_selected = 0,
            KeyCode::End | KeyCode::Char('G') => self.list_selected = len.saturating_sub(1),
            _ => {}
        }
    }

    fn handle_calendar_key(&mut self, key: KeyEvent) {
        if self.detail_focus {
            let len = self.nav.selected_tasks(&self.tasks).len();
            match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.detail_selected = self.detail_selected.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if self.detail_selected + 1 < len {
                        self.detail_selected += 1;
                    }
                }
                KeyCode::Tab | KeyCode::Esc => {
                    self.detail_focus = false;
                    self.status = "Calendar focused".into();
                }
                _ => {}
            }
            return;
        }

        let vertical = if self.nav.granularity() == Granularity::Day {
            1
        } else {
            7
        };
        match key.code {
            KeyCode::Char('[') => self.nav.step(Step::Prev),
            KeyCode::Char(']') => self.nav.step(Step::Next),
            KeyCode::Char('.') => {
                self.nav.jump_to_today(&self.clock);
                self.status = format!("Jumped to {}", self.nav.period_title());
            }
            KeyCode::Char('g') => {
                let next = self.nav.granularity().next();
                self.nav.set_granularity(next);
                self.prefs.granularity = next;
                self.save_preferences(&format!("{} view", next.label()));
            }
            KeyCode::Left | KeyCode::Char('h') => self.move_selection(-1),
            KeyCode::Right | KeyCode::Char('l') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-vertical),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(vertical),
            KeyCode::Esc => {
                self.nav.clear_selection();
                self.status = "Selection cleared".into();
            }
            KeyCode::Tab => {
                if self.nav.selected_date().is_some() {
                    self.detail_focus = true;
                    self.detail_selected = 0;
                    self.status = "Day panel focused (↑↓ browse, Tab back)".into();
                } else {
                    self.status = "Select a day first".into();
                }
            }
            _ => {}
        }
    }

    fn move_selection(&mut self, days: i64) {
        self.nav.move_selection(days);
        self.detail_selected = 0;
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<bool> {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let close_form = match &mut mode {
            Mode::Creating(form) => self.process_form_key(None, form, key),
            Mode::Editing { task_id, form } => {
                let id = *task_id;
                self.process_form_key(Some(id), form, key)
            }
            Mode::ConfirmDelete { .. } | Mode::Normal => true,
        };
        if !close_form {
            self.mode = mode;
        }
        Ok(false)
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<bool> {
        let task_id = match &self.mode {
            Mode::ConfirmDelete { task_id } => *task_id,
            _ => return Ok(false),
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.apply("delete task", |service| {
                    service.delete_task(task_id)?;
                    Ok(format!("Deleted task {}", task_id))
                });
                self.mode = Mode::Normal;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Delete canceled".into();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
        Ok(false)
    }

    fn set_view(&mut self, view: ViewMode) {
        if self.view != view {
            self.view = view;
            self.detail_focus = false;
            self.status = format!("Switched to {} view", view.label());
        }
    }

    fn process_form_key(
        &mut self,
        target: Option<TaskId>,
        form: &mut TaskFormState,
        key: KeyEvent,
    ) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                return true;
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.prev_field(),
            KeyCode::Left => form.active_field_mut().move_left(),
            KeyCode::Right => form.active_field_mut().move_right(),
            KeyCode::Enter => return self.submit_form(target, form),
            KeyCode::Backspace => form.active_field_mut().backspace(),
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    form.active_field_mut().insert_char(c);
                }
            }
            _ => {}
        }
        false
    }

    fn submit_form(&mut self, target: Option<TaskId>, form: &TaskFormState) -> bool {
        let draft = match form.to_form().validate() {
            Ok(draft) => draft,
            Err(err) => {
                self.status = format!("Invalid task: {}", err);
                return false;
            }
        };
        match target {
            None => self.apply("create task", |service| {
                let task = service.create_task(draft)?;
                Ok(format!("Created task {}", task.id))
            }),
            Some(id) => {
                let Some(mut task) = self.tasks.iter().find(|t| t.id == id).cloned() else {
                    self.status = format!("Task {} no longer exists", id);
                    return true;
                };
                task.apply(draft);
                self.apply("update task", move |service| {
                    service.update_task(task)?;
                    Ok(format!("Updated task {}", id))
                })
            }
        }
    }

    /// Runs a mutation, then refreshes the snapshot. On failure the previous
    /// snapshot stays on screen and the error goes to the status line.
    fn apply(&mut self, action: &str, op: impl FnOnce(&mut S) -> Result<String>) -> bool {
        match op(&mut self.service) {
            Ok(message) => {
                self.status = message;
                self.reload(false);
                true
            }
            Err(err) => {
                tracing::warn!(action, error = %err, "task operation failed");
                self.status = format!("Could not {}: {:#}", action, err);
                false
            }
        }
    }

    fn optimize(&mut self) {
        match self.service.optimize_schedule() {
            Ok(tasks) => {
                let scheduled = tasks
                    .iter()
                    .filter(|t| !t.completed && !t.locked)
                    .count();
                self.tasks = tasks;
                self.last_sync = Instant::now();
                self.clamp_selection();
                self.status = format!("Scheduled {} open tasks", scheduled);
            }
            Err(err) => {
                tracing::warn!(error = %err, "optimize failed");
                self.status = format!("Could not optimize schedule: {:#}", err);
            }
        }
    }

    fn reload(&mut self, announce: bool) {
        match self.service.list_tasks() {
            Ok(tasks) => {
                self.tasks = tasks;
                self.last_sync = Instant::now();
                self.clamp_selection();
                if announce {
                    self.status = format!("Reloaded {} tasks", self.tasks.len());
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "refresh failed");
                self.status = format!("Could not refresh tasks: {:#}", err);
            }
        }
    }

    fn save_preferences(&mut self, message: &str) {
        match (self.save_prefs)(&self.prefs) {
            Ok(()) => self.status = message.to_string(),
            Err(err) => {
                tracing::warn!(error = %err, "saving preferences failed");
                self.status = format!("{} (not saved: {:#})", message, err);
            }
        }
    }

    fn clamp_selection(&mut self) {
        self.list_selected = self.list_selected.min(self.tasks.len().saturating_sub(1));
        let day_tasks = self.nav.selected_tasks(&self.tasks).len();
        self.detail_selected = self.detail_selected.min(day_tasks.saturating_sub(1));
        if day_tasks == 0 {
            self.detail_focus = false;
        }
    }

    /// Pending tasks first, each group by deadline then priority.
    fn list_order(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().collect();
        tasks.sort_by_key(|t| (t.completed, t.deadline, Reverse(t.priority), t.id));
        tasks
    }

    fn current_task(&self) -> Option<&Task> {
        match self.view {
            ViewMode::List => self.list_order().get(self.list_selected).copied(),
            ViewMode::Calendar if self.detail_focus => self
                .nav
                .selected_tasks(&self.tasks)
                .get(self.detail_selected)
                .copied(),
            _ => None,
        }
    }

    fn nothing_selected(&self) -> String {
        match self.view {
            ViewMode::Calendar => "Pick a day and press Tab to choose a task".into(),
            _ => "No task selected".into(),
        }
    }

    fn palette(&self) -> Palette {
        Palette::for_mode(self.prefs.dark_mode)
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let palette = self.palette();
        f.render_widget(
            Block::default().style(Style::default().bg(palette.background()).fg(palette.text)),
            f.size(),
        );
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        match self.view {
            ViewMode::List => self.draw_list(f, layout[1]),
            ViewMode::Calendar => self.draw_calendar(f, layout[1]),
            ViewMode::Stats => self.draw_stats(f, layout[1]),
        }
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::Creating(form) => self.draw_form(f, "New Task", form),
            Mode::Editing { form, .. } => self.draw_form(f, "Edit Task", form),
            Mode::ConfirmDelete { task_id } => self.draw_confirm(f, *task_id),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let palette = self.palette();
        let title = Line::from(vec![
            Span::styled(
                "taskgrid ",
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(self.source.clone(), Style::default().fg(palette.muted)),
            Span::raw("  •  "),
            Span::styled(
                format!("synced {}", format_elapsed(self.last_sync)),
                Style::default().fg(palette.muted),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("view {}", self.view.label().to_lowercase()),
                Style::default().fg(Color::Magenta),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(palette.border));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_list(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let palette = self.palette();
        let pending = self.tasks.iter().filter(|t| !t.completed).count();
        let title = format!(
            "Tasks ({} pending, {} done)",
            pending,
            self.tasks.len() - pending
        );
        let block = Block::default()
            .title(Span::styled(
                title,
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.border));

        if self.tasks.is_empty() {
            let msg = Paragraph::new("No tasks yet. Press n to add one.")
                .alignment(Alignment::Center)
                .style(Style::default().fg(palette.muted))
                .block(block);
            f.render_widget(msg, area);
            return;
        }

        let items: Vec<ListItem<'static>> = self
            .list_order()
            .into_iter()
            .map(|task| task_item(task, &palette))
            .collect();
        let viewport = area.height.saturating_sub(2) as usize;
        self.list_offset = adjust_offset(self.list_selected, self.list_offset, viewport, 1, items.len());
        let mut state = ListState::default();
        state.select(Some(self.list_selected));
        *state.offset_mut() = self.list_offset;
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(palette.accent)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_calendar(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(72), Constraint::Percentage(28)])
            .split(area);
        self.draw_grid(f, columns[0]);
        self.draw_day_panel(f, columns[1]);
    }

    fn draw_grid(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let palette = self.palette();
        let granularity = self.nav.granularity();
        let block = Block::default()
            .title(Span::styled(
                format!("{}  [{}]", self.nav.period_title(), granularity.label()),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if self.detail_focus {
                palette.border
            } else {
                palette.accent
            }));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let cells = self.nav.grid(&self.tasks, &self.clock);
        if cells.is_empty() {
            return;
        }
        let columns = cells.len().min(7);
        let rows = cells.len().div_ceil(columns);
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(u16::from(granularity == Granularity::Month)),
                Constraint::Min(0),
            ])
            .split(inner);

        if granularity == Granularity::Month {
            let header_cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, 7); 7])
                .split(sections[0]);
            for (name, col) in ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]
                .iter()
                .zip(header_cols.iter())
            {
                f.render_widget(
                    Paragraph::new(*name)
                        .alignment(Alignment::Center)
                        .style(Style::default().fg(palette.muted)),
                    *col,
                );
            }
        }

        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
            .split(sections[1]);
        for (row_area, week) in row_areas.iter().zip(cells.chunks(columns)) {
            let col_areas = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, columns as u32); columns])
                .split(*row_area);
            for (cell_area, cell) in col_areas.iter().zip(week) {
                self.draw_cell(f, cell, *cell_area);
            }
        }
    }

    fn draw_cell(&self, f: &mut ratatui::Frame<'_>, cell: &CalendarCell<'_>, area: Rect) {
        let palette = self.palette();
        let granularity = self.nav.granularity();
        let mut title_style = Style::default().fg(palette.text);
        let mut border_style = Style::default().fg(palette.border);
        if !cell.in_focused_period {
            title_style = Style::default()
                .fg(palette.muted)
                .add_modifier(Modifier::DIM);
        }
        if cell.is_today {
            title_style = Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD);
            border_style = Style::default().fg(palette.accent);
        }
        if self.nav.selected_date() == Some(cell.date) {
            border_style = Style::default()
                .fg(palette.highlight)
                .add_modifier(Modifier::BOLD);
        }
        let title = match granularity {
            Granularity::Month => cell.date.day().to_string(),
            _ => cell.date.format("%a %-d").to_string(),
        };
        let block = Block::default()
            .title(Span::styled(title, title_style))
            .borders(Borders::ALL)
            .border_style(border_style);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let layout = layout_cell(cell, &self.prefs.calendar);
        let lines = cell_lines(
            &layout,
            &self.prefs.calendar,
            inner.width as usize,
            granularity != Granularity::Month,
            palette,
        );
        f.render_widget(Paragraph::new(lines), inner);
    }

    fn draw_day_panel(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let palette = self.palette();
        let focused = self.detail_focus;
        let block = Block::default()
            .title(Span::styled(
                "Selected day",
                Style::default()
                    .fg(if focused { palette.accent } else { palette.muted })
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused {
                palette.accent
            } else {
                palette.border
            }));

        let Some(date) = self.nav.selected_date() else {
            let hint = Paragraph::new("Move with ←↑↓→ / h j k l to pick a day")
                .wrap(Wrap { trim: true })
                .style(Style::default().fg(palette.muted))
                .block(block);
            f.render_widget(hint, area);
            return;
        };

        let inner = block.inner(area);
        f.render_widget(block, area);
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(0)])
            .split(inner);
        f.render_widget(
            Paragraph::new(Span::styled(
                date.format("%A, %B %-d, %Y").to_string(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )),
            sections[0],
        );

        let tasks = self.nav.selected_tasks(&self.tasks);
        if tasks.is_empty() {
            f.render_widget(
                Paragraph::new("Nothing scheduled").style(Style::default().fg(palette.muted)),
                sections[1],
            );
            return;
        }
        let items: Vec<ListItem<'static>> = tasks.iter().map(|t| task_item(t, &palette)).collect();
        let mut state = ListState::default();
        if focused {
            state.select(Some(self.detail_selected));
        }
        let list = List::new(items).highlight_style(
            Style::default()
                .bg(palette.accent)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, sections[1], &mut state);
    }

    fn draw_stats(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let palette = self.palette();
        let pie = &self.prefs.calendar.pie;
        let summary = summarize(&self.tasks, pie);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(columns[0]);

        let counts = vec![
            Line::from(vec![
                Span::styled("Total      ", Style::default().fg(palette.muted)),
                Span::styled(
                    summary.total.to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![
                Span::styled("Completed  ", Style::default().fg(COMPLETED_COLOR)),
                Span::raw(format!(
                    "{} ({:.0}%)",
                    summary.completed_count, summary.completed_percent
                )),
            ]),
            Line::from(vec![
                Span::styled("Pending    ", Style::default().fg(PENDING_COLOR)),
                Span::raw(format!(
                    "{} ({:.0}%)",
                    summary.pending_count, summary.pending_percent
                )),
            ]),
        ];
        f.render_widget(
            Paragraph::new(counts).block(
                Block::default()
                    .title("Summary")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.border)),
            ),
            left[0],
        );

        let gauge = Gauge::default()
            .block(
                Block::default()
                    .title("Completion")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.border)),
            )
            .gauge_style(Style::default().fg(COMPLETED_COLOR).bg(PENDING_COLOR))
            .ratio((summary.completed_percent / 100.0).clamp(0.0, 1.0))
            .label(format!("{:.0}%", summary.completed_percent));
        f.render_widget(gauge, left[1]);

        let completed = summary
            .completed_arc
            .as_ref()
            .map(|slice| slice_points(pie, slice))
            .unwrap_or_default();
        let pending = summary
            .pending_arc
            .as_ref()
            .map(|slice| slice_points(pie, slice))
            .unwrap_or_default();
        let empty = summary.is_empty();
        let canvas = Canvas::default()
            .block(
                Block::default()
                    .title(if empty { "No tasks yet" } else { "Completed vs pending" })
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.border)),
            )
            .marker(Marker::Braille)
            .background_color(palette.background())
            .x_bounds([0.0, pie.center_x * 2.0])
            .y_bounds([0.0, pie.center_y * 2.0])
            .paint(|ctx| {
                if empty {
                    ctx.draw(&Circle {
                        x: pie.center_x,
                        y: pie.center_y,
                        radius: pie.radius,
                        color: palette.muted,
                    });
                    return;
                }
                ctx.draw(&Points {
                    coords: pending.as_slice(),
                    color: PENDING_COLOR,
                });
                ctx.draw(&Points {
                    coords: completed.as_slice(),
                    color: COMPLETED_COLOR,
                });
            });
        f.render_widget(canvas, columns[1]);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let palette = self.palette();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(palette.border)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(palette.border)),
            );
        f.render_widget(status, bottom[0]);

        let detail = match self.current_task() {
            Some(task) => selected_task_detail(task),
            None => Line::from("No task selected"),
        };
        let detail = Paragraph::new(detail)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(palette.border))
                    .title("Selected"),
            );
        f.render_widget(detail, bottom[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let key = |k: &'static str, color: Color| Span::styled(k, Style::default().fg(color));
        let mut spans = vec![
            key("1", Color::LightCyan),
            Span::raw(" list  "),
            key("2", Color::LightCyan),
            Span::raw(" calendar  "),
            key("3", Color::LightCyan),
            Span::raw(" stats  "),
        ];
        match self.view {
            ViewMode::List => spans.extend([
                key("↑↓ / j k", Color::LightCyan),
                Span::raw(" browse  "),
            ]),
            ViewMode::Calendar => spans.extend([
                key("[ ]", Color::LightCyan),
                Span::raw(" period  "),
                key("g", Color::LightCyan),
                Span::raw(" zoom  "),
                key(".", Color::LightCyan),
                Span::raw(" today  "),
                key("←↑↓→", Color::LightCyan),
                Span::raw(" day  "),
                key("Tab", Color::LightCyan),
                Span::raw(" panel  "),
            ]),
            ViewMode::Stats => {}
        }
        spans.extend([
            key("n", Color::LightMagenta),
            Span::raw(" new  "),
            key("e", Color::LightYellow),
            Span::raw(" edit  "),
            key("x", Color::LightGreen),
            Span::raw(" done  "),
            key("d", Color::LightRed),
            Span::raw(" delete  "),
            key("o", Color::LightGreen),
            Span::raw(" optimize  "),
            key("t", Color::LightYellow),
            Span::raw(" theme  "),
            key("q", Color::LightRed),
            Span::raw(" quit"),
        ]);
        Line::from(spans)
    }

    fn draw_form(&self, f: &mut ratatui::Frame<'_>, title: &str, form: &TaskFormState) {
        let area = centered_rect(70, 60, f.size());
        let mut lines: Vec<Line<'static>> = FORM_LABELS
            .iter()
            .zip(form.fields.iter())
            .enumerate()
            .map(|(idx, (label, field))| field_line(label, field, idx == form.active))
            .collect();
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Enter to save • Esc to cancel • Tab/Shift-Tab to move",
            Style::default().fg(Color::Gray),
        )));
        let dialog = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(Span::styled(
                        title.to_string(),
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, task_id: TaskId) {
        let area = centered_rect(50, 30, f.size());
        let title = self
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .map(|t| t.title.clone())
            .unwrap_or_else(|| task_id.to_string());
        let body = vec![
            Line::from(Span::styled(
                format!("Delete \"{}\"?", title),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
            Block::default()
                .title(Span::styled(
                    "Confirm Delete",
                    Style::default()
                        .fg(Color::LightRed)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed)),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

impl TaskFormState {
    fn from_form(form: TaskForm) -> Self {
        TaskFormState {
            fields: [
                FieldValue::new(&form.title),
                FieldValue::new(&form.priority),
                FieldValue::new(&form.deadline),
                FieldValue::new(&form.estimated_hours),
                FieldValue::new(&form.estimated_minutes),
                FieldValue::new(&form.start_date),
                FieldValue::new(&form.category),
            ],
            active: 0,
        }
    }

    fn to_form(&self) -> TaskForm {
        let [title, priority, deadline, hours, minutes, start, category] =
            self.fields.clone().map(|f| f.value);
        TaskForm {
            title,
            priority,
            deadline,
            estimated_hours: hours,
            estimated_minutes: minutes,
            start_date: start,
            category,
        }
    }

    fn next_field(&mut self) {
        self.active = (self.active + 1) % self.fields.len();
    }

    fn prev_field(&mut self) {
        self.active = (self.active + self.fields.len() - 1) % self.fields.len();
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        &mut self.fields[self.active]
    }
}

/// Text rendering of one occupancy bar, exactly `width` columns wide.
///
/// Multi-day spans get a half block on the edge where the span begins or
/// ends so adjacent cells read as one continuous bar.
pub fn bar_text(bar: &TimelineBar<'_>, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let len = ((width as f64 * bar.width_percent / 100.0).round() as usize).clamp(1, width);
    let left = ((width as f64 * bar.left_percent / 100.0).round() as usize).min(width - len);
    let mut glyphs = vec!['█'; len];
    if len > 1 {
        if bar.is_span_start && !bar.is_span_end {
            glyphs[0] = '▐';
        }
        if bar.is_span_end && !bar.is_span_start {
            glyphs[len - 1] = '▌';
        }
    }
    let mut text = " ".repeat(left);
    text.extend(glyphs);
    text.push_str(&" ".repeat(width - left - len));
    text
}

/// One line per stack slot, placed by the bar's `stack_top`.
fn cell_lines(
    layout: &CellLayout<'_>,
    config: &CalendarConfig,
    width: usize,
    labelled: bool,
    palette: Palette,
) -> Vec<Line<'static>> {
    let slot = |top: u32| (top.saturating_sub(config.bar_base_offset) / config.bar_height.max(1)) as usize;
    let slots = layout
        .bars
        .iter()
        .map(|b| slot(b.stack_top))
        .chain(layout.overflow.iter().map(|o| slot(o.stack_top)))
        .max()
        .map_or(0, |max| max + 1);
    let mut lines = vec![Line::default(); slots];

    let bar_width = if labelled { (width / 3).max(1) } else { width };
    for bar in &layout.bars {
        let style = Style::default().fg(blend(bar.color, bar.opacity, palette.background));
        let mut spans = vec![Span::styled(bar_text(bar, bar_width), style)];
        if labelled {
            let room = width.saturating_sub(bar_width + 1);
            let mut label_style = Style::default().fg(palette.text);
            if bar.task.completed {
                label_style = label_style.add_modifier(Modifier::CROSSED_OUT | Modifier::DIM);
            }
            spans.push(Span::raw(" "));
            spans.push(Span::styled(truncate_text(&bar.task.title, room), label_style));
        }
        lines[slot(bar.stack_top)] = Line::from(spans);
    }
    if let Some(overflow) = &layout.overflow {
        lines[slot(overflow.stack_top)] = Line::from(Span::styled(
            overflow.label(),
            Style::default().fg(palette.muted),
        ));
    }
    lines
}

/// Canvas points filling a donut sector, y flipped for the canvas' upward axis.
fn slice_points(pie: &PieGeometry, slice: &ArcSlice) -> Vec<(f64, f64)> {
    const STEP: f64 = 1.5;
    let mut points = Vec::new();
    let mut radius = pie.inner_radius.max(0.0);
    while radius <= pie.radius {
        let mut angle = slice.start_angle;
        while angle <= slice.end_angle {
            let (x, y) = polar_to_cartesian(pie.center_x, pie.center_y, radius, angle);
            points.push((x, pie.center_y * 2.0 - y));
            angle += STEP;
        }
        radius += STEP;
    }
    points
}

fn rgb(color: Rgb) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}

/// Mixes `color` over `background`; terminals have no alpha channel.
fn blend(color: Rgb, opacity: f32, background: Rgb) -> Color {
    let alpha = opacity.clamp(0.0, 1.0);
    let mix = |fg: u8, bg: u8| (f32::from(fg) * alpha + f32::from(bg) * (1.0 - alpha)).round() as u8;
    Color::Rgb(
        mix(color.0, background.0),
        mix(color.1, background.1),
        mix(color.2, background.2),
    )
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn prev_grapheme(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map_or(0, |(idx, _)| idx)
}

fn next_grapheme(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map_or(cursor, |ch| cursor + ch.len_utf8())
}

fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return text.chars().take(max).collect();
    }
    let mut out: String = text.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

fn task_item(task: &Task, palette: &Palette) -> ListItem<'static> {
    let mut title_style = Style::default().fg(palette.text);
    if task.completed {
        title_style = title_style.add_modifier(Modifier::CROSSED_OUT | Modifier::DIM);
    }
    let mut spans = vec![
        Span::styled(
            if task.completed { "[x] " } else { "[ ] " },
            Style::default().fg(palette.muted),
        ),
        Span::styled(format!("#{:<3} ", task.id), Style::default().fg(palette.muted)),
        Span::styled(task.title.clone(), title_style),
        Span::raw("  "),
        Span::styled(
            format!("P{}", task.priority),
            Style::default()
                .fg(rgb(priority_color(task.priority)))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!("due {}", format_date(task.deadline)),
            Style::default().fg(Color::LightRed),
        ),
    ];
    if let Some(category) = &task.category {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("#{}", category),
            Style::default().fg(Color::LightMagenta),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn field_line(label: &str, field: &FieldValue, active: bool) -> Line<'static> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::styled(text, value_style),
    ])
}

fn selected_task_detail(task: &Task) -> Line<'static> {
    let mut spans = vec![Span::styled(
        task.title.clone(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::raw("  "));
    let span_days = occupancy_span(task).days();
    spans.push(Span::styled(
        format!(
            "{}h{:02}m over {} day{}",
            task.estimated_time / 60,
            task.estimated_time % 60,
            span_days,
            if span_days == 1 { "" } else { "s" }
        ),
        Style::default().fg(Color::Gray),
    ));
    if let Some(start) = task.scheduled_start {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!(
                "starts {}",
                start.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            ),
            Style::default().fg(Color::LightGreen),
        ));
    } else if let Some(start) = task.start_date {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("starts {}", format_date(start)),
            Style::default().fg(Color::LightGreen),
        ));
    }
    if task.locked {
        spans.push(Span::raw("  locked"));
    }
    Line::from(spans)
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::{date, task};
    use crate::model::TaskDraft;
    use anyhow::bail;
    use chrono::Utc;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct FakeService {
        tasks: Vec<Task>,
        fail: bool,
    }

    impl FakeService {
        fn check(&self) -> Result<()> {
            if self.fail {
                bail!("store offline");
            }
            Ok(())
        }

        fn find(&mut self, id: TaskId) -> Result<&mut Task> {
            match self.tasks.iter_mut().find(|t| t.id == id) {
                Some(task) => Ok(task),
                None => bail!("task {} not found", id),
            }
        }
    }

    impl TaskService for FakeService {
        fn list_tasks(&mut self) -> Result<Vec<Task>> {
            self.check()?;
            Ok(self.tasks.clone())
        }

        fn create_task(&mut self, draft: TaskDraft) -> Result<Task> {
            self.check()?;
            let id = self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
            let task = Task::from_draft(id, draft, Utc::now());
            self.tasks.push(task.clone());
            Ok(task)
        }

        fn update_task(&mut self, task: Task) -> Result<()> {
            self.check()?;
            let id = task.id;
            *self.find(id)? = task;
            Ok(())
        }

        fn delete_task(&mut self, id: TaskId) -> Result<()> {
            self.check()?;
            self.tasks.retain(|t| t.id != id);
            Ok(())
        }

        fn set_completion(&mut self, id: TaskId, completed: bool) -> Result<()> {
            self.check()?;
            self.find(id)?.completed = completed;
            Ok(())
        }

        fn optimize_schedule(&mut self) -> Result<Vec<Task>> {
            self.check()?;
            Ok(self.tasks.clone())
        }
    }

    fn app_with(tasks: Vec<Task>) -> (App<FakeService>, Rc<RefCell<Vec<Preferences>>>) {
        let saved = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&saved);
        let service = FakeService {
            tasks,
            fail: false,
        };
        let app = App::new(
            service,
            "test".into(),
            Preferences::default(),
            Box::new(move |prefs: &Preferences| -> Result<()> {
                sink.borrow_mut().push(prefs.clone());
                Ok(())
            }),
        )
        .unwrap();
        (app, saved)
    }

    fn press(app: &mut App<FakeService>, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE)).unwrap()
    }

    fn type_text(app: &mut App<FakeService>, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    fn bar<'a>(task: &'a Task, width_percent: f64, start: bool, end: bool) -> TimelineBar<'a> {
        TimelineBar {
            task,
            width_percent,
            left_percent: 0.0,
            stack_top: 20,
            is_span_start: start,
            is_span_end: end,
            color: priority_color(task.priority),
            opacity: 0.9,
        }
    }

    #[test]
    fn bar_text_scales_and_marks_span_edges() {
        let t = task(1, date(2024, 3, 10), 180);
        assert_eq!(bar_text(&bar(&t, 25.0, true, true), 8), "██      ");
        assert_eq!(bar_text(&bar(&t, 100.0, true, false), 4), "▐███");
        assert_eq!(bar_text(&bar(&t, 100.0, false, true), 4), "███▌");
        assert_eq!(bar_text(&bar(&t, 100.0, false, false), 4), "████");
        assert_eq!(bar_text(&bar(&t, 1.0, true, true), 4), "█   ");
        assert_eq!(bar_text(&bar(&t, 50.0, true, true), 0), "");
    }

    #[test]
    fn cell_lines_follow_stack_slots_and_overflow() {
        let tasks: Vec<Task> = (1..=6).map(|id| task(id, date(2024, 3, 10), 60)).collect();
        let cell = CalendarCell {
            date: date(2024, 3, 10),
            in_focused_period: true,
            is_today: false,
            tasks: tasks.iter().collect(),
        };
        let config = CalendarConfig::default();
        let layout = layout_cell(&cell, &config);
        let lines = cell_lines(&layout, &config, 10, false, Palette::for_mode(true));
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[4].spans[0].content, "+2");
    }

    #[test]
    fn blend_mixes_toward_background() {
        assert_eq!(blend(Rgb(200, 100, 0), 0.5, Rgb(0, 0, 0)), Color::Rgb(100, 50, 0));
        assert_eq!(blend(Rgb(10, 20, 30), 1.0, Rgb(255, 255, 255)), Color::Rgb(10, 20, 30));
    }

    #[test]
    fn slice_points_stay_inside_the_donut() {
        let pie = PieGeometry::default();
        let summary = summarize(&[task(1, date(2024, 3, 10), 60)], &pie);
        let slice = summary.pending_arc.unwrap();
        let points = slice_points(&pie, &slice);
        assert!(!points.is_empty());
        for (x, y) in points {
            let r = ((x - pie.center_x).powi(2) + (y - pie.center_y).powi(2)).sqrt();
            assert!(r >= pie.inner_radius - 1e-6 && r <= pie.radius + 1e-6);
        }
    }

    #[test]
    fn field_editing_handles_multibyte_chars() {
        let mut field = FieldValue::new("né");
        field.move_left();
        assert_eq!(field.cursor, 1);
        field.insert_char('x');
        assert_eq!(field.value, "nxé");
        field.move_right();
        field.backspace();
        assert_eq!(field.value, "nx");
        assert_eq!(field.with_caret(), "nx▌");
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a long title", 8), "a lon...");
        assert_eq!(truncate_text("abcdef", 2), "ab");
    }

    #[test]
    fn adjust_offset_keeps_selection_visible() {
        assert_eq!(adjust_offset(0, 0, 5, 1, 20), 0);
        assert_eq!(adjust_offset(10, 0, 5, 1, 20), 7);
        assert_eq!(adjust_offset(19, 7, 5, 1, 20), 15);
        assert_eq!(adjust_offset(3, 0, 0, 1, 20), 0);
    }

    #[test]
    fn toggling_completion_refreshes_the_snapshot() {
        let (mut app, _) = app_with(vec![task(1, date(2024, 3, 10), 60)]);
        press(&mut app, KeyCode::Char('x'));
        assert!(app.tasks[0].completed);
        assert_eq!(app.status, "Completed task 1");
    }

    #[test]
    fn failed_mutation_keeps_stale_snapshot() {
        let (mut app, _) = app_with(vec![task(1, date(2024, 3, 10), 60)]);
        app.service.fail = true;
        press(&mut app, KeyCode::Char('x'));
        assert!(!app.tasks[0].completed);
        assert!(app.status.starts_with("Could not update completion"));

        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.tasks.len(), 1);
        assert!(app.status.contains("store offline"));
    }

    #[test]
    fn new_task_form_validates_then_creates() {
        let (mut app, _) = app_with(Vec::new());
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Creating(_)));
        assert!(app.status.contains("title is required"));

        type_text(&mut app, "Write report");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "2024-03-10");
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.tasks.len(), 1);
        assert_eq!(app.tasks[0].title, "Write report");
        assert_eq!(app.tasks[0].estimated_time, 30);
    }

    #[test]
    fn delete_requires_confirmation() {
        let (mut app, _) = app_with(vec![task(1, date(2024, 3, 10), 60)]);
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.tasks.len(), 1);
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.tasks.is_empty());
    }

    #[test]
    fn calendar_keys_navigate_and_persist_preferences() {
        let (mut app, saved) = app_with(vec![task(1, date(2024, 3, 10), 60)]);
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.view, ViewMode::Calendar);

        press(&mut app, KeyCode::Char('g'));
        assert_eq!(app.nav.granularity(), Granularity::Week);
        press(&mut app, KeyCode::Char('t'));
        {
            let saved = saved.borrow();
            assert_eq!(saved.len(), 2);
            assert_eq!(saved[0].granularity, Granularity::Week);
            assert!(saved[1].dark_mode);
        }

        press(&mut app, KeyCode::Right);
        assert!(app.nav.selected_date().is_some());
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.nav.selected_date(), None);
        let focused = app.nav.focused_date();
        press(&mut app, KeyCode::Char(']'));
        press(&mut app, KeyCode::Char('['));
        assert_eq!(app.nav.focused_date(), focused);
    }

    #[test]
    fn day_panel_selects_tasks_for_editing() {
        let (mut app, _) = app_with(vec![task(1, date(2024, 3, 10), 60)]);
        press(&mut app, KeyCode::Char('2'));
        app.nav.select_date(date(2024, 3, 10));
        press(&mut app, KeyCode::Tab);
        assert!(app.detail_focus);
        press(&mut app, KeyCode::Char('e'));
        match &app.mode {
            Mode::Editing { task_id, form } => {
                assert_eq!(*task_id, 1);
                assert_eq!(form.to_form().deadline, "2024-03-10");
            }
            _ => panic!("expected edit form"),
        }
        type_text(&mut app, " v2");
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.status, "Updated task 1");
        assert_eq!(app.service.tasks[0].title, "task 1 v2");
        assert_eq!(app.tasks[0].title, "task 1 v2");
    }

    #[test]
    fn quit_key_ends_the_loop() {
        let (mut app, _) = app_with(Vec::new());
        assert!(press(&mut app, KeyCode::Char('q')));
    }
}
