use crate::calendar::{layout_cell, summarize, Granularity, NavigationState, SystemClock};
use crate::cli::TaskFields;
use crate::config::{load_preferences, preferences_path, save_preferences, Preferences};
use crate::model::{format_date, parse_date, Task, TaskForm, TaskId};
use crate::service::TaskService;
use crate::storage::{init_project_store, locate_store, FileStore};
use crate::ui;
use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, Local};
use std::env;
use std::fs;
use std::path::PathBuf;

const BAR_WIDTH: usize = 24;

pub fn init(name: Option<String>) -> Result<()> {
    let location = init_project_store(name)?;
    println!("Initialized task store at {}", location.path.display());
    Ok(())
}

pub fn list(pending_only: bool, completed_only: bool) -> Result<()> {
    let mut store = open_store()?;
    let tasks = store.list_tasks()?;
    println!(
        "Tasks: {} ({})",
        store.book().name,
        store.location().scope.label()
    );
    let (completed, pending): (Vec<&Task>, Vec<&Task>) = tasks.iter().partition(|t| t.completed);
    if !completed_only {
        print_section("Pending", &pending);
    }
    if !pending_only {
        print_section("Completed", &completed);
    }
    Ok(())
}

pub fn add(title: String, fields: TaskFields) -> Result<()> {
    let mut form = TaskForm {
        title,
        ..TaskForm::blank()
    };
    overlay(&mut form, fields);
    let draft = form.validate()?;
    let mut store = open_store()?;
    let task = store.create_task(draft)?;
    println!("Added task {}: {}", task.id, task.title);
    Ok(())
}

pub fn edit(
    id: TaskId,
    title: Option<String>,
    fields: TaskFields,
    clear_start: bool,
    clear_category: bool,
) -> Result<()> {
    let mut store = open_store()?;
    store.list_tasks()?;
    let mut task = store
        .book()
        .get(id)
        .cloned()
        .ok_or_else(|| anyhow!("task {} not found", id))?;
    let mut form = TaskForm::from_task(&task);
    if let Some(t) = title {
        form.title = t;
    }
    overlay(&mut form, fields);
    if clear_start {
        form.start_date.clear();
    }
    if clear_category {
        form.category.clear();
    }
    task.apply(form.validate()?);
    store.update_task(task)?;
    println!("Updated task {}", id);
    Ok(())
}

pub fn done(id: TaskId, undo: bool) -> Result<()> {
    let mut store = open_store()?;
    store.set_completion(id, !undo)?;
    if undo {
        println!("Marked task {} as pending", id);
    } else {
        println!("Completed task {}", id);
    }
    Ok(())
}

pub fn delete(id: TaskId) -> Result<()> {
    let mut store = open_store()?;
    store.delete_task(id)?;
    println!("Deleted task {}", id);
    Ok(())
}

pub fn optimize() -> Result<()> {
    let mut store = open_store()?;
    let tasks = store.optimize_schedule()?;
    for task in tasks.iter().filter(|t| !t.completed) {
        match task.scheduled_start {
            Some(start) => println!(
                "  - {}: {} starts {}",
                task.id,
                task.title,
                start.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            ),
            None => println!("  - {}: {} (locked)", task.id, task.title),
        }
    }
    Ok(())
}

pub fn calendar(view: Option<Granularity>, date: Option<String>) -> Result<()> {
    let prefs = current_preferences()?;
    let focused = match date.as_deref() {
        Some(raw) => parse_date(raw)?.ok_or_else(|| anyhow!("date must not be empty"))?,
        None => Local::now().date_naive(),
    };
    let nav = NavigationState::new(focused, view.unwrap_or(prefs.granularity));
    let mut store = open_store()?;
    let tasks = store.list_tasks()?;
    let cells = nav.grid(&tasks, &SystemClock);

    println!("{}", nav.period_title());
    if nav.granularity() == Granularity::Month {
        println!(
            "{}",
            ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"]
                .iter()
                .map(|d| format!("{:<8}", d))
                .collect::<String>()
        );
        for week in cells.chunks(7) {
            let row: String = week
                .iter()
                .map(|cell| {
                    let day = cell.date.day();
                    let mark = if cell.is_today { '*' } else { ' ' };
                    let text = match (cell.in_focused_period, cell.tasks.len()) {
                        (false, _) => format!("{:>2}{}", ".", mark),
                        (true, 0) => format!("{:>2}{}", day, mark),
                        (true, n) => format!("{:>2}{}({})", day, mark, n),
                    };
                    format!("{:<8}", text)
                })
                .collect();
            println!("{}", row.trim_end());
        }
        return Ok(());
    }

    for cell in &cells {
        let marker = if cell.is_today { " (today)" } else { "" };
        println!("{}{}", cell.date.format("%a %Y-%m-%d"), marker);
        let layout = layout_cell(cell, &prefs.calendar);
        if layout.bars.is_empty() {
            println!("  (free)");
        }
        for bar in &layout.bars {
            let status = if bar.task.completed { "done" } else { "todo" };
            println!(
                "  {} {}: {} [P{} {}]",
                ui::bar_text(bar, BAR_WIDTH),
                bar.task.id,
                bar.task.title,
                bar.task.priority,
                status
            );
        }
        if let Some(overflow) = layout.overflow {
            println!("  {}", overflow.label());
        }
    }
    Ok(())
}

pub fn stats(svg: Option<PathBuf>) -> Result<()> {
    let prefs = current_preferences()?;
    let mut store = open_store()?;
    let tasks = store.list_tasks()?;
    let summary = summarize(&tasks, &prefs.calendar.pie);
    println!("Total:     {}", summary.total);
    println!(
        "Completed: {} ({:.0}%)",
        summary.completed_count, summary.completed_percent
    );
    println!(
        "Pending:   {} ({:.0}%)",
        summary.pending_count, summary.pending_percent
    );
    if let Some(path) = svg {
        fs::write(&path, summary.to_svg(&prefs.calendar.pie, prefs.dark_mode))
            .with_context(|| format!("writing {:?}", path))?;
        println!("Wrote chart to {}", path.display());
    }
    Ok(())
}

pub fn tui() -> Result<()> {
    let store = open_store()?;
    let source = format!(
        "{} ({})",
        store.location().path.display(),
        store.location().scope.label()
    );
    let prefs_path = preferences_path()?;
    let prefs = load_preferences(&prefs_path)?;
    ui::run(store, source, prefs, move |p| save_preferences(&prefs_path, p))
}

fn open_store() -> Result<FileStore> {
    let cwd = env::current_dir()?;
    let location = locate_store(&cwd)?;
    FileStore::open(location)
}

fn current_preferences() -> Result<Preferences> {
    load_preferences(&preferences_path()?)
}

fn overlay(form: &mut TaskForm, fields: TaskFields) {
    let TaskFields {
        deadline,
        priority,
        hours,
        minutes,
        start,
        category,
    } = fields;
    let targets = [
        (deadline, &mut form.deadline),
        (priority, &mut form.priority),
        (hours, &mut form.estimated_hours),
        (minutes, &mut form.estimated_minutes),
        (start, &mut form.start_date),
        (category, &mut form.category),
    ];
    for (value, target) in targets {
        if let Some(v) = value {
            *target = v;
        }
    }
}

fn print_section(heading: &str, tasks: &[&Task]) {
    println!("{}", heading);
    if tasks.is_empty() {
        println!("  (none)");
    }
    for task in tasks {
        print_task(task);
    }
    println!();
}

fn print_task(task: &Task) {
    println!("  - {}: {} [P{}]", task.id, task.title, task.priority);
    let mut details = vec![format!("due {}", format_date(task.deadline))];
    details.push(format!(
        "est {}h{:02}m",
        task.estimated_time / 60,
        task.estimated_time % 60
    ));
    if let Some(start) = task.start_date {
        details.push(format!("start {}", format_date(start)));
    }
    if let Some(scheduled) = task.scheduled_start {
        details.push(format!(
            "scheduled {}",
            scheduled.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ));
    }
    if let Some(category) = &task.category {
        details.push(format!("#{}", category));
    }
    println!("    {}", details.join("  "));
}
