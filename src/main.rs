mod calendar;
mod cli;
mod commands;
mod config;
mod logging;
mod model;
mod optimizer;
mod refresh;
mod service;
mod storage;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let _log_guard = logging::init_or_warn(logging::init());
    let command = args.command.unwrap_or(cli::Command::Tui);
    let result = match command {
        cli::Command::Init { name } => commands::init(name),
        cli::Command::List { pending, completed } => commands::list(pending, completed),
        cli::Command::Add { title, fields } => commands::add(title, fields),
        cli::Command::Edit {
            id,
            title,
            fields,
            clear_start,
            clear_category,
        } => commands::edit(id, title, fields, clear_start, clear_category),
        cli::Command::Done { id, undo } => commands::done(id, undo),
        cli::Command::Delete { id } => commands::delete(id),
        cli::Command::Optimize => commands::optimize(),
        cli::Command::Calendar { view, date } => commands::calendar(view, date),
        cli::Command::Stats { svg } => commands::stats(svg),
        cli::Command::Tui => commands::tui(),
    };
    if let Err(err) = &result {
        tracing::error!("{:#}", err);
    }
    result
}
