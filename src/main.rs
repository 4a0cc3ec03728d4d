use anyhow::{ensure, Context, Result};
use std::{fs::File, path::PathBuf, sync::Mutex, time::Duration};
use structopt::StructOpt;

mod error;
mod events;
mod sweep;
mod ui;

#[derive(Debug, structopt::StructOpt)]
#[structopt(about = "Sweep the mines around a page that was not found.")]
struct Opt {
    /// The number of rows in the grid.
    #[structopt(short, long, default_value = "9")]
    rows: usize,

    /// The number of columns in the grid.
    #[structopt(short, long, default_value = "15")]
    columns: usize,

    /// The total number of mines in the grid.
    #[structopt(short, long, default_value = "10")]
    mines: usize,

    /// Digits carved permanently into the middle of the grid. Empty for a plain board.
    #[structopt(short, long, default_value = "404")]
    pattern: String,

    /// Empty columns between neighbouring digits of the pattern.
    #[structopt(long, default_value = "1")]
    spacing: usize,

    /// Seed for mine placement, for reproducible boards.
    #[structopt(long)]
    seed: Option<u64>,

    /// The width of each cell.
    #[structopt(short = "w", long, default_value = "5")]
    cell_width: usize,

    /// The height of each cell.
    #[structopt(short = "H", long, default_value = "3")]
    cell_height: usize,

    /// Milliseconds between animation frames of a cascading reveal.
    #[structopt(long, default_value = "30")]
    tick_rate: u64,

    /// Write debug logs to this file.
    #[structopt(long, parse(from_os_str))]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let Opt {
        rows,
        columns,
        mines,
        pattern,
        spacing,
        seed,
        cell_width,
        cell_height,
        tick_rate,
        log_file,
    } = Opt::from_args();

    ensure!(
        cell_width >= 3 && cell_height >= 3,
        "cells must be at least 3x3, got {}x{}",
        cell_width,
        cell_height
    );

    if let Some(path) = log_file {
        let file = File::create(&path)
            .with_context(|| format!("failed to create log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .init();
    }

    let pattern = sweep::Pattern::new(&pattern, spacing).context("invalid pattern")?;
    let config = sweep::Config::builder()
        .rows(rows)
        .columns(columns)
        .mines(mines)
        .pattern(pattern)
        .seed(seed)
        .build();

    ui::Ui::builder()
        .config(config)
        .cell_width(cell_width)
        .cell_height(cell_height)
        .events(events::Config {
            tick_rate: Duration::from_millis(tick_rate),
        })
        .build()
        .run()
        .context("sweep failed")
}
