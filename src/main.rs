mod logging;

use std::thread;
use std::time::Duration;

use clap::Parser;
use colored::*;
use dotenv::dotenv;
use dupe_index::{config, is_definitely_equal, EqualityTable, GroupTag};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "dupe-index")]
#[command(about = "Incremental duplicate-file index", long_about = None)]
struct Cli {
    /// Files or directories to index; defaults to root_paths from Config.toml
    paths: Vec<String>,

    /// Milliseconds between ticks of the poll loop
    #[arg(long, default_value_t = 10)]
    tick_interval: u64,
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let _guard = logging::init_logger();

    let args = Cli::parse();
    let config = config::load_configuration()?;

    let paths = if args.paths.is_empty() {
        config::non_overlapping_directories(config.root_paths.clone())
    } else {
        args.paths.clone()
    };
    if paths.is_empty() {
        anyhow::bail!("no paths given and no root_paths in Config.toml");
    }

    let table = EqualityTable::with_ignore_patterns(&config.ignore_patterns);
    for path in &paths {
        table.insert(path.as_str());
    }

    run_to_settled(&table, Duration::from_millis(args.tick_interval));
    print_listing(&table);

    info!(
        "{} files | {} duplicates",
        format!("{}", table.len()).green(),
        format!("{}", table.duplicate_count()).red(),
    );

    Ok(())
}

/// Drive the table the way the original window loop does: tick, refresh
/// the status line, sleep, until no background work is left.
fn run_to_settled(table: &EqualityTable, tick_interval: Duration) {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.enable_steady_tick(Duration::from_millis(80));

    loop {
        table.tick();
        let pending = table.pending_task_count();
        pb.set_message(format!(
            "{} files | {} duplicates | {} pending tasks",
            table.len(),
            table.duplicate_count(),
            pending
        ));
        if pending == 0 {
            break;
        }
        thread::sleep(tick_interval);
    }
    pb.finish_and_clear();
}

fn print_listing(table: &EqualityTable) {
    let rows = table.snapshot();

    println!("   {:>20} {:>10} {:>10}  {}", "File Size", "1KB CRC32", "CRC32", "Path");
    for (i, entry) in rows.iter().enumerate() {
        // colour swatch only when an adjacent record is definitely equal
        let has_adjacent_dupe = (i > 0 && is_definitely_equal(&rows[i - 1], entry))
            || (i + 1 < rows.len() && is_definitely_equal(entry, &rows[i + 1]));
        let swatch = if has_adjacent_dupe {
            let GroupTag { r, g, b } = entry.group_tag;
            "██".truecolor(r, g, b)
        } else {
            "  ".normal()
        };
        println!(
            "{} {:>20} {:>10} {:>10}  {}",
            swatch,
            entry.size_display(),
            entry.partial_checksum_display(),
            entry.full_checksum_display(),
            entry.path
        );
    }
}
