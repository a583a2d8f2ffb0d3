//! pipetable - align, edit, sort and export plain-text tables.
//!
//! # Usage
//!
//! ```bash
//! pipetable notes.org --line 12 align
//! pipetable README.md --line 4 --col 9 sort-rows n
//! pipetable notes.org --line 1 --select-to 40 sort-entries p
//! pipetable notes.org --line 12 export csv --output table.csv
//! pipetable notes.org --line 12 export latex --output
//! ```

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use pipetable::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    parse_flag_tokens, save_config_flags,
};
use pipetable::editor::EditorBuffer;
use pipetable::outline::SortKey;
use pipetable::session::{MemoryClipboard, Outcome, Session};
use pipetable::table::{
    ExportFormat, HorizontalDirection, RowSortKind, Syntax, VerticalDirection,
};

/// Align, edit, sort and export pipe tables in org and markdown files
#[derive(Parser, Debug)]
#[command(name = "pipetable", version, about, long_about = None)]
struct Cli {
    /// Document to operate on
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Cursor line (1-based)
    #[arg(long, default_value_t = 1)]
    line: usize,

    /// Cursor column (1-based byte column)
    #[arg(long, default_value_t = 1)]
    col: usize,

    /// Select lines from --line through this line (1-based, inclusive)
    #[arg(long, value_name = "LINE")]
    select_to: Option<usize>,

    /// Table syntax; guessed from the file extension when omitted
    #[arg(long, value_enum)]
    syntax: Option<Syntax>,

    /// Glyph shown where a max-width cell is cut
    #[arg(long)]
    marker: Option<String>,

    /// Quiet period before projections are recomputed
    #[arg(long, value_name = "MS")]
    debounce_ms: Option<u64>,

    /// Comma-separated TODO sequence used by entry sorting
    #[arg(long, value_name = "LIST")]
    todo_keywords: Option<String>,

    /// Print the result instead of writing the file
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reformat the table at the cursor
    Align,
    /// Insert an empty row
    InsertRow {
        #[arg(value_enum, default_value = "down")]
        direction: VerticalDirection,
    },
    /// Delete the row at the cursor
    DeleteRow,
    /// Insert a separator below the cursor row
    InsertSeparator,
    /// Swap the cursor row with a neighbour
    MoveRow {
        #[arg(value_enum)]
        direction: VerticalDirection,
    },
    /// Insert an empty column
    InsertColumn {
        #[arg(value_enum, default_value = "right")]
        direction: HorizontalDirection,
    },
    /// Delete the column at the cursor
    DeleteColumn,
    /// Swap the cursor column with a neighbour
    MoveColumn {
        #[arg(value_enum)]
        direction: HorizontalDirection,
    },
    /// Move to the next cell, adding a row past the end
    NextField,
    /// Move to the previous cell
    PreviousField,
    /// Sort table rows by the cursor column (a/n/t, upper case reverses)
    SortRows { key: char },
    /// Sort outline entries (a n t d s p o c k r, upper case reverses)
    SortEntries {
        key: char,
        /// Property name for the `r` key
        #[arg(long)]
        property: Option<String>,
    },
    /// Serialize the table at the cursor
    Export {
        #[arg(value_enum)]
        format: ExportFormat,
        /// Write to a file instead of stdout; without PATH the file is
        /// named after the document with the format's extension
        #[arg(long, value_name = "PATH", num_args = 0..=1)]
        output: Option<Option<PathBuf>>,
    },
    /// Insert delimited text as a table at the cursor line
    Import {
        /// Read from a file instead of stdin
        #[arg(long, value_name = "PATH")]
        from: Option<PathBuf>,
    },
    /// Print truncation projections as JSON
    Project,
    /// Print the rows of a named table as JSON
    Lookup { name: String },
}

fn effective_flags(cli: &Cli, raw_args: &[String]) -> Result<ConfigFlags> {
    let global_path = global_config_path();
    let cli_flags = parse_flag_tokens(raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_override_path())?;
        global_flags.union(&local_flags)
    };
    Ok(file_flags.union(&cli_flags))
}

fn report(outcome: &Outcome) {
    if let Some(message) = &outcome.message {
        eprintln!("{message}");
    }
}

fn main() -> Result<()> {
    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let effective = effective_flags(&cli, &raw_args)?;

    // Initialize logging
    let level = if effective.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    if !cli.file.exists() {
        bail!("File not found: {}", cli.file.display());
    }
    let text = fs::read_to_string(&cli.file)
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;

    let config = effective.resolve();
    let syntax = config.syntax_for(&cli.file);
    let mut buffer = EditorBuffer::from_text(&text);
    let line = cli.line.saturating_sub(1);
    buffer.move_to(line, cli.col.saturating_sub(1));
    if let Some(to) = cli.select_to {
        buffer.set_selection(line..to.max(cli.line));
    }

    let clipboard = match &cli.command {
        Command::Import { from: Some(path) } => MemoryClipboard::with_text(
            &fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        Command::Import { from: None } => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            MemoryClipboard::with_text(&input)
        }
        _ => MemoryClipboard::default(),
    };
    let mut session = Session::new(buffer, syntax, config, Box::new(clipboard));

    let outcome = match cli.command {
        Command::Align => session.align(),
        Command::InsertRow { direction } => session.insert_row(direction),
        Command::DeleteRow => session.delete_row(),
        Command::InsertSeparator => session.insert_separator(),
        Command::MoveRow { direction } => session.move_row(direction),
        Command::InsertColumn { direction } => session.insert_column(direction),
        Command::DeleteColumn => session.delete_column(),
        Command::MoveColumn { direction } => session.move_column(direction),
        Command::NextField => session.next_field(),
        Command::PreviousField => session.previous_field(),
        Command::SortRows { key } => {
            let Some((kind, reverse)) = RowSortKind::from_key(key) else {
                bail!("Unknown row sort key '{key}' (expected a, n or t)");
            };
            session.sort_rows(kind, reverse)
        }
        Command::SortEntries { key, property } => {
            let Some((key, reverse)) = SortKey::from_key(key) else {
                bail!("Unknown entry sort key '{key}'");
            };
            session.sort_entries(key, reverse, property.as_deref())
        }
        Command::Export { format, output } => {
            let outcome = if let Some(path) = output {
                let path = path.unwrap_or_else(|| format.default_path(&cli.file));
                session.export_to_file(format, &path)?
            } else {
                match session.export(format)? {
                    Ok(text) => {
                        print!("{text}");
                        Outcome::default()
                    }
                    Err(reason) => reason.into(),
                }
            };
            report(&outcome);
            return Ok(());
        }
        Command::Import { .. } => session.import_from_clipboard()?,
        Command::Project => {
            let json = serde_json::to_string_pretty(&session.projections())
                .context("Failed to serialize projections")?;
            println!("{json}");
            return Ok(());
        }
        Command::Lookup { name } => {
            let json = serde_json::to_string_pretty(&session.lookup_table(&name))
                .context("Failed to serialize table")?;
            println!("{json}");
            return Ok(());
        }
    };

    report(&outcome);
    if !outcome.applied {
        return Ok(());
    }
    let text = session.buffer().text();
    if cli.dry_run {
        print!("{text}");
    } else {
        fs::write(&cli.file, text)
            .with_context(|| format!("Failed to write {}", cli.file.display()))?;
    }
    Ok(())
}
