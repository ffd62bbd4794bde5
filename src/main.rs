use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use soundboard::catalog::CatalogError;
use soundboard::config::{ConfigError, SoundboardConfig};
use soundboard::error::ErrorCode;
use soundboard::services::editor::EditorError;
use soundboard::services::slot::{SlotError, SlotKey};
use soundboard::services::soundboard::{Command, DropResolution, ExportScope, Outcome, Soundboard, SoundboardError};
use soundboard::services::soundpad::{self, SearchQuery, SoundpadError};
use soundboard::state::AppContext;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("{code}: {0}", code = .0.error_code())]
    Soundboard(#[from] SoundboardError),
    #[error("{code}: {0}", code = .0.error_code())]
    Soundpad(#[from] SoundpadError),
    #[error("{code}: {0}", code = .0.error_code())]
    Editor(#[from] EditorError),
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("unexpected outcome: {0}")]
    Unexpected(String),
}

#[derive(Parser, Debug)]
#[command(name = "soundboard", about = "Grid soundboard and sound-pad browser")]
struct Cli {
    /// Settings file, overriding SOUNDBOARD_SETTINGS_PATH.
    #[arg(long)]
    settings: Option<String>,

    /// Acting user, overriding SOUNDBOARD_USER.
    #[arg(long)]
    user: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    Boards(BoardsCommand),
    /// Print the current board.
    Show,
    Slot(SlotCommand),
    Export {
        /// Export every board instead of the current one.
        #[arg(long)]
        all: bool,
        /// Write here instead of the suggested file name.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Import {
        file: PathBuf,
    },
    Soundpads(SoundpadsCommand),
}

#[derive(Args, Debug)]
struct BoardsCommand {
    #[command(subcommand)]
    command: BoardsSubcommand,
}

#[derive(Subcommand, Debug)]
enum BoardsSubcommand {
    List,
    Create {
        name: String,
    },
    Select {
        idx: usize,
    },
    Rename {
        name: String,
        #[arg(long)]
        board: Option<usize>,
    },
    Delete {
        #[arg(long)]
        board: Option<usize>,
    },
    Resize {
        rows: i64,
        cols: i64,
    },
    ToggleHidden,
}

#[derive(Args, Debug)]
struct SlotCommand {
    #[command(subcommand)]
    command: SlotSubcommand,
}

#[derive(Subcommand, Debug)]
enum SlotSubcommand {
    /// Assign audio to a slot, e.g. `slot set 0#2 sfx/door.ogg`.
    Set {
        #[arg(value_parser = parse_key)]
        key: SlotKey,
        #[arg(required = true)]
        paths: Vec<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        volume: Option<f64>,
        #[arg(long)]
        size: Option<u32>,
        #[arg(long)]
        repeat: bool,
    },
    Clear {
        #[arg(value_parser = parse_key)]
        key: SlotKey,
    },
    Move {
        #[arg(value_parser = parse_key)]
        from: SlotKey,
        #[arg(value_parser = parse_key)]
        to: SlotKey,
        /// Swap with an assigned destination.
        #[arg(long, conflicts_with = "overwrite")]
        swap: bool,
        /// Replace an assigned destination.
        #[arg(long)]
        overwrite: bool,
        /// Keep the source slot.
        #[arg(long)]
        copy: bool,
    },
    Play {
        #[arg(value_parser = parse_key)]
        key: SlotKey,
    },
}

#[derive(Args, Debug)]
struct SoundpadsCommand {
    #[command(subcommand)]
    command: SoundpadsSubcommand,
}

#[derive(Subcommand, Debug)]
enum SoundpadsSubcommand {
    Browse {
        /// Switch to this creator and remember the choice.
        #[arg(long)]
        creator: Option<String>,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        category: Option<String>,
        /// Include hidden sounds and folders.
        #[arg(long)]
        all: bool,
        /// Collapse or expand the volume line and remember the choice.
        #[arg(long)]
        toggle_controls: bool,
    },
}

/// Slot keys are accepted as `row#col` or `audio-row#col`.
fn parse_key(raw: &str) -> Result<SlotKey, SlotError> {
    raw.parse().or_else(|_| SlotKey::from_id(raw))
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = SoundboardConfig::from_env()?;
    if let Some(path) = cli.settings {
        config.settings_path = path;
    }
    if let Some(user) = cli.user {
        config.user_name = user;
    }
    let ctx = AppContext::from_config(config)?;

    match cli.command {
        CliCommand::Boards(boards) => run_boards(&ctx, boards.command).await,
        CliCommand::Show => show(&Soundboard::new(ctx), Command::Render).await,
        CliCommand::Slot(slot) => run_slot(&ctx, slot.command).await,
        CliCommand::Export { all, out } => run_export(&ctx, all, out).await,
        CliCommand::Import { file } => {
            let json = tokio::fs::read_to_string(&file)
                .await
                .map_err(|source| CliError::Read { path: file, source })?;
            show(&Soundboard::new(ctx), Command::Import { json }).await
        }
        CliCommand::Soundpads(pads) => run_soundpads(&ctx, pads.command).await,
    }
}

async fn run_boards(ctx: &AppContext, command: BoardsSubcommand) -> Result<(), CliError> {
    let board = Soundboard::new(ctx.clone());
    let cmd = match command {
        BoardsSubcommand::List => {
            let Outcome::Render(view) = board.dispatch(Command::Render).await? else {
                return Err(CliError::Unexpected("expected a render".into()));
            };
            for entry in view.boards {
                let marker = if entry.selected { '*' } else { ' ' };
                println!("{marker} {:>3}  {}", entry.idx, entry.name);
            }
            return Ok(());
        }
        BoardsSubcommand::Create { name } => Command::BoardCreated { name },
        BoardsSubcommand::Select { idx } => Command::BoardSelected { idx },
        BoardsSubcommand::Rename { name, board } => Command::BoardRenamed { idx: board, name },
        BoardsSubcommand::Delete { board } => Command::BoardDeleted { idx: board },
        BoardsSubcommand::Resize { rows, cols } => Command::GridResized { rows, cols },
        BoardsSubcommand::ToggleHidden => Command::HideUnusedToggled,
    };
    show(&board, cmd).await
}

async fn run_slot(ctx: &AppContext, command: SlotSubcommand) -> Result<(), CliError> {
    let board = Soundboard::new(ctx.clone());
    match command {
        SlotSubcommand::Set { key, paths, name, volume, size, repeat } => {
            let Outcome::OpenEditor(mut editor) = board.dispatch(Command::EditSlot { key }).await? else {
                return Err(CliError::Unexpected("expected the slot editor".into()));
            };
            for path in &paths {
                editor.add_audio(path);
            }
            if let Some(name) = name {
                editor.set_name(&name);
            }
            if let Some(volume) = volume {
                editor.set_volume(volume);
            }
            if let Some(size) = size {
                editor.set_size(size)?;
            }
            editor.set_repeat(repeat);
            let slot = editor.save()?;
            show(&board, Command::SlotSaved { key, slot }).await
        }
        SlotSubcommand::Clear { key } => show(&board, Command::SlotDeleted { key }).await,
        SlotSubcommand::Move { from, to, swap, overwrite, copy } => {
            let resolution = match (swap, overwrite) {
                (true, _) => Some(DropResolution::Swap),
                (false, true) => Some(DropResolution::Overwrite),
                (false, false) => None,
            };
            show(&board, Command::SlotDropped { from, to, resolution, duplicate: copy }).await
        }
        SlotSubcommand::Play { key } => show(&board, Command::SlotClicked { key }).await,
    }
}

async fn run_export(ctx: &AppContext, all: bool, out: Option<PathBuf>) -> Result<(), CliError> {
    let scope = if all { ExportScope::Collection } else { ExportScope::Board };
    let Outcome::Exported(file) = Soundboard::new(ctx.clone()).dispatch(Command::Export { scope }).await? else {
        return Err(CliError::Unexpected("expected an export".into()));
    };
    let path = out.unwrap_or_else(|| PathBuf::from(&file.filename));
    tokio::fs::write(&path, file.json)
        .await
        .map_err(|source| CliError::Write { path: path.clone(), source })?;
    eprintln!("exported to {}", path.display());
    Ok(())
}

async fn run_soundpads(ctx: &AppContext, command: SoundpadsSubcommand) -> Result<(), CliError> {
    let SoundpadsSubcommand::Browse { creator, search, category, all, toggle_controls } = command;
    let browser = match creator {
        Some(creator) => soundpad::select_creator(ctx, &creator).await?,
        None => soundpad::open(ctx).await?,
    };
    let query = SearchQuery { text: search, category, show_all: all };
    let result = soundpad::search(ctx, &browser, &query).await?;

    let hide_controls = if toggle_controls {
        soundpad::toggle_controls(ctx).await?
    } else {
        soundpad::controls_hidden(ctx).await?
    };

    println!("{} ({} sounds)", browser.publisher, result.total);
    if !hide_controls {
        println!("volume {:.0}%", soundpad::volume(ctx).await? * 100.0);
    }
    for folder in &result.folders {
        println!("{} [{}]", folder.name, folder.count);
        let Some(tree) = browser.folder(&folder.key) else { continue };
        for idx in tree.sounds.iter().filter(|idx| result.matches.contains(*idx)) {
            if let Some(sound) = browser.sound(*idx) {
                println!("  {:>4}  {:<40} {}", sound.idx, sound.name.trim(), sound.pretty_duration());
            }
        }
    }
    Ok(())
}

/// Dispatch one command and print what came back.
async fn show(board: &Soundboard, cmd: Command) -> Result<(), CliError> {
    match board.dispatch(cmd).await? {
        Outcome::Render(view) => {
            println!("{} ({}x{})", view.board_name, view.grid.row_count, view.grid.col_count);
            for row in &view.grid.rows {
                let line: Vec<String> = row
                    .iter()
                    .filter(|cell| !view.grid.hide_unused || cell.is_assigned())
                    .map(|cell| match &cell.slot {
                        Some(slot) => format!("[{}]", slot.name),
                        None => format!("({})", cell.id),
                    })
                    .collect();
                println!("{}", line.join(" "));
            }
        }
        Outcome::ConfirmDrop { from, to } => {
            eprintln!("{to} is assigned; rerun `slot move {} {}` with --swap or --overwrite", from.id(), to.id());
        }
        Outcome::Played { path, playing } => println!("{} {path}", if playing { "playing" } else { "stopped" }),
        Outcome::Notify(notice) => print_json(&notice)?,
        Outcome::OpenEditor(editor) => print_json(&editor.view())?,
        Outcome::Exported(file) => println!("{}", file.json),
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
