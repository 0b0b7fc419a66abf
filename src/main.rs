use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

mod app;

use app::controller::Controller;
use app::ui::TableUI;
use app::viewer::{Status, Viewer};
use app::{ViewerConfig, logging};
use tablestate::{
    ExportScope, LoadOptions, Persistence, Record, TableConfig, TableError, TableModel,
    load_table, write_delimited,
};

const DEFAULT_STATE_DIR: &str = "~/.local/state/tablestate";

/// Browse a csv, parquet or arrow file as a table. Sorting, filters and layout are remembered
/// per table between runs.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// File to open
    file: PathBuf,

    /// Key the view state is saved under. Defaults to the file name.
    #[arg(long)]
    table_id: Option<String>,

    /// Directory holding saved view states
    #[arg(long, default_value = DEFAULT_STATE_DIR)]
    state_dir: String,

    /// Rows per page for tables without a saved state
    #[arg(long, default_value_t = 20)]
    page_size: usize,

    /// Column whose values identify rows
    #[arg(long)]
    key_column: Option<String>,

    /// Write the saved view of the table to this csv file and exit
    #[arg(long)]
    export: Option<PathBuf>,

    /// Forget the saved view state before starting
    #[arg(long)]
    reset: bool,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = logging::init(args.log_file.as_deref()) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }
    match run(args) {
        Err(e) => {
            ratatui::restore();
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: Args) -> Result<(), TableError> {
    let mut options = LoadOptions::default();
    if let Some(key) = &args.key_column {
        options = options.with_key_column(key.as_str());
    }
    let loaded = load_table(&args.file, &options)?;
    info!(
        "Loaded {} rows and {} columns from {}",
        loaded.records.len(),
        loaded.columns.len(),
        args.file.display()
    );

    let table_id = args.table_id.clone().unwrap_or_else(|| loaded.name.clone());
    let state_dir = shellexpand::full(&args.state_dir)
        .map_err(|e| TableError::LoadingFailed(e.to_string()))?
        .into_owned();
    let mut persistence = Persistence::in_dir(state_dir);
    if args.reset {
        persistence.clear(&table_id)?;
    }

    let config = TableConfig::default()
        .with_page_size(args.page_size)
        .with_min_column_width(3);
    let table = TableModel::new(
        table_id,
        loaded.columns,
        loaded.records,
        |r: &Record| r.key.clone(),
        config,
    )
    .with_persistence(persistence);

    if let Some(path) = &args.export {
        let export = table.export(ExportScope::Filtered);
        let mut file = File::create(path)?;
        write_delimited(&export, &mut file, b',')?;
        info!("Exported {} rows to {}", export.row_count(), path.display());
        return Ok(());
    }

    let viewer_config = ViewerConfig {
        export_path: format!("{}.view.csv", loaded.name).into(),
        ..ViewerConfig::default()
    };
    let mut terminal = ratatui::init();
    let size = terminal.size()?;
    let mut viewer = Viewer::new(table, loaded.name, viewer_config.clone(), size.width as usize);
    let ui = TableUI::new();
    let controller = Controller::new(&viewer_config);

    while viewer.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(viewer.get_uidata(), f))?;
        let message = controller.handle_event(&viewer)?;
        viewer.update(message)?;
    }

    ratatui::restore();
    Ok(())
}
