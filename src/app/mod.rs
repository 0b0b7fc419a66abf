pub mod controller;
pub mod debounce;
pub mod inputter;
pub mod logging;
pub mod ui;
pub mod viewer;

use ratatui::crossterm::event::KeyEvent;

pub const DEFAULT_EVENT_POLL_TIME: u64 = 100;
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const RESIZE_STEP: u32 = 2;

pub const HELP_TEXT: &str = "\
Navigation
  j/k, Up/Down    move row          h/l, Left/Right  move column
  g/G             first/last row    n/p              next/previous page
  P/N             first/last page   +                cycle page size

Sorting and filtering
  s               toggle sort       S                toggle sort (multi column)
  f               filter column     /                global filter
  F               column facets     x                reset filters

Columns
  </>             narrow/widen      H/L              move column left/right
  [ ] =           pin left/right/unpin
  v               hide column       V                show all columns

Rows and state
  Enter           expand row        r                reset everything
  e               export view       c                copy page to clipboard

  ?               help              Esc              close             q  quit";

/// Viewer settings that do not belong to the table engine.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub event_poll_time: u64,
    pub debounce_ms: u64,
    pub export_path: std::path::PathBuf,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            event_poll_time: DEFAULT_EVENT_POLL_TIME,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            export_path: "export.csv".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdMode {
    GlobalFilter,
    ColumnFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    Exit,
    Help,
    Enter,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MoveBeginning,
    MoveEnd,
    NextPage,
    PreviousPage,
    FirstPage,
    LastPage,
    CyclePageSize,
    Sort,
    SortMulti,
    Filter,
    Search,
    Facets,
    ResetFilters,
    ResetAll,
    Narrow,
    Widen,
    MoveColumnLeft,
    MoveColumnRight,
    PinLeft,
    PinRight,
    Unpin,
    HideColumn,
    ShowAllColumns,
    Export,
    CopyPage,
    Resize(usize, usize),
    RawKey(KeyEvent),
}
