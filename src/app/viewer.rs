use std::fs::File;
use std::time::{Duration, Instant};

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, info, trace, warn};

use tablestate::value::parse_date;
use tablestate::{
    ExportScope, FilterMode, FilterValue, PinSide, Record, SortAction, TableError, TableModel,
    to_delimited_string, write_delimited,
};

use super::debounce::Debouncer;
use super::inputter::{InputResult, Inputter};
use super::{CmdMode, HELP_TEXT, Message, RESIZE_STEP, ViewerConfig};

const SORT_ASCENDING: &str = "▲";
const SORT_DESCENDING: &str = "▼";
const RANGE_SEPARATOR: &str = "..";

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
    FACETS,
}

/// Value distribution of one column, as shown in the facets panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetData {
    pub column_id: String,
    pub header: String,
    pub values: Vec<(String, usize)>,
    pub range: Option<(f64, f64)>,
    pub selected: usize,
}

/// Everything the ui needs to draw one frame.
#[derive(Debug, Clone, Default)]
pub struct UIData {
    pub name: String,
    pub headers: Vec<String>,
    pub widths: Vec<u16>,
    pub pins: Vec<PinSide>,
    pub rows: Vec<Vec<String>>,
    pub expanded: Vec<bool>,
    pub selected_row: usize,
    pub selected_column: usize,
    /// Fields of the selected row when it is expanded.
    pub detail: Option<Vec<(String, String)>>,
    pub facets: Option<FacetData>,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CmdMode>,
    pub active_cmdinput: bool,
    pub status_line: String,
    pub status_message: String,
    pub last_status_message_update: Option<Instant>,
}

pub struct Viewer {
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    config: ViewerConfig,
    table: TableModel<Record>,
    name: String,
    curser_row: usize,
    curser_column: usize,
    offset_column: usize,
    width: usize,
    input: Inputter,
    cmd_mode: Option<CmdMode>,
    filter_column: Option<String>,
    global_filter_before: String,
    search: Debouncer<String>,
    facets: Option<FacetData>,
    clipboard: Option<Clipboard>,
    uidata: UIData,
}

impl Viewer {
    pub fn new(
        table: TableModel<Record>,
        name: impl Into<String>,
        config: ViewerConfig,
        ui_width: usize,
    ) -> Self {
        let search = Debouncer::new(Duration::from_millis(config.debounce_ms));
        let mut viewer = Viewer {
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            config,
            table,
            name: name.into(),
            curser_row: 0,
            curser_column: 0,
            offset_column: 0,
            width: ui_width,
            input: Inputter::default(),
            cmd_mode: None,
            filter_column: None,
            global_filter_before: String::new(),
            search,
            facets: None,
            clipboard: None,
            uidata: UIData::default(),
        };
        viewer.set_status_message(format!(
            "Loaded {} rows, press ? for help",
            viewer.table.view().total_row_count
        ));
        viewer.update_uidata();
        viewer
    }

    pub fn table(&self) -> &TableModel<Record> {
        &self.table
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn quit(&mut self) {
        // A search still waiting for its quiet period is committed before leaving.
        if let Some(query) = self.search.flush() {
            self.table.set_global_filter(query);
        }
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), TableError> {
        if let Some(query) = self.search.poll() {
            trace!("Debounced global filter: {query}");
            self.table.set_global_filter(query);
        }

        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit => {}
                    Message::Help => self.show_help(),
                    Message::Enter => self.toggle_expanded(),
                    Message::MoveUp => self.move_selection_up(),
                    Message::MoveDown => self.move_selection_down(),
                    Message::MoveLeft => self.move_selection_left(),
                    Message::MoveRight => self.move_selection_right(),
                    Message::MoveBeginning => self.curser_row = 0,
                    Message::MoveEnd => self.curser_row = usize::MAX,
                    Message::NextPage => {
                        self.table.next_page();
                    }
                    Message::PreviousPage => {
                        self.table.previous_page();
                    }
                    Message::FirstPage => {
                        self.table.first_page();
                    }
                    Message::LastPage => {
                        self.table.last_page();
                    }
                    Message::CyclePageSize => self.cycle_page_size(),
                    Message::Sort => self.sort_current_column(false),
                    Message::SortMulti => self.sort_current_column(true),
                    Message::Filter => self.enter_column_filter(),
                    Message::Search => self.enter_global_filter(),
                    Message::Facets => self.build_facet_view(),
                    Message::ResetFilters => {
                        if self.table.reset_filters() {
                            self.set_status_message("Filters cleared");
                        }
                    }
                    Message::ResetAll => {
                        if self.table.reset_all() {
                            self.set_status_message("View reset");
                        }
                    }
                    Message::Narrow => self.resize_current_column(false),
                    Message::Widen => self.resize_current_column(true),
                    Message::MoveColumnLeft => self.move_current_column(false),
                    Message::MoveColumnRight => self.move_current_column(true),
                    Message::PinLeft => self.pin_current_column(PinSide::Left),
                    Message::PinRight => self.pin_current_column(PinSide::Right),
                    Message::Unpin => self.pin_current_column(PinSide::None),
                    Message::HideColumn => self.hide_current_column(),
                    Message::ShowAllColumns => {
                        self.table.reset_column_visibility();
                    }
                    Message::Export => {
                        let result = self.export();
                        self.report(result);
                    }
                    Message::CopyPage => {
                        let result = self.copy_page();
                        self.report(result);
                    }
                    Message::Resize(width, _) => self.width = width,
                    Message::RawKey(_) => {}
                },
                Modus::FACETS => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveUp => self.move_facet_selection(false),
                    Message::MoveDown => self.move_facet_selection(true),
                    Message::Enter => self.apply_facet(),
                    Message::Exit | Message::Facets => self.exit(),
                    Message::Help => self.show_help(),
                    Message::Resize(width, _) => self.width = width,
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, _) => self.width = width,
                    Message::Exit | Message::Enter | Message::Help => self.exit(),
                    _ => (),
                },
                Modus::CMDINPUT => {
                    if let Message::RawKey(key) = msg {
                        self.raw_input(key)
                    }
                }
            }
        }

        self.update_uidata();
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        match self.modus {
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
            }
            Modus::FACETS => {
                self.facets = None;
                self.modus = Modus::TABLE;
                self.previous_modus = Modus::FACETS;
            }
            Modus::TABLE | Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.uidata.status_message = message.into();
        self.uidata.last_status_message_update = Some(Instant::now());
    }

    fn report(&mut self, result: Result<String, TableError>) {
        match result {
            Ok(message) => self.set_status_message(message),
            Err(e) => {
                warn!("Action failed: {e}");
                self.set_status_message(format!("Error: {e}"));
            }
        }
    }

    fn current_column_id(&self) -> Option<String> {
        self.table
            .visible_columns()
            .get(self.curser_column)
            .map(|c| c.id().to_string())
    }

    fn focus_column(&mut self, column_id: &str) {
        if let Some(pos) = self
            .table
            .visible_columns()
            .iter()
            .position(|c| c.id() == column_id)
        {
            self.curser_column = pos;
        }
    }

    fn move_selection_up(&mut self) {
        if self.curser_row > 0 {
            self.curser_row -= 1;
        } else if self.table.previous_page() {
            self.curser_row = usize::MAX;
        }
    }

    fn move_selection_down(&mut self) {
        let nrows = self.table.view().rows.len();
        if self.curser_row + 1 < nrows {
            self.curser_row += 1;
        } else if self.table.next_page() {
            self.curser_row = 0;
        }
    }

    fn move_selection_left(&mut self) {
        self.curser_column = self.curser_column.saturating_sub(1);
    }

    fn move_selection_right(&mut self) {
        self.curser_column += 1;
    }

    fn cycle_page_size(&mut self) {
        let current = self.table.state().pagination.page_size;
        let next = self.table.config().next_page_size(current);
        if self.table.set_page_size(next) {
            self.set_status_message(format!("{next} rows per page"));
        }
    }

    fn sort_current_column(&mut self, multi: bool) {
        if let Some(id) = self.current_column_id()
            && !self.table.set_sort(&id, SortAction::Toggle, multi)
        {
            self.set_status_message(format!("Column {id} cannot be sorted"));
        }
    }

    fn resize_current_column(&mut self, wider: bool) {
        let Some(id) = self.current_column_id() else {
            return;
        };
        let Some(width) = self.table.column_width(&id) else {
            return;
        };
        let width = if wider {
            width.saturating_add(RESIZE_STEP)
        } else {
            width.saturating_sub(RESIZE_STEP)
        };
        self.table.resize_column(&id, width);
    }

    fn move_current_column(&mut self, right: bool) {
        let Some(id) = self.current_column_id() else {
            return;
        };
        let order = &self.table.state().column_order;
        let Some(pos) = order.iter().position(|c| *c == id) else {
            return;
        };
        let target = if right {
            pos + 1
        } else {
            pos.saturating_sub(1)
        };
        if self.table.move_column(&id, target) {
            self.focus_column(&id);
        }
    }

    fn pin_current_column(&mut self, side: PinSide) {
        if let Some(id) = self.current_column_id()
            && self.table.pin_column(&id, side)
        {
            self.focus_column(&id);
        }
    }

    fn hide_current_column(&mut self) {
        if let Some(id) = self.current_column_id() {
            if self.table.set_column_visibility(&id, false) {
                self.set_status_message(format!("Column {id} hidden, V shows all"));
            } else {
                self.set_status_message(format!("Column {id} cannot be hidden"));
            }
        }
    }

    fn toggle_expanded(&mut self) {
        let key = self
            .table
            .page_rows()
            .get(self.curser_row)
            .map(|r| r.key.clone());
        if let Some(key) = key {
            self.table.toggle_row_expanded(&key);
        }
    }

    fn export(&mut self) -> Result<String, TableError> {
        let export = self.table.export(ExportScope::Filtered);
        let path = &self.config.export_path;
        let mut file = File::create(path)?;
        write_delimited(&export, &mut file, b',')?;
        info!("Exported {} rows to {}", export.row_count(), path.display());
        Ok(format!(
            "Exported {} rows to {}",
            export.row_count(),
            path.display()
        ))
    }

    fn copy_page(&mut self) -> Result<String, TableError> {
        let export = self.table.export(ExportScope::CurrentPage);
        let text = to_delimited_string(&export, b'\t')?;
        if self.clipboard.is_none() {
            let clipboard = Clipboard::new().map_err(|e| TableError::Clipboard(e.to_string()))?;
            self.clipboard = Some(clipboard);
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            clipboard
                .set_text(text)
                .map_err(|e| TableError::Clipboard(e.to_string()))?;
        }
        Ok(format!("Copied {} rows to clipboard", export.row_count()))
    }

    // -------------------- Command line ---------------------- //

    fn enter_cmd_mode(&mut self, mode: CmdMode, prefill: &str) {
        trace!("Entering command mode {mode:?}");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.input.clear();
        self.input.set(prefill);
    }

    fn leave_cmd_mode(&mut self) {
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;
        self.cmd_mode = None;
        self.filter_column = None;
    }

    fn enter_global_filter(&mut self) {
        self.global_filter_before = self.table.state().global_filter.clone();
        let prefill = self.global_filter_before.clone();
        self.enter_cmd_mode(CmdMode::GlobalFilter, &prefill);
    }

    fn enter_column_filter(&mut self) {
        let Some(id) = self.current_column_id() else {
            return;
        };
        if !self.table.column(&id).is_some_and(|c| c.is_filterable()) {
            self.set_status_message(format!("Column {id} cannot be filtered"));
            return;
        }
        let prefill = self
            .table
            .state()
            .column_filters
            .get(&id)
            .map(format_filter)
            .unwrap_or_default();
        self.filter_column = Some(id);
        self.enter_cmd_mode(CmdMode::ColumnFilter, &prefill);
    }

    fn raw_input(&mut self, key: KeyEvent) {
        let result = self.input.read(key);
        match self.cmd_mode {
            Some(CmdMode::GlobalFilter) => {
                if result.canceled {
                    self.search.cancel();
                    let before = std::mem::take(&mut self.global_filter_before);
                    self.table.set_global_filter(before);
                } else if result.finished {
                    self.search.cancel();
                    self.table.set_global_filter(result.input.clone());
                } else {
                    self.search.push(result.input.clone());
                }
            }
            Some(CmdMode::ColumnFilter) => {
                if result.finished && !result.canceled {
                    self.apply_column_filter(&result.input);
                }
            }
            None => {}
        }
        if result.finished {
            self.leave_cmd_mode();
        }
    }

    fn apply_column_filter(&mut self, input: &str) {
        let Some(id) = self.filter_column.clone() else {
            return;
        };
        let Some(mode) = self.table.column(&id).map(|c| c.filter_mode()) else {
            return;
        };
        match parse_filter(mode, input) {
            Ok(value) => {
                debug!("Filter on {id}: {value:?}");
                self.table.set_column_filter(&id, value);
            }
            Err(e) => self.set_status_message(e),
        }
    }

    // -------------------- Facets ---------------------- //

    fn build_facet_view(&mut self) {
        let Some(id) = self.current_column_id() else {
            return;
        };
        let Some(facets) = self.table.view().facets.get(&id) else {
            self.set_status_message(format!("Column {id} has no facets"));
            return;
        };
        let mut values: Vec<(String, usize)> = facets
            .counts
            .iter()
            .map(|(value, count)| (value.clone(), *count))
            .collect();
        values.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let range = facets.min.zip(facets.max);
        let header = self
            .table
            .column(&id)
            .map(|c| c.header().to_string())
            .unwrap_or_default();
        self.facets = Some(FacetData {
            column_id: id,
            header,
            values,
            range,
            selected: 0,
        });
        self.previous_modus = self.modus;
        self.modus = Modus::FACETS;
    }

    fn move_facet_selection(&mut self, down: bool) {
        if let Some(facets) = self.facets.as_mut() {
            let last = facets.values.len().saturating_sub(1);
            facets.selected = if down {
                (facets.selected + 1).min(last)
            } else {
                facets.selected.saturating_sub(1)
            };
        }
    }

    /// Narrow the table to the selected facet value. On a select column the value is toggled in
    /// the current selection.
    fn apply_facet(&mut self) {
        let Some(facets) = self.facets.take() else {
            return;
        };
        let Some((value, _)) = facets.values.get(facets.selected) else {
            self.exit();
            return;
        };
        let id = facets.column_id.clone();
        let mode = self
            .table
            .column(&id)
            .map(|c| c.filter_mode())
            .unwrap_or(FilterMode::None);
        let filter = match mode {
            FilterMode::Select => {
                let mut selected = match self.table.state().column_filters.get(&id) {
                    Some(FilterValue::Select(selected)) => selected.clone(),
                    _ => Vec::new(),
                };
                if let Some(pos) = selected.iter().position(|s| s == value) {
                    selected.remove(pos);
                } else {
                    selected.push(value.clone());
                }
                Some(FilterValue::Select(selected))
            }
            FilterMode::Text => Some(FilterValue::Text(value.clone())),
            FilterMode::Number | FilterMode::NumberRange => value.parse::<f64>().ok().map(|n| {
                if mode == FilterMode::Number {
                    FilterValue::Number(n)
                } else {
                    FilterValue::NumberRange {
                        min: Some(n),
                        max: Some(n),
                    }
                }
            }),
            FilterMode::DateRange | FilterMode::None => None,
        };
        match filter {
            Some(filter) => {
                self.table.set_column_filter(&id, Some(filter));
            }
            None => self.set_status_message(format!("Use f to filter column {id}")),
        }
        self.exit();
    }

    // -------------------- UI data ---------------------- //

    /// Indices into the visible columns that fit on screen: every pinned column plus a window of
    /// unpinned ones that keeps the cursor column in view.
    fn rendered_columns(&mut self) -> Vec<usize> {
        let layout = self.table.column_layout();
        let pinned_width: usize = layout
            .iter()
            .filter(|l| l.pin != PinSide::None)
            .map(|l| l.width as usize + 1)
            .sum();
        let available = self.width.saturating_sub(pinned_width);
        let centre: Vec<usize> = (0..layout.len())
            .filter(|&i| layout[i].pin == PinSide::None)
            .collect();

        if let Some(cursor) = centre.iter().position(|&i| i == self.curser_column) {
            self.offset_column = self.offset_column.min(cursor);
            let span = |from: usize| -> usize {
                centre[from..=cursor]
                    .iter()
                    .map(|&i| layout[i].width as usize + 1)
                    .sum()
            };
            while self.offset_column < cursor && span(self.offset_column) > available {
                self.offset_column += 1;
            }
        }
        self.offset_column = self.offset_column.min(centre.len().saturating_sub(1));

        let mut used = 0;
        let mut shown_centre = Vec::new();
        for &i in centre.iter().skip(self.offset_column) {
            let w = layout[i].width as usize + 1;
            if !shown_centre.is_empty() && used + w > available {
                break;
            }
            used += w;
            shown_centre.push(i);
        }

        (0..layout.len())
            .filter(|&i| layout[i].pin == PinSide::Left)
            .chain(shown_centre)
            .chain((0..layout.len()).filter(|&i| layout[i].pin == PinSide::Right))
            .collect()
    }

    fn header_for(&self, column_id: &str, header: &str) -> String {
        let state = self.table.state();
        let mut text = header.to_string();
        if let Some(pos) = state.sorting.iter().position(|s| s.column_id == column_id) {
            let arrow = if state.sorting[pos].descending {
                SORT_DESCENDING
            } else {
                SORT_ASCENDING
            };
            text.push(' ');
            text.push_str(arrow);
            if state.sorting.len() > 1 {
                text.push_str(&(pos + 1).to_string());
            }
        }
        if state.column_filters.contains_key(column_id) {
            text.push_str(" *");
        }
        text
    }

    fn status_line(&self) -> String {
        let view = self.table.view();
        let state = self.table.state();
        let mut parts = vec![
            self.name.clone(),
            format!("{}/{} rows", view.filtered_row_count, view.total_row_count),
            format!("page {}/{}", view.page_index + 1, view.page_count),
        ];
        if !state.column_filters.is_empty() {
            parts.push(format!("{} filters", state.column_filters.len()));
        }
        if !state.global_filter.is_empty() {
            parts.push(format!("search \"{}\"", state.global_filter));
        }
        parts.join(" | ")
    }

    fn update_uidata(&mut self) {
        let nvisible = self.table.visible_columns().len();
        self.curser_column = self.curser_column.min(nvisible.saturating_sub(1));
        let nrows = self.table.view().rows.len();
        self.curser_row = self.curser_row.min(nrows.saturating_sub(1));

        let rendered = self.rendered_columns();
        let visible = self.table.visible_columns();
        let columns: Vec<_> = rendered.iter().map(|&i| visible[i]).collect();
        let page = self.table.page_rows();

        let headers = columns
            .iter()
            .map(|c| self.header_for(c.id(), c.header()))
            .collect();
        let widths = columns
            .iter()
            .map(|c| {
                self.table
                    .column_width(c.id())
                    .unwrap_or(c.initial_width())
                    .min(u16::MAX as u32) as u16
            })
            .collect();
        let pins = columns
            .iter()
            .map(|c| self.table.state().pin_side(c.id()))
            .collect();
        let rows = page
            .iter()
            .map(|r| columns.iter().map(|c| c.value(r).display()).collect())
            .collect();
        let expanded: Vec<bool> = page.iter().map(|r| self.table.is_row_expanded(r)).collect();
        let detail = page
            .get(self.curser_row)
            .filter(|r| self.table.is_row_expanded(r))
            .map(|r| {
                self.table
                    .columns()
                    .iter()
                    .filter(|c| !c.is_action())
                    .map(|c| (c.header().to_string(), c.value(r).display()))
                    .collect()
            });
        let selected_column = rendered
            .iter()
            .position(|&i| i == self.curser_column)
            .unwrap_or(0);
        let status_line = self.status_line();

        let uidata = &mut self.uidata;
        uidata.name = self.name.clone();
        uidata.headers = headers;
        uidata.widths = widths;
        uidata.pins = pins;
        uidata.rows = rows;
        uidata.expanded = expanded;
        uidata.selected_row = self.curser_row;
        uidata.selected_column = selected_column;
        uidata.detail = detail;
        uidata.facets = if self.modus == Modus::FACETS {
            self.facets.clone()
        } else {
            None
        };
        uidata.show_popup = self.modus == Modus::POPUP;
        uidata.popup_message = HELP_TEXT.to_string();
        uidata.cmdinput = self.input.get();
        uidata.cmd_mode = self.cmd_mode;
        uidata.active_cmdinput = self.modus == Modus::CMDINPUT;
        uidata.status_line = status_line;
    }
}

/// Parse command line input into a filter value for a column of `mode`. Empty input clears.
///
/// Ranges are written `min..max`; either side may be left out.
pub fn parse_filter(mode: FilterMode, input: &str) -> Result<Option<FilterValue>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let number = |s: &str| -> Result<Option<f64>, String> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(None);
        }
        s.parse::<f64>()
            .map(Some)
            .map_err(|_| format!("Not a number: {s}"))
    };
    let date = |s: &str| -> Result<Option<chrono::NaiveDate>, String> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(None);
        }
        parse_date(s)
            .map(Some)
            .ok_or_else(|| format!("Not a date: {s}"))
    };

    let value = match mode {
        FilterMode::None => return Ok(None),
        FilterMode::Text => FilterValue::Text(input.to_string()),
        FilterMode::Number => match number(input)? {
            Some(n) => FilterValue::Number(n),
            None => return Ok(None),
        },
        FilterMode::NumberRange => match input.split_once(RANGE_SEPARATOR) {
            Some((min, max)) => FilterValue::NumberRange {
                min: number(min)?,
                max: number(max)?,
            },
            None => {
                let n = number(input)?;
                FilterValue::NumberRange { min: n, max: n }
            }
        },
        FilterMode::Select => FilterValue::Select(
            input
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        ),
        FilterMode::DateRange => match input.split_once(RANGE_SEPARATOR) {
            Some((start, end)) => FilterValue::DateRange {
                start: date(start)?,
                end: date(end)?,
            },
            None => return Err(format!("Expected start{RANGE_SEPARATOR}end")),
        },
    };
    Ok(Some(value))
}

pub fn format_filter(value: &FilterValue) -> String {
    let opt = |v: Option<String>| v.unwrap_or_default();
    match value {
        FilterValue::Text(s) => s.clone(),
        FilterValue::Number(n) => n.to_string(),
        FilterValue::NumberRange { min, max } => format!(
            "{}{RANGE_SEPARATOR}{}",
            opt(min.map(|n| n.to_string())),
            opt(max.map(|n| n.to_string()))
        ),
        FilterValue::Select(values) => values.join(", "),
        FilterValue::DateRange { start, end } => format!(
            "{}{RANGE_SEPARATOR}{}",
            opt(start.map(|d| d.to_string())),
            opt(end.map(|d| d.to_string()))
        ),
    }
}
