use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState},
};

use super::CmdMode;
use super::viewer::{FacetData, UIData};
use tablestate::PinSide;

pub const CMDLINE_HEIGH: u16 = 1;
pub const STATUSLINE_HEIGHT: u16 = 1;
pub const DETAIL_MAX_HEIGHT: u16 = 10;
const GUTTER_WIDTH: u16 = 2;

const EXPANDED_MARKER: &str = "▾";
const COLLAPSED_MARKER: &str = "▸";

#[derive(Debug, Default)]
pub struct TableUI;

impl TableUI {
    pub fn new() -> Self {
        Self
    }

    pub fn draw(&self, uidata: &UIData, frame: &mut Frame) {
        let detail_height = uidata
            .detail
            .as_ref()
            .map(|d| (d.len() as u16 + 2).min(DETAIL_MAX_HEIGHT))
            .unwrap_or(0);
        let [table_area, detail_area, status_area, cmd_area] = Layout::vertical([
            Constraint::Min(3),
            Constraint::Length(detail_height),
            Constraint::Length(STATUSLINE_HEIGHT),
            Constraint::Length(CMDLINE_HEIGH),
        ])
        .areas(frame.area());

        self.draw_table(uidata, frame, table_area);
        if let Some(detail) = &uidata.detail {
            self.draw_detail(detail, frame, detail_area);
        }
        self.draw_statusline(uidata, frame, status_area);
        self.draw_cmdline(uidata, frame, cmd_area);

        if let Some(facets) = &uidata.facets {
            self.draw_facets(facets, frame);
        }
        if uidata.show_popup {
            self.draw_popup(&uidata.popup_message, frame);
        }
    }

    fn draw_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let header_cells = std::iter::once(Cell::from("")).chain(
            uidata
                .headers
                .iter()
                .zip(uidata.pins.iter())
                .map(|(h, pin)| {
                    let style = match pin {
                        PinSide::None => Style::default(),
                        _ => Style::default().fg(Color::Cyan),
                    };
                    Cell::from(h.as_str()).style(style)
                }),
        );
        let header = Row::new(header_cells).add_modifier(Modifier::BOLD);

        let rows = uidata.rows.iter().enumerate().map(|(ridx, cells)| {
            let marker = if uidata.expanded.get(ridx).copied().unwrap_or(false) {
                EXPANDED_MARKER
            } else {
                COLLAPSED_MARKER
            };
            Row::new(
                std::iter::once(Cell::from(marker))
                    .chain(cells.iter().map(|c| Cell::from(c.as_str()))),
            )
        });

        let widths = std::iter::once(Constraint::Length(GUTTER_WIDTH))
            .chain(uidata.widths.iter().map(|&w| Constraint::Length(w)));

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::bordered().title(Line::from(format!(" {} ", uidata.name)).bold()))
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .cell_highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

        let mut state = TableState::default();
        if !uidata.rows.is_empty() {
            state.select(Some(uidata.selected_row));
            state.select_column(Some(uidata.selected_column + 1));
        }
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_detail(&self, detail: &[(String, String)], frame: &mut Frame, area: Rect) {
        let label_width = detail.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
        let lines: Vec<Line> = detail
            .iter()
            .map(|(k, v)| {
                Line::from(vec![
                    Span::styled(format!("{k:>label_width$}: "), Style::default().bold()),
                    Span::raw(v.as_str()),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines).block(Block::bordered()), area);
    }

    fn draw_statusline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let line = Line::from(vec![
            Span::styled(uidata.status_line.as_str(), Style::default().fg(Color::Green)),
            Span::raw("  "),
            Span::raw(uidata.status_message.as_str()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_cmdline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if !uidata.active_cmdinput {
            return;
        }
        let prompt = match uidata.cmd_mode {
            Some(CmdMode::GlobalFilter) => "/",
            Some(CmdMode::ColumnFilter) => "filter: ",
            None => ":",
        };
        let line = Line::from(vec![
            Span::styled(prompt, Style::default().bold()),
            Span::raw(uidata.cmdinput.input.as_str()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        let x = area.x + (prompt.chars().count() + uidata.cmdinput.curser_pos) as u16;
        frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
    }

    fn draw_facets(&self, facets: &FacetData, frame: &mut Frame) {
        let area = popup_area(frame.area(), 50, 60);
        let count_width = facets
            .values
            .iter()
            .map(|(_, c)| c.to_string().len())
            .max()
            .unwrap_or(1);
        let items: Vec<ListItem> = facets
            .values
            .iter()
            .map(|(value, count)| ListItem::new(format!("{count:>count_width$}  {value}")))
            .collect();
        let title = match facets.range {
            Some((min, max)) => format!(" {} [{min} .. {max}] ", facets.header),
            None => format!(" {} ", facets.header),
        };
        let list = List::new(items)
            .block(Block::bordered().title(title))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        let mut state = ListState::default();
        state.select(Some(facets.selected));
        frame.render_widget(Clear, area);
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_popup(&self, message: &str, frame: &mut Frame) {
        let area = popup_area(frame.area(), 80, 80);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(message).block(Block::bordered().title(" Help ")),
            area,
        );
    }
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}
