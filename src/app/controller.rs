use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use tracing::trace;

use super::viewer::Viewer;
use super::{Message, ViewerConfig};
use tablestate::TableError;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            event_poll_time: config.event_poll_time,
        }
    }

    pub fn handle_event(&self, viewer: &Viewer) -> Result<Option<Message>, TableError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    return Ok(handle_key(key, viewer.raw_keyevents()));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }
}

pub fn handle_key(key: KeyEvent, raw: bool) -> Option<Message> {
    if raw {
        return Some(Message::RawKey(key));
    }
    let message = match (key.code, key.modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
        (KeyCode::Char('q'), _) => Some(Message::Quit),
        (KeyCode::Esc, _) => Some(Message::Exit),
        (KeyCode::Char('?'), _) => Some(Message::Help),
        (KeyCode::Enter, _) => Some(Message::Enter),
        (KeyCode::Up | KeyCode::Char('k'), _) => Some(Message::MoveUp),
        (KeyCode::Down | KeyCode::Char('j'), _) => Some(Message::MoveDown),
        (KeyCode::Left | KeyCode::Char('h'), _) => Some(Message::MoveLeft),
        (KeyCode::Right | KeyCode::Char('l'), _) => Some(Message::MoveRight),
        (KeyCode::Home | KeyCode::Char('g'), _) => Some(Message::MoveBeginning),
        (KeyCode::End | KeyCode::Char('G'), _) => Some(Message::MoveEnd),
        (KeyCode::PageDown | KeyCode::Char('n'), _) => Some(Message::NextPage),
        (KeyCode::PageUp | KeyCode::Char('p'), _) => Some(Message::PreviousPage),
        (KeyCode::Char('N'), _) => Some(Message::LastPage),
        (KeyCode::Char('P'), _) => Some(Message::FirstPage),
        (KeyCode::Char('+'), _) => Some(Message::CyclePageSize),
        (KeyCode::Char('s'), _) => Some(Message::Sort),
        (KeyCode::Char('S'), _) => Some(Message::SortMulti),
        (KeyCode::Char('f'), _) => Some(Message::Filter),
        (KeyCode::Char('/'), _) => Some(Message::Search),
        (KeyCode::Char('F'), _) => Some(Message::Facets),
        (KeyCode::Char('x'), _) => Some(Message::ResetFilters),
        (KeyCode::Char('r'), _) => Some(Message::ResetAll),
        (KeyCode::Char('<'), _) => Some(Message::Narrow),
        (KeyCode::Char('>'), _) => Some(Message::Widen),
        (KeyCode::Char('H'), _) => Some(Message::MoveColumnLeft),
        (KeyCode::Char('L'), _) => Some(Message::MoveColumnRight),
        (KeyCode::Char('['), _) => Some(Message::PinLeft),
        (KeyCode::Char(']'), _) => Some(Message::PinRight),
        (KeyCode::Char('='), _) => Some(Message::Unpin),
        (KeyCode::Char('v'), _) => Some(Message::HideColumn),
        (KeyCode::Char('V'), _) => Some(Message::ShowAllColumns),
        (KeyCode::Char('e'), _) => Some(Message::Export),
        (KeyCode::Char('c'), _) => Some(Message::CopyPage),
        _ => None,
    };
    trace!("Mapped: {key:?} => {message:?}");
    message
}
