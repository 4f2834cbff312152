use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use crate::bind::{BindPoller, BindSnapshot};
use crate::input::{Buttons, InputPoller};

/// Terminal input frontend. Drains pending key events once per tick into
/// the logical button mask; `/` opens a search line submitted with Enter.
///
/// Terminals deliver key repeats instead of held state, so hold-to-repeat
/// acceleration comes from the OS repeat rate here; game controllers get
/// the real thing through the SDL frontend.
pub struct TermPoller {
    raw_mode: bool,
    searching: bool,
    search_buf: String,
    submitted: Option<String>,
    skip_flag: Arc<AtomicBool>,
}

impl TermPoller {
    pub fn new() -> std::io::Result<TermPoller> {
        terminal::enable_raw_mode()?;
        Ok(TermPoller {
            raw_mode: true,
            searching: false,
            search_buf: String::new(),
            submitted: None,
            skip_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    #[cfg(test)]
    fn detached() -> TermPoller {
        TermPoller {
            raw_mode: false,
            searching: false,
            search_buf: String::new(),
            submitted: None,
            skip_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Companion bind poller: no joypad access, Enter acts as the skip key.
    pub fn bind_poller(&self) -> TermBindPoller {
        TermBindPoller {
            skip: self.skip_flag.clone(),
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> Buttons {
        if key.kind == KeyEventKind::Release {
            return Buttons::NONE;
        }

        if self.searching {
            match key.code {
                KeyCode::Enter => {
                    self.searching = false;
                    self.submitted = Some(std::mem::take(&mut self.search_buf));
                }
                KeyCode::Esc => {
                    self.searching = false;
                    self.search_buf.clear();
                }
                KeyCode::Backspace => {
                    self.search_buf.pop();
                }
                KeyCode::Char(c) => self.search_buf.push(c),
                _ => {}
            }
            return Buttons::NONE;
        }

        match key.code {
            KeyCode::Char('/') => {
                self.searching = true;
                self.search_buf.clear();
                Buttons::NONE
            }
            KeyCode::Enter => {
                self.skip_flag.store(true, Ordering::Relaxed);
                Buttons::A
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Buttons::QUIT,
            KeyCode::Up => Buttons::UP,
            KeyCode::Down => Buttons::DOWN,
            KeyCode::Left => Buttons::LEFT,
            KeyCode::Right => Buttons::RIGHT,
            KeyCode::Backspace => Buttons::B,
            KeyCode::Char('x') => Buttons::A,
            KeyCode::Char('z') => Buttons::B,
            KeyCode::PageUp => Buttons::L,
            KeyCode::PageDown => Buttons::R,
            KeyCode::Char(' ') => Buttons::START,
            KeyCode::F(1) => Buttons::MENU_TOGGLE,
            KeyCode::Esc => Buttons::QUIT,
            _ => Buttons::NONE,
        }
    }
}

impl Drop for TermPoller {
    fn drop(&mut self) {
        if self.raw_mode {
            let _ = terminal::disable_raw_mode();
        }
    }
}

impl InputPoller for TermPoller {
    fn poll(&mut self) -> Buttons {
        let mut buttons = Buttons::NONE;
        while matches!(event::poll(Duration::ZERO), Ok(true)) {
            match event::read() {
                Ok(Event::Key(key)) => buttons = buttons | self.handle_key(&key),
                Ok(_) => {}
                Err(e) => {
                    log::warn!("terminal event read failed: {}", e);
                    break;
                }
            }
        }
        buttons
    }

    fn take_search(&mut self) -> Option<String> {
        self.submitted.take()
    }
}

pub struct TermBindPoller {
    skip: Arc<AtomicBool>,
}

impl BindPoller for TermBindPoller {
    fn poll(&mut self) -> BindSnapshot {
        let mut snap = BindSnapshot::empty();
        snap.skip = self.skip.swap(false, Ordering::Relaxed);
        snap
    }
}
