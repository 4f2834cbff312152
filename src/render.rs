use crate::list::EntryList;

/// Everything a renderer needs for one frame. Built by the menu context
/// after dispatch; the renderer never mutates menu state.
pub struct Screen<'a> {
    pub title: String,
    pub entries: &'a EntryList,
    /// Per-row value column (setting values, "(DIR)" markers, paths).
    pub values: Vec<String>,
    pub cursor: usize,
    pub need_refresh: bool,
    pub msg_force: bool,
    pub message: Option<&'a str>,
}

/// Presentation seam. Swapping the renderer must not fork the menu logic.
pub trait MenuRenderer {
    fn render(&mut self, screen: &Screen<'_>);

    fn teardown(&mut self) {}
}

/// Rows visible at once in the text renderer.
const TERM_HEIGHT: usize = 20;

/// Plain text renderer: one line per visible row, `*` marks the selection.
/// Only reprints when the visible content changes, so a 60 Hz menu loop does
/// not flood the terminal.
pub struct TextRenderer {
    last_frame: String,
    out: Box<dyn std::io::Write + Send>,
}

impl TextRenderer {
    pub fn new() -> TextRenderer {
        TextRenderer {
            last_frame: String::new(),
            out: Box::new(std::io::stdout()),
        }
    }

    #[cfg(test)]
    fn sink(out: Box<dyn std::io::Write + Send>) -> TextRenderer {
        TextRenderer {
            last_frame: String::new(),
            out,
        }
    }

    fn compose(screen: &Screen<'_>) -> String {
        // Center the selection in the visible window; pin the window when
        // everything fits.
        let size = screen.entries.len();
        let mut begin = if screen.cursor >= TERM_HEIGHT / 2 {
            screen.cursor - TERM_HEIGHT / 2
        } else {
            0
        };
        if size <= TERM_HEIGHT {
            begin = 0;
        }
        let end = (begin + TERM_HEIGHT).min(size);

        let mut s = String::new();
        s.push_str(&format!("--- {} ---\r\n", screen.title));
        for i in begin..end {
            let entry = screen.entries.get(i).expect("index within bounds");
            let marker = if i == screen.cursor { '*' } else { ' ' };
            let label = entry.alt_label.as_deref().unwrap_or(&entry.label);
            let value = screen.values.get(i).map(String::as_str).unwrap_or("");
            if value.is_empty() {
                s.push_str(&format!("{} {}\r\n", marker, label));
            } else {
                s.push_str(&format!("{} {:<40} {}\r\n", marker, label, value));
            }
        }
        if let Some(msg) = screen.message {
            s.push_str(&format!(">>> {}\r\n", msg));
        }
        s
    }
}

impl Default for TextRenderer {
    fn default() -> Self {
        TextRenderer::new()
    }
}

impl MenuRenderer for TextRenderer {
    fn render(&mut self, screen: &Screen<'_>) {
        // A pending refresh means the list is stale; skip unless a message
        // forces the frame through.
        if screen.need_refresh && !screen.msg_force {
            return;
        }
        let frame = Self::compose(screen);
        if frame == self.last_frame {
            return;
        }
        let _ = self.out.write_all(frame.as_bytes());
        let _ = self.out.flush();
        self.last_frame = frame;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::{EntryKind, EntryList};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn list(names: &[&str]) -> EntryList {
        let mut l = EntryList::new();
        for n in names {
            l.push(*n, EntryKind::File, 0);
        }
        l
    }

    fn screen<'a>(entries: &'a EntryList, cursor: usize) -> Screen<'a> {
        Screen {
            title: "Main Menu".to_string(),
            entries,
            values: vec![String::new(); entries.len()],
            cursor,
            need_refresh: false,
            msg_force: false,
            message: None,
        }
    }

    #[test]
    fn marks_selected_row() {
        let entries = list(&["alpha", "beta"]);
        let out = Captured::default();
        let mut r = TextRenderer::sink(Box::new(out.clone()));
        r.render(&screen(&entries, 1));
        let text = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains("  alpha"));
        assert!(text.contains("* beta"));
    }

    #[test]
    fn skips_stale_frames_unless_forced() {
        let entries = list(&["alpha"]);
        let out = Captured::default();
        let mut r = TextRenderer::sink(Box::new(out.clone()));

        let mut s = screen(&entries, 0);
        s.need_refresh = true;
        r.render(&s);
        assert!(out.0.lock().unwrap().is_empty());

        s.msg_force = true;
        s.message = Some("loading");
        r.render(&s);
        let text = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains(">>> loading"));
    }

    #[test]
    fn identical_frames_print_once() {
        let entries = list(&["alpha"]);
        let out = Captured::default();
        let mut r = TextRenderer::sink(Box::new(out.clone()));
        r.render(&screen(&entries, 0));
        let first_len = out.0.lock().unwrap().len();
        r.render(&screen(&entries, 0));
        assert_eq!(out.0.lock().unwrap().len(), first_len);
    }
}
