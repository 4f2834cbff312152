use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sdl2::controller::{Axis, Button as CButton, GameController};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::Color;
use sdl2::rect::Rect;
use sdl2::render::{TextureCreator, WindowCanvas};
use sdl2::ttf::Font;
use sdl2::video::WindowContext;
use sdl2::EventPump;

use crate::bind::{BindPoller, BindSnapshot, MAX_AXES, MAX_BUTTONS};
use crate::input::{Buttons, InputPoller};
use crate::render::{MenuRenderer, Screen};

const ROW_H: i32 = 28;

const BG: Color = Color::RGB(12, 12, 12);
const ROW_SELECTED: Color = Color::RGB(80, 80, 80);
const TEXT: Color = Color::RGB(220, 220, 220);
const TITLE: Color = Color::RGB(240, 240, 240);
const MESSAGE_BG: Color = Color::RGB(40, 40, 40);

/// Raw controller buttons in snapshot index order.
const PAD_BUTTONS: [CButton; 15] = [
    CButton::A,
    CButton::B,
    CButton::X,
    CButton::Y,
    CButton::Back,
    CButton::Guide,
    CButton::Start,
    CButton::LeftStick,
    CButton::RightStick,
    CButton::LeftShoulder,
    CButton::RightShoulder,
    CButton::DPadUp,
    CButton::DPadDown,
    CButton::DPadLeft,
    CButton::DPadRight,
];

const PAD_AXES: [Axis; 6] = [
    Axis::LeftX,
    Axis::LeftY,
    Axis::RightX,
    Axis::RightY,
    Axis::TriggerLeft,
    Axis::TriggerRight,
];

fn find_font_path() -> Option<String> {
    if let Ok(p) = std::env::var("FONT_PATH") {
        return Some(p);
    }
    let candidates = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    ];
    candidates
        .iter()
        .find(|p| Path::new(p).exists())
        .map(|s| s.to_string())
}

/// Window plus controller frontend. Returns the input poller, the renderer
/// and a bind poller sharing the opened controllers.
pub fn init() -> Result<(SdlInput, SdlRenderer, SdlBindPoller), String> {
    let sdl = sdl2::init()?;
    let video = sdl.video()?;
    let controller_subsystem = sdl.game_controller()?;

    // Keep opened controllers alive for the lifetime of the frontend.
    let mut controllers: Vec<GameController> = Vec::new();
    for id in 0..sdl.joystick()?.num_joysticks()? {
        if controller_subsystem.is_game_controller(id) {
            match controller_subsystem.open(id) {
                Ok(gc) => {
                    log::info!("opened controller: {}", gc.name());
                    controllers.push(gc);
                }
                Err(e) => log::warn!("failed opening controller {}: {}", id, e),
            }
        }
    }
    let controllers = Rc::new(RefCell::new(controllers));

    let window = video
        .window("retro_frontend", 1280, 720)
        .position_centered()
        .build()
        .map_err(|e| e.to_string())?;
    let canvas = window
        .into_canvas()
        .accelerated()
        .present_vsync()
        .build()
        .map_err(|e| e.to_string())?;

    // The ttf context must outlive the font; the frontend lives for the
    // whole process, so leaking it is fine.
    let ttf = Box::leak(Box::new(sdl2::ttf::init().map_err(|e| e.to_string())?));
    let font_path = find_font_path().ok_or_else(|| {
        "No TTF font found. Install DejaVu/FreeSans or set FONT_PATH.".to_string()
    })?;
    let font = ttf.load_font(font_path, 16)?;

    let event_pump = sdl.event_pump()?;
    let skip_flag = Arc::new(AtomicBool::new(false));

    Ok((
        SdlInput {
            pump: event_pump,
            controllers: controllers.clone(),
            held: Buttons::NONE,
            skip_flag: skip_flag.clone(),
        },
        SdlRenderer { canvas, font },
        SdlBindPoller {
            controllers,
            skip_flag,
        },
    ))
}

pub struct SdlInput {
    pump: EventPump,
    controllers: Rc<RefCell<Vec<GameController>>>,
    held: Buttons,
    skip_flag: Arc<AtomicBool>,
}

fn key_button(key: Keycode) -> Buttons {
    match key {
        Keycode::Up => Buttons::UP,
        Keycode::Down => Buttons::DOWN,
        Keycode::Left => Buttons::LEFT,
        Keycode::Right => Buttons::RIGHT,
        Keycode::Return => Buttons::A,
        Keycode::X => Buttons::A,
        Keycode::Backspace => Buttons::B,
        Keycode::Z => Buttons::B,
        Keycode::PageUp => Buttons::L,
        Keycode::PageDown => Buttons::R,
        Keycode::Space => Buttons::START,
        Keycode::F1 => Buttons::MENU_TOGGLE,
        Keycode::Escape => Buttons::QUIT,
        _ => Buttons::NONE,
    }
}

fn pad_button(button: CButton) -> Buttons {
    match button {
        CButton::DPadUp => Buttons::UP,
        CButton::DPadDown => Buttons::DOWN,
        CButton::DPadLeft => Buttons::LEFT,
        CButton::DPadRight => Buttons::RIGHT,
        CButton::A => Buttons::A,
        CButton::B => Buttons::B,
        CButton::LeftShoulder => Buttons::L,
        CButton::RightShoulder => Buttons::R,
        CButton::Start => Buttons::START,
        CButton::Back => Buttons::SELECT,
        CButton::Guide => Buttons::MENU_TOGGLE,
        _ => Buttons::NONE,
    }
}

impl InputPoller for SdlInput {
    fn poll(&mut self) -> Buttons {
        while let Some(event) = self.pump.poll_event() {
            match event {
                Event::Quit { .. } => self.held = self.held | Buttons::QUIT,
                Event::KeyDown {
                    keycode: Some(k), ..
                } => {
                    if k == Keycode::Return {
                        self.skip_flag.store(true, Ordering::Relaxed);
                    }
                    self.held = self.held | key_button(k);
                }
                Event::KeyUp {
                    keycode: Some(k), ..
                } => {
                    self.held = self.held & !key_button(k);
                }
                Event::ControllerButtonDown { button, .. } => {
                    self.held = self.held | pad_button(button);
                }
                Event::ControllerButtonUp { button, .. } => {
                    self.held = self.held & !pad_button(button);
                }
                _ => {}
            }
        }
        self.held
    }
}

pub struct SdlBindPoller {
    controllers: Rc<RefCell<Vec<GameController>>>,
    skip_flag: Arc<AtomicBool>,
}

impl BindPoller for SdlBindPoller {
    fn poll(&mut self) -> BindSnapshot {
        let mut snap = BindSnapshot::empty();
        snap.skip = self.skip_flag.swap(false, Ordering::Relaxed);
        for (port, gc) in self.controllers.borrow().iter().enumerate() {
            if port >= snap.ports.len() {
                break;
            }
            for (i, b) in PAD_BUTTONS.iter().enumerate().take(MAX_BUTTONS) {
                snap.ports[port].buttons[i] = gc.button(*b);
            }
            for (i, a) in PAD_AXES.iter().enumerate().take(MAX_AXES) {
                snap.ports[port].axes[i] = gc.axis(*a);
            }
        }
        snap
    }
}

pub struct SdlRenderer {
    canvas: WindowCanvas,
    font: Font<'static, 'static>,
}

fn draw_text(
    canvas: &mut WindowCanvas,
    creator: &TextureCreator<WindowContext>,
    font: &Font,
    text: &str,
    x: i32,
    y: i32,
    color: Color,
) -> u32 {
    if text.is_empty() {
        return 0;
    }
    let Ok(surface) = font.render(text).blended(color) else {
        return 0;
    };
    let Ok(tex) = creator.create_texture_from_surface(&surface) else {
        return 0;
    };
    let q = tex.query();
    let _ = canvas.copy(&tex, None, Rect::new(x, y, q.width, q.height));
    q.width
}

impl MenuRenderer for SdlRenderer {
    fn render(&mut self, screen: &Screen<'_>) {
        if screen.need_refresh && !screen.msg_force {
            return;
        }
        let (w, h) = self.canvas.output_size().unwrap_or((1280, 720));
        let creator = self.canvas.texture_creator();

        self.canvas.set_draw_color(BG);
        self.canvas.clear();

        draw_text(&mut self.canvas, &creator, &self.font, &screen.title, 12, 8, TITLE);

        let top = 44;
        let visible = (((h as i32) - top - 40) / ROW_H).max(1) as usize;
        let size = screen.entries.len();
        let mut begin = if screen.cursor >= visible / 2 {
            screen.cursor - visible / 2
        } else {
            0
        };
        if size <= visible {
            begin = 0;
        }
        let end = (begin + visible).min(size);

        for i in begin..end {
            let Some(entry) = screen.entries.get(i) else { break };
            let y = top + ((i - begin) as i32) * ROW_H;
            if i == screen.cursor {
                self.canvas.set_draw_color(ROW_SELECTED);
                let _ = self
                    .canvas
                    .fill_rect(Rect::new(8, y - 2, w.saturating_sub(16), ROW_H as u32));
            }
            let label = entry.alt_label.as_deref().unwrap_or(&entry.label);
            draw_text(&mut self.canvas, &creator, &self.font, label, 16, y, TEXT);
            if let Some(value) = screen.values.get(i).filter(|v| !v.is_empty()) {
                // right-aligned value column
                let value_w = self.font.size_of(value).map(|(vw, _)| vw).unwrap_or(0);
                let vx = (w as i32) - (value_w as i32) - 16;
                draw_text(&mut self.canvas, &creator, &self.font, value, vx, y, TEXT);
            }
        }

        if let Some(msg) = screen.message {
            self.canvas.set_draw_color(MESSAGE_BG);
            let _ = self
                .canvas
                .fill_rect(Rect::new(0, (h as i32) - 36, w, 36));
            draw_text(
                &mut self.canvas,
                &creator,
                &self.font,
                msg,
                12,
                (h as i32) - 30,
                TITLE,
            );
        }

        self.canvas.present();
    }
}
