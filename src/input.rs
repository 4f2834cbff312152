use std::ops::{BitAnd, BitOr, Not};

/// One logical menu action per tick, produced by the input reducer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Ok,
    Cancel,
    Refresh,
    Start,
    Message,
    ScrollDown,
    ScrollUp,
    Noop,
}

/// Raw logical button state for one tick, one bit per button.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Buttons(u64);

impl Buttons {
    pub const NONE: Buttons = Buttons(0);
    pub const UP: Buttons = Buttons(1 << 0);
    pub const DOWN: Buttons = Buttons(1 << 1);
    pub const LEFT: Buttons = Buttons(1 << 2);
    pub const RIGHT: Buttons = Buttons(1 << 3);
    pub const A: Buttons = Buttons(1 << 4);
    pub const B: Buttons = Buttons(1 << 5);
    pub const L: Buttons = Buttons(1 << 6);
    pub const R: Buttons = Buttons(1 << 7);
    pub const START: Buttons = Buttons(1 << 8);
    pub const SELECT: Buttons = Buttons(1 << 9);
    pub const MENU_TOGGLE: Buttons = Buttons(1 << 10);
    /// Synthetic: the frontend (window close, terminal quit key) asked to exit.
    pub const QUIT: Buttons = Buttons(1 << 11);
    pub const ALL: Buttons = Buttons(u64::MAX);

    pub fn contains(self, other: Buttons) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Buttons) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Buttons {
    type Output = Buttons;
    fn bitor(self, rhs: Buttons) -> Buttons {
        Buttons(self.0 | rhs.0)
    }
}

impl BitAnd for Buttons {
    type Output = Buttons;
    fn bitand(self, rhs: Buttons) -> Buttons {
        Buttons(self.0 & rhs.0)
    }
}

impl Not for Buttons {
    type Output = Buttons;
    fn not(self) -> Buttons {
        Buttons(!self.0)
    }
}

/// Buttons the user can rebind, in the order the rebind screen walks them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalButton {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    L,
    R,
    Start,
    Select,
}

impl LogicalButton {
    pub const BINDABLE: [LogicalButton; 10] = [
        LogicalButton::Up,
        LogicalButton::Down,
        LogicalButton::Left,
        LogicalButton::Right,
        LogicalButton::A,
        LogicalButton::B,
        LogicalButton::L,
        LogicalButton::R,
        LogicalButton::Start,
        LogicalButton::Select,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LogicalButton::Up => "Up",
            LogicalButton::Down => "Down",
            LogicalButton::Left => "Left",
            LogicalButton::Right => "Right",
            LogicalButton::A => "A",
            LogicalButton::B => "B",
            LogicalButton::L => "L",
            LogicalButton::R => "R",
            LogicalButton::Start => "Start",
            LogicalButton::Select => "Select",
        }
    }
}

/// One raw sample per tick.
pub trait InputPoller {
    fn poll(&mut self) -> Buttons;

    /// A submitted search line, if the poller supports text entry.
    fn take_search(&mut self) -> Option<String> {
        None
    }
}

const HELD_MASK: Buttons = Buttons(
    Buttons::UP.0 | Buttons::DOWN.0 | Buttons::LEFT.0 | Buttons::RIGHT.0 | Buttons::L.0 | Buttons::R.0,
);

/// Initial hold-to-repeat delay, in ticks, for the first hold after rest.
const DELAY_INITIAL: u32 = 12;
/// Delay for subsequent holds while the user keeps tapping.
const DELAY_REPEAT: u32 = 6;
const ACCEL_CAP: u32 = 64;

/// Turns per-tick raw button samples into discrete actions: edge detection,
/// hold-to-repeat with acceleration, fixed priority mapping.
pub struct InputReducer {
    old_state: Buttons,
    trigger_state: Buttons,
    do_held: bool,
    delay_timer: u32,
    delay_count: u32,
    scroll_accel: u32,
    first_held: bool,
    initial_held: bool,
}

impl Default for InputReducer {
    fn default() -> Self {
        InputReducer::new()
    }
}

impl InputReducer {
    pub fn new() -> Self {
        InputReducer {
            old_state: Buttons::NONE,
            trigger_state: Buttons::NONE,
            do_held: false,
            delay_timer: 0,
            delay_count: 0,
            scroll_accel: 0,
            first_held: false,
            initial_held: true,
        }
    }

    /// Mark buttons as already pressed so they do not trigger on the next
    /// tick. Used when re-entering the menu with the toggle held, and after
    /// rebinds or search submission (`Buttons::ALL`).
    pub fn prime(&mut self, mask: Buttons) {
        self.old_state = self.old_state | mask;
    }

    /// Consume one raw sample and produce this tick's action.
    pub fn reduce(&mut self, input: Buttons) -> Action {
        self.trigger_state = input & !self.old_state;
        self.do_held = input.intersects(HELD_MASK) && !input.contains(Buttons::MENU_TOGGLE);

        if self.do_held {
            if !self.first_held {
                self.first_held = true;
                self.delay_timer = if self.initial_held { DELAY_INITIAL } else { DELAY_REPEAT };
                self.delay_count = 0;
            }

            if self.delay_count >= self.delay_timer {
                // Re-emit the held state as fresh triggers and accelerate.
                self.first_held = false;
                self.trigger_state = input;
                self.scroll_accel = (self.scroll_accel + 1).min(ACCEL_CAP);
            }

            self.initial_held = false;
        } else {
            self.first_held = false;
            self.initial_held = true;
            self.scroll_accel = 0;
        }

        self.delay_count += 1;
        self.old_state = input;

        let t = self.trigger_state;
        if t.contains(Buttons::UP) {
            Action::Up
        } else if t.contains(Buttons::DOWN) {
            Action::Down
        } else if t.contains(Buttons::LEFT) {
            Action::Left
        } else if t.contains(Buttons::RIGHT) {
            Action::Right
        } else if t.contains(Buttons::L) {
            Action::ScrollUp
        } else if t.contains(Buttons::R) {
            Action::ScrollDown
        } else if t.contains(Buttons::B) {
            Action::Cancel
        } else if t.contains(Buttons::A) {
            Action::Ok
        } else if t.contains(Buttons::START) {
            Action::Start
        } else {
            Action::Noop
        }
    }

    /// Hold acceleration counter, feeds the dispatcher's scroll speed.
    pub fn scroll_accel(&self) -> u32 {
        self.scroll_accel
    }

    /// True when the menu toggle button went down this tick.
    pub fn menu_toggle_pressed(&self) -> bool {
        self.trigger_state.contains(Buttons::MENU_TOGGLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_newly_pressed_bits() {
        let mut r = InputReducer::new();
        assert_eq!(r.reduce(Buttons::A), Action::Ok);
        // Same raw state again: no edge, no action.
        assert_eq!(r.reduce(Buttons::A), Action::Noop);
        assert_eq!(r.reduce(Buttons::NONE), Action::Noop);
        assert_eq!(r.reduce(Buttons::A), Action::Ok);
    }

    #[test]
    fn priority_order_up_wins() {
        let mut r = InputReducer::new();
        assert_eq!(r.reduce(Buttons::UP | Buttons::DOWN | Buttons::A), Action::Up);
        let mut r = InputReducer::new();
        assert_eq!(r.reduce(Buttons::B | Buttons::A), Action::Cancel);
        let mut r = InputReducer::new();
        assert_eq!(r.reduce(Buttons::L | Buttons::R), Action::ScrollUp);
    }

    #[test]
    fn no_edge_is_noop() {
        let mut r = InputReducer::new();
        assert_eq!(r.reduce(Buttons::NONE), Action::Noop);
    }

    #[test]
    fn initial_hold_repeats_after_twelve_ticks() {
        let mut r = InputReducer::new();
        assert_eq!(r.reduce(Buttons::DOWN), Action::Down);
        // Held: ticks 1..=11 after the edge stay quiet (delay_count reaches
        // the 12-tick timer on the 12th held tick).
        for _ in 0..11 {
            assert_eq!(r.reduce(Buttons::DOWN), Action::Noop);
        }
        assert_eq!(r.reduce(Buttons::DOWN), Action::Down);
        assert!(r.scroll_accel() >= 1);
    }

    #[test]
    fn later_repeats_use_short_delay() {
        let mut r = InputReducer::new();
        r.reduce(Buttons::DOWN);
        for _ in 0..11 {
            r.reduce(Buttons::DOWN);
        }
        // First repeat fired after the 12-tick delay; within the same hold
        // the next one comes after only 6 ticks.
        assert_eq!(r.reduce(Buttons::DOWN), Action::Down);
        for _ in 0..6 {
            assert_eq!(r.reduce(Buttons::DOWN), Action::Noop);
        }
        assert_eq!(r.reduce(Buttons::DOWN), Action::Down);
    }

    #[test]
    fn release_restores_initial_delay() {
        let mut r = InputReducer::new();
        for _ in 0..20 {
            r.reduce(Buttons::DOWN);
        }
        r.reduce(Buttons::NONE);
        // Fresh hold after rest waits the full initial delay again.
        assert_eq!(r.reduce(Buttons::DOWN), Action::Down);
        for _ in 0..11 {
            assert_eq!(r.reduce(Buttons::DOWN), Action::Noop);
        }
        assert_eq!(r.reduce(Buttons::DOWN), Action::Down);
    }

    #[test]
    fn release_resets_acceleration() {
        let mut r = InputReducer::new();
        for _ in 0..40 {
            r.reduce(Buttons::DOWN);
        }
        assert!(r.scroll_accel() > 0);
        r.reduce(Buttons::NONE);
        assert_eq!(r.scroll_accel(), 0);
    }

    #[test]
    fn acceleration_caps_at_64() {
        let mut r = InputReducer::new();
        for _ in 0..500 {
            r.reduce(Buttons::DOWN);
        }
        assert_eq!(r.scroll_accel(), 64);
    }

    #[test]
    fn menu_toggle_suppresses_held() {
        let mut r = InputReducer::new();
        r.reduce(Buttons::DOWN | Buttons::MENU_TOGGLE);
        for _ in 0..30 {
            r.reduce(Buttons::DOWN | Buttons::MENU_TOGGLE);
        }
        // No hold acceleration while the toggle is down.
        assert_eq!(r.scroll_accel(), 0);
    }

    #[test]
    fn priming_blocks_stale_triggers() {
        let mut r = InputReducer::new();
        r.prime(Buttons::MENU_TOGGLE);
        assert_eq!(r.reduce(Buttons::MENU_TOGGLE), Action::Noop);
        assert!(!r.menu_toggle_pressed());

        let mut r = InputReducer::new();
        r.prime(Buttons::ALL);
        assert_eq!(r.reduce(Buttons::A | Buttons::START), Action::Noop);
    }
}
