use std::fmt;

use crate::input::LogicalButton;

pub const MAX_PLAYERS: usize = 8;
/// Number of targets the rebind screen walks.
pub const LOGICAL_BIND_COUNT: usize = LogicalButton::BINDABLE.len();
pub const MAX_BUTTONS: usize = 32;
pub const MAX_AXES: usize = 32;
pub const MAX_HATS: usize = 4;

/// Axis movement must travel this far from both its rested and locked
/// positions to count as a deliberate bind.
const AXIS_THRESHOLD: i32 = 20000;

pub const HAT_UP: u16 = 1 << 0;
pub const HAT_DOWN: u16 = 1 << 1;
pub const HAT_LEFT: u16 = 1 << 2;
pub const HAT_RIGHT: u16 = 1 << 3;

/// Raw state of one joypad port.
#[derive(Clone)]
pub struct PortState {
    pub buttons: [bool; MAX_BUTTONS],
    pub axes: [i16; MAX_AXES],
    pub hats: [u16; MAX_HATS],
}

impl Default for PortState {
    fn default() -> Self {
        PortState {
            buttons: [false; MAX_BUTTONS],
            axes: [0; MAX_AXES],
            hats: [0; MAX_HATS],
        }
    }
}

/// One raw sample of every port plus the skip key.
#[derive(Clone, Default)]
pub struct BindSnapshot {
    pub skip: bool,
    pub ports: Vec<PortState>,
}

impl BindSnapshot {
    pub fn empty() -> BindSnapshot {
        BindSnapshot {
            skip: false,
            ports: vec![PortState::default(); MAX_PLAYERS],
        }
    }
}

/// Raw joypad polling seam for the rebind screen.
pub trait BindPoller {
    fn poll(&mut self) -> BindSnapshot;
}

/// Poller with no joypad access; only the skip key ever fires.
pub struct NullBindPoller;

impl BindPoller for NullBindPoller {
    fn poll(&mut self) -> BindSnapshot {
        BindSnapshot::empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HatDir {
    Up,
    Down,
    Left,
    Right,
}

impl HatDir {
    fn as_str(self) -> &'static str {
        match self {
            HatDir::Up => "up",
            HatDir::Down => "down",
            HatDir::Left => "left",
            HatDir::Right => "right",
        }
    }
}

/// A captured physical bind, serialized into the config joypad_binds map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindSpec {
    Button(usize),
    Axis { axis: usize, positive: bool },
    Hat { hat: usize, dir: HatDir },
}

impl fmt::Display for BindSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindSpec::Button(b) => write!(f, "button:{}", b),
            BindSpec::Axis { axis, positive } => {
                write!(f, "axis:{}{}", if *positive { '+' } else { '-' }, axis)
            }
            BindSpec::Hat { hat, dir } => write!(f, "hat:{}:{}", hat, dir.as_str()),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum BindProgress {
    /// Still waiting for a trigger on the current target.
    Waiting,
    /// Captured or skipped one target; more remain.
    Advanced,
    /// All targets walked; captured binds are ready to commit.
    Done,
}

/// Walks every bindable button in order, capturing one physical input per
/// target from raw joypad snapshots.
pub struct BindSession {
    targets: &'static [LogicalButton],
    index: usize,
    prev: BindSnapshot,
    prev_skip: bool,
    rested_axes: Vec<[i16; MAX_AXES]>,
    locked_axes: Vec<[i16; MAX_AXES]>,
    captured: Vec<(LogicalButton, BindSpec)>,
    /// Port that produced the last capture; recorded so the frontend can
    /// map the player to a device automatically.
    pub active_port: Option<usize>,
}

impl BindSession {
    /// `rested` is the axis state sampled before the user touches anything,
    /// so sticks resting off-center do not instantly bind.
    pub fn new(rested: BindSnapshot) -> BindSession {
        let rested_axes: Vec<[i16; MAX_AXES]> =
            rested.ports.iter().map(|p| p.axes).collect();
        let ports = rested.ports.len();
        BindSession {
            targets: &LogicalButton::BINDABLE,
            index: 0,
            prev: rested,
            prev_skip: false,
            rested_axes,
            locked_axes: vec![[0; MAX_AXES]; ports],
            captured: Vec::new(),
            active_port: None,
        }
    }

    pub fn current_target(&self) -> LogicalButton {
        self.targets[self.index.min(self.targets.len() - 1)]
    }

    pub fn prompt(&self) -> String {
        format!(
            "Press joypad input for: {} ({}/{}, Enter skips)",
            self.current_target().label(),
            self.index + 1,
            self.targets.len()
        )
    }

    fn find_trigger_port(&mut self, snap: &BindSnapshot, port: usize) -> Option<BindSpec> {
        let n = &snap.ports[port];
        let o = &self.prev.ports[port];

        for b in 0..MAX_BUTTONS {
            if n.buttons[b] && !o.buttons[b] {
                return Some(BindSpec::Button(b));
            }
        }

        // Axes are a bit tricky: require distance from both the rested and
        // the locked position, so an axis parked at an extreme cannot
        // re-trigger (360 pad on Linux rests at -0x8000).
        for a in 0..MAX_AXES {
            let locked_distance = (n.axes[a] as i32 - self.locked_axes[port][a] as i32).abs();
            let rested_distance = (n.axes[a] as i32 - self.rested_axes[port][a] as i32).abs();

            if (n.axes[a] as i32).abs() >= AXIS_THRESHOLD
                && locked_distance >= AXIS_THRESHOLD
                && rested_distance >= AXIS_THRESHOLD
            {
                self.locked_axes[port][a] = if n.axes[a] > 0 { 0x7fff } else { -0x7fff };
                return Some(BindSpec::Axis {
                    axis: a,
                    positive: n.axes[a] > 0,
                });
            }

            if locked_distance >= AXIS_THRESHOLD {
                self.locked_axes[port][a] = 0;
            }
        }

        for h in 0..MAX_HATS {
            let trigged = n.hats[h] & !o.hats[h];
            let dir = if trigged & HAT_UP != 0 {
                Some(HatDir::Up)
            } else if trigged & HAT_DOWN != 0 {
                Some(HatDir::Down)
            } else if trigged & HAT_LEFT != 0 {
                Some(HatDir::Left)
            } else if trigged & HAT_RIGHT != 0 {
                Some(HatDir::Right)
            } else {
                None
            };
            if let Some(dir) = dir {
                return Some(BindSpec::Hat { hat: h, dir });
            }
        }

        None
    }

    /// Consume one snapshot. Skip edge advances without capturing; any
    /// trigger captures for the current target.
    pub fn iterate(&mut self, snap: BindSnapshot) -> BindProgress {
        if self.index >= self.targets.len() {
            return BindProgress::Done;
        }

        let skip_edge = snap.skip && !self.prev_skip;
        let mut advanced = false;

        if skip_edge {
            log::debug!("bind skipped for {}", self.current_target().label());
            advanced = true;
        } else {
            let ports = snap.ports.len().min(self.prev.ports.len());
            for port in 0..ports {
                if let Some(spec) = self.find_trigger_port(&snap, port) {
                    log::info!(
                        "bound {} to {} (port {})",
                        self.current_target().label(),
                        spec,
                        port
                    );
                    self.captured.push((self.current_target(), spec));
                    self.active_port = Some(port);
                    advanced = true;
                    break;
                }
            }
        }

        self.prev_skip = snap.skip;
        self.prev = snap;

        if advanced {
            self.index += 1;
            if self.index >= self.targets.len() {
                return BindProgress::Done;
            }
            return BindProgress::Advanced;
        }
        BindProgress::Waiting
    }

    /// Captured binds as config map entries.
    pub fn into_binds(self) -> Vec<(String, String)> {
        self.captured
            .into_iter()
            .map(|(btn, spec)| (btn.label().to_string(), spec.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap() -> BindSnapshot {
        BindSnapshot::empty()
    }

    #[test]
    fn button_press_captures_current_target() {
        let mut s = BindSession::new(snap());
        assert_eq!(s.current_target(), LogicalButton::Up);

        let mut pressed = snap();
        pressed.ports[0].buttons[3] = true;
        assert_eq!(s.iterate(pressed.clone()), BindProgress::Advanced);
        assert_eq!(s.current_target(), LogicalButton::Down);

        // Held button is not a new edge for the next target.
        assert_eq!(s.iterate(pressed), BindProgress::Waiting);
    }

    #[test]
    fn skip_edge_advances_without_capture() {
        let mut s = BindSession::new(snap());
        let mut sk = snap();
        sk.skip = true;
        assert_eq!(s.iterate(sk.clone()), BindProgress::Advanced);
        // Skip still held: no edge, no advance.
        assert_eq!(s.iterate(sk), BindProgress::Waiting);
        assert!(s.into_binds().is_empty());
    }

    #[test]
    fn walking_all_targets_finishes() {
        let mut s = BindSession::new(snap());
        for i in 0..LogicalButton::BINDABLE.len() {
            let mut pressed = snap();
            pressed.ports[0].buttons[i] = true;
            let progress = s.iterate(pressed);
            if i + 1 == LogicalButton::BINDABLE.len() {
                assert_eq!(progress, BindProgress::Done);
            } else {
                assert_eq!(progress, BindProgress::Advanced);
                // release before the next press
                assert_eq!(s.iterate(snap()), BindProgress::Waiting);
            }
        }
        let binds = s.into_binds();
        assert_eq!(binds.len(), LogicalButton::BINDABLE.len());
        assert_eq!(binds[0], ("Up".to_string(), "button:0".to_string()));
    }

    #[test]
    fn rested_axis_does_not_trigger() {
        let mut rest = snap();
        rest.ports[0].axes[1] = -0x7fff; // stick resting at an extreme
        let mut s = BindSession::new(rest.clone());
        assert_eq!(s.iterate(rest), BindProgress::Waiting);
    }

    #[test]
    fn moved_axis_triggers_and_locks() {
        let mut s = BindSession::new(snap());
        let mut moved = snap();
        moved.ports[0].axes[2] = 30000;
        assert_eq!(s.iterate(moved.clone()), BindProgress::Advanced);
        // Axis held at the same extreme: locked, no second trigger.
        assert_eq!(s.iterate(moved), BindProgress::Waiting);

        // Back to rest unlocks, then the opposite direction triggers.
        assert_eq!(s.iterate(snap()), BindProgress::Waiting);
        let mut opposite = snap();
        opposite.ports[0].axes[2] = -30000;
        assert_eq!(s.iterate(opposite), BindProgress::Advanced);

        let binds = s.into_binds();
        assert_eq!(binds[0].1, "axis:+2");
        assert_eq!(binds[1].1, "axis:-2");
    }

    #[test]
    fn hat_edge_triggers_single_direction() {
        let mut s = BindSession::new(snap());
        let mut hat = snap();
        hat.ports[0].hats[0] = HAT_UP | HAT_LEFT;
        assert_eq!(s.iterate(hat), BindProgress::Advanced);
        let binds = s.into_binds();
        assert_eq!(binds[0].1, "hat:0:up");
    }
}
