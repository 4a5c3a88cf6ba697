//! Resize coordination.
//!
//! Geometry changes reach us through two kinds of notification: container
//! layout reports (the waveform pane's rect as laid out on every frame) and
//! window resize events from the terminal. Neither is fully reliable
//! everywhere, so a [`ResizeStrategy`] is picked once at setup and the
//! coordinator only honors the notifications that strategy trusts.
//!
//! With a recorded buffer on screen, geometry changes are debounced so a
//! burst of resize events costs a single re-extraction. Without one the new
//! geometry applies immediately so the live view stays responsive.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::geometry::{ContainerSize, Geometry};

/// Delays after mount at which geometry is re-checked when window resize
/// events are the only notification.
pub const RECHECK_DELAYS: [Duration; 3] = [
    Duration::from_millis(100),
    Duration::from_millis(500),
    Duration::from_millis(1000),
];

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Which resize notifications are trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeStrategy {
    /// Container layout reports, delivered every frame
    Observer,
    /// Window resize events plus forced re-checks shortly after mount
    WindowWithRechecks,
    /// Window resize events only
    WindowOnly,
}

/// Configured strategy; `auto` is resolved against the environment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StrategySetting {
    #[default]
    Auto,
    Observer,
    Window,
    WindowRechecks,
}

/// Facts about the hosting terminal that decide the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResizeEnvironment {
    /// Running inside tmux or screen, which relay size changes late
    pub multiplexer: bool,
    /// No layout observation available at all
    pub dumb_terminal: bool,
}

impl ResizeEnvironment {
    pub fn from_env() -> Self {
        let multiplexer = std::env::var_os("TMUX").is_some() || std::env::var_os("STY").is_some();
        let dumb_terminal = std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false);
        Self { multiplexer, dumb_terminal }
    }
}

impl ResizeStrategy {
    pub fn detect(env: ResizeEnvironment) -> Self {
        if env.dumb_terminal {
            ResizeStrategy::WindowOnly
        } else if env.multiplexer {
            ResizeStrategy::WindowWithRechecks
        } else {
            ResizeStrategy::Observer
        }
    }
}

impl StrategySetting {
    pub fn resolve(self, env: ResizeEnvironment) -> ResizeStrategy {
        match self {
            StrategySetting::Auto => ResizeStrategy::detect(env),
            StrategySetting::Observer => ResizeStrategy::Observer,
            StrategySetting::Window => ResizeStrategy::WindowOnly,
            StrategySetting::WindowRechecks => ResizeStrategy::WindowWithRechecks,
        }
    }
}

/// A resize notification from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeSignal {
    /// The container's laid-out size
    Layout(ContainerSize),
    /// The window was resized; carries the container size measured afterwards
    Window(ContainerSize),
}

/// A committed geometry change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryChange {
    pub geometry: Geometry,
    /// Bars for the recorded buffer must be extracted again
    pub recompute: bool,
}

#[derive(Debug, Clone, Copy)]
struct PendingCommit {
    geometry: Geometry,
    due: Instant,
}

pub struct ResizeCoordinator {
    strategy: ResizeStrategy,
    debounce: Duration,
    device_pixel_ratio: f32,
    geometry: Geometry,
    pending: Option<PendingCommit>,
    rechecks: Vec<Instant>,
}

impl ResizeCoordinator {
    pub fn new(strategy: ResizeStrategy, debounce: Duration, device_pixel_ratio: f32) -> Self {
        Self {
            strategy,
            debounce,
            device_pixel_ratio,
            geometry: Geometry::default(),
            pending: None,
            rechecks: Vec::new(),
        }
    }

    pub fn strategy(&self) -> ResizeStrategy {
        self.strategy
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// A debounced commit is waiting for its window to close.
    pub fn is_resizing(&self) -> bool {
        self.pending.is_some()
    }

    /// Computes the initial geometry and arms the post-mount re-checks.
    pub fn mount(&mut self, container: ContainerSize, now: Instant) -> Geometry {
        self.geometry = Geometry::from_container(container, self.device_pixel_ratio);
        self.pending = None;
        self.rechecks = match self.strategy {
            ResizeStrategy::WindowWithRechecks => RECHECK_DELAYS.iter().map(|d| now + *d).collect(),
            _ => Vec::new(),
        };
        tracing::debug!(
            "Waveform mounted with {:?} strategy at {}x{}",
            self.strategy,
            self.geometry.pixel_width,
            self.geometry.pixel_height
        );
        self.geometry
    }

    /// Handles a resize notification. Returns a change only when it is
    /// committed right away; debounced changes surface from [`Self::poll`].
    pub fn notify(
        &mut self,
        signal: ResizeSignal,
        has_recorded_buffer: bool,
        now: Instant,
    ) -> Option<GeometryChange> {
        let container = match (self.strategy, signal) {
            (ResizeStrategy::Observer, ResizeSignal::Layout(container)) => container,
            (
                ResizeStrategy::WindowWithRechecks | ResizeStrategy::WindowOnly,
                ResizeSignal::Window(container),
            ) => container,
            _ => return None,
        };
        self.apply(container, has_recorded_buffer, now)
    }

    /// Fires due re-checks and closes expired debounce windows.
    pub fn poll(
        &mut self,
        now: Instant,
        container: ContainerSize,
        has_recorded_buffer: bool,
    ) -> Option<GeometryChange> {
        let mut change = None;

        let scheduled = self.rechecks.len();
        self.rechecks.retain(|due| *due > now);
        if self.rechecks.len() < scheduled {
            tracing::trace!("Forced geometry re-check");
            change = self.apply(container, has_recorded_buffer, now);
        }

        if let Some(pending) = self.pending {
            if now >= pending.due {
                self.pending = None;
                if pending.geometry != self.geometry {
                    tracing::debug!(
                        "Debounced resize committed: {}x{}",
                        pending.geometry.pixel_width,
                        pending.geometry.pixel_height
                    );
                    self.geometry = pending.geometry;
                    change = Some(GeometryChange {
                        geometry: pending.geometry,
                        recompute: true,
                    });
                }
            }
        }

        change
    }

    fn apply(
        &mut self,
        container: ContainerSize,
        has_recorded_buffer: bool,
        now: Instant,
    ) -> Option<GeometryChange> {
        let geometry = Geometry::from_container(container, self.device_pixel_ratio);

        if has_recorded_buffer {
            if geometry == self.geometry && self.pending.is_none() {
                return None;
            }
            // Every notification in a burst pushes the window out again.
            self.pending = Some(PendingCommit {
                geometry,
                due: now + self.debounce,
            });
            return None;
        }

        self.pending = None;
        if geometry == self.geometry {
            return None;
        }
        self.geometry = geometry;
        Some(GeometryChange {
            geometry,
            recompute: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(width: f32, height: f32) -> ContainerSize {
        ContainerSize::new(width, height)
    }

    #[test]
    fn test_strategy_detection() {
        assert_eq!(
            ResizeStrategy::detect(ResizeEnvironment::default()),
            ResizeStrategy::Observer
        );
        assert_eq!(
            ResizeStrategy::detect(ResizeEnvironment { multiplexer: true, dumb_terminal: false }),
            ResizeStrategy::WindowWithRechecks
        );
        assert_eq!(
            ResizeStrategy::detect(ResizeEnvironment { multiplexer: true, dumb_terminal: true }),
            ResizeStrategy::WindowOnly
        );
        assert_eq!(
            StrategySetting::Window.resolve(ResizeEnvironment::default()),
            ResizeStrategy::WindowOnly
        );
    }

    #[test]
    fn test_live_mode_applies_immediately() {
        let now = Instant::now();
        let mut resize = ResizeCoordinator::new(ResizeStrategy::Observer, DEFAULT_DEBOUNCE, 1.0);
        resize.mount(size(400.0, 200.0), now);

        let change = resize
            .notify(ResizeSignal::Layout(size(800.0, 200.0)), false, now)
            .expect("immediate change");
        assert!(!change.recompute);
        assert_eq!(change.geometry.pixel_width, 800);
        assert_eq!(resize.notify(ResizeSignal::Layout(size(800.0, 200.0)), false, now), None);
    }

    #[test]
    fn test_static_mode_debounces_bursts() {
        let start = Instant::now();
        let mut resize = ResizeCoordinator::new(ResizeStrategy::Observer, DEFAULT_DEBOUNCE, 1.0);
        resize.mount(size(400.0, 200.0), start);

        for (i, width) in [500.0, 600.0, 700.0, 800.0].into_iter().enumerate() {
            let at = start + Duration::from_millis(50 * i as u64);
            assert_eq!(resize.notify(ResizeSignal::Layout(size(width, 200.0)), true, at), None);
        }
        assert!(resize.is_resizing());

        let last = start + Duration::from_millis(150);
        assert_eq!(resize.poll(last + Duration::from_millis(499), size(800.0, 200.0), true), None);

        let change = resize
            .poll(last + DEFAULT_DEBOUNCE, size(800.0, 200.0), true)
            .expect("debounced commit");
        assert!(change.recompute);
        assert_eq!(change.geometry.pixel_width, 800);
        assert!(!resize.is_resizing());
        assert_eq!(resize.poll(last + DEFAULT_DEBOUNCE * 4, size(800.0, 200.0), true), None);
    }

    #[test]
    fn test_resize_and_back_is_not_a_change() {
        let start = Instant::now();
        let mut resize = ResizeCoordinator::new(ResizeStrategy::Observer, DEFAULT_DEBOUNCE, 1.0);
        resize.mount(size(400.0, 200.0), start);
        resize.notify(ResizeSignal::Layout(size(500.0, 200.0)), true, start);
        resize.notify(ResizeSignal::Layout(size(400.0, 200.0)), true, start);
        assert_eq!(resize.poll(start + DEFAULT_DEBOUNCE, size(400.0, 200.0), true), None);
    }

    #[test]
    fn test_strategy_filters_signals() {
        let now = Instant::now();
        let mut observer = ResizeCoordinator::new(ResizeStrategy::Observer, DEFAULT_DEBOUNCE, 1.0);
        observer.mount(size(10.0, 10.0), now);
        assert_eq!(observer.notify(ResizeSignal::Window(size(20.0, 10.0)), false, now), None);

        let mut window = ResizeCoordinator::new(ResizeStrategy::WindowOnly, DEFAULT_DEBOUNCE, 1.0);
        window.mount(size(10.0, 10.0), now);
        assert_eq!(window.notify(ResizeSignal::Layout(size(20.0, 10.0)), false, now), None);
        assert!(window.notify(ResizeSignal::Window(size(20.0, 10.0)), false, now).is_some());
    }

    #[test]
    fn test_rechecks_catch_late_layout() {
        let start = Instant::now();
        let mut resize =
            ResizeCoordinator::new(ResizeStrategy::WindowWithRechecks, DEFAULT_DEBOUNCE, 1.0);
        resize.mount(size(0.0, 0.0), start);

        assert_eq!(resize.poll(start + Duration::from_millis(50), size(120.0, 40.0), false), None);
        let change = resize
            .poll(start + Duration::from_millis(100), size(120.0, 40.0), false)
            .expect("first re-check");
        assert_eq!(change.geometry.pixel_width, 120);

        assert_eq!(resize.poll(start + Duration::from_millis(500), size(120.0, 40.0), false), None);
        let change = resize
            .poll(start + Duration::from_millis(1000), size(160.0, 40.0), false)
            .expect("last re-check");
        assert_eq!(change.geometry.pixel_width, 160);
    }

    #[test]
    fn test_rechecks_with_recorded_buffer_are_debounced() {
        let start = Instant::now();
        let mut resize =
            ResizeCoordinator::new(ResizeStrategy::WindowWithRechecks, DEFAULT_DEBOUNCE, 1.0);
        resize.mount(size(400.0, 200.0), start);

        let wide = size(800.0, 200.0);
        assert_eq!(resize.poll(start + Duration::from_millis(100), wide, true), None);
        assert!(resize.is_resizing());
        assert_eq!(resize.geometry().pixel_width, 400);

        // The 500 ms and 1000 ms re-checks push the window out to 1500 ms.
        assert_eq!(resize.poll(start + Duration::from_millis(1000), wide, true), None);
        assert_eq!(resize.poll(start + Duration::from_millis(1499), wide, true), None);
        let change = resize
            .poll(start + Duration::from_millis(1500), wide, true)
            .expect("debounced re-check");
        assert!(change.recompute);
        assert_eq!(change.geometry.pixel_width, 800);
        assert!(!resize.is_resizing());
    }

    #[test]
    fn test_window_only_has_no_rechecks() {
        let start = Instant::now();
        let mut resize = ResizeCoordinator::new(ResizeStrategy::WindowOnly, DEFAULT_DEBOUNCE, 1.0);
        resize.mount(size(0.0, 0.0), start);
        assert_eq!(resize.poll(start + Duration::from_secs(2), size(120.0, 40.0), false), None);
    }
}
