//! Input event types for the Glide event stream.
//!
//! Events are recorded in append-only JSONL format for crash safety.
//! Positions are percentages `[0, 100]` of the captured frame and `time`
//! is seconds since recording start.

use serde::{Deserialize, Serialize};

/// Kind of recorded input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Pointer moved.
    Move,
    /// Pointer button pressed.
    Down,
    /// Pointer button released.
    Up,
    /// Keyboard activity at the current pointer position.
    Key,
}

/// A single recorded input event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    /// Event kind.
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Seconds since recording start.
    pub time: f64,

    /// Horizontal position, percent of frame width.
    pub x: f64,

    /// Vertical position, percent of frame height.
    pub y: f64,
}

impl InputEvent {
    /// Create an event of any kind.
    pub fn new(kind: EventKind, time: f64, x: f64, y: f64) -> Self {
        Self { kind, time, x, y }
    }

    /// Create a pointer-move event.
    pub fn pointer_move(time: f64, x: f64, y: f64) -> Self {
        Self::new(EventKind::Move, time, x, y)
    }

    /// Create a pointer-down event.
    pub fn down(time: f64, x: f64, y: f64) -> Self {
        Self::new(EventKind::Down, time, x, y)
    }

    /// Create a pointer-up event.
    pub fn up(time: f64, x: f64, y: f64) -> Self {
        Self::new(EventKind::Up, time, x, y)
    }

    /// Create a key event.
    pub fn key(time: f64, x: f64, y: f64) -> Self {
        Self::new(EventKind::Key, time, x, y)
    }

    /// Pointer position if this event describes where the pointer is.
    ///
    /// Key events carry coordinates too, but they reflect the last known
    /// pointer position rather than a fresh sample.
    pub fn pointer_position(&self) -> Option<(f64, f64)> {
        match self.kind {
            EventKind::Move | EventKind::Down | EventKind::Up => Some((self.x, self.y)),
            EventKind::Key => None,
        }
    }

    /// Whether this is a pointer-down event.
    pub fn is_down(&self) -> bool {
        self.kind == EventKind::Down
    }
}

/// Problems found when checking an event stream against its contract.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EventStreamError {
    #[error("event {index} goes back in time ({time}s after {previous}s)")]
    NonMonotonic {
        index: usize,
        time: f64,
        previous: f64,
    },

    #[error("event {index} has a negative timestamp ({time}s)")]
    NegativeTime { index: usize, time: f64 },

    #[error("event {index} position ({x}, {y}) is outside [0, 100]")]
    OutOfRange { index: usize, x: f64, y: f64 },
}

/// Check that times are non-negative and non-decreasing and positions are in range.
pub fn check_event_stream(events: &[InputEvent]) -> Result<(), EventStreamError> {
    let mut previous: Option<f64> = None;
    for (index, event) in events.iter().enumerate() {
        if event.time < 0.0 {
            return Err(EventStreamError::NegativeTime {
                index,
                time: event.time,
            });
        }
        if let Some(prev) = previous {
            if event.time < prev {
                return Err(EventStreamError::NonMonotonic {
                    index,
                    time: event.time,
                    previous: prev,
                });
            }
        }
        if !(0.0..=100.0).contains(&event.x) || !(0.0..=100.0).contains(&event.y) {
            return Err(EventStreamError::OutOfRange {
                index,
                x: event.x,
                y: event.y,
            });
        }
        previous = Some(event.time);
    }
    Ok(())
}

/// Parse events from JSONL content (one JSON object per line).
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_events(jsonl: &str) -> Result<Vec<InputEvent>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Serialize events to JSONL format.
pub fn serialize_events(events: &[InputEvent]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for event in events {
        output.push_str(&serde_json::to_string(event)?);
        output.push('\n');
    }
    Ok(output)
}
