//! Typed values stored under well-known setting keys.
//!
//! The store itself accepts arbitrary JSON; these are the shapes the
//! editable surfaces of the mission site agree on.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Key holding the countdown target.
pub const COUNTDOWN_TARGET_KEY: &str = "countdown_target";

/// Key holding the countdown timer position.
pub const TIMER_POSITION_KEY: &str = "timer_position";

/// Label shown when no countdown label was configured.
pub const DEFAULT_COUNTDOWN_LABEL: &str = "Mission Launch In";

/// Target of the launch countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownTarget {
    /// Unix timestamp (seconds) the countdown runs to. `0` means unset.
    pub timestamp: i64,
    /// Caption rendered above the timer.
    pub label: String,
}

impl Default for CountdownTarget {
    fn default() -> Self {
        Self {
            timestamp: 0,
            label: DEFAULT_COUNTDOWN_LABEL.to_owned(),
        }
    }
}

impl CountdownTarget {
    /// Create a countdown to the given instant.
    #[must_use]
    pub fn at(target: DateTime<Utc>, label: impl Into<String>) -> Self {
        Self {
            timestamp: target.timestamp(),
            label: label.into(),
        }
    }

    /// Whether an admin has configured a target.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.timestamp > 0
    }

    /// The target as a UTC instant, if it is configured and representable.
    #[must_use]
    pub fn target(&self) -> Option<DateTime<Utc>> {
        if !self.is_configured() {
            return None;
        }
        DateTime::from_timestamp(self.timestamp, 0)
    }

    /// Time left until the target, saturating at zero.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        self.target()
            .map_or(TimeDelta::zero(), |target| (target - now).max(TimeDelta::zero()))
    }
}

/// Position of a draggable element, in CSS pixels from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementPosition {
    /// Horizontal offset.
    pub x: f64,
    /// Vertical offset.
    pub y: f64,
}

impl ElementPosition {
    /// Create a position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamp the position into a `width` x `height` viewport.
    #[must_use]
    pub fn clamped(self, width: f64, height: f64) -> Self {
        Self {
            x: self.x.clamp(0.0, width.max(0.0)),
            y: self.y.clamp(0.0, height.max(0.0)),
        }
    }
}

/// Inline text edited in place by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditableText(String);

impl EditableText {
    /// Wrap a string.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Get the text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EditableText {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}
