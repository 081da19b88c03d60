use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Visible workspace area in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn full(&self) -> Geometry {
        Geometry {
            x: 0,
            y: 0,
            z: 0,
            width: self.width,
            height: self.height,
        }
    }

    /// Centered rectangle of half the viewport in each dimension.
    pub fn centered_half(&self) -> Geometry {
        let width = self.width / 2;
        let height = self.height / 2;
        Geometry {
            x: (self.width - width) / 2,
            y: (self.height - height) / 2,
            z: 0,
            width,
            height,
        }
    }

    /// Pixel to percentage of the viewport width, two decimals.
    pub fn percent_x(&self, px: u32) -> String {
        percent(px, self.width)
    }

    pub fn percent_y(&self, px: u32) -> String {
        percent(px, self.height)
    }

    pub fn pixels_x(&self, pct: &str) -> Option<u32> {
        pixels(pct, self.width)
    }

    pub fn pixels_y(&self, pct: &str) -> Option<u32> {
        pixels(pct, self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Viewport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("Expected WIDTHxHEIGHT, got: {}", s))?;
        let width = w.trim().parse::<u32>().map_err(|e| e.to_string())?;
        let height = h.trim().parse::<u32>().map_err(|e| e.to_string())?;
        Ok(Self::new(width, height))
    }
}

/// Positions past the viewport edge are stored as 100%.
fn percent(px: u32, total: u32) -> String {
    if total == 0 {
        return "0.00".to_string();
    }
    format!("{:.2}", f64::from(px.min(total)) * 100.0 / f64::from(total))
}

/// Percentages outside 0..=100 are rejected.
fn pixels(pct: &str, total: u32) -> Option<u32> {
    let value = pct.trim().trim_end_matches('%').parse::<f64>().ok()?;
    if !(0.0..=100.0).contains(&value) {
        return None;
    }
    Some((value * f64::from(total) / 100.0).round() as u32)
}

/// Window rectangle in pixels plus stacking order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn overlaps(&self, other: &Geometry) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
    }
}

/// User affordances on a window frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowControls {
    pub movable: bool,
    pub resizable: bool,
    pub maximizable: bool,
    pub minimizable: bool,
}

impl WindowControls {
    pub const FREE: Self = Self {
        movable: true,
        resizable: true,
        maximizable: true,
        minimizable: true,
    };

    pub const LOCKED: Self = Self {
        movable: false,
        resizable: false,
        maximizable: false,
        minimizable: false,
    };
}

impl Default for WindowControls {
    fn default() -> Self {
        Self::FREE
    }
}
