use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::geometry::{Geometry, WindowControls};
use super::layout::WindowHandle;
use super::schema::{TargetType, WindowTarget};

/// Unique identifier for windows, never reused
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(Uuid);

impl WindowId {
    /// Create a new unique window ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for WindowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WindowId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s).map_err(|e| e.to_string())?))
    }
}

/// `(target type, identity param)`: at most one window per key
pub type IdentityKey = (TargetType, String);

/// An open window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowItem {
    pub id: WindowId,
    pub target: WindowTarget,
    pub title: String,
    /// Whether `title` was given explicitly rather than derived from the target
    pub custom_title: bool,
    pub geometry: Geometry,
    pub controls: WindowControls,
    pub maximized: bool,
    /// Set when the window is brought forward for a duplicate open request
    pub highlighted: bool,
}

impl WindowItem {
    pub fn new(target: WindowTarget, title: Option<String>, geometry: Geometry) -> Self {
        let custom_title = title.is_some();
        let title = title.unwrap_or_else(|| target.default_title());
        Self {
            id: WindowId::new(),
            target,
            title,
            custom_title,
            geometry,
            controls: WindowControls::FREE,
            maximized: false,
            highlighted: false,
        }
    }

    pub fn target_type(&self) -> TargetType {
        self.target.target_type()
    }

    pub fn identity_key(&self) -> Option<IdentityKey> {
        self.target
            .identity()
            .map(|identity| (self.target_type(), identity.into_owned()))
    }

    /// Re-derive the title from the target unless it was set explicitly.
    pub fn refresh_title(&mut self) {
        if !self.custom_title {
            self.title = self.target.default_title();
        }
    }
}

impl WindowHandle for WindowItem {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
    }

    fn set_controls(&mut self, controls: WindowControls) {
        self.controls = controls;
    }

    fn set_maximized(&mut self, maximized: bool) {
        self.maximized = maximized;
    }
}
