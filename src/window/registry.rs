//! The set of open windows and the only code allowed to change it.
//!
//! Every mutating call finishes by persisting the new state into the URL
//! parameters, after re-running the layout when the number of windows, the
//! arrangement or the viewport changed. Listeners see the resulting events
//! synchronously, in order.

use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::codec::{CodecError, UrlQuery, UrlState, decode, encode};
use super::events::{EventBus, Notification, SubscriptionId, WorkspaceEvent};
use super::geometry::{Geometry, Viewport};
use super::item::{WindowId, WindowItem};
use super::layout::{Arrangement, LayoutSettings, arrange};
use super::schema::{TargetType, ValidationError, WindowDescriptor};
use crate::config::WorkspaceSettings;

/// What `add_window` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Created(WindowId),
    /// A window with the same identity existed and was brought forward
    Focused(WindowId),
    Rejected(ValidationError),
}

impl AddOutcome {
    pub fn id(&self) -> Option<&WindowId> {
        match self {
            Self::Created(id) | Self::Focused(id) => Some(id),
            Self::Rejected(_) => None,
        }
    }
}

/// What `restore` did
#[derive(Debug)]
pub enum RestoreOutcome {
    /// Decoded windows were replayed; `rejected` counts replays that failed
    Restored { windows: usize, rejected: usize },
    /// Nothing in the URL; started from an empty workspace
    Initialized,
    /// The URL could not be decoded; started from an empty workspace
    Fallback(CodecError),
}

#[derive(Debug)]
pub struct WindowRegistry {
    windows: Vec<WindowItem>,
    arrangement: Arrangement,
    default_arrangement: Arrangement,
    viewport: Viewport,
    layout: LayoutSettings,
    highlight_pulses: u32,
    next_z: u32,
    url: UrlState,
    bus: EventBus,
}

impl WindowRegistry {
    pub fn new(settings: &WorkspaceSettings, viewport: Viewport) -> Self {
        let arrangement = settings.default_arrangement;
        Self {
            windows: Vec::new(),
            arrangement,
            default_arrangement: arrangement,
            viewport,
            layout: settings.layout(),
            highlight_pulses: settings.highlight_pulses,
            next_z: 1,
            url: encode(&[], arrangement, &viewport),
            bus: EventBus::default(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&WorkspaceEvent) + 'static) -> SubscriptionId {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Open windows in insertion order
    pub fn windows(&self) -> &[WindowItem] {
        &self.windows
    }

    pub fn get(&self, id: &WindowId) -> Option<&WindowItem> {
        self.windows.iter().find(|w| &w.id == id)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn arrangement(&self) -> Arrangement {
        self.arrangement
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// The URL parameters for the current state
    pub fn url_state(&self) -> &UrlState {
        &self.url
    }

    pub fn find_window_by_type_and_identity(&self, target_type: TargetType, identity: &str) -> Option<&WindowItem> {
        self.windows
            .iter()
            .find(|w| w.target_type() == target_type && w.target.identity().as_deref() == Some(identity))
    }

    /// Validate an untyped descriptor and open it.
    pub fn add_window_value(&mut self, value: &Value) -> AddOutcome {
        match WindowDescriptor::from_value(value) {
            Ok(descriptor) => self.add_window(descriptor),
            Err(e) => self.reject(e),
        }
    }

    /// Open a window, or focus the existing window with the same identity.
    pub fn add_window(&mut self, descriptor: WindowDescriptor) -> AddOutcome {
        if let Err(e) = descriptor.target.validate() {
            return self.reject(e);
        }

        let existing = descriptor.target.identity().and_then(|identity| {
            self.windows
                .iter()
                .position(|w| w.target_type() == descriptor.target.target_type() && w.target.identity().as_deref() == Some(&*identity))
        });
        if let Some(index) = existing {
            return self.merge_into_existing(index, descriptor);
        }

        let geometry = match descriptor.geometry {
            Some(geometry) => {
                self.next_z = self.next_z.max(geometry.z.saturating_add(1));
                geometry
            }
            None => Geometry {
                z: self.take_z(),
                ..self.viewport.centered_half()
            },
        };
        let item = WindowItem::new(descriptor.target, descriptor.title, geometry);
        let id = item.id.clone();
        info!("Opening window {} ({})", id, item.title);
        self.windows.push(item);
        self.bus.publish(&WorkspaceEvent::WindowOpened(id.clone()));
        self.sync(true);
        AddOutcome::Created(id)
    }

    fn merge_into_existing(&mut self, index: usize, descriptor: WindowDescriptor) -> AddOutcome {
        let merged = self.windows[index].target.merged_with(&descriptor.target);
        match merged {
            Ok(target) => {
                let window = &mut self.windows[index];
                window.target = target;
                if let Some(title) = descriptor.title {
                    window.title = title;
                    window.custom_title = true;
                }
                window.refresh_title();
            }
            Err(e) => {
                warn!("Could not merge params into existing window: {}", e);
                self.notify(Notification::warning("Window not updated", e.to_string()));
            }
        }
        let id = self.windows[index].id.clone();
        debug!("Window {} already open, focusing", id);
        self.bring_to_front(index);
        self.bus.publish(&WorkspaceEvent::WindowUpdated(id.clone()));
        self.sync(false);
        AddOutcome::Focused(id)
    }

    fn reject(&mut self, e: ValidationError) -> AddOutcome {
        warn!("Rejected window descriptor: {}", e);
        self.notify(Notification::error("Could not open window", e.to_string()));
        AddOutcome::Rejected(e)
    }

    fn take_z(&mut self) -> u32 {
        let z = self.next_z;
        self.next_z = self.next_z.saturating_add(1);
        z
    }

    fn index_of(&self, id: &WindowId) -> Option<usize> {
        self.windows.iter().position(|w| &w.id == id)
    }

    fn bring_to_front(&mut self, index: usize) {
        let z = self.take_z();
        let window = &mut self.windows[index];
        window.geometry.z = z;
        window.highlighted = true;
        self.bus.publish(&WorkspaceEvent::WindowFocused {
            id: window.id.clone(),
            pulses: self.highlight_pulses,
        });
    }

    /// Bring a window to the front. Returns false if it does not exist.
    pub fn focus_window(&mut self, id: &WindowId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.bring_to_front(index);
        self.sync(false);
        true
    }

    /// End the highlight pulse of a window.
    pub fn clear_highlight(&mut self, id: &WindowId) {
        if let Some(index) = self.index_of(id) {
            self.windows[index].highlighted = false;
        }
    }

    /// Close a window. Closing an unknown id does nothing.
    pub fn remove_window(&mut self, id: &WindowId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let removed = self.windows.remove(index);
        info!("Closed window {} ({})", removed.id, removed.title);
        self.bus.publish(&WorkspaceEvent::WindowClosed(removed.id));
        self.sync(true);
        true
    }

    pub fn close_all(&mut self) {
        if self.windows.is_empty() {
            return;
        }
        self.discard_windows();
        self.sync(true);
    }

    /// Drop every window, announcing each one as closed.
    fn discard_windows(&mut self) {
        for window in std::mem::take(&mut self.windows) {
            self.bus.publish(&WorkspaceEvent::WindowClosed(window.id));
        }
    }

    /// Replace a window's query string and refresh its title. Windows
    /// without a query string are left alone.
    pub fn update_query_param(&mut self, id: &WindowId, query: &str) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let window = &mut self.windows[index];
        if !window.target.set_query_string(query) {
            return false;
        }
        window.refresh_title();
        let id = window.id.clone();
        self.bus.publish(&WorkspaceEvent::WindowUpdated(id));
        self.sync(false);
        true
    }

    /// Move or resize a window on behalf of the user. Refused while the
    /// arrangement owns the geometry.
    pub fn set_geometry(&mut self, id: &WindowId, geometry: Geometry) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let window = &mut self.windows[index];
        if !(window.controls.movable || window.controls.resizable) {
            debug!("Ignoring geometry change for locked window {}", window.id);
            return false;
        }
        window.geometry = Geometry {
            z: window.geometry.z,
            ..geometry
        };
        let id = window.id.clone();
        self.bus.publish(&WorkspaceEvent::WindowUpdated(id));
        self.sync(false);
        true
    }

    pub fn set_arrangement(&mut self, arrangement: Arrangement) {
        if arrangement == self.arrangement {
            return;
        }
        self.arrangement = arrangement;
        self.bus.publish(&WorkspaceEvent::ArrangementChanged(arrangement));
        self.sync(true);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport == self.viewport {
            return;
        }
        self.viewport = viewport;
        self.sync(true);
    }

    /// Rebuild the workspace from URL parameters.
    ///
    /// The decoded windows are replayed through [`add_window`](Self::add_window)
    /// in order, so validation and identity merging behave exactly as for
    /// interactive opens. Missing parameters start an empty workspace; an
    /// undecodable state is reported and also starts an empty workspace.
    pub fn restore(&mut self, query: &UrlQuery) -> RestoreOutcome {
        let (Some(windows), Some(arrangement)) = (&query.windows, &query.arrangement) else {
            info!("No window state in URL, starting empty");
            self.reset();
            return RestoreOutcome::Initialized;
        };

        let decoded = match decode(windows, arrangement, &self.viewport) {
            Ok(decoded) => decoded,
            Err(e) => {
                error!("Failed to restore window state: {}", e);
                self.notify(Notification::error("Could not restore workspace", e.to_string()));
                self.reset();
                return RestoreOutcome::Fallback(e);
            }
        };

        self.discard_windows();
        self.next_z = 1;
        self.arrangement = decoded.arrangement;
        let total = decoded.windows.len();
        let mut rejected = 0;
        for descriptor in decoded.windows {
            if let AddOutcome::Rejected(_) = self.add_window(descriptor) {
                rejected += 1;
            }
        }
        info!("Restored {} windows ({} rejected)", total - rejected, rejected);
        self.bus.publish(&WorkspaceEvent::ArrangementChanged(self.arrangement));
        self.sync(true);
        RestoreOutcome::Restored {
            windows: total - rejected,
            rejected,
        }
    }

    fn reset(&mut self) {
        self.discard_windows();
        self.next_z = 1;
        self.arrangement = self.default_arrangement;
        self.bus.publish(&WorkspaceEvent::ArrangementChanged(self.arrangement));
        self.sync(true);
    }

    fn notify(&mut self, notification: Notification) {
        self.bus.publish(&WorkspaceEvent::Notify(notification));
    }

    fn sync(&mut self, relayout: bool) {
        if relayout {
            arrange(self.viewport, self.arrangement, &self.layout, &mut self.windows);
            self.bus.publish(&WorkspaceEvent::Relayout);
        }
        self.url = encode(&self.windows, self.arrangement, &self.viewport);
        debug!("Synced URL state ({} windows, {})", self.windows.len(), self.arrangement);
        self.bus.publish(&WorkspaceEvent::UrlSynced(self.url.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::geometry::WindowControls;
    use crate::window::schema::WindowTarget;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn registry() -> WindowRegistry {
        WindowRegistry::new(&WorkspaceSettings::default(), Viewport::new(1600, 900))
    }

    fn text(id: &str) -> WindowDescriptor {
        WindowDescriptor::new(WindowTarget::from_parts("Text", json!({"textId": id})).unwrap())
    }

    fn search(query: &str) -> WindowDescriptor {
        WindowDescriptor::new(WindowTarget::from_parts("Search", json!({"queryString": query})).unwrap())
    }

    #[test]
    fn test_add_creates_and_lays_out() {
        let mut reg = registry();
        let id = reg.add_window(text("a")).id().cloned().unwrap();
        assert_eq!(reg.len(), 1);
        let window = reg.get(&id).unwrap();
        assert_eq!(window.geometry.width, 1600);
        assert_eq!(window.geometry.height, 900);
        assert_eq!(window.controls, WindowControls::LOCKED);
    }

    #[test]
    fn test_identity_dedup_focuses_existing() {
        let mut reg = registry();
        let first = reg.add_window(text("a")).id().cloned().unwrap();
        reg.add_window(text("b"));
        let outcome = reg.add_window(text("a"));
        assert_eq!(outcome, AddOutcome::Focused(first.clone()));
        assert_eq!(reg.len(), 2);
        let window = reg.get(&first).unwrap();
        assert!(window.highlighted);
        assert!(reg.windows().iter().all(|w| w.geometry.z <= window.geometry.z));

        reg.clear_highlight(&first);
        assert!(!reg.get(&first).unwrap().highlighted);
    }

    #[test]
    fn test_windows_without_identity_repeat() {
        let mut reg = registry();
        reg.add_window(search("a:1"));
        reg.add_window(search("a:1"));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_rejected_descriptor_notifies() {
        let mut reg = registry();
        let notes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&notes);
        reg.subscribe(move |e| {
            if let WorkspaceEvent::Notify(n) = e {
                sink.borrow_mut().push(n.clone());
            }
        });
        let outcome = reg.add_window_value(&json!({"targetType": "Text", "params": {}}));
        assert!(matches!(outcome, AddOutcome::Rejected(ValidationError::InvalidParams { .. })));
        assert!(reg.is_empty());
        assert_eq!(notes.borrow().len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut reg = registry();
        let id = reg.add_window(text("a")).id().cloned().unwrap();
        assert!(reg.remove_window(&id));
        assert!(!reg.remove_window(&id));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_update_query_param() {
        let mut reg = registry();
        let id = reg.add_window(search("a:1")).id().cloned().unwrap();
        assert!(reg.update_query_param(&id, "a:2"));
        let window = reg.get(&id).unwrap();
        assert_eq!(window.target.query_string(), Some("a:2"));
        assert_eq!(window.title, "Search: a:2");

        let text_id = reg.add_window(text("x")).id().cloned().unwrap();
        let before = reg.get(&text_id).cloned();
        assert!(!reg.update_query_param(&text_id, "a:2"));
        assert_eq!(reg.get(&text_id).cloned(), before);
    }

    #[test]
    fn test_geometry_only_when_unlocked() {
        let mut reg = registry();
        let id = reg.add_window(text("a")).id().cloned().unwrap();
        let moved = Geometry { x: 10, y: 10, z: 0, width: 200, height: 100 };
        assert!(!reg.set_geometry(&id, moved));
        reg.set_arrangement(Arrangement::None);
        assert!(reg.set_geometry(&id, moved));
        assert_eq!(reg.get(&id).unwrap().geometry.width, 200);
    }

    #[test]
    fn test_every_mutation_syncs_url() {
        let mut reg = registry();
        let synced = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&synced);
        reg.subscribe(move |e| {
            if matches!(e, WorkspaceEvent::UrlSynced(_)) {
                *counter.borrow_mut() += 1;
            }
        });
        let id = reg.add_window(text("a")).id().cloned().unwrap();
        reg.set_arrangement(Arrangement::Cascade);
        reg.focus_window(&id);
        reg.remove_window(&id);
        assert_eq!(*synced.borrow(), 4);
        assert_eq!(reg.url_state().arrangement, "cascade");
    }

    #[test]
    fn test_restore_without_params_initializes() {
        let mut reg = registry();
        reg.add_window(text("a"));
        assert!(matches!(reg.restore(&UrlQuery::default()), RestoreOutcome::Initialized));
        assert!(reg.is_empty());
        assert_eq!(reg.arrangement(), Arrangement::SmartTile);
        assert_eq!(reg.url_state().arrangement, "smart-tile");
    }

    fn track_open(reg: &mut WindowRegistry) -> Rc<RefCell<i64>> {
        let open = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&open);
        reg.subscribe(move |e| match e {
            WorkspaceEvent::WindowOpened(_) => *counter.borrow_mut() += 1,
            WorkspaceEvent::WindowClosed(_) => *counter.borrow_mut() -= 1,
            _ => {}
        });
        open
    }

    #[test]
    fn test_restore_announces_replaced_windows() {
        let mut reg = registry();
        let open = track_open(&mut reg);
        reg.add_window(text("a"));
        reg.add_window(text("b"));
        let saved = reg.url_state().clone();

        reg.restore(&UrlQuery::default());
        assert_eq!(*open.borrow(), 0);

        reg.add_window(text("c"));
        reg.restore(&UrlQuery::from(saved));
        assert_eq!(reg.len(), 2);
        assert_eq!(*open.borrow(), 2);

        reg.restore(&UrlQuery::parse("w=!!!&a=tile"));
        assert!(reg.is_empty());
        assert_eq!(*open.borrow(), 0);
    }

    #[test]
    fn test_restore_garbage_falls_back() {
        let mut reg = registry();
        reg.add_window(text("a"));
        let query = UrlQuery::parse("w=!!!&a=tile");
        assert!(matches!(reg.restore(&query), RestoreOutcome::Fallback(CodecError::Transport(_))));
        assert!(reg.is_empty());
    }
}
