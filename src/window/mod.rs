//! Window workspace: typed window descriptors, layout, URL persistence and
//! the registry tying them together.

pub mod codec;
pub mod events;
pub mod geometry;
pub mod item;
pub mod layout;
pub mod registry;
pub mod schema;

pub use codec::{CodecError, DecodedState, UrlQuery, UrlState, WindowSnapshot, decode, encode};
pub use events::{EventBus, Notification, NotificationLevel, SubscriptionId, WorkspaceEvent};
pub use geometry::{Geometry, Viewport, WindowControls};
pub use item::{IdentityKey, WindowId, WindowItem};
pub use layout::{Arrangement, LayoutSettings, WindowHandle, arrange};
pub use registry::{AddOutcome, RestoreOutcome, WindowRegistry};
pub use schema::{TargetType, ValidationError, WindowDescriptor, WindowTarget};
