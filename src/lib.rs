//! Rainwatch: keeps a rain nowcast view in sync with the viewer's position.
//!
//! While the page is visible the scheduler runs one tick per interval:
//! resolve the position, check it lies in the supported region, fetch the
//! forecast page for those coordinates and merge its content fragment into
//! the view.
//!
//! # Architecture
//!
//! - **position**: where the viewer is ([`PositionSource`])
//! - **bounds**: the supported region ([`BoundingBox`])
//! - **fetcher**: forecast retrieval ([`FragmentSource`], [`ContentFetcher`])
//! - **view** / **reporter**: the two display regions and error reporting
//! - **scheduler**: tick timing, visibility handling and the event loop
//! - **redirect**: one-shot position redirect

pub mod bounds;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod position;
pub mod redirect;
pub mod reporter;
pub mod scheduler;
pub mod view;

pub use bounds::{BoundingBox, NETHERLANDS, within_bounds};
pub use config::WatchConfig;
pub use error::{GeolocationError, RefreshError, Result, WatchError};
pub use fetcher::{ContentFetcher, FragmentSource};
pub use position::{Position, PositionSource};
pub use redirect::{Navigation, navigation_for};
pub use reporter::ErrorReporter;
pub use scheduler::{SchedulerSnapshot, TickRunner, Visibility};
pub use view::{MemoryView, TerminalView, ViewSurface};
