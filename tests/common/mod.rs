//! Common test infrastructure
//!
//! Scripted collaborators for the aggregation engine plus track and library
//! fixtures. Tests should only import from this module, not from internal
//! submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{member, shared_track, ScriptedSource, RecordingObserver};
//!
//! #[tokio::test]
//! async fn test_two_members() {
//!     let source = ScriptedSource::new()
//!         .with_tracks("a", vec![shared_track(1)])
//!         .with_tracks("b", vec![shared_track(1)]);
//!     let (engine, observer) = RecordingObserver::engine(source);
//!     engine.start(vec![member("a"), member("b")]).unwrap();
//! }
//! ```

#![allow(dead_code)]

mod constants;
mod fixtures;
mod observer;
mod source;

// Public API - this is what tests import
pub use constants::*;
pub use fixtures::*;
pub use observer::{PanicPoint, PanickingObserver, RecordingObserver};
pub use source::ScriptedSource;
