//! Observable containers backing record and record set state.
//!
//! Both containers notify subscribers through an
//! [`event_emitter_rs::EventEmitter`] after each mutation. The entries lock
//! is released before listeners run, so a listener may read the container it
//! subscribed to.

mod list;
mod map;

pub use list::ObservableList;
pub use map::ObservableMap;

/// Event name emitted by both containers after a mutation.
pub const CHANGE_EVENT: &str = "change";
