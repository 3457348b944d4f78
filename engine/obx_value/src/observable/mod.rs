//! Reference observable objects.
//!
//! Small host types that implement [`Object`](crate::Object) together with
//! the change-notification contract. They are enough to drive the engine
//! from tests and simple callers; richer hosts implement `Object` directly.
//!
//! All three follow the same discipline: mutate under the internal lock,
//! release it, then notify.

mod list;
mod map;
mod record;

pub use list::ObservableList;
pub use map::ObservableMap;
pub use record::ObservableRecord;

/// Member name under which collections expose their element count.
pub(crate) const LEN: &str = "len";
