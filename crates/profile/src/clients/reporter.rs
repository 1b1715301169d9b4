use crate::clients::ApiError;
use crate::model::EntityKind;

/// Error sink notified when a machine lands in an error state. Fire-and-forget
/// like [`Navigator`](crate::clients::Navigator).
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &ApiError, kind: EntityKind, slug: &str);
}
