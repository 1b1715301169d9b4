/// Fire-and-forget routing effect, called from machine actions. Synchronous
/// because actions are; implementations must not block.
pub trait Navigator: Send + Sync {
    fn navigate_to(&self, path: &str);
}
