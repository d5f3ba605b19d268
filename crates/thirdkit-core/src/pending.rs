/// One-slot store for the platform of the action currently awaiting a vendor reply.
///
/// Every terminal notification a manager emits goes through [`take`](Self::take):
/// the first completion for an action consumes the context, later ones find the
/// slot empty and are dropped. That is what keeps an action to exactly one
/// terminal result even when a vendor reports through two paths.
#[derive(Debug)]
pub struct Pending<P> {
    slot: Option<P>,
}

impl<P> Pending<P> {
    pub fn new() -> Self {
        Self { slot: None }
    }

    /// Store `platform` as the in-flight context, returning any context it replaced.
    pub fn begin(&mut self, platform: P) -> Option<P> {
        self.slot.replace(platform)
    }

    /// Consume the in-flight context.
    pub fn take(&mut self) -> Option<P> {
        self.slot.take()
    }

    pub fn current(&self) -> Option<&P> {
        self.slot.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.slot.is_some()
    }
}

impl<P> Default for Pending<P> {
    fn default() -> Self {
        Self::new()
    }
}
