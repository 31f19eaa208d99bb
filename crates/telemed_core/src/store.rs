use crate::RequestId;

/// Result cache shared by one or more slots.
///
/// Invoking parks the previous value in `stashed` and leaves `current`
/// empty, so nothing is reported as a result during loading. Every live
/// request holds a claim. A success replaces the value and retires all
/// claims issued before it, so an older request finishing later is
/// rejected. When the last claim is released by failure or cancel the
/// parked value comes back.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResultStore<T> {
    current: Option<T>,
    stashed: Option<T>,
    claims: Vec<RequestId>,
}

impl<T> Default for ResultStore<T> {
    fn default() -> Self {
        Self {
            current: None,
            stashed: None,
            claims: Vec::new(),
        }
    }
}

impl<T> ResultStore<T> {
    pub(crate) fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub(crate) fn claim(&mut self, request_id: RequestId) {
        if self.current.is_some() {
            self.stashed = self.current.take();
        }
        self.claims.push(request_id);
    }

    /// Returns `false` when `request_id` holds no live claim.
    pub(crate) fn fulfil(&mut self, request_id: RequestId, value: T) -> bool {
        if !self.claims.contains(&request_id) {
            return false;
        }
        // Request ids grow monotonically.
        self.claims.retain(|&claim| claim > request_id);
        self.current = Some(value);
        self.stashed = None;
        true
    }

    pub(crate) fn release(&mut self, request_id: RequestId) {
        let before = self.claims.len();
        self.claims.retain(|&claim| claim != request_id);
        if self.claims.len() == before || !self.claims.is_empty() {
            return;
        }
        if self.current.is_none() {
            self.current = self.stashed.take();
        }
        self.stashed = None;
    }

    /// Drops both the visible and the parked value; live claims may still write.
    pub(crate) fn clear(&mut self) {
        self.current = None;
        self.stashed = None;
    }
}
