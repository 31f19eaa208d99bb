use crate::{FailureReason, RequestId, SlotKind};

/// Lifecycle of one operation slot.
///
/// Validation happens synchronously inside `update`, so there is no
/// observable phase between `Idle` and `InFlight`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotPhase {
    #[default]
    Idle,
    InFlight {
        request_id: RequestId,
    },
    Succeeded,
    Failed {
        reason: FailureReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSlot {
    kind: SlotKind,
    phase: SlotPhase,
}

impl OperationSlot {
    pub fn new(kind: SlotKind) -> Self {
        Self {
            kind,
            phase: SlotPhase::Idle,
        }
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    pub fn phase(&self) -> SlotPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, SlotPhase::InFlight { .. })
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        match self.phase {
            SlotPhase::InFlight { request_id } => Some(request_id),
            _ => None,
        }
    }

    pub fn last_error(&self) -> Option<FailureReason> {
        match self.phase {
            SlotPhase::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    pub(crate) fn begin(&mut self, request_id: RequestId) {
        self.phase = SlotPhase::InFlight { request_id };
    }

    pub(crate) fn succeed(&mut self) {
        self.phase = SlotPhase::Succeeded;
    }

    pub(crate) fn fail(&mut self, reason: FailureReason) {
        self.phase = SlotPhase::Failed { reason };
    }

    /// Drops the in-flight request, if any, and returns its id.
    pub(crate) fn abandon(&mut self) -> Option<RequestId> {
        let request_id = self.in_flight()?;
        self.phase = SlotPhase::Idle;
        Some(request_id)
    }
}

/// The five slots of a session, one per action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Slots {
    slots: [OperationSlot; 5],
}

impl Default for Slots {
    fn default() -> Self {
        Self {
            slots: SlotKind::ALL.map(OperationSlot::new),
        }
    }
}

impl Slots {
    fn index(kind: SlotKind) -> usize {
        match kind {
            SlotKind::Chat => 0,
            SlotKind::TextAnalysis => 1,
            SlotKind::ImageAnalysis => 2,
            SlotKind::TextExtraction => 3,
            SlotKind::Research => 4,
        }
    }

    pub(crate) fn get(&self, kind: SlotKind) -> &OperationSlot {
        &self.slots[Self::index(kind)]
    }

    pub(crate) fn get_mut(&mut self, kind: SlotKind) -> &mut OperationSlot {
        &mut self.slots[Self::index(kind)]
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &OperationSlot> {
        self.slots.iter()
    }

    /// Finds the slot currently waiting on `request_id`.
    pub(crate) fn owner_of(&self, request_id: RequestId) -> Option<SlotKind> {
        self.slots
            .iter()
            .find(|slot| slot.in_flight() == Some(request_id))
            .map(OperationSlot::kind)
    }
}
