/// Discriminated phase of one exam attempt. Exactly one holds at a time;
/// presentation components re-render from it and own none of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Exam definition and submission status are being fetched.
    Loading,
    /// A load or stream failure left the session displayable but inert.
    Error { message: String },
    /// The learner is answering; countdown and autosave are live.
    InProgress,
    /// The submit request is in flight. Further submit triggers are no-ops.
    Submitting,
    /// Submit accepted; consuming the grading progress stream.
    AwaitingGrading,
    /// Terminal: grading finished and the record is stored.
    Completed,
    /// Terminal: a prior submission was detected at load time.
    AlreadySubmitted,
}

impl Phase {
    /// True once the session can never return to answering.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::AlreadySubmitted)
    }
}

/// What one countdown tick asks the service layer to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickEffects {
    /// An autosave boundary was crossed with at least one answer present.
    pub autosave_due: bool,
    /// The countdown just reached zero; submit without confirmation.
    pub force_submit: bool,
}

impl TickEffects {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}
