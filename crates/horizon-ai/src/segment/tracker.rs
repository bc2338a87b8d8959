use super::Segmentation;
use super::code::{CodePayload, PayloadSource};

/// Decides when a turn's consumers must be told about a new code payload.
///
/// Create one per turn and feed it every [`Segmentation`]. Once a payload has
/// been reported the tracker stays on that region: a later candidate is only
/// accepted when it has the same anchor, or when it is a closed fence
/// replacing a raw document. A fence always outranks a bare doctype, even one
/// that was only mentioned in prose ahead of the block.
#[derive(Debug, Default)]
pub struct PayloadTracker {
    current: Option<CodePayload>,
}

impl PayloadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new code when it differs from the last reported one.
    pub fn observe(&mut self, segmentation: &Segmentation) -> Option<String> {
        let candidate = segmentation.code_payload.as_ref()?;

        if let Some(current) = &self.current {
            if !same_region(current, candidate) {
                tracing::debug!(
                    locked_anchor = current.anchor,
                    candidate_anchor = candidate.anchor,
                    "Ignoring code payload from another region"
                );
                return None;
            }
            if current.code == candidate.code {
                self.current = Some(candidate.clone());
                return None;
            }
        }

        self.current = Some(candidate.clone());
        Some(candidate.code.clone())
    }

    /// Last reported code, if any.
    pub fn current(&self) -> Option<&str> {
        self.current.as_ref().map(|p| p.code.as_str())
    }

    pub fn into_current(self) -> Option<String> {
        self.current.map(|p| p.code)
    }
}

fn same_region(current: &CodePayload, candidate: &CodePayload) -> bool {
    match (current.source, candidate.source) {
        (PayloadSource::Document, PayloadSource::Fenced) => true,
        _ => current.source == candidate.source && current.anchor == candidate.anchor,
    }
}
