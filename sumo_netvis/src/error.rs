use thiserror::Error;

/// Problems found while reading SUMO files.
///
/// `Structural` problems abort the whole parse and come back through `anyhow::Result`; callers
/// can `downcast_ref::<ParseError>()` to tell them apart from IO errors. The other two variants
/// only ever skip one entity and land in the model's `diagnostics`.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ParseError {
    #[error("malformed structure: {0}")]
    Structural(String),
    #[error("bad geometry for {id}: {reason}")]
    Geometry { id: String, reason: String },
    #[error("can't resolve {id}: {reason}")]
    Resolution { id: String, reason: String },
}

impl ParseError {
    pub(crate) fn geometry<I: Into<String>, R: Into<String>>(id: I, reason: R) -> ParseError {
        ParseError::Geometry {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn resolution<I: Into<String>, R: Into<String>>(id: I, reason: R) -> ParseError {
        ParseError::Resolution {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// The entity this problem is about, if it's not structural.
    pub fn id(&self) -> Option<&str> {
        match self {
            ParseError::Structural(_) => None,
            ParseError::Geometry { id, .. } | ParseError::Resolution { id, .. } => Some(id),
        }
    }

    pub fn is_geometry(&self) -> bool {
        matches!(self, ParseError::Geometry { .. })
    }

    pub fn is_resolution(&self) -> bool {
        matches!(self, ParseError::Resolution { .. })
    }
}
