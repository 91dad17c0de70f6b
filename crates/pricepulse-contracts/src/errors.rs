use thiserror::Error;

/// Failures the tracking pipeline can surface.
///
/// `MissingCredential` is raised once at startup; everything else is raised
/// per submission and converted into a single user-facing message by the
/// tracker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("missing API credential; set {0}")]
    MissingCredential(String),
    #[error("invalid input type '{0}' (expected URL, TEXT or IMAGE)")]
    InvalidInputKind(String),
    #[error("image input must be a data URI of the form data:<mime>;base64,<data>")]
    MalformedImageInput,
    #[error("Could not identify the product. Please try a different input.")]
    IdentityNotFound,
    #[error("Received an empty response from the price analysis service.")]
    EmptyAnalysisResponse,
    #[error("Could not parse the product price data.")]
    UnparseableAnalysisJson,
    #[error("AI service request failed: {0}")]
    UpstreamService(String),
}

impl PipelineError {
    /// Wraps a transport failure, keeping every cause in the chain.
    pub fn upstream(err: &anyhow::Error) -> Self {
        Self::UpstreamService(error_chain_message(err))
    }

    pub fn is_soft(&self) -> bool {
        matches!(self, Self::IdentityNotFound)
    }
}

pub fn error_chain_message(err: &anyhow::Error) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::{error_chain_message, PipelineError};

    #[test]
    fn upstream_keeps_cause_chain() {
        let err = Err::<(), _>(anyhow::anyhow!("connection reset"))
            .context("Gemini request failed")
            .unwrap_err();
        assert_eq!(
            PipelineError::upstream(&err),
            PipelineError::UpstreamService("Gemini request failed: connection reset".to_string())
        );
    }

    #[test]
    fn chain_message_skips_blank_and_repeated_causes() {
        let err = anyhow::anyhow!("timeout").context("timeout").context("  ");
        assert_eq!(error_chain_message(&err), "timeout");
    }

    #[test]
    fn only_identity_miss_is_soft() {
        assert!(PipelineError::IdentityNotFound.is_soft());
        assert!(!PipelineError::EmptyAnalysisResponse.is_soft());
        assert!(!PipelineError::InvalidInputKind("VIDEO".to_string()).is_soft());
    }
}
