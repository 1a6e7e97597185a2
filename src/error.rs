pub type SitelapseResult<T> = Result<T, SitelapseError>;

#[derive(thiserror::Error, Debug)]
pub enum SitelapseError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("binding error: {0}")]
    Binding(String),

    #[error("subprocess error: {0}")]
    Subprocess(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SitelapseError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn binding(msg: impl Into<String>) -> Self {
        Self::Binding(msg.into())
    }

    pub fn subprocess(msg: impl Into<String>) -> Self {
        Self::Subprocess(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            SitelapseError::config("x")
                .to_string()
                .contains("configuration error:")
        );
        assert!(
            SitelapseError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            SitelapseError::binding("x")
                .to_string()
                .contains("binding error:")
        );
        assert!(
            SitelapseError::subprocess("x")
                .to_string()
                .contains("subprocess error:")
        );
        assert!(
            SitelapseError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = SitelapseError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
