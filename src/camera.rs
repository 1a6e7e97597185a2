use std::{collections::BTreeSet, fmt, str::FromStr};

use crate::error::{SitelapseError, SitelapseResult};

/// Camera selection expression: every camera, the first N by sorted name,
/// or an explicit comma-separated name list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CameraSelector {
    All,
    FirstN(usize),
    Named(Vec<String>),
}

impl FromStr for CameraSelector {
    type Err = SitelapseError;

    fn from_str(s: &str) -> SitelapseResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SitelapseError::config(
                "camera selection expression must be non-empty",
            ));
        }
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        if let Some(rest) = s.strip_prefix("first:") {
            let n: usize = rest.trim().parse().map_err(|_| {
                SitelapseError::config(format!("invalid camera count in 'first:{rest}'"))
            })?;
            if n == 0 {
                return Err(SitelapseError::config("'first:N' requires N >= 1"));
            }
            return Ok(Self::FirstN(n));
        }
        let names: Vec<String> = s
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        if names.is_empty() {
            return Err(SitelapseError::config(
                "camera selection expression names no cameras",
            ));
        }
        Ok(Self::Named(names))
    }
}

impl fmt::Display for CameraSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::FirstN(n) => write!(f, "first:{n}"),
            Self::Named(names) => write!(f, "{}", names.join(",")),
        }
    }
}

/// Resolve a selector against the scene's cameras, then drop excluded names.
///
/// The basis for `All` and `FirstN` is the camera list sorted by name;
/// explicit names keep their given order, deduplicated. Every explicitly
/// named camera must exist; all missing names are reported together.
pub fn resolve_cameras(
    selector: &CameraSelector,
    available: &[String],
    exclude: &[String],
) -> SitelapseResult<Vec<String>> {
    let mut sorted: Vec<String> = available.to_vec();
    sorted.sort();
    sorted.dedup();

    let basis: Vec<String> = match selector {
        CameraSelector::All => sorted,
        CameraSelector::FirstN(n) => sorted.into_iter().take(*n).collect(),
        CameraSelector::Named(names) => {
            let known: BTreeSet<&str> = available.iter().map(String::as_str).collect();
            let missing: Vec<&str> = names
                .iter()
                .map(String::as_str)
                .filter(|name| !known.contains(name))
                .collect();
            if !missing.is_empty() {
                return Err(SitelapseError::binding(format!(
                    "cameras not found in scene: {}",
                    missing.join(", ")
                )));
            }
            let mut seen = BTreeSet::new();
            names
                .iter()
                .filter(|name| seen.insert(name.as_str()))
                .cloned()
                .collect()
        }
    };

    let excluded: BTreeSet<&str> = exclude.iter().map(String::as_str).collect();
    let selected: Vec<String> = basis
        .into_iter()
        .filter(|name| !excluded.contains(name.as_str()))
        .collect();

    if selected.is_empty() {
        return Err(SitelapseError::config(
            "camera selection is empty after exclusion",
        ));
    }
    Ok(selected)
}
