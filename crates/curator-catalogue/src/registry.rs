//! Expander lookup by name

use crate::errors::CatalogueError;
use crate::expander::{Expander, LocalGlobExpander, XrootdExpander};
use std::fmt;
use std::str::FromStr;

/// Name of the expander used when none is requested
pub const DEFAULT_EXPANDER: &str = "xrootd";

/// The known expansion strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpanderKind {
    Xrootd,
    Local,
}

impl ExpanderKind {
    pub const ALL: [ExpanderKind; 2] = [ExpanderKind::Xrootd, ExpanderKind::Local];

    pub fn as_str(self) -> &'static str {
        match self {
            ExpanderKind::Xrootd => "xrootd",
            ExpanderKind::Local => "local",
        }
    }

    /// Comma separated list of valid names
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn build(self) -> Box<dyn Expander> {
        match self {
            ExpanderKind::Xrootd => Box::new(XrootdExpander::new()),
            ExpanderKind::Local => Box::new(LocalGlobExpander),
        }
    }
}

impl fmt::Display for ExpanderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpanderKind {
    type Err = CatalogueError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| {
                CatalogueError::Configuration(format!(
                    "Unknown catalogue interface requested, '{}'. Valid options: {}",
                    name,
                    Self::valid_names()
                ))
            })
    }
}

/// Resolve an expander by name and check that it can run
pub fn get_file_list_expander(name: &str) -> Result<Box<dyn Expander>, CatalogueError> {
    let expander = name.parse::<ExpanderKind>()?.build();
    ensure_setup(expander)
}

fn ensure_setup(expander: Box<dyn Expander>) -> Result<Box<dyn Expander>, CatalogueError> {
    if !expander.check_setup() {
        return Err(CatalogueError::Configuration(format!(
            "Issue setting up catalogue interface: {}",
            expander.name()
        )));
    }
    Ok(expander)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CatalogueError;

    struct BrokenExpander;

    impl Expander for BrokenExpander {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn check_setup(&self) -> bool {
            false
        }

        fn expand(
            &self,
            _patterns: &[String],
            _prefix: Option<&str>,
        ) -> Result<Vec<String>, CatalogueError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_get_known_expanders() {
        assert!(get_file_list_expander("xrootd").is_ok_and(|e| e.name() == "xrootd"));
        assert!(get_file_list_expander("local").is_ok_and(|e| e.name() == "local"));
    }

    #[test]
    fn test_unknown_expander() {
        let Err(err) = get_file_list_expander("gobbledy gook") else {
            panic!("unknown expander must fail");
        };
        let message = err.to_string();
        assert!(message.contains("Unknown catalogue"));
        assert!(message.contains("'gobbledy gook'"));
        assert!(message.contains("xrootd, local"));
    }

    #[test]
    fn test_failed_setup_names_expander() {
        let Err(err) = ensure_setup(Box::new(BrokenExpander)) else {
            panic!("broken setup must fail");
        };
        assert!(matches!(err, CatalogueError::Configuration(_)));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_default_expander_is_registered() {
        assert!(DEFAULT_EXPANDER.parse::<ExpanderKind>().is_ok_and(|k| k == ExpanderKind::Xrootd));
    }
}
