use compact_str::CompactString;
use core::fmt;

/// Namespace URI plus local name, as used for variables and extension
/// functions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    pub ns_uri: Option<CompactString>,
    pub local: CompactString,
}

impl ExpandedName {
    pub fn new(ns_uri: Option<&str>, local: impl Into<CompactString>) -> Self {
        Self {
            ns_uri: ns_uri.map(CompactString::from),
            local: local.into(),
        }
    }

    pub fn local(local: impl Into<CompactString>) -> Self {
        Self {
            ns_uri: None,
            local: local.into(),
        }
    }

    pub fn ns(ns_uri: &str, local: impl Into<CompactString>) -> Self {
        Self::new(Some(ns_uri), local)
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns_uri {
            Some(ns) => write!(f, "Q{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

impl From<&str> for ExpandedName {
    fn from(local: &str) -> Self {
        ExpandedName::local(local)
    }
}
