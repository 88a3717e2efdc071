use serde::Serialize;
use std::fmt;

/// Identifies a resource inside a module: either a 16-bit integer id or a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ResourceId {
    Id(u16),
    Name(String),
}

impl ResourceId {
    pub fn as_id(&self) -> Option<u16> {
        match self {
            ResourceId::Id(id) => Some(*id),
            ResourceId::Name(_) => None,
        }
    }
}

impl From<u16> for ResourceId {
    fn from(id: u16) -> Self {
        ResourceId::Id(id)
    }
}

impl From<&str> for ResourceId {
    fn from(name: &str) -> Self {
        ResourceId::Name(name.to_owned())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Id(id) => write!(f, "{}", id),
            ResourceId::Name(name) => f.write_str(name),
        }
    }
}
