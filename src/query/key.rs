use std::fmt;

/// Identifies a cached read: a resource kind plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    resource: String,
    params: Vec<String>,
}

impl QueryKey {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter.
    pub fn with(mut self, param: impl ToString) -> Self {
        self.params.push(param.to_string());
        self
    }

    /// True when `self`, used as an invalidation pattern, covers `other`:
    /// same resource and `self`'s params are a prefix of `other`'s.
    pub fn matches(&self, other: &QueryKey) -> bool {
        self.resource == other.resource && other.params.starts_with(&self.params)
    }
}

impl From<&str> for QueryKey {
    fn from(resource: &str) -> Self {
        QueryKey::new(resource)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource)?;
        for param in &self.params {
            write!(f, "/{}", param)?;
        }
        Ok(())
    }
}
