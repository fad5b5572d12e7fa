use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::registry::ToolCatalog;
use super::types::ToolDescriptor;
use crate::error::ToolError;

/// Tool names visible to one session. Fixed when the session starts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowedToolSet {
    names: HashSet<String>,
}

impl AllowedToolSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Everything in the catalog.
    pub fn all(catalog: &ToolCatalog) -> Self {
        Self::new(catalog.names())
    }

    /// `None` means every registered tool. Every listed name must be in the
    /// catalog.
    pub fn from_config(catalog: &ToolCatalog, allowed: Option<&[String]>) -> Result<Self, ToolError> {
        let names = match allowed {
            Some(names) => names,
            None => return Ok(Self::all(catalog)),
        };
        if let Some(unknown) = names.iter().find(|name| !catalog.has(name)) {
            return Err(ToolError::UnknownTool(unknown.clone()));
        }
        Ok(Self::new(names.iter().cloned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

pub fn filter<'a, I>(descriptors: I, allowed: &'a AllowedToolSet) -> impl Iterator<Item = &'a ToolDescriptor> + 'a
where
    I: IntoIterator<Item = &'a ToolDescriptor>,
    I::IntoIter: 'a,
{
    descriptors.into_iter().filter(move |d| allowed.contains(&d.name))
}

pub fn check(tool_name: &str, allowed: &AllowedToolSet) -> Result<(), ToolError> {
    if allowed.contains(tool_name) {
        Ok(())
    } else {
        Err(ToolError::NotAllowed(tool_name.to_string()))
    }
}
