use std::collections::HashMap;

use crate::catalog::CatalogClient;
use crate::domain::ContainerId;
use crate::error::LinksError;

/// Run-scoped memo of project display names.
///
/// Each distinct project id reaches the catalog at most once, whatever order the
/// rows arrive in. Failed lookups are remembered too.
pub struct ProjectNameCache<'a, C: CatalogClient + ?Sized> {
    catalog: &'a C,
    names: HashMap<ContainerId, Result<String, String>>,
}

impl<'a, C: CatalogClient + ?Sized> ProjectNameCache<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self {
            catalog,
            names: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, container: &ContainerId) -> Result<String, LinksError> {
        let catalog = self.catalog;
        let entry = self.names.entry(container.clone()).or_insert_with(|| {
            tracing::debug!(project = %container, "resolving project name");
            catalog
                .resolve_container_name(container)
                .map_err(|err| match err {
                    LinksError::Lookup { message, .. } => message,
                    other => other.to_string(),
                })
        });
        entry.clone().map_err(|message| LinksError::Lookup {
            id: container.to_string(),
            message,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
