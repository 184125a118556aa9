use std::time::Duration;

use crate::catalog::CatalogClient;
use crate::domain::{ContainerId, FileId};
use crate::error::LinksError;
use crate::pairing::PairedRow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Links {
    pub url: String,
    pub index_url: Option<String>,
}

/// Mints a time-limited endpoint for the file and appends `/<name>` so the
/// URL carries the real file name.
pub fn assemble_url<C: CatalogClient + ?Sized>(
    catalog: &C,
    file: &FileId,
    container: &ContainerId,
    name: &str,
    ttl: Duration,
) -> Result<String, LinksError> {
    let endpoint = catalog.mint_download_url(file, container, ttl)?;
    Ok(format!("{endpoint}/{name}"))
}

pub struct UrlAssembler<'a, C: CatalogClient + ?Sized> {
    catalog: &'a C,
    ttl: Duration,
}

impl<'a, C: CatalogClient + ?Sized> UrlAssembler<'a, C> {
    pub fn new(catalog: &'a C, ttl: Duration) -> Self {
        Self { catalog, ttl }
    }

    /// Links for the primary file and, when paired, its index. Either failure fails the row.
    pub fn link(&self, row: &PairedRow) -> Result<Links, LinksError> {
        let primary = &row.primary;
        let url = assemble_url(
            self.catalog,
            &primary.file,
            &primary.container,
            &primary.name,
            self.ttl,
        )?;
        let index_url = row
            .index
            .as_ref()
            .map(|index| {
                assemble_url(
                    self.catalog,
                    &index.file,
                    &index.container,
                    &index.name,
                    self.ttl,
                )
            })
            .transpose()?;
        Ok(Links { url, index_url })
    }
}
