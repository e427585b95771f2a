//! Opaque PDF byte streams passed between pipeline stages.

use crate::error::{DocumentKind, Result};
use crate::pipeline::merge;
use std::fmt;

/// An immutable PDF, tagged with the document it was rendered from.
///
/// The merged report has no single source and carries `kind: None`.
#[derive(Clone, PartialEq, Eq)]
pub struct PdfArtifact {
    kind: Option<DocumentKind>,
    bytes: Vec<u8>,
}

impl PdfArtifact {
    pub fn rendered(kind: DocumentKind, bytes: Vec<u8>) -> Self {
        Self {
            kind: Some(kind),
            bytes,
        }
    }

    pub fn merged(bytes: Vec<u8>) -> Self {
        Self { kind: None, bytes }
    }

    pub fn kind(&self) -> Option<DocumentKind> {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Parse the artifact and count its pages.
    pub fn page_count(&self) -> Result<usize> {
        merge::page_count(&self.bytes)
    }
}

impl fmt::Debug for PdfArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfArtifact")
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}
