// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Simulated data files and the process-wide file registry.

use crate::define_id;
use crate::error::CoreError;
use parking_lot::RwLock;
use smol_str::SmolStr;
use std::collections::HashMap;

define_id! {
    /// Identifier of a [`DataFile`].
    pub struct FileId("file");
}

/// An immutable simulated file: an identifier and a size in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    id: FileId,
    name: SmolStr,
    size_bytes: u64,
}

impl DataFile {
    pub fn new(name: impl Into<SmolStr>, size_bytes: u64) -> Self {
        Self { id: FileId::new(), name: name.into(), size_bytes }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// Process-wide registry of known [`DataFile`]s, keyed by id.
///
/// Mirrors the "global state is a singleton with explicit init/clear"
/// design note: there is no implicit module-load side effect, a simulation
/// constructs exactly one registry and tears it down when it ends.
#[derive(Debug, Default)]
pub struct FileRegistry {
    files: RwLock<HashMap<FileId, DataFile>>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, file: DataFile) -> FileId {
        let id = file.id();
        self.files.write().insert(id, file);
        id
    }

    pub fn get(&self, id: FileId) -> Option<DataFile> {
        self.files.read().get(&id).cloned()
    }

    pub fn lookup_by_name(&self, name: &str) -> Result<DataFile, CoreError> {
        self.files
            .read()
            .values()
            .find(|f| f.name() == name)
            .cloned()
            .ok_or_else(|| CoreError::invalid_argument(format!("no such file: {name}")))
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    /// Drop every registered file. Called at simulation tear-down.
    pub fn clear(&self) {
        self.files.write().clear();
    }
}

#[cfg(test)]
#[path = "data_file_tests.rs"]
mod tests;
