// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File locations and path sanitization.

use crate::error::CoreError;
use smol_str::SmolStr;

const UNALLOWED_CHARACTERS: [char; 8] = ['\\', ' ', '~', '`', '"', '&', '*', '?'];

/// Sanitize an absolute path the way a storage service expects it.
///
/// Rules (see `DESIGN.md` for the grounding source): reject empty paths,
/// require a leading `/`, reject a fixed blacklist of characters, then
/// resolve `.`/`..`/empty segments token by token, finally returning a path
/// that always starts and ends with `/`.
pub fn sanitize_path(path: &str) -> Result<String, CoreError> {
    if path.is_empty() {
        return Err(CoreError::invalid_argument("path cannot be empty"));
    }
    if !path.starts_with('/') {
        return Err(CoreError::invalid_argument(format!(
            "an absolute path must start with '/' ({path})"
        )));
    }
    if let Some(c) = UNALLOWED_CHARACTERS.iter().find(|c| path.contains(**c)) {
        return Err(CoreError::invalid_argument(format!(
            "unallowed character '{c}' in path ({path})"
        )));
    }

    let terminated = if path.ends_with('/') { path.to_string() } else { format!("{path}/") };

    // Split on '/', drop the leading and trailing empty tokens produced by
    // the guaranteed leading/trailing slashes, then resolve the rest.
    let mut tokens: Vec<&str> = terminated.split('/').collect();
    tokens.remove(0);
    tokens.pop();

    let mut resolved: Vec<&str> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if token == "." || token.is_empty() {
            continue;
        } else if token == ".." {
            if resolved.pop().is_none() {
                return Err(CoreError::invalid_argument(format!("invalid path ({path})")));
            }
        } else {
            resolved.push(token);
        }
    }

    let mut sanitized = String::with_capacity(path.len());
    for token in resolved {
        sanitized.push('/');
        sanitized.push_str(token);
    }
    sanitized.push('/');
    Ok(sanitized)
}

/// A location where a file does or will reside: a storage service name, the
/// mount point it was resolved against, and the sanitized absolute path
/// within that mount point. Optionally fronted by a proxy service.
///
/// A `FileLocation` is a value type; it references services by name only and
/// owns none of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    proxy_service: Option<SmolStr>,
    storage_service: SmolStr,
    mount_point: SmolStr,
    path: String,
}

impl FileLocation {
    /// Build a location at the root mount point `/` of `storage_service`.
    pub fn new(storage_service: impl Into<SmolStr>, absolute_path: &str) -> Result<Self, CoreError> {
        Self::at_mount_point(storage_service, "/", absolute_path)
    }

    pub fn at_mount_point(
        storage_service: impl Into<SmolStr>,
        mount_point: impl Into<SmolStr>,
        absolute_path: &str,
    ) -> Result<Self, CoreError> {
        let path = sanitize_path(absolute_path)?;
        Ok(Self {
            proxy_service: None,
            storage_service: storage_service.into(),
            mount_point: mount_point.into(),
            path,
        })
    }

    /// Build a location fronted by a proxy storage service.
    pub fn via_proxy(
        proxy_service: impl Into<SmolStr>,
        storage_service: impl Into<SmolStr>,
        absolute_path: &str,
    ) -> Result<Self, CoreError> {
        let mut loc = Self::new(storage_service, absolute_path)?;
        loc.proxy_service = Some(proxy_service.into());
        Ok(loc)
    }

    pub fn storage_service(&self) -> &str {
        &self.storage_service
    }

    pub fn proxy_service(&self) -> Option<&str> {
        self.proxy_service.as_deref()
    }

    pub fn mount_point(&self) -> &str {
        &self.mount_point
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// `<service>:<mount_point><path>` string form, matching the storage
    /// service's own display convention.
    pub fn to_display_string(&self) -> String {
        format!("{}:{}{}", self.storage_service, self.mount_point, self.path)
    }
}

#[cfg(test)]
#[path = "file_location_tests.rs"]
mod tests;
