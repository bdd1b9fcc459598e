// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class index to class name mapping
//!
//! The table is built once when the detector is loaded and never changes
//! afterwards. It can come from:
//! - a plain text file, one name per line (line number = class index)
//! - the `names` metadata entry that Ultralytics writes into exported ONNX
//!   models, a Python dict literal such as `{0: 'person', 1: 'bicycle'}`

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

/// Immutable class index -> name table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassNameTable {
    names: BTreeMap<usize, String>,
}

impl ClassNameTable {
    /// Build a table where position in `names` is the class index
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .enumerate()
                .map(|(index, name)| (index, name.into()))
                .collect(),
        }
    }

    /// Build a table from explicit index/name pairs
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, String)>,
    {
        Self {
            names: pairs.into_iter().collect(),
        }
    }

    /// Load names from a text file, one per line
    ///
    /// Blank lines are skipped and surrounding whitespace is trimmed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read class names from {}", path.display()))?;

        let table = Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        );

        if table.is_empty() {
            anyhow::bail!("Class names file is empty: {}", path.display());
        }

        Ok(table)
    }

    /// Parse the Ultralytics `names` metadata value
    ///
    /// Accepted grammar is the Python dict repr Ultralytics writes:
    /// `{` `<int>: <quoted name>` (`, ` separated) `}`, where a name is
    /// single- or double-quoted and contains no quote of the same kind.
    /// Anything between entries is ignored. Returns `None` when no entry
    /// can be found.
    pub fn from_metadata(value: &str) -> Option<Self> {
        let pattern = Regex::new(r#"(\d+)\s*:\s*(?:'([^']*)'|"([^"]*)")"#).ok()?;

        let table = Self::from_pairs(pattern.captures_iter(value).filter_map(|caps| {
            let index = caps.get(1)?.as_str().parse::<usize>().ok()?;
            let name = caps.get(2).or_else(|| caps.get(3))?.as_str().to_string();
            Some((index, name))
        }));

        if table.is_empty() {
            None
        } else {
            Some(table)
        }
    }

    /// Look up a class name
    pub fn get(&self, class_index: usize) -> Option<&str> {
        self.names.get(&class_index).map(String::as_str)
    }

    /// Resolve a class name, falling back to `class{index}` for unknown indices
    pub fn resolve(&self, class_index: usize) -> String {
        self.get(class_index)
            .map(str::to_string)
            .unwrap_or_else(|| format!("class{}", class_index))
    }

    /// Number of entries in the table
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of classes implied by the highest index (`max + 1`)
    pub fn num_classes(&self) -> usize {
        self.names.keys().next_back().map(|max| max + 1).unwrap_or(0)
    }
}
