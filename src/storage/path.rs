// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use object_store::path::Path as ObjectPath;
use std::fmt::{Display, Formatter, Result as FmtResult};

pub const SEPARATOR: char = '/';

/// Hierarchical location inside a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BlobPath {
    segments: Vec<String>,
}

impl BlobPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `path` on `/`, dropping empty segments.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split(SEPARATOR)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Child path with `segment` appended.
    pub fn add(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// `other` rooted under this path.
    pub fn join(&self, other: &BlobPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend_from_slice(&other.segments);
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Flatten into a key prefix: segments joined by `/` with a trailing `/`,
    /// or the empty string for the root path. A blob key is this prefix
    /// followed by the blob name.
    pub fn build_as_string(&self) -> String {
        let mut key = String::new();
        for segment in &self.segments {
            key.push_str(segment);
            key.push(SEPARATOR);
        }
        key
    }
}

impl Display for BlobPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{}]", self.segments.join(", "))
    }
}

impl<S: Into<String>> FromIterator<S> for BlobPath {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            segments: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Helper function to create an ObjectPath from a flat key
pub(crate) fn string_to_path(s: &str) -> ObjectPath {
    ObjectPath::from(s)
}

/// Optional listing prefix; the empty key lists the whole container.
pub(crate) fn prefix_path(s: &str) -> Option<ObjectPath> {
    if s.is_empty() {
        None
    } else {
        Some(string_to_path(s))
    }
}
