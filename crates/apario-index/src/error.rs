// Copyright 2025 Apario Search Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::error::Error;
use std::fmt::{self, Display};

/// Typed errors returned by the indexing and search operations.
#[derive(Debug)]
pub enum IndexError {
    /// A sidecar file was missing, unreadable, or lacked an `identifier`
    /// field. Ingest-local: the page is skipped, the build continues.
    CorpusInvalid(String),
    /// Read/write failure against corpus or cache files. Fatal during an
    /// index build, skip-and-log during per-page ingest.
    Io(std::io::Error),
    /// The index prefix, header JSON, or a bitmap could not be decoded.
    /// Fatal at load; triggers a checksum-driven rebuild.
    IndexMalformed(String),
    /// Fallback for other textual errors.
    Other(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;

impl Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::CorpusInvalid(s) => write!(f, "corpus invalid: {}", s),
            IndexError::Io(e) => write!(f, "io error: {}", e),
            IndexError::IndexMalformed(s) => write!(f, "index malformed: {}", s),
            IndexError::Other(s) => write!(f, "error: {}", s),
        }
    }
}

impl Error for IndexError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            IndexError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Io(e)
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(e: serde_json::Error) -> Self {
        IndexError::Other(e.to_string())
    }
}
