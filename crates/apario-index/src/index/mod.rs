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

//! The on-disk bitmap index. Layout, front to back:
//!
//! 1. an 8-byte little-endian u64 announcing the header's byte offset,
//! 2. the body: serialized roaring bitmaps, one per key, back to back,
//! 3. a JSON header object mapping each key to its `[offset, length]`
//!    slice of the body.
//!
//! An empty postings stream still produces a well-formed file whose prefix
//! points at `{}`.

mod reader;
mod writer;

pub use reader::IndexReader;
pub use writer::{write_index, IndexWriteOptions};

/// Width of the fixed prefix announcing the header offset.
pub(crate) const PREFIX_LEN: u64 = 8;
