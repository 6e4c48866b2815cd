// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};

/// Builds a non-blocking, size-rotated file writer under `log_dir`.
///
/// `logs_max_bytes` bounds each individual file, `logs_max_lines` is unused by the
/// byte-limited rotation strategy but kept for parity with the node's config surface,
/// `logs_retained` is how many rotated files are kept uncompressed before the
/// `logs_uncompressed` threshold kicks in and older ones are gzip-compressed.
pub(super) fn file_rotater(
    log_dir: &Path,
    logs_max_bytes: usize,
    _logs_max_lines: usize,
    logs_retained: usize,
    logs_uncompressed: usize,
) -> (NonBlocking, WorkerGuard) {
    let file_path: PathBuf = log_dir.join("chat_node.log");

    let rotation = FileRotate::new(
        file_path,
        AppendCount::new(logs_uncompressed.max(logs_retained + 1)),
        ContentLimit::Bytes(logs_max_bytes),
        Compression::OnRotate(logs_retained),
        #[cfg(unix)]
        None,
    );

    tracing_appender::non_blocking(rotation)
}
