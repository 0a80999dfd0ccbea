//! 파일 기반 로그 수집기
//!
//! 호출될 때마다 마지막 읽기 위치 이후에 추가된 줄을 읽습니다 (`tail` 방식).
//!
//! # 로테이션 감지
//! - 파일 크기 축소 (truncation): 처음부터 다시 읽습니다.
//! - inode 변경 (logrotate 등, Unix 전용): 새 파일을 처음부터 읽습니다.
//!
//! 개행으로 끝나지 않은 마지막 줄은 다음 호출까지 읽지 않고 남겨 둡니다.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use logwarden_core::error::LogwardenError;
use logwarden_core::pipeline::Collector;
use logwarden_core::types::RawRecord;

use crate::error::EngineError;

/// 파일 수집기 설정
#[derive(Debug, Clone)]
pub struct FileCollectorConfig {
    /// 감시할 파일 경로
    pub path: PathBuf,
    /// 처음 열 때 파일 끝에서 시작할지 여부
    pub from_end: bool,
    /// 한 번에 읽을 최대 줄 수
    pub max_lines_per_read: usize,
    /// 최대 줄 길이 (바이트). 초과분은 잘립니다.
    pub max_line_length: usize,
    /// 파서 형식 힌트
    pub format_hint: Option<String>,
}

impl FileCollectorConfig {
    /// 기본값으로 설정을 생성합니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            from_end: false,
            max_lines_per_read: 10_000,
            max_line_length: 64 * 1024, // 64KB
            format_hint: None,
        }
    }
}

/// 파일 위치 추적 상태
#[derive(Debug, Default)]
struct FileState {
    /// 마지막 읽기 위치 (바이트 오프셋)
    offset: u64,
    /// 한 번이라도 열었는지 여부
    opened: bool,
    /// 현재 파일의 inode (Unix 전용)
    inode: Option<u64>,
}

/// 파일 기반 로그 수집기
pub struct FileCollector {
    config: FileCollectorConfig,
    name: String,
    state: FileState,
    missing_reported: bool,
}

impl FileCollector {
    /// 새 파일 수집기를 생성합니다.
    pub fn new(config: FileCollectorConfig) -> Self {
        let name = config.path.display().to_string();
        Self {
            config,
            name,
            state: FileState::default(),
            missing_reported: false,
        }
    }

    /// 현재 읽기 위치
    pub fn offset(&self) -> u64 {
        self.state.offset
    }

    fn read_new_lines(&mut self) -> Result<Vec<RawRecord>, EngineError> {
        let path = self.config.path.clone();
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if !self.missing_reported {
                    tracing::warn!(path = %path.display(), "log file not found");
                    self.missing_reported = true;
                }
                return Ok(Vec::new());
            }
            Err(e) => return Err(collector_error(&path, e)),
        };
        self.missing_reported = false;

        let metadata = file.metadata().map_err(|e| collector_error(&path, e))?;
        let len = metadata.len();
        let inode = inode_of(&metadata);

        if !self.state.opened {
            self.state.opened = true;
            self.state.inode = inode;
            self.state.offset = if self.config.from_end { len } else { 0 };
        } else if inode.is_some() && inode != self.state.inode {
            tracing::info!(path = %path.display(), "log file rotated, reading from start");
            self.state.inode = inode;
            self.state.offset = 0;
        } else if len < self.state.offset {
            tracing::info!(
                path = %path.display(),
                previous = self.state.offset,
                size = len,
                "log file truncated, reading from start"
            );
            self.state.offset = 0;
        }

        if len == self.state.offset {
            return Ok(Vec::new());
        }

        let mut reader = BufReader::new(file);
        reader
            .seek(SeekFrom::Start(self.state.offset))
            .map_err(|e| collector_error(&path, e))?;

        let mut records = Vec::new();
        let mut buf = Vec::new();
        while records.len() < self.config.max_lines_per_read {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| collector_error(&path, e))?;
            if read == 0 || buf.last() != Some(&b'\n') {
                // EOF 또는 아직 완성되지 않은 줄
                break;
            }
            self.state.offset += read as u64;

            let line = buf.trim_ascii();
            if line.is_empty() {
                continue;
            }
            let line = &line[..line.len().min(self.config.max_line_length)];

            let mut record = RawRecord::new(Bytes::copy_from_slice(line), self.name.clone());
            if let Some(hint) = &self.config.format_hint {
                record = record.with_format_hint(hint.clone());
            }
            records.push(record);
        }

        if !records.is_empty() {
            tracing::debug!(
                path = %path.display(),
                count = records.len(),
                offset = self.state.offset,
                "collected new log lines"
            );
        }

        Ok(records)
    }
}

impl Collector for FileCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn collect(&mut self) -> Result<Vec<RawRecord>, LogwardenError> {
        self.read_new_lines().map_err(LogwardenError::from)
    }
}

fn collector_error(path: &Path, e: std::io::Error) -> EngineError {
    EngineError::Collector {
        source_type: "file".to_owned(),
        reason: format!("{}: {e}", path.display()),
    }
}

#[cfg(unix)]
fn inode_of(metadata: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.ino())
}

#[cfg(not(unix))]
fn inode_of(_metadata: &std::fs::Metadata) -> Option<u64> {
    None
}
