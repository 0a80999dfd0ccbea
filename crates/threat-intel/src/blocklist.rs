//! 차단 목록 저장소
//!
//! 차단 목록 파일을 `blocklist_dir` 아래에 보관하고, 파일이 없거나
//! `refresh_hours`보다 오래되면 [`BlocklistFetcher`]로 다시 받아옵니다.
//! 다운로드에 실패하면 경고만 남기고 디스크에 있는 파일을 계속 사용합니다.
//!
//! 갱신은 저장소 내부 잠금으로 직렬화됩니다.

use std::future::Future;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use logwarden_core::metrics as m;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::cidr::parse_drop_list;
use crate::error::IntelError;

/// 다운로드 본문을 파일로 저장하기 전의 변환 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlocklistFormat {
    /// 본문을 그대로 저장
    Verbatim,
    /// Tor exit 목록: `ExitAddress <ip> ...` 줄의 IP만 저장
    ExitAddress,
}

impl BlocklistFormat {
    /// 다운로드 본문을 저장할 텍스트로 변환합니다.
    pub fn transform(self, body: &str) -> String {
        match self {
            Self::Verbatim => body.to_owned(),
            Self::ExitAddress => body
                .lines()
                .filter(|line| line.starts_with("ExitAddress "))
                .filter_map(|line| line.split_whitespace().nth(1))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// 목록과 IP를 비교하는 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// 줄 단위 문자열 일치
    Exact,
    /// IPv4 네트워크 포함
    Cidr,
}

/// 차단 목록 소스 정의
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocklistSource {
    /// 저장 파일 이름
    pub file_name: String,
    /// 다운로드 URL
    pub url: String,
    /// 저장 형식
    pub format: BlocklistFormat,
    /// 매칭 시 결과에 기록되는 카테고리
    pub category: String,
    /// 매칭 시 더해지는 점수
    pub score: u32,
    /// 비교 방식
    pub kind: MatchKind,
}

impl BlocklistSource {
    /// 기본 차단 목록 3종 (Tor exit, URLhaus, Spamhaus DROP)
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                file_name: "tor_exit_nodes.txt".to_owned(),
                url: "https://check.torproject.org/exit-addresses".to_owned(),
                format: BlocklistFormat::ExitAddress,
                category: "tor_exit_node".to_owned(),
                score: 50,
                kind: MatchKind::Exact,
            },
            Self {
                file_name: "botnet_ips.txt".to_owned(),
                url: "https://urlhaus.abuse.ch/downloads/text/".to_owned(),
                format: BlocklistFormat::Verbatim,
                category: "botnet".to_owned(),
                score: 80,
                kind: MatchKind::Exact,
            },
            Self {
                file_name: "spamhaus_drop.txt".to_owned(),
                url: "https://www.spamhaus.org/drop/drop.txt".to_owned(),
                format: BlocklistFormat::Verbatim,
                category: "spamhaus".to_owned(),
                score: 70,
                kind: MatchKind::Cidr,
            },
        ]
    }
}

/// 차단 목록 다운로드 trait
///
/// 데몬은 [`HttpFetcher`]를, 테스트는 mock 구현을 사용합니다.
pub trait BlocklistFetcher: Send + Sync + 'static {
    /// URL의 본문을 가져옵니다. HTTP 200 이외의 응답은 에러입니다.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, IntelError>> + Send;
}

/// reqwest 기반 HTTP 다운로더
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// 요청 제한 시간을 지정해 생성합니다.
    pub fn new(timeout: Duration) -> Result<Self, IntelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("logwarden/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IntelError::Config {
                field: "fetch_timeout_secs".to_owned(),
                reason: format!("failed to build http client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl BlocklistFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, IntelError> {
        let fetch_err = |reason: String| IntelError::Fetch {
            name: url.to_owned(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(fetch_err(format!("unexpected status {status}")));
        }

        response.text().await.map_err(|e| fetch_err(e.to_string()))
    }
}

/// IP 하나에 대한 차단 목록 매칭 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlocklistHits {
    /// 매칭된 소스 점수 합계
    pub score: u32,
    /// 매칭된 카테고리 (소스 순서)
    pub matches: Vec<String>,
}

/// 디스크 기반 차단 목록 저장소
pub struct BlocklistStore<F> {
    dir: PathBuf,
    sources: Vec<BlocklistSource>,
    refresh_interval: TimeDelta,
    fetcher: F,
    refresh_lock: Mutex<()>,
}

impl<F: BlocklistFetcher> BlocklistStore<F> {
    /// 새 저장소를 생성합니다. 디렉토리는 첫 갱신 시 만들어집니다.
    pub fn new(
        dir: impl Into<PathBuf>,
        sources: Vec<BlocklistSource>,
        refresh_interval: TimeDelta,
        fetcher: F,
    ) -> Self {
        Self {
            dir: dir.into(),
            sources,
            refresh_interval,
            fetcher,
            refresh_lock: Mutex::new(()),
        }
    }

    /// 차단 목록 디렉토리
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 등록된 소스
    pub fn sources(&self) -> &[BlocklistSource] {
        &self.sources
    }

    /// 오래되었거나 없는 목록을 갱신하고 갱신에 성공한 목록 수를 반환합니다.
    pub async fn ensure_fresh(&self) -> usize {
        self.ensure_fresh_at(Utc::now()).await
    }

    /// 기준 시각 `now`로 [`ensure_fresh`](Self::ensure_fresh)를 수행합니다.
    pub async fn ensure_fresh_at(&self, now: DateTime<Utc>) -> usize {
        let _guard = self.refresh_lock.lock().await;
        let mut refreshed = 0;

        for source in &self.sources {
            let path = self.dir.join(&source.file_name);
            if !self.needs_refresh(&path, now).await {
                continue;
            }

            match self.refresh(source, &path).await {
                Ok(()) => {
                    refreshed += 1;
                    tracing::info!(blocklist = %source.file_name, "blocklist refreshed");
                }
                Err(e) => {
                    metrics::counter!(
                        m::BLOCKLIST_REFRESH_FAILURES_TOTAL,
                        m::LABEL_BLOCKLIST => source.file_name.clone()
                    )
                    .increment(1);
                    tracing::warn!(
                        blocklist = %source.file_name,
                        error = %e,
                        "blocklist refresh failed, keeping existing file"
                    );
                }
            }
        }

        refreshed
    }

    async fn needs_refresh(&self, path: &Path, now: DateTime<Utc>) -> bool {
        let modified = match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(_) => return true,
        };
        now.checked_sub_signed(self.refresh_interval)
            .is_some_and(|cutoff| modified < cutoff)
    }

    async fn refresh(&self, source: &BlocklistSource, path: &Path) -> Result<(), IntelError> {
        let body = self.fetcher.fetch(&source.url).await.map_err(|e| match e {
            IntelError::Fetch { reason, .. } => IntelError::Fetch {
                name: source.file_name.clone(),
                reason,
            },
            other => other,
        })?;
        let content = source.format.transform(&body);

        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// 디스크의 목록과 IP를 비교합니다.
    ///
    /// 파일이 없거나 읽을 수 없는 목록은 매칭되지 않은 것으로 처리합니다.
    /// CIDR 목록은 IPv4 주소에만 적용됩니다.
    pub async fn score(&self, ip_text: &str, ipv4: Option<Ipv4Addr>) -> BlocklistHits {
        let mut hits = BlocklistHits::default();

        for source in &self.sources {
            let path = self.dir.join(&source.file_name);
            let text = match tokio::fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!(blocklist = %source.file_name, error = %e, "blocklist unavailable");
                    continue;
                }
            };

            let matched = match source.kind {
                MatchKind::Exact => exact_match(&text, ip_text),
                MatchKind::Cidr => ipv4
                    .is_some_and(|ip| parse_drop_list(&text).iter().any(|net| net.contains(ip))),
            };

            if matched {
                hits.score = hits.score.saturating_add(source.score);
                hits.matches.push(source.category.clone());
            }
        }

        hits
    }
}

fn exact_match(text: &str, ip_text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .any(|line| line == ip_text)
}
