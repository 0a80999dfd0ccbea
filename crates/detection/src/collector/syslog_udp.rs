//! UDP Syslog 수집기
//!
//! 백그라운드 태스크가 UDP 소켓에서 데이터그램을 받아 bounded 채널에 넣고,
//! [`Collector::collect`]는 채널에 쌓인 레코드를 블로킹 없이 비웁니다.
//! 각 데이터그램은 하나의 로그 메시지로 취급됩니다.
//!
//! 채널이 가득 차면 새 데이터그램은 버려지고 경고가 기록됩니다.

use std::net::SocketAddr;

use bytes::Bytes;
use logwarden_core::error::LogwardenError;
use logwarden_core::pipeline::Collector;
use logwarden_core::types::RawRecord;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;

/// UDP syslog 수집기 설정
#[derive(Debug, Clone)]
pub struct SyslogUdpConfig {
    /// 바인드 주소 (예: "0.0.0.0:5140")
    pub bind_addr: String,
    /// 수신 채널 용량
    pub channel_capacity: usize,
    /// 최대 메시지 크기 (바이트)
    pub max_message_size: usize,
    /// 파서 형식 힌트
    pub format_hint: Option<String>,
}

impl Default for SyslogUdpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5140".to_owned(),
            channel_capacity: 1024,
            max_message_size: 65535,
            format_hint: None,
        }
    }
}

/// UDP Syslog 수집기
pub struct SyslogUdpCollector {
    rx: mpsc::Receiver<RawRecord>,
    local_addr: SocketAddr,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SyslogUdpCollector {
    /// 소켓을 바인드하고 수신 태스크를 시작합니다.
    ///
    /// `cancel`이 취소되면 수신 태스크가 종료됩니다.
    pub async fn bind(
        config: SyslogUdpConfig,
        cancel: CancellationToken,
    ) -> Result<Self, EngineError> {
        let socket = UdpSocket::bind(&config.bind_addr)
            .await
            .map_err(|e| EngineError::Collector {
                source_type: "syslog_udp".to_owned(),
                reason: format!("failed to bind to {}: {e}", config.bind_addr),
            })?;
        let local_addr = socket.local_addr()?;

        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let task = tokio::spawn(Self::receive_loop(socket, tx, config, cancel.clone()));

        tracing::info!(addr = %local_addr, "UDP syslog collector listening");

        Ok(Self {
            rx,
            local_addr,
            cancel,
            task: Some(task),
        })
    }

    /// 실제로 바인드된 주소
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 수신 태스크를 중지하고 종료를 기다립니다.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "UDP syslog receive task failed");
            }
        }
    }

    async fn receive_loop(
        socket: UdpSocket,
        tx: mpsc::Sender<RawRecord>,
        config: SyslogUdpConfig,
        cancel: CancellationToken,
    ) {
        let mut buf = vec![0u8; config.max_message_size.max(1)];
        let mut dropped: u64 = 0;

        loop {
            tokio::select! {
                result = socket.recv_from(&mut buf) => {
                    let (len, peer) = match result {
                        Ok(received) => received,
                        Err(e) => {
                            tracing::warn!(error = %e, "UDP receive error");
                            continue;
                        }
                    };

                    let data = buf[..len].trim_ascii();
                    if data.is_empty() {
                        continue;
                    }

                    let mut record =
                        RawRecord::new(Bytes::copy_from_slice(data), format!("syslog_udp:{peer}"));
                    if let Some(hint) = &config.format_hint {
                        record = record.with_format_hint(hint.clone());
                    }

                    match tx.try_send(record) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            dropped += 1;
                            tracing::warn!(dropped, %peer, "syslog queue full, datagram dropped");
                        }
                        Err(TrySendError::Closed(_)) => break,
                    }
                }
                _ = cancel.cancelled() => {
                    tracing::info!("UDP syslog collector received shutdown signal");
                    break;
                }
            }
        }
    }
}

impl Collector for SyslogUdpCollector {
    fn name(&self) -> &str {
        "syslog_udp"
    }

    fn collect(&mut self) -> Result<Vec<RawRecord>, LogwardenError> {
        let mut records = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(record) => records.push(record),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if records.is_empty() {
                        return Err(EngineError::Collector {
                            source_type: "syslog_udp".to_owned(),
                            reason: "receive task stopped".to_owned(),
                        }
                        .into());
                    }
                    break;
                }
            }
        }
        Ok(records)
    }
}

impl Drop for SyslogUdpCollector {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> SyslogUdpConfig {
        SyslogUdpConfig {
            bind_addr: "127.0.0.1:0".to_owned(),
            channel_capacity: 2,
            format_hint: Some("syslog".to_owned()),
            ..Default::default()
        }
    }

    async fn drain(collector: &mut SyslogUdpCollector, expected: usize) -> Vec<RawRecord> {
        let mut records = Vec::new();
        for _ in 0..50 {
            records.extend(collector.collect().unwrap());
            if records.len() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        records
    }

    #[tokio::test]
    async fn receives_datagrams() {
        let mut collector = SyslogUdpCollector::bind(config(), CancellationToken::new())
            .await
            .unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender
            .send_to(b"May  1 12:00:00 host sshd: hello\n", collector.local_addr())
            .await
            .unwrap();

        let records = drain(&mut collector, 1).await;
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0].data[..], b"May  1 12:00:00 host sshd: hello");
        assert_eq!(records[0].format_hint.as_deref(), Some("syslog"));
        assert!(records[0].source.starts_with("syslog_udp:"));
    }

    #[tokio::test]
    async fn collect_is_empty_without_traffic() {
        let mut collector = SyslogUdpCollector::bind(config(), CancellationToken::new())
            .await
            .unwrap();
        assert!(collector.collect().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stop_ends_receive_task() {
        let mut collector = SyslogUdpCollector::bind(config(), CancellationToken::new())
            .await
            .unwrap();
        collector.stop().await;
        assert!(collector.collect().is_err());
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let cfg = SyslogUdpConfig {
            bind_addr: "not-an-address".to_owned(),
            ..config()
        };
        let result = SyslogUdpCollector::bind(cfg, CancellationToken::new()).await;
        assert!(matches!(result, Err(EngineError::Collector { .. })));
    }
}
