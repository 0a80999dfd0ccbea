//! IPv4 CIDR 매칭
//!
//! Spamhaus DROP 형식(`a.b.c.d/n ; SBLxxxx`)의 네트워크 목록을 파싱합니다.

use std::net::Ipv4Addr;
use std::str::FromStr;

/// IPv4 네트워크 (`network`는 마스크가 적용된 값)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Cidr {
    network: u32,
    prefix_len: u8,
}

impl Ipv4Cidr {
    /// 네트워크 주소와 프리픽스 길이로 생성합니다. 호스트 비트는 지워집니다.
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Option<Self> {
        if prefix_len > 32 {
            return None;
        }
        Some(Self {
            network: u32::from(addr) & mask(prefix_len),
            prefix_len,
        })
    }

    /// 주소가 이 네트워크에 속하는지 확인합니다.
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        u32::from(ip) & mask(self.prefix_len) == self.network
    }

    /// 프리픽스 길이
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }
}

impl FromStr for Ipv4Cidr {
    type Err = String;

    /// `a.b.c.d/n` 또는 단일 주소(`/32`)를 파싱합니다.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr, prefix_len) = match s.split_once('/') {
            Some((addr, len)) => {
                let len: u8 = len
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid prefix length in '{s}'"))?;
                (addr.trim(), len)
            }
            None => (s, 32),
        };
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| format!("invalid network address in '{s}'"))?;
        Self::new(addr, prefix_len).ok_or_else(|| format!("prefix length out of range in '{s}'"))
    }
}

fn mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        !0u32 << (32 - prefix_len)
    }
}

/// DROP 목록 텍스트에서 네트워크를 추출합니다.
///
/// `;` 이후는 주석이며, 빈 줄, `#` 주석 줄, 해석할 수 없는 줄은 건너뜁니다.
pub fn parse_drop_list(text: &str) -> Vec<Ipv4Cidr> {
    text.lines()
        .filter_map(|line| {
            let entry = line.split(';').next().unwrap_or_default().trim();
            if entry.is_empty() || entry.starts_with('#') {
                return None;
            }
            entry.parse().ok()
        })
        .collect()
}
