//! 绑定地址键
//!
//! 格式为 `{protocol}://{host}:{port}`，协议部分统一小写，IPv6 主机带方括号

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::error::SocketError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressKey {
    protocol: String,
    endpoint: SocketAddr,
}

impl AddressKey {
    pub fn new(protocol: &str, endpoint: SocketAddr) -> Result<Self, SocketError> {
        let protocol = protocol.trim();
        let valid = !protocol.is_empty()
            && protocol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid {
            return Err(SocketError::UnsupportedProtocol(protocol.to_string()));
        }
        Ok(Self {
            protocol: protocol.to_ascii_lowercase(),
            endpoint,
        })
    }

    /// 由字符串形式的 IP 和端口构造
    pub fn from_parts(protocol: &str, ip: &str, port: u16) -> Result<Self, SocketError> {
        let ip: IpAddr = ip
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse()
            .map_err(|_| SocketError::InvalidEndpoint(format!("{}:{}", ip, port)))?;
        Self::new(protocol, SocketAddr::new(ip, port))
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }
}

impl fmt::Display for AddressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.protocol, self.endpoint)
    }
}

impl FromStr for AddressKey {
    type Err = SocketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (protocol, endpoint) = s
            .split_once("://")
            .ok_or_else(|| SocketError::InvalidEndpoint(s.to_string()))?;
        let endpoint: SocketAddr = endpoint
            .parse()
            .map_err(|_| SocketError::InvalidEndpoint(s.to_string()))?;
        Self::new(protocol, endpoint)
    }
}
