//! 错误代码和错误类别定义
//!
//! 错误代码按类别分组，每个类别占用1000个代码范围：
//! - 1000-1999: 服务发现相关错误
//! - 2000-2999: 套接字相关错误
//! - 6000-6999: 系统相关错误
//! - 7000-7999: 网络相关错误
//! - 8000-8999: 序列化相关错误
//! - 9000-9999: 通用错误

use serde::{Deserialize, Serialize};
use std::fmt;

/// 错误代码枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    // ============================================================
    // 服务发现相关错误 (1000-1999)
    // ============================================================
    DiscoveryUnavailable = 1000,
    DiscoveryTimeout = 1001,
    RegistryStatus = 1002,
    RegistryIndexMissing = 1003,

    // ============================================================
    // 套接字相关错误 (2000-2999)
    // ============================================================
    SocketBindFailed = 2000,
    SocketCloseFailed = 2001,
    SocketAlreadyClosed = 2002,
    InvalidEndpoint = 2003,
    ProtocolNotSupported = 2004,
    ReactorStopped = 2005,
    ReactorStartFailed = 2006,

    // ============================================================
    // 系统相关错误 (6000-6999)
    // ============================================================
    ConfigurationError = 6003,

    // ============================================================
    // 网络相关错误 (7000-7999)
    // ============================================================
    NetworkError = 7000,
    NetworkTimeout = 7001,

    // ============================================================
    // 序列化相关错误 (8000-8999)
    // ============================================================
    DeserializationError = 8001,

    // ============================================================
    // 通用错误 (9000-9999)
    // ============================================================
    UnknownError = 9999,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ErrorCode {
    /// 获取错误代码的数字值
    #[inline]
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// 获取错误代码的英文标识符
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DiscoveryUnavailable => "DISCOVERY_UNAVAILABLE",
            ErrorCode::DiscoveryTimeout => "DISCOVERY_TIMEOUT",
            ErrorCode::RegistryStatus => "REGISTRY_STATUS",
            ErrorCode::RegistryIndexMissing => "REGISTRY_INDEX_MISSING",
            ErrorCode::SocketBindFailed => "SOCKET_BIND_FAILED",
            ErrorCode::SocketCloseFailed => "SOCKET_CLOSE_FAILED",
            ErrorCode::SocketAlreadyClosed => "SOCKET_ALREADY_CLOSED",
            ErrorCode::InvalidEndpoint => "INVALID_ENDPOINT",
            ErrorCode::ProtocolNotSupported => "PROTOCOL_NOT_SUPPORTED",
            ErrorCode::ReactorStopped => "REACTOR_STOPPED",
            ErrorCode::ReactorStartFailed => "REACTOR_START_FAILED",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::NetworkTimeout => "NETWORK_TIMEOUT",
            ErrorCode::DeserializationError => "DESERIALIZATION_ERROR",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// 获取错误代码的类别
    pub fn category(&self) -> ErrorCategory {
        match self.as_u32() {
            1000..=1999 => ErrorCategory::Discovery,
            2000..=2999 => ErrorCategory::Socket,
            6000..=6999 => ErrorCategory::System,
            7000..=7999 => ErrorCategory::Network,
            8000..=8999 => ErrorCategory::Serialization,
            _ => ErrorCategory::General,
        }
    }

    /// 判断是否为可重试的错误
    ///
    /// 绑定失败同样可重试：失败的地址不会被永久占用
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::DiscoveryUnavailable
                | ErrorCode::DiscoveryTimeout
                | ErrorCode::RegistryStatus
                | ErrorCode::NetworkError
                | ErrorCode::NetworkTimeout
                | ErrorCode::SocketBindFailed
        )
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Discovery,
    Socket,
    System,
    Network,
    Serialization,
    General,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Discovery => write!(f, "DISCOVERY"),
            ErrorCategory::Socket => write!(f, "SOCKET"),
            ErrorCategory::System => write!(f, "SYSTEM"),
            ErrorCategory::Network => write!(f, "NETWORK"),
            ErrorCategory::Serialization => write!(f, "SERIALIZATION"),
            ErrorCategory::General => write!(f, "GENERAL"),
        }
    }
}
