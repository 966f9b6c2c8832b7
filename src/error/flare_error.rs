//! Flare Cloud 统一错误类型
//!
//! 每个子系统有自己的错误枚举，`FlareError` 把它们汇总成一个对外类型

use super::code::ErrorCode;
use thiserror::Error;

/// 注册中心调用错误（长轮询、按服务查询）
///
/// 对后台监听循环来说这是瞬时错误：记录日志、退避、继续
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// 传输层失败（连接、超时、请求构造）
    #[error("注册中心请求失败: {0}")]
    Transport(String),

    /// 注册中心返回了非成功状态码
    #[error("注册中心返回状态 {status}: {body}")]
    Status { status: u16, body: String },

    /// 响应体无法解析
    #[error("注册中心响应解析失败: {0}")]
    Decode(String),

    /// 阻塞查询响应缺少 X-Consul-Index 头
    #[error("注册中心响应缺少索引头")]
    MissingIndex,
}

impl RegistryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RegistryError::Transport(_) => ErrorCode::NetworkError,
            RegistryError::Status { .. } => ErrorCode::RegistryStatus,
            RegistryError::Decode(_) => ErrorCode::DeserializationError,
            RegistryError::MissingIndex => ErrorCode::RegistryIndexMissing,
        }
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RegistryError::Decode(err.to_string())
        } else {
            RegistryError::Transport(err.to_string())
        }
    }
}

/// 按需获取服务实例失败
///
/// 需要 `Clone`：同一次获取的结果由所有并发等待者共享
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// 服务发现暂时不可用，缓存未被修改
    #[error("服务 {service} 发现暂时不可用: {reason}")]
    Unavailable { service: String, reason: String },

    /// 获取超过了配置的时限
    #[error("服务 {service} 发现超时")]
    Timeout { service: String },
}

impl DiscoveryError {
    pub fn unavailable(service: impl Into<String>, source: &RegistryError) -> Self {
        DiscoveryError::Unavailable {
            service: service.into(),
            reason: source.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            DiscoveryError::Unavailable { .. } => ErrorCode::DiscoveryUnavailable,
            DiscoveryError::Timeout { .. } => ErrorCode::DiscoveryTimeout,
        }
    }

    /// 发生错误的服务名
    pub fn service(&self) -> &str {
        match self {
            DiscoveryError::Unavailable { service, .. } => service,
            DiscoveryError::Timeout { service } => service,
        }
    }
}

/// 套接字创建、绑定、关闭错误
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("无效的端点 {0}")]
    InvalidEndpoint(String),

    #[error("不支持的协议 {0}")]
    UnsupportedProtocol(String),

    /// 绑定失败；该地址之后仍可重试
    #[error("绑定 '{address}' 失败: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("关闭 '{address}' 失败: {reason}")]
    Close { address: String, reason: String },

    #[error("套接字 '{0}' 已关闭")]
    AlreadyClosed(String),

    #[error("事件反应器已停止")]
    ReactorStopped,

    #[error("事件反应器启动失败: {0}")]
    ReactorStart(#[source] std::io::Error),
}

impl SocketError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SocketError::InvalidEndpoint(_) => ErrorCode::InvalidEndpoint,
            SocketError::UnsupportedProtocol(_) => ErrorCode::ProtocolNotSupported,
            SocketError::Bind { .. } => ErrorCode::SocketBindFailed,
            SocketError::Close { .. } => ErrorCode::SocketCloseFailed,
            SocketError::AlreadyClosed(_) => ErrorCode::SocketAlreadyClosed,
            SocketError::ReactorStopped => ErrorCode::ReactorStopped,
            SocketError::ReactorStart(_) => ErrorCode::ReactorStartFailed,
        }
    }
}

/// 配置加载错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("读取配置文件 '{path}' 失败: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("配置解析失败: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("配置无效: {0}")]
    Invalid(String),
}

/// Flare Cloud 统一错误类型
#[derive(Error, Debug)]
pub enum FlareError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Socket(#[from] SocketError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl FlareError {
    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            FlareError::Registry(e) => e.code(),
            FlareError::Discovery(e) => e.code(),
            FlareError::Socket(e) => e.code(),
            FlareError::Config(_) => ErrorCode::ConfigurationError,
        }
    }

    /// 判断是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

pub type Result<T> = std::result::Result<T, FlareError>;
