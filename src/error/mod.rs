//! Flare Cloud 错误处理模块
//!
//! 提供统一的错误代码分类，以及服务发现、套接字、配置各子系统的错误类型

pub mod code;
pub mod flare_error;

pub use code::{ErrorCategory, ErrorCode};
pub use flare_error::{
    ConfigError, DiscoveryError, FlareError, RegistryError, Result, SocketError,
};
