//! 配置管理模块
//!
//! 提供探测配置的数据结构、加载和验证功能

pub mod loader;
pub mod types;

pub use loader::{get_default_config_path, ConfigLoader, TomlConfigLoader};
pub use types::{
    validate_config, validate_probe_spec, Assertion, AssertionKind, AssertionOperator,
    AssertionValue, Config, ProbeSpec, RetryPolicy,
};
