//! 探测执行模块
//!
//! 提供HTTP探测、断言评估和重试执行功能

pub mod assertion;
pub mod executor;
pub mod outcome;
pub mod prober;

pub use assertion::evaluate_assertion;
pub use executor::{
    RequestExecutor, UserAgentProvider, CANARY_USER_AGENT_PLACEHOLDER, DEFAULT_CANARY_USER_AGENT,
};
pub use outcome::{AssertionCheck, ProbeOutcome, ProbeReport, MAX_BODY_CHARS};
pub use prober::{HttpProber, ProbeRequest, ProbeResponse, Prober};
