//! 断言评估器
//!
//! 对探测观察值与期望值进行无状态的比较评估

use crate::config::types::{Assertion, AssertionOperator};
use crate::error::AssertionError;
use tracing::info;

/// 评估单条断言
///
/// 按操作符对观察值和期望值做数值比较。固定集合之外的
/// 操作符返回错误，属于硬性失败而非默认通过。
///
/// # 参数
/// * `assertion` - 断言定义
/// * `actual_value` - 观察到的实际值
///
/// # 返回
/// * `Result<bool, AssertionError>` - 断言是否通过
pub fn evaluate_assertion(
    assertion: &Assertion,
    actual_value: f64,
) -> Result<bool, AssertionError> {
    let expected_value = assertion.value.as_f64();

    info!(
        "评估 {} 断言: {} {} {}",
        assertion.kind, actual_value, assertion.operator, assertion.value
    );

    match assertion.operator {
        AssertionOperator::Equals => Ok(actual_value == expected_value),
        AssertionOperator::NotEquals => Ok(actual_value != expected_value),
        AssertionOperator::GreaterThan => Ok(actual_value > expected_value),
        AssertionOperator::LessThan => Ok(actual_value < expected_value),
        AssertionOperator::Unsupported => Err(AssertionError::UnsupportedOperator {
            operator: assertion.operator.to_string(),
        }),
    }
}
