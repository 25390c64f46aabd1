//! 字段值与构造参数
//!
//! `CtorArgs` 取代可变参数列表：构造链上的每一层按顺序消费自己的参数。

use super::error::RuntimeError;
use std::collections::VecDeque;

/// 实例字段值
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// 无符号整数
    Unsigned(u64),
    /// 浮点数
    Float(f64),
}

impl Value {
    /// 类型名（用于错误信息）
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unsigned(_) => "unsigned",
            Value::Float(_) => "float",
        }
    }

    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            Value::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Unsigned(v as u64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Unsigned(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

/// 构造参数队列
#[derive(Debug, Clone, Default)]
pub struct CtorArgs {
    args: VecDeque<Value>,
    /// 已消费的参数个数（用于错误定位）
    consumed: usize,
}

impl CtorArgs {
    /// 创建参数队列
    pub fn new<I, V>(args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            consumed: 0,
        }
    }

    /// 空参数
    pub fn empty() -> Self {
        Self::default()
    }

    /// 剩余参数个数
    pub fn remaining(&self) -> usize {
        self.args.len()
    }

    /// 取下一个参数
    pub fn next_value(&mut self) -> Result<Value, RuntimeError> {
        let position = self.consumed;
        let value = self
            .args
            .pop_front()
            .ok_or(RuntimeError::MissingArgument { position })?;
        self.consumed += 1;
        Ok(value)
    }

    /// 取下一个无符号整数参数
    pub fn next_unsigned(&mut self) -> Result<u64, RuntimeError> {
        let position = self.consumed;
        let value = self.next_value()?;
        value.as_unsigned().ok_or(RuntimeError::ArgumentType {
            position,
            expected: "unsigned",
            found: value.type_name(),
        })
    }

    /// 取下一个 u32 参数（超出位宽视为类型错误）
    pub fn next_u32(&mut self) -> Result<u32, RuntimeError> {
        let position = self.consumed;
        let value = self.next_unsigned()?;
        u32::try_from(value).map_err(|_| RuntimeError::ArgumentType {
            position,
            expected: "u32",
            found: "unsigned",
        })
    }

    /// 取下一个浮点参数
    pub fn next_float(&mut self) -> Result<f64, RuntimeError> {
        let position = self.consumed;
        let value = self.next_value()?;
        value.as_float().ok_or(RuntimeError::ArgumentType {
            position,
            expected: "float",
            found: value.type_name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_consumed_in_order() {
        let mut args = CtorArgs::new([Value::from(7u32), Value::from(2.5)]);
        assert_eq!(args.remaining(), 2);
        assert_eq!(args.next_u32().unwrap(), 7);
        assert_eq!(args.next_float().unwrap(), 2.5);
        assert_eq!(args.remaining(), 0);
    }

    #[test]
    fn test_missing_argument_reports_position() {
        let mut args = CtorArgs::new([1u32]);
        args.next_u32().unwrap();
        match args.next_u32() {
            Err(RuntimeError::MissingArgument { position }) => assert_eq!(position, 1),
            other => panic!("Expected MissingArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_argument_type_mismatch() {
        let mut args = CtorArgs::new([0.5f64]);
        match args.next_u32() {
            Err(RuntimeError::ArgumentType {
                position,
                expected,
                found,
            }) => {
                assert_eq!(position, 0);
                assert_eq!(expected, "unsigned");
                assert_eq!(found, "float");
            }
            other => panic!("Expected ArgumentType, got {:?}", other),
        }
    }

    #[test]
    fn test_u32_width_is_checked() {
        let mut args = CtorArgs::new([u64::from(u32::MAX) + 1]);
        assert!(matches!(
            args.next_u32(),
            Err(RuntimeError::ArgumentType { expected: "u32", .. })
        ));
    }
}
