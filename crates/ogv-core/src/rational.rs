//! 有理数类型, 用于帧率和像素宽高比.

use std::fmt;

/// 有理数, 由分子和分母组成
///
/// Theora 头部以无符号分数给出帧率 (如 30000/1001) 和像素宽高比.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// 分子
    pub num: u32,
    /// 分母
    pub den: u32,
}

impl Rational {
    /// 创建新的有理数
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// 未定义 (分母为 0)
    pub const UNDEFINED: Self = Self { num: 0, den: 0 };

    /// 判断是否有效 (分母不为 0)
    pub const fn is_valid(&self) -> bool {
        self.den != 0
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
