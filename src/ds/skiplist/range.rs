/// 按分数查找时的区间条件，两端都是闭区间。
///
/// `min_inf` 为真时下界是负无穷，忽略 `min`；`max_inf` 同理。
/// 区间总是按 (下界, 上界) 给出，反向查询也不会修改它。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
    pub min_inf: bool,
    pub max_inf: bool,
}

impl ScoreRange {
    /// `[min, max]`
    pub fn closed(min: f64, max: f64) -> Self {
        Self { min, max, min_inf: false, max_inf: false }
    }

    /// `(-∞, +∞)`
    pub fn all() -> Self {
        Self { min: 0f64, max: 0f64, min_inf: true, max_inf: true }
    }

    /// `[min, +∞)`
    pub fn at_least(min: f64) -> Self {
        Self { min, max: 0f64, min_inf: false, max_inf: true }
    }

    /// `(-∞, max]`
    pub fn at_most(max: f64) -> Self {
        Self { min: 0f64, max, min_inf: true, max_inf: false }
    }

    pub fn above_min(&self, score: f64) -> bool {
        self.min_inf || score >= self.min
    }

    pub fn below_max(&self, score: f64) -> bool {
        self.max_inf || score <= self.max
    }

    pub fn contains(&self, score: f64) -> bool {
        self.above_min(score) && self.below_max(score)
    }
}
