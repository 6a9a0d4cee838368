/// 跳表构造时的错误。构造完成后，跳表上的操作都不会失败。
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SkipListError {
    /// 分数相同时需要用比较函数决定先后，必须提供
    #[error("skiplist compare function is not set")]
    MissingComparator,
}

pub type SkipListResult<T> = Result<T, SkipListError>;
