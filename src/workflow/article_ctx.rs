//! 文章处理上下文
//!
//! 封装"我正在处理第几批的第几篇文章"这一信息

use std::fmt::Display;

/// 文章处理上下文
#[derive(Debug, Clone)]
pub struct ArticleCtx {
    /// 文章ID
    pub article_id: String,

    /// 批次编号（从1开始，仅用于日志显示）
    pub batch_num: usize,

    /// 文章在本批中的位置（从1开始）
    pub position: usize,
}

impl ArticleCtx {
    pub fn new(article_id: impl Into<String>, batch_num: usize, position: usize) -> Self {
        Self {
            article_id: article_id.into(),
            batch_num,
            position,
        }
    }
}

impl Display for ArticleCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[批次 {} #{} 文章 {}]",
            self.batch_num, self.position, self.article_id
        )
    }
}
