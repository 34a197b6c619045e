pub mod article;
pub mod batch_result;
pub mod loaders;
pub mod validator;

pub use article::{derive_id, parse_secondary_keywords, ArticleJob, JobStatus};
pub use batch_result::{BatchResult, ContentMetadata, InternalLink, ResultStatus};
pub use loaders::{parse_article_table, read_article_table, ArticleTable};
pub use validator::{DataValidator, InvalidRow, ValidationReport, REQUIRED_COLUMNS};
