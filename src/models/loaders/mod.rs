pub mod csv_loader;

pub use csv_loader::{parse_article_table, read_article_table, ArticleTable};
