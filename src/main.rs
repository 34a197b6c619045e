use anyhow::Result;
use seo_article_batch::utils::logging;
use seo_article_batch::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let mut app = App::initialize(config).await?;
    let stats = app.run().await?;

    if stats.failed > 0 {
        tracing::warn!("⚠️ 有 {} 篇文章失败，详见失败列表", stats.failed);
    }

    Ok(())
}
