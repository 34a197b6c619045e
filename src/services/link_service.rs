//! 内链服务 - 业务能力层
//!
//! 按向量余弦相似度为关键词挑选站内旧文章链接

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{AppResult, ValidationError};
use crate::models::{read_article_table, InternalLink};
use crate::services::ports::{Embedder, LinkProvider};

const URL_COLUMN: &str = "URL";
const DESCRIPTION_COLUMNS: [&str; 2] = ["Descripción", "Description"];

/// 一条可链接的旧文章
#[derive(Debug, Clone, PartialEq)]
pub struct LinkEntry {
    pub url: String,
    pub description: String,
}

/// 内链服务
///
/// 职责：
/// - 读取内链 CSV（`URL` + `Descripción`）
/// - 缓存描述文本的向量，同一文本只请求一次
/// - 任何失败都退化为空列表，不影响文章生成
pub struct InternalLinkService {
    embedder: Arc<dyn Embedder>,
    links: Vec<LinkEntry>,
    cache: Mutex<HashMap<String, Vec<f32>>>,
}

impl InternalLinkService {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self::from_entries(embedder, Vec::new())
    }

    pub fn from_entries(embedder: Arc<dyn Embedder>, links: Vec<LinkEntry>) -> Self {
        Self {
            embedder,
            links,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// 从 CSV 加载内链，返回加载条数
    ///
    /// URL 为空的行会被跳过
    pub async fn load_links(&mut self, path: &Path) -> AppResult<usize> {
        let table = read_article_table(path).await?;

        let description_column = DESCRIPTION_COLUMNS
            .iter()
            .find(|c| table.has_column(c))
            .copied();
        let description_column = match description_column {
            Some(c) if table.has_column(URL_COLUMN) => c,
            _ => {
                let mut missing = Vec::new();
                if !table.has_column(URL_COLUMN) {
                    missing.push(URL_COLUMN.to_string());
                }
                if description_column.is_none() {
                    missing.push(DESCRIPTION_COLUMNS[0].to_string());
                }
                return Err(ValidationError::MissingColumns(missing).into());
            }
        };

        self.links = table
            .rows
            .iter()
            .filter_map(|row| {
                let url = row.get(URL_COLUMN)?.trim();
                if url.is_empty() {
                    return None;
                }
                Some(LinkEntry {
                    url: url.to_string(),
                    description: row
                        .get(description_column)
                        .map(|d| d.trim().to_string())
                        .unwrap_or_default(),
                })
            })
            .collect();

        info!("🔗 已加载 {} 条内链: {}", self.links.len(), path.display());
        Ok(self.links.len())
    }

    pub fn links(&self) -> &[LinkEntry] {
        &self.links
    }

    /// 获取一组文本的向量，未缓存的文本合并成一次请求
    ///
    /// 查缓存和写缓存在同一把锁内完成，并发调用不会重复请求同一文本
    async fn embeddings_for(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut cache = self.cache.lock().await;

        let mut seen = HashSet::new();
        let missing: Vec<String> = texts
            .iter()
            .filter(|t| !cache.contains_key(*t) && seen.insert(*t))
            .cloned()
            .collect();

        if !missing.is_empty() {
            debug!("缓存未命中 {} 条，请求向量", missing.len());
            let vectors = self.embedder.embed(&missing).await?;
            for (text, vector) in missing.into_iter().zip(vectors) {
                cache.insert(text, vector);
            }
        }

        Ok(texts
            .iter()
            .map(|t| cache.get(t).cloned().unwrap_or_default())
            .collect())
    }

    async fn rank_links(&self, keyword: &str, n: usize) -> AppResult<Vec<InternalLink>> {
        let mut texts = Vec::with_capacity(self.links.len() + 1);
        texts.push(keyword.to_string());
        texts.extend(self.links.iter().map(|l| l.description.clone()));

        let vectors = self.embeddings_for(&texts).await?;
        let Some((keyword_vector, link_vectors)) = vectors.split_first() else {
            return Ok(Vec::new());
        };

        let mut ranked: Vec<InternalLink> = self
            .links
            .iter()
            .zip(link_vectors)
            .filter_map(|(link, vector)| {
                cosine_similarity(keyword_vector, vector).map(|similarity| InternalLink {
                    url: link.url.clone(),
                    description: link.description.clone(),
                    similarity,
                })
            })
            .collect();

        ranked.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        ranked.truncate(n);
        Ok(ranked)
    }
}

#[async_trait]
impl LinkProvider for InternalLinkService {
    fn is_loaded(&self) -> bool {
        !self.links.is_empty()
    }

    async fn find_relevant_links(&self, keyword: &str, n: usize) -> Vec<InternalLink> {
        if !self.is_loaded() {
            warn!("内链未加载，跳过");
            return Vec::new();
        }
        if n == 0 {
            return Vec::new();
        }

        match self.rank_links(keyword, n).await {
            Ok(links) => {
                debug!("关键词 {} 匹配到 {} 条内链", keyword, links.len());
                links
            }
            Err(e) => {
                warn!("查找内链失败 ({}): {}", keyword, e);
                Vec::new()
            }
        }
    }
}

/// 余弦相似度；维度不一致或零向量返回 `None`
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// 格式化为 Markdown 链接，锚文本取描述的第一句
pub fn format_link_for_content(link: &InternalLink) -> String {
    let anchor = link
        .description
        .split('.')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(&link.url);
    format!("[{}]({})", anchor, link.url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 按文本查表返回向量，并记录请求次数
    struct TableEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        calls: AtomicUsize,
        texts: AtomicUsize,
    }

    impl TableEmbedder {
        fn new(pairs: &[(&str, Vec<f32>)]) -> Self {
            Self {
                vectors: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                calls: AtomicUsize::new(0),
                texts: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for TableEmbedder {
        async fn embed(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.texts.fetch_add(texts.len(), Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(texts
                .iter()
                .map(|t| self.vectors.get(t).cloned().unwrap_or_else(|| vec![0.0, 0.0]))
                .collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Err(crate::error::AppError::empty_response("embeddings"))
        }
    }

    fn entries() -> Vec<LinkEntry> {
        vec![
            LinkEntry {
                url: "https://x.test/hipotecas".into(),
                description: "Guía de hipotecas. Todo lo que necesitas".into(),
            },
            LinkEntry {
                url: "https://x.test/cocina".into(),
                description: "Recetas de cocina".into(),
            },
            LinkEntry {
                url: "https://x.test/alquiler".into(),
                description: "Alquilar o comprar".into(),
            },
        ]
    }

    fn embedder() -> Arc<TableEmbedder> {
        Arc::new(TableEmbedder::new(&[
            ("vivienda", vec![1.0, 0.0]),
            ("Guía de hipotecas. Todo lo que necesitas", vec![0.9, 0.1]),
            ("Recetas de cocina", vec![0.0, 1.0]),
            ("Alquilar o comprar", vec![0.7, 0.7]),
        ]))
    }

    #[test]
    fn cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]).unwrap() - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
    }

    #[test]
    fn link_uses_first_sentence_as_anchor() {
        let link = InternalLink {
            url: "https://x.test/a".into(),
            description: "Guía de hipotecas. Más texto".into(),
            similarity: 0.9,
        };
        assert_eq!(format_link_for_content(&link), "[Guía de hipotecas](https://x.test/a)");

        let bare = InternalLink {
            description: String::new(),
            ..link
        };
        assert_eq!(format_link_for_content(&bare), "[https://x.test/a](https://x.test/a)");
    }

    #[tokio::test]
    async fn links_are_ranked_by_similarity() {
        let service = InternalLinkService::from_entries(embedder(), entries());
        let links = service.find_relevant_links("vivienda", 2).await;

        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, ["https://x.test/hipotecas", "https://x.test/alquiler"]);
        assert!(links[0].similarity >= links[1].similarity);
    }

    #[tokio::test]
    async fn embeddings_are_cached_between_calls() {
        let embedder = embedder();
        let service = InternalLinkService::from_entries(embedder.clone(), entries());

        service.find_relevant_links("vivienda", 3).await;
        service.find_relevant_links("vivienda", 3).await;
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_first_lookups_embed_each_text_once() {
        let embedder = embedder();
        let service = InternalLinkService::from_entries(embedder.clone(), entries());

        let keywords: Vec<String> = (0..10).map(|i| format!("clave {}", i)).collect();
        let lookups = keywords
            .iter()
            .map(|k| service.find_relevant_links(k, 3));
        futures::future::join_all(lookups).await;

        // 3 条描述 + 10 个关键词，各请求一次
        assert_eq!(embedder.texts.load(Ordering::SeqCst), 13);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn repeated_texts_in_one_request_are_embedded_once() {
        let embedder = embedder();
        let mut links = entries();
        links.push(LinkEntry {
            url: "https://x.test/cocina-2".into(),
            description: "Recetas de cocina".into(),
        });
        let service = InternalLinkService::from_entries(embedder.clone(), links);

        let found = service.find_relevant_links("vivienda", 4).await;
        assert_eq!(found.len(), 4);
        assert_eq!(embedder.texts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn nothing_loaded_or_failures_give_empty_list() {
        let empty = InternalLinkService::new(embedder());
        assert!(!empty.is_loaded());
        assert!(empty.find_relevant_links("vivienda", 3).await.is_empty());

        let failing = InternalLinkService::from_entries(Arc::new(FailingEmbedder), entries());
        assert!(failing.find_relevant_links("vivienda", 3).await.is_empty());
    }

    #[tokio::test]
    async fn load_links_reads_csv_and_skips_blank_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.csv");
        tokio::fs::write(
            &path,
            "URL,Descripción\nhttps://x.test/a,Primera. Resto\n ,Sin url\nhttps://x.test/b,Segunda\n",
        )
        .await
        .unwrap();

        let mut service = InternalLinkService::new(embedder());
        assert_eq!(service.load_links(&path).await.unwrap(), 2);
        assert_eq!(service.links()[0].description, "Primera. Resto");
        assert!(service.is_loaded());
    }

    #[tokio::test]
    async fn load_links_requires_url_and_description() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.csv");
        tokio::fs::write(&path, "Link,Texto\na,b\n").await.unwrap();

        let mut service = InternalLinkService::new(embedder());
        let err = service.load_links(&path).await.unwrap_err();
        assert!(err.to_string().contains("URL"));
    }
}
