//! 提示词构建
//!
//! 研究提示词发给研究 API（英文指令，西语输出），
//! 正文提示词发给写作模型（西语）。

use regex::Regex;

use crate::models::ArticleJob;

/// 生成研究问题
///
/// CSV 提供了 `PerplexityQuery` 时直接使用，否则由关键词拼出
pub fn build_research_question(
    primary_keyword: &str,
    secondary_keywords: &[String],
    query: Option<&str>,
) -> String {
    match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => q.to_string(),
        None if secondary_keywords.is_empty() => {
            format!("Provide comprehensive information about {}", primary_keyword)
        }
        None => format!(
            "Provide comprehensive information about {} considering these related topics: {}",
            primary_keyword,
            secondary_keywords.join(", ")
        ),
    }
}

/// 研究提示词
pub fn build_research_prompt(question: &str) -> String {
    format!(
        "Please search all relevant sources to give the most accurate, valuable and concrete answer to the following question: \n\
{question}\n\
\n\
Additional instructions:  \n\
Use english written sources please\n\
Order your answer in the most SEO friendly way so it can be used to write a SEO article for a website.\n\
Include all semantic context possible, however, limit yourself to information relevant to answer the question inside a news outlet/blog SEO optimized post perspective.\n\
Your response will be used as a main data source fed to a writing LLM to develop a high quality info about this subject.\n\
Please, at the end give any relevant info about your workflow or frame of reference you believe is relevant in order to get the best output possible.\n\
Avoid leaving blank spaces between lines in your response please\n\
Please give your response in fluid spanish, 40% spartan tone, casual."
    )
}

/// 内链段落，每行 `- [描述](url)`
pub fn format_links_section(links: &[String]) -> String {
    links
        .iter()
        .map(|link| format!("- {}", link))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 正文提示词
pub fn build_content_prompt(
    job: &ArticleJob,
    research_data: &str,
    tone: &str,
    internal_links: &[String],
) -> String {
    let links_section = if internal_links.is_empty() {
        "(sin enlaces internos)".to_string()
    } else {
        format_links_section(internal_links)
    };

    format!(
        "Eres un escritor SEO experto que escribe exactamente con este tono y estilo:\n\
\n\
{tone}\n\
\n\
Genera contenido en español siguiendo estrictamente estas reglas:\n\
1. Título: {title}\n\
2. Palabra clave principal: {keyword}\n\
3. Palabras clave secundarias: {secondary}\n\
4. Datos de investigación: {research_data}\n\
\n\
Enlaces internos a incluir naturalmente en el contenido:\n\
{links_section}\n\
\n\
El contenido debe:\n\
- Tener 600 palabras mínimo\n\
- Mantener el tono especificado\n\
- Estar optimizado para SEO\n\
- Incluir datos verificables de la investigación\n\
- Ser original y atractivo\n\
- Incluir los enlaces internos de forma natural y relevante\n\
\n\
Estructura el contenido de forma natural y atractiva, usando los datos de investigación como base.",
        tone = tone.trim(),
        title = job.title,
        keyword = job.primary_keyword,
        secondary = job.secondary_keywords.join(", "),
    )
}

/// 规范化研究文本：去掉首尾空白，合并连续空行
pub fn normalize_research_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = text.trim();
    if let Ok(re) = Regex::new(r"\n[ \t]*(?:\n[ \t]*)+") {
        re.replace_all(text, "\n").into_owned()
    } else {
        text.to_string()
    }
}
