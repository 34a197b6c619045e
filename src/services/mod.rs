pub mod backup_service;
pub mod link_service;
pub mod llm_service;
pub mod ports;
pub mod prompt;
pub mod report_writer;

pub use backup_service::BackupService;
pub use link_service::{format_link_for_content, InternalLinkService, LinkEntry};
pub use llm_service::{ResearchService, WritingService};
pub use ports::{
    AiAnalysis, BackupWriter, ContentGenerator, ContentValidator, DocumentStore, Embedder,
    LinkProvider, ResearchProvider,
};
pub use report_writer::ReportWriter;
