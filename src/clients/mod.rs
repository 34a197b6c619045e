pub mod doc_store_client;
pub mod embedding_client;
pub mod llm_client;
pub mod validation_client;

pub use doc_store_client::HttpDocumentStore;
pub use embedding_client::EmbeddingClient;
pub use llm_client::LlmClient;
pub use validation_client::ValidationClient;
