//! Prompt templates for RAG generation

use crate::providers::vector_store::VectorSearchResult;

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build context from search results, one block per chunk
    pub fn build_context(results: &[VectorSearchResult]) -> String {
        results
            .iter()
            .map(|result| {
                let source = &result.chunk.source;
                let mut header = format!("file_name: {}", source.filename);
                if let Some(page) = source.page_number {
                    header.push_str(&format!("\npage_label: {}", page));
                }
                format!("{}\n\n{}", header, result.chunk.content.trim())
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the question-answering prompt
    pub fn build_qa_prompt(query: &str, context: &str) -> String {
        format!(
            "Context information is below.\n\
             ---------------------\n\
             {context}\n\
             ---------------------\n\
             Given the context information and not prior knowledge, answer the query.\n\
             Query: {query}\n\
             Answer: ",
            context = context,
            query = query
        )
    }
}
