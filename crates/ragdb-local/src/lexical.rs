use anyhow::{anyhow, Result};
use std::sync::Mutex;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use ragdb_core::fusion::TITLE_BOOST;
use ragdb_core::types::Document;

use crate::tantivy_utils::{build_schema, register_tokenizer};

const WRITER_HEAP_BYTES: usize = 20_000_000;

/// In-RAM BM25 index over `title` (boosted) and `content`, keyed by document id.
pub struct LexicalIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    id_field: Field,
    title_field: Field,
    content_field: Field,
}

impl LexicalIndex {
    pub fn in_memory() -> Result<Self> {
        let schema = build_schema();
        let index = Index::create_in_ram(schema.clone());
        register_tokenizer(&index);
        let writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;
        let reader: IndexReader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
        let id_field = schema.get_field("id")?;
        let title_field = schema.get_field("title")?;
        let content_field = schema.get_field("content")?;
        Ok(Self { index, reader, writer: Mutex::new(writer), id_field, title_field, content_field })
    }

    /// Adds or replaces documents, then makes them searchable.
    pub fn upsert(&self, docs: &[Document]) -> Result<()> {
        let mut writer = self.writer.lock().map_err(|_| anyhow!("lexical index writer poisoned"))?;
        for d in docs {
            writer.delete_term(Term::from_field_text(self.id_field, &d.id));
            writer.add_document(doc!(
                self.id_field => d.id.clone(),
                self.title_field => d.title.clone(),
                self.content_field => d.content.clone(),
            ))?;
        }
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        let mut writer = self.writer.lock().map_err(|_| anyhow!("lexical index writer poisoned"))?;
        writer.delete_term(Term::from_field_text(self.id_field, id));
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let mut writer = self.writer.lock().map_err(|_| anyhow!("lexical index writer poisoned"))?;
        writer.delete_all_documents()?;
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    /// Top `limit` `(id, score)` pairs, best first. Query syntax errors are
    /// tolerated; the parsable part of the query is used.
    pub fn search(&self, text: &str, limit: usize) -> Result<Vec<(String, f32)>> {
        if limit == 0 || text.trim().is_empty() {
            return Ok(vec![]);
        }
        let searcher = self.reader.searcher();
        let mut qp = QueryParser::for_index(&self.index, vec![self.title_field, self.content_field]);
        qp.set_field_boost(self.title_field, TITLE_BOOST);
        let (query, _errors) = qp.parse_query_lenient(text);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;
        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let id = doc.get_first(self.id_field).and_then(|v| v.as_str()).unwrap_or("").to_string();
            hits.push((id, score));
        }
        Ok(hits)
    }
}
