use crate::config::Settings;
use crate::database::{FichaMetadata, QdrantClient, QdrantConfig, SimilarFicha, StoredFicha};
use crate::embeddings::{EmbeddingClient, EMBEDDING_DIMENSION};
use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;

/// Maximum number of texts sent in one batch embedding request
const EMBED_BATCH_SIZE: usize = 100;

/// A prior ficha ready to be indexed
#[derive(Debug, Clone)]
pub struct IndexedFicha {
    pub id: String,
    pub text: String,
    pub metadata: FichaMetadata,
}

/// Statistics of the retrieval collection
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub count: u64,
    pub embedding_model: String,
    pub embedding_dimension: u64,
    pub distance: &'static str,
}

/// Retrieval index of prior fichas: Gemini embeddings stored in Qdrant
pub struct RagSystem {
    qdrant: QdrantClient,
    embeddings: EmbeddingClient,
}

impl RagSystem {
    pub fn new(qdrant: QdrantClient, embeddings: EmbeddingClient) -> Self {
        RagSystem { qdrant, embeddings }
    }

    /// Connect to Qdrant and get or create the fichas collection
    pub async fn connect(settings: &Settings) -> Result<Self> {
        info!("Inicializando sistema RAG...");
        let embeddings = EmbeddingClient::from_settings(settings)?;
        let qdrant = QdrantClient::new(QdrantConfig::from_settings(settings))
            .context("Failed to initialize Qdrant client")?;
        qdrant.ensure_collection().await?;

        info!(
            "Sistema RAG listo (colección {}, modelo {})",
            qdrant.collection_name(),
            embeddings.model()
        );
        Ok(Self::new(qdrant, embeddings))
    }

    /// Index one ficha; an existing ficha with the same id is replaced
    pub async fn index_ficha(&self, id: &str, text: &str, metadata: FichaMetadata) -> Result<()> {
        let embedding = self
            .embeddings
            .get_embedding(text)
            .await
            .with_context(|| format!("Failed to embed ficha {}", id))?;

        self.qdrant
            .store_fichas(
                vec![StoredFicha {
                    id: id.to_string(),
                    text: text.to_string(),
                    metadata,
                }],
                vec![embedding],
            )
            .await?;

        debug!("Ficha indexada: {}", id);
        Ok(())
    }

    /// Index several fichas, returning how many were stored
    pub async fn index_multiple(&self, fichas: &[IndexedFicha]) -> Result<usize> {
        if fichas.is_empty() {
            return Ok(0);
        }

        let mut indexed = 0;
        for batch in fichas.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<&str> = batch.iter().map(|f| f.text.as_str()).collect();
            let embeddings = self
                .embeddings
                .get_embeddings(&texts)
                .await
                .context("Failed to embed fichas")?;

            let stored = batch
                .iter()
                .map(|f| StoredFicha {
                    id: f.id.clone(),
                    text: f.text.clone(),
                    metadata: f.metadata.clone(),
                })
                .collect();
            indexed += self.qdrant.store_fichas(stored, embeddings).await?;
        }

        info!("{} fichas indexadas", indexed);
        Ok(indexed)
    }

    /// Find the `k` indexed fichas closest to `query`
    pub async fn retrieve_similar(
        &self,
        query: &str,
        k: u64,
        filter_metadata: Option<&FichaMetadata>,
    ) -> Result<Vec<SimilarFicha>> {
        let query_embedding = self
            .embeddings
            .get_embedding(query)
            .await
            .context("Failed to embed query")?;

        let results = self.qdrant.search(query_embedding, k, filter_metadata).await?;
        debug!("Recuperadas {} fichas similares", results.len());
        Ok(results)
    }

    pub async fn count(&self) -> Result<u64> {
        self.qdrant.count().await
    }

    /// Remove every indexed ficha
    pub async fn delete_all(&self) -> Result<()> {
        self.qdrant.reset().await
    }

    pub async fn collection_info(&self) -> Result<CollectionInfo> {
        Ok(CollectionInfo {
            name: self.qdrant.collection_name().to_string(),
            count: self.count().await?,
            embedding_model: self.embeddings.model().to_string(),
            embedding_dimension: EMBEDDING_DIMENSION,
            distance: "cosine",
        })
    }
}
