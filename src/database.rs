use crate::config::Settings;
use crate::embeddings::{Embedding, EMBEDDING_DIMENSION};
use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use qdrant_client::qdrant::{
    with_payload_selector, Condition, CountPointsBuilder, CreateCollectionBuilder, Distance,
    Filter, PointStruct, SearchPoints, UpsertPointsBuilder, VectorParams, WithPayloadSelector,
};
use qdrant_client::{Payload, Qdrant};
use serde::Serialize;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::BTreeMap;
use uuid::Uuid;

const TEXT_KEY: &str = "text";
const FICHA_ID_KEY: &str = "ficha_id";

/// Free-form string metadata stored next to each indexed ficha
pub type FichaMetadata = BTreeMap<String, String>;

/// Configuration for Qdrant
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection_name: String,
}

impl QdrantConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        QdrantConfig {
            url: settings.qdrant_url.clone(),
            api_key: settings.qdrant_api_key.clone(),
            collection_name: settings.collection_name.clone(),
        }
    }
}

/// A ficha as stored in (or returned from) the vector collection
#[derive(Debug, Clone, Serialize)]
pub struct StoredFicha {
    pub id: String,
    pub text: String,
    pub metadata: FichaMetadata,
}

/// A search hit with its cosine similarity
#[derive(Debug, Clone, Serialize)]
pub struct SimilarFicha {
    pub id: String,
    pub text: String,
    pub metadata: FichaMetadata,
    pub score: f32,
}

/// Client for the fichas collection in Qdrant
pub struct QdrantClient {
    client: Qdrant,
    collection_name: String,
}

impl QdrantClient {
    /// Create a new Qdrant client
    pub fn new(config: QdrantConfig) -> Result<Self> {
        let config_builder = Qdrant::from_url(&config.url);
        let config_builder = if let Some(api_key) = config.api_key {
            config_builder.api_key(api_key)
        } else {
            config_builder
        };

        let client = config_builder
            .build()
            .with_context(|| format!("Failed to connect to Qdrant at {}", config.url))?;

        Ok(QdrantClient {
            client,
            collection_name: config.collection_name,
        })
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Check if the collection exists
    pub async fn collection_exists(&self) -> Result<bool> {
        self.client
            .collection_exists(&self.collection_name)
            .await
            .with_context(|| {
                format!(
                    "Failed to check collection existence: {}",
                    self.collection_name
                )
            })
    }

    /// Create the collection
    pub async fn create_collection(&self) -> Result<()> {
        let create_collection = CreateCollectionBuilder::new(self.collection_name.clone())
            .vectors_config(VectorParams {
                size: EMBEDDING_DIMENSION,
                distance: Distance::Cosine.into(),
                ..Default::default()
            });

        self.client
            .create_collection(create_collection)
            .await
            .with_context(|| format!("Failed to create collection {}", self.collection_name))?;

        Ok(())
    }

    /// Create the collection unless it is already there
    pub async fn ensure_collection(&self) -> Result<()> {
        if self.collection_exists().await? {
            info!("Colección existente cargada: {}", self.collection_name);
        } else {
            self.create_collection().await?;
            info!("Nueva colección creada: {}", self.collection_name);
        }
        Ok(())
    }

    /// Delete the collection
    pub async fn delete_collection(&self) -> Result<()> {
        self.client
            .delete_collection(self.collection_name.clone())
            .await
            .with_context(|| format!("Failed to delete collection {}", self.collection_name))?;

        Ok(())
    }

    /// Store fichas in the collection; re-storing an id overwrites the point
    pub async fn store_fichas(
        &self,
        fichas: Vec<StoredFicha>,
        embeddings: Vec<Embedding>,
    ) -> Result<usize> {
        if fichas.len() != embeddings.len() {
            return Err(anyhow!(
                "Got {} fichas but {} embeddings",
                fichas.len(),
                embeddings.len()
            ));
        }

        let points = fichas
            .into_iter()
            .zip(embeddings)
            .map(|(ficha, embedding)| {
                let payload = Payload::try_from(ficha_payload(&ficha))
                    .with_context(|| format!("Invalid payload for ficha {}", ficha.id))?;
                Ok(PointStruct::new(point_id(&ficha.id), embedding.values, payload))
            })
            .collect::<Result<Vec<_>>>()?;
        let stored = points.len();

        let upsert_request = UpsertPointsBuilder::new(self.collection_name.clone(), points)
            .wait(true)
            .build();

        self.client
            .upsert_points(upsert_request)
            .await
            .with_context(|| {
                format!(
                    "Failed to upsert points in collection {}",
                    self.collection_name
                )
            })?;

        debug!("{} puntos almacenados en {}", stored, self.collection_name);
        Ok(stored)
    }

    /// Search for the fichas closest to an embedding, optionally restricted to
    /// exact metadata matches
    pub async fn search(
        &self,
        query_embedding: Embedding,
        limit: u64,
        filter_metadata: Option<&FichaMetadata>,
    ) -> Result<Vec<SimilarFicha>> {
        let filter = filter_metadata
            .filter(|metadata| !metadata.is_empty())
            .map(|metadata| {
                Filter::must(
                    metadata
                        .iter()
                        .map(|(key, value)| Condition::matches(key.clone(), value.clone())),
                )
            });

        let search_request = SearchPoints {
            collection_name: self.collection_name.clone(),
            vector: query_embedding.values,
            limit,
            filter,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(with_payload_selector::SelectorOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let search_response = self
            .client
            .search_points(search_request)
            .await
            .with_context(|| format!("Failed to search collection {}", self.collection_name))?;

        let fichas = search_response
            .result
            .into_iter()
            .filter_map(|scored_point| {
                let payload = scored_point.payload;
                let text = payload.get(TEXT_KEY)?.as_str()?.to_string();
                let id = payload
                    .get(FICHA_ID_KEY)
                    .and_then(|v| v.as_str())
                    .cloned()
                    .unwrap_or_default();

                let metadata = payload
                    .iter()
                    .filter(|(key, _)| key.as_str() != TEXT_KEY && key.as_str() != FICHA_ID_KEY)
                    .filter_map(|(key, value)| Some((key.clone(), value.as_str()?.clone())))
                    .collect();

                Some(SimilarFicha {
                    id,
                    text,
                    metadata,
                    score: scored_point.score,
                })
            })
            .collect();

        Ok(fichas)
    }

    /// Number of points in the collection
    pub async fn count(&self) -> Result<u64> {
        let response = self
            .client
            .count(CountPointsBuilder::new(self.collection_name.clone()).exact(true))
            .await
            .with_context(|| format!("Failed to count points in {}", self.collection_name))?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    /// Drop every point by recreating the collection
    pub async fn reset(&self) -> Result<()> {
        warn!("Eliminando todas las fichas de la colección...");
        if self.collection_exists().await? {
            self.delete_collection().await?;
        }
        self.create_collection().await?;
        info!("Colección reiniciada");
        Ok(())
    }
}

/// Deterministic point id for a ficha identifier
pub fn point_id(ficha_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, ficha_id.as_bytes()).to_string()
}

fn ficha_payload(ficha: &StoredFicha) -> JsonValue {
    let mut payload = Map::new();
    for (key, value) in &ficha.metadata {
        payload.insert(key.clone(), json!(value));
    }
    payload.insert(TEXT_KEY.to_string(), json!(ficha.text));
    payload.insert(FICHA_ID_KEY.to_string(), json!(ficha.id));
    JsonValue::Object(payload)
}
