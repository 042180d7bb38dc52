use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{EntropyError, EntropyPredictor, RecurrentPredictor, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorMetadata {
    pub name: String,
    pub path: Option<PathBuf>,
    pub alphabet_size: usize,
}

/// Named, shareable predictors. Loaded parameters are immutable, so lookups
/// hand out `Arc`s and any number of threads may evaluate the same model.
pub struct PredictorRegistry<P> {
    predictors: DashMap<String, Arc<P>>,
    metadata: DashMap<String, PredictorMetadata>,
}

impl<P> Default for PredictorRegistry<P> {
    fn default() -> Self {
        Self {
            predictors: DashMap::new(),
            metadata: DashMap::new(),
        }
    }
}

impl<P: EntropyPredictor> PredictorRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: impl Into<String>, predictor: P) -> Arc<P> {
        self.insert_with_path(name.into(), predictor, None)
    }

    pub fn get(&self, name: &str) -> Result<Arc<P>> {
        self.predictors
            .get(name)
            .map(|p| Arc::clone(p.value()))
            .ok_or_else(|| EntropyError::ModelNotFound(name.to_string()))
    }

    pub fn unload(&self, name: &str) -> bool {
        let source = self.metadata.remove(name).and_then(|(_, meta)| meta.path);
        let removed = self.predictors.remove(name).is_some();
        if removed {
            info!(name, source = ?source, "predictor unloaded");
        }
        removed
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.predictors.iter().map(|kv| kv.key().clone()).collect();
        names.sort();
        names
    }

    pub fn list(&self) -> Vec<PredictorMetadata> {
        self.metadata.iter().map(|kv| kv.value().clone()).collect()
    }

    fn insert_with_path(&self, name: String, predictor: P, path: Option<PathBuf>) -> Arc<P> {
        let predictor = Arc::new(predictor);
        self.metadata.insert(
            name.clone(),
            PredictorMetadata {
                name: name.clone(),
                path,
                alphabet_size: predictor.alphabet_size(),
            },
        );
        self.predictors.insert(name, Arc::clone(&predictor));
        predictor
    }
}

impl<P> PredictorRegistry<P>
where
    P: EntropyPredictor + Serialize + DeserializeOwned,
{
    /// Loads bincode-encoded parameters from `path` under `name`.
    pub fn load_file(&self, name: impl Into<String>, path: impl AsRef<Path>) -> Result<Arc<P>> {
        let name = name.into();
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let predictor: P = bincode::deserialize(&bytes)?;
        info!(
            name = %name,
            path = %path.display(),
            alphabet = predictor.alphabet_size(),
            "predictor loaded"
        );
        Ok(self.insert_with_path(name, predictor, Some(path.to_path_buf())))
    }

    /// Writes the named predictor's parameters to `path` as bincode.
    pub fn save_file(&self, name: &str, path: impl AsRef<Path>) -> Result<()> {
        let predictor = self.get(name)?;
        let bytes = bincode::serialize(predictor.as_ref())?;
        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }
}

/// Process-wide registry for the default recurrent predictor family.
pub static REGISTRY: Lazy<PredictorRegistry<RecurrentPredictor>> = Lazy::new(PredictorRegistry::new);
