//! Model loading off the render thread.
//!
//! Fetching and decoding belong to a [`ModelSource`] and run on worker
//! threads. Results come back over a channel and are polled by the render
//! thread, which is the only place the scene graph is touched. A load is never
//! cancelled; a result that is no longer wanted is discarded by its caller.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Identifies one load request; increases monotonically per loader
pub type RequestId = u64;

/// Axis-aligned bounds of a model in model units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    /// Extent along X, the temple-to-temple direction
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max[0] - self.min[0]
    }
}

/// Decoded model, ready to be turned into scene entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelData {
    /// Identifier the model was requested with
    #[serde(default)]
    pub url: String,
    /// Renderable parts, one entity each
    pub parts: Vec<String>,
    pub bounds: BoundingBox,
}

/// Fetches and decodes models; called from worker threads
pub trait ModelSource: Send + Sync {
    /// # Errors
    ///
    /// Returns [`Error::AssetLoad`] when the model cannot be fetched or decoded.
    fn fetch(&self, url: &str) -> Result<ModelData>;
}

/// Reads YAML model descriptors from a directory (`<root>/<url>.yaml`)
#[derive(Debug, Clone)]
pub struct DescriptorSource {
    root: PathBuf,
}

impl DescriptorSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        if url.ends_with(".yaml") || url.ends_with(".yml") {
            self.root.join(url)
        } else {
            self.root.join(format!("{url}.yaml"))
        }
    }
}

impl ModelSource for DescriptorSource {
    fn fetch(&self, url: &str) -> Result<ModelData> {
        let load_error = |reason: String| Error::AssetLoad {
            url: url.to_string(),
            reason,
        };

        let path = self.path_for(url);
        debug!("Reading model descriptor {}", path.display());
        let content = std::fs::read_to_string(&path).map_err(|e| load_error(format!("{}: {e}", path.display())))?;

        let mut data: ModelData =
            serde_yaml::from_str(&content).map_err(|e| load_error(format!("invalid descriptor: {e}")))?;
        if data.parts.is_empty() {
            return Err(load_error("model has no parts".to_string()));
        }
        data.url = url.to_string();
        Ok(data)
    }
}

/// Completion of one request
#[derive(Debug)]
pub struct LoadOutcome {
    pub request: RequestId,
    pub url: String,
    pub result: Result<ModelData>,
}

/// Where the most recent model request stands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading {
        request: RequestId,
        url: String,
    },
    Ready {
        url: String,
    },
    Failed {
        url: String,
        reason: String,
    },
}

/// Spawns one worker per request and hands results back over a channel
pub struct AssetLoader {
    source: Arc<dyn ModelSource>,
    sender: Sender<LoadOutcome>,
    receiver: Receiver<LoadOutcome>,
    next_request: RequestId,
}

impl AssetLoader {
    #[must_use]
    pub fn new(source: Arc<dyn ModelSource>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            source,
            sender,
            receiver,
            next_request: 1,
        }
    }

    /// Start loading `url` in the background.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LoaderUnavailable`] if the worker thread cannot be spawned.
    pub fn request(&mut self, url: &str) -> Result<RequestId> {
        let request = self.next_request;
        self.next_request += 1;

        let source = Arc::clone(&self.source);
        let sender = self.sender.clone();
        let url = url.to_string();
        thread::Builder::new()
            .name(format!("model-loader-{request}"))
            .spawn(move || {
                let result = source.fetch(&url);
                // Receiver gone means the session was destroyed
                let _ = sender.send(LoadOutcome { request, url, result });
            })
            .map_err(|e| Error::LoaderUnavailable(e.to_string()))?;

        Ok(request)
    }

    /// Completed loads, without blocking
    #[must_use]
    pub fn poll(&self) -> Vec<LoadOutcome> {
        self.receiver.try_iter().collect()
    }

    /// Block up to `timeout` for the next completion
    #[must_use]
    pub fn wait(&self, timeout: Duration) -> Option<LoadOutcome> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

impl std::fmt::Debug for AssetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetLoader").field("next_request", &self.next_request).finish_non_exhaustive()
    }
}
