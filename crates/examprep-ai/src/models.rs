//! Model registry: the Gemini models the tutor is known to work with.

use crate::Model;

/// Base URL of the Google Generative AI REST API
pub const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when neither the CLI nor the config file names one
pub const DEFAULT_MODEL_ID: &str = "gemini-2.0-flash";

struct ModelEntry {
    id: &'static str,
    name: &'static str,
    context_window: u32,
    max_tokens: u32,
}

const MODEL_ENTRIES: &[ModelEntry] = &[
    ModelEntry {
        id: "gemini-2.0-flash",
        name: "Gemini 2.0 Flash",
        context_window: 1_048_576,
        max_tokens: 8192,
    },
    ModelEntry {
        id: "gemini-2.0-flash-lite",
        name: "Gemini 2.0 Flash-Lite",
        context_window: 1_048_576,
        max_tokens: 8192,
    },
    ModelEntry {
        id: "gemini-2.5-flash",
        name: "Gemini 2.5 Flash",
        context_window: 1_048_576,
        max_tokens: 65_536,
    },
    ModelEntry {
        id: "gemini-2.5-pro",
        name: "Gemini 2.5 Pro",
        context_window: 1_048_576,
        max_tokens: 65_536,
    },
    ModelEntry {
        id: "gemini-1.5-flash",
        name: "Gemini 1.5 Flash",
        context_window: 1_000_000,
        max_tokens: 8192,
    },
];

impl ModelEntry {
    fn to_model(&self) -> Model {
        Model {
            id: self.id.to_string(),
            name: self.name.to_string(),
            base_url: GOOGLE_BASE_URL.to_string(),
            context_window: self.context_window,
            max_tokens: self.max_tokens,
            headers: Default::default(),
        }
    }
}

/// Strip the optional `models/` prefix the Google SDKs use.
pub fn normalize_id(id: &str) -> &str {
    let id = id.trim();
    id.strip_prefix("models/").unwrap_or(id)
}

/// Look up a registered model by ID (with or without the `models/` prefix).
pub fn get_model(id: &str) -> Option<Model> {
    let id = normalize_id(id);
    MODEL_ENTRIES
        .iter()
        .find(|e| e.id == id)
        .map(|e| e.to_model())
}

/// Look up a model, falling back to a generic Gemini definition for unknown IDs.
pub fn model_or_default(id: &str) -> Model {
    if let Some(model) = get_model(id) {
        return model;
    }

    tracing::debug!("Model '{}' not in registry, using generic definition", id);
    let id = normalize_id(id);
    Model {
        id: id.to_string(),
        name: id.to_string(),
        base_url: GOOGLE_BASE_URL.to_string(),
        context_window: 128_000,
        max_tokens: 8192,
        headers: Default::default(),
    }
}
