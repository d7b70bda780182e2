use std::sync::Arc;

use sembed_core::InferenceGate;

#[derive(Clone, Debug)]
pub struct AppState {
    pub gate: InferenceGate,
    /// `None` rejects every request.
    pub api_key: Option<Arc<str>>,
    pub expose_inference_errors: bool,
}

impl AppState {
    pub fn new(gate: InferenceGate, api_key: Option<&str>) -> Self {
        Self {
            gate,
            api_key: api_key.filter(|k| !k.is_empty()).map(Arc::from),
            expose_inference_errors: false,
        }
    }

    #[must_use]
    pub fn with_exposed_errors(mut self, expose: bool) -> Self {
        self.expose_inference_errors = expose;
        self
    }
}
