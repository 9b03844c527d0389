use jit_cleaner_application::DrainService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub drain_service: DrainService,
    pub subscription_path: String,
    pub batch_size: usize,
}
