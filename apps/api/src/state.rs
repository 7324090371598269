use std::sync::Arc;

use crate::ai::AiClient;
use crate::config::Config;
use crate::export::raster::RasterPageSpec;
use crate::layout::PageConfig;
use crate::store::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Every live editing session; built once at startup.
    pub sessions: Arc<SessionRegistry>,
    pub ai: AiClient,
    pub config: Config,
    /// Page size, margins and font for the structured exporters.
    pub page_config: PageConfig,
    pub raster_spec: RasterPageSpec,
}

impl AppState {
    pub fn new(config: Config, ai: AiClient, page_config: PageConfig) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new(config.session_idle)),
            ai,
            config,
            raster_spec: RasterPageSpec {
                page_width_mm: page_config.page_width_mm,
                page_height_mm: page_config.page_height_mm,
                ..RasterPageSpec::a4()
            },
            page_config,
        }
    }
}
