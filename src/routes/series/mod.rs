mod handlers;
mod types;

pub use handlers::{get_series_window, list_series};
pub use types::{SamplePoint, SeriesSummary, SeriesWindowResponse, WindowQuery};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{__path_get_series_window, __path_list_series};
