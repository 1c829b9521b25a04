pub mod binding;
pub mod geometry;
pub mod labels;
pub mod projection;
pub mod renderer;
pub mod scale;

pub use binding::{bind, BoundRegion, Choropleth, NameCollision, ValueIndex};
pub use labels::{Label, LabelPlacer};
pub use projection::Viewport;
pub use renderer::{DisplaySettings, MapLayers, MapRenderer, Overlay};
pub use scale::{format_tick, format_tons, legend_ticks, ColorScale, LegendTick};
