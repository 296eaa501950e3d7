//! Rules-driven record pipeline.
//!
//! An [`EntityMain`] runs an [`EntityHandlers`] chain over raw data. The chain
//! starts with a [`DefaultHandler`] that normalizes the input into a batch,
//! fills defaults, validates, applies filters and hides fields according to
//! a [`entify_model::Rules`] specification. Further stages can be registered
//! after it.

pub mod entity;
pub mod factory;
pub mod filters;
pub mod handler;
pub mod handlers;
pub mod loader;
pub mod paginator;
pub mod render;

pub use entity::EntityMain;
pub use factory::HandlerFactory;
pub use filters::{DefaultFilterLibrary, FilterLibrary, FilterOp, KindCheck};
pub use handler::{DefaultHandler, EntityHandler, FnHandler, is_batch_index};
pub use handlers::EntityHandlers;
pub use loader::{
    JsonRulesLoader, ModelRegistry, RulesLoader, RulesModel, StaticModel, check_model_data,
};
pub use paginator::{PageInfo, Paginator};
pub use render::EntityRenderer;
