pub mod model_catalog;
pub mod siamese_engine;
