pub mod dataset;
pub mod detection;
pub mod errors;
pub mod imaging;
pub mod model;
