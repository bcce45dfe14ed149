pub mod driver;
pub mod latches;
pub mod predictor;
pub mod stages;
