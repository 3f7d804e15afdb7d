pub mod evaluator;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use evaluator::{CouponEvaluation, CouponEvaluator, ScopedLine};
pub use handlers::*;
pub use models::*;
pub use repository::*;
pub use service::*;
