pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::{catalog_routes, category_routes, speciality_routes};
