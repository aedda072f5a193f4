pub mod embed;
pub mod error;

pub use embed::{NamedRef, PersonRef};
pub use error::AppError;

/// Display name used wherever a doctor or patient is rendered as one string.
pub fn full_name(firstname: &str, lastname: &str) -> String {
    format!("{} {}", firstname, lastname)
}
