pub mod query;
pub mod supabase;

pub use query::PostgrestQuery;
pub use supabase::{is_constraint_violation, SupabaseClient, SupabaseError};
