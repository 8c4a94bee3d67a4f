pub mod memory;
pub mod supabase;

pub use memory::InMemoryStore;
pub use supabase::{SupabaseStore, DEFAULT_QUERY_NAME, DEFAULT_TABLE};
