pub mod factory;
pub mod session;
pub mod supabase;

pub use factory::{MEMORY_ENV_KEYS, create_memory};
pub use session::SessionMemory;
pub use supabase::{SupabaseMemory, format_content};
