//! Data store modules for Supabase integration

pub mod carts;
pub mod catalog;
pub mod orders;
pub mod posts;
pub mod supabase;
pub mod users;

pub use carts::CartStore;
pub use catalog::ProductStore;
pub use orders::OrderStore;
pub use posts::ScheduledPostStore;
pub use supabase::SupabaseClient;
pub use users::UserStore;
