//! Authentication for Flowdesk
//!
//! Sign-in itself is handled by Supabase; this module only carries the
//! caller's access token to it.

pub mod extract;
pub mod supabase;

pub use extract::{extract_bearer_token, AccessToken, ACCESS_TOKEN_COOKIE};
pub use supabase::SupabaseSessions;
