//! Session store: who is logged in, persisted across runs.
//! Keep the public surface thin and split implementation across sub-modules.

mod claims;
mod session;
mod storage;

pub use claims::{decode_claims, encode_unsigned, Claims, ClaimsError, Role};
pub use session::{Session, SessionStore, SessionToken, TOKEN_KEY};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
