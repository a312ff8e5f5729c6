pub mod locks;
pub mod state;

pub use locks::KeyedLocks;
pub use state::AppState;
