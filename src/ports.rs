pub mod clock;
pub mod push;
pub mod store;

pub use clock::TimeProvider;
pub use push::PushSender;
pub use store::DocumentStore;
