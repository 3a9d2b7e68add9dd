pub mod backend;
pub mod messages;
pub mod noop;
pub mod postmark;

pub use backend::{Email, Mailer};
pub use noop::NoopMailer;
pub use postmark::PostmarkMailer;
