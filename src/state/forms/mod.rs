//! Demo forms: schemas, focus handling and per-field edit buffers

mod channel;
mod demo_form;
mod login;

pub use channel::channel_form;
pub use demo_form::{DemoForm, Edit};
pub use login::login_form;
