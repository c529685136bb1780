pub mod contact;
pub mod event;
pub mod registration;

pub use contact::Contact;
pub use event::Event;
pub use registration::Registration;
