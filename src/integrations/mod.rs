//! Outbound notification channels and storage.

pub mod mailer {
    pub use crate::mailer::*;
}

pub mod whatsapp {
    pub use crate::whatsapp::*;
}

pub mod lead_store {
    pub use crate::lead_store::*;
}
