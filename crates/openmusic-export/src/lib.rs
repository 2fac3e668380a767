pub mod mail;
pub mod worker;

pub use mail::{HttpMailer, Mail, MailDispatcher};
pub use worker::ExportWorker;
