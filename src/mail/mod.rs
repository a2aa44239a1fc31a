pub mod api;
pub mod repository;
pub mod types;

pub use api::MailApi;
pub use repository::MailRepository;
pub use types::{EmailDetail, EmailListPage, EmailSummary, Mailbox, ModifyAction, OutgoingEmail, ReplyBody};
