pub mod api_server;
pub mod log_messenger;
pub mod webhook;

pub use api_server::{start_api_server, start_api_server_background};
pub use log_messenger::LogMessenger;
pub use webhook::WebhookMessenger;
