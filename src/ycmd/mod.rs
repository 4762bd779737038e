pub mod client;
pub mod hmac;
pub mod request;
pub mod server;

pub use client::{YcmdClient, COMPLETER_COMMAND_HANDLER, READY_HANDLER};
pub use self::hmac::{create_hmac, sign, sign_base64, verify_response, HMAC_HEADER};
pub use request::{GoToResponse, Location, YcmdRequest};
pub use server::{find_python, free_port, write_options_file, ServerConfig, YcmdServer};
