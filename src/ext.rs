//! Extension points for attaching cached tokens to outbound API requests.

pub mod request_signer;

pub use request_signer::*;
