pub mod amounts;
pub mod domain;
pub mod errors;
pub mod hd_keys;
pub mod key_manager;
pub mod kms_only;
pub mod sealed_hd;
