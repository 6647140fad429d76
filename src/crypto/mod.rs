pub mod address;
pub mod codec;
pub mod envelope;
pub mod recovery;
