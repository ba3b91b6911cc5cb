pub mod cluster;
pub mod push;
pub mod sweep;
