pub mod checkpoint;
pub mod envfile;
