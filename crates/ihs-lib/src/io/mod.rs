pub mod csv;
pub mod recording;
pub mod text;
