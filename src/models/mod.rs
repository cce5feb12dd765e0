pub mod keyed;
pub mod list;
