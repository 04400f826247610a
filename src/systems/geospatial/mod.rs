pub mod borders;
pub mod coordinates;
