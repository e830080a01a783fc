pub mod costs;
pub mod debug;
pub mod recommendations;
pub mod scan;
