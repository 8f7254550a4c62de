mod food;

pub use food::*;
