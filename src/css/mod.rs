pub mod collect;
pub mod color;
pub mod selector;
pub mod value;
