pub mod goods;
pub mod line_item;
pub mod quote;
pub mod service;
