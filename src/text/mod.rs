pub mod normalize;
pub mod select;

pub use normalize::normalize;
pub use select::select_main_text;
