pub mod select_value;
