pub mod json_extract;
