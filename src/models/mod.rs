pub mod detection_types;
pub mod scan_types;
