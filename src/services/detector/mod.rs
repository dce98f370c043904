pub mod image_detector;
pub mod labels;
pub mod model;
pub mod nms;
pub mod pipeline;
pub mod tensor_codec;
