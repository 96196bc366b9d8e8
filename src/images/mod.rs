pub mod services;

pub use services::CapturedImage;
