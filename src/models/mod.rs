pub mod candle;
pub mod market;
pub mod settings;

pub use candle::*;
pub use market::*;
pub use settings::*;
