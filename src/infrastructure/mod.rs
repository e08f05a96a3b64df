//! 基础设施层（Infrastructure）
//!
//! 负责文档格式的读写，只暴露编解码能力。

pub mod xml_codec;

pub use xml_codec::{Codec, XmlCodec};
