//! 测试公共模块

#![allow(dead_code)]

pub mod mock_provider;

pub use mock_provider::*;
