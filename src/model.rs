//! 应用描述数据模型
//!
//! 由 builder 或 JSON 描述文件生成，渲染管线只读。

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 应用描述
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dark_mode: Option<bool>,
    #[serde(default)]
    pub window: Option<Window>,
}

impl Application {
    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// 从 JSON 文件加载
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// 背景材质
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Backdrop {
    #[default]
    Acrylic,
    Blur,
    Mica,
}

/// 窗口描述
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
    #[serde(default)]
    pub blur: Option<bool>,
    #[serde(default)]
    pub title_bar: Option<bool>,
    #[serde(default)]
    pub transparent: Option<bool>,
    #[serde(default)]
    pub backdrop: Option<Backdrop>,
    #[serde(default)]
    pub components: Vec<Component>,
}

/// 子组件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Component {
    StaticText(StaticText),
    Container(Container),
}

/// 静态文本
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticText {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub size: Option<u32>,
    /// `#RRGGBB` 或 `#RRGGBBAA`
    #[serde(default)]
    pub color: Option<String>,
}

/// 容器
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
    #[serde(default)]
    pub components: Vec<Component>,
}
