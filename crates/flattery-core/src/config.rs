//! 引擎配置

use serde::{Deserialize, Serialize};

use crate::{FlatteryError, Result};

/// 批量寫入策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationMethod {
    /// 單一批量更新語句，不載入目標記錄（預設）
    #[default]
    UpdateAll,

    /// 逐筆載入並儲存目標記錄
    EachRecord,
}

impl PropagationMethod {
    /// 策略識別字（如 `update_all`）
    pub fn as_str(&self) -> &'static str {
        match self {
            PropagationMethod::UpdateAll => "update_all",
            PropagationMethod::EachRecord => "each_record",
        }
    }

    /// 由識別字解析
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "update_all" => Some(PropagationMethod::UpdateAll),
            "each_record" => Some(PropagationMethod::EachRecord),
            _ => None,
        }
    }
}

/// 傳播時機
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationTiming {
    /// 來源記錄寫入前；以上次持久化的主鍵選取目標（預設）
    #[default]
    BeforeSave,

    /// 來源記錄寫入後；以目前的主鍵選取目標
    AfterSave,
}

/// 引擎配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 未指定策略的宣告所採用的批量寫入策略
    pub default_method: PropagationMethod,

    /// 傳播時機
    pub timing: PropagationTiming,

    /// 是否將來源寫入與批量傳播包在同一交易中
    pub atomic: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_method: PropagationMethod::UpdateAll,
            timing: PropagationTiming::BeforeSave,
            atomic: true,
        }
    }
}

impl EngineConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 由 JSON 文件載入；未出現的欄位取預設值
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| FlatteryError::Config(e.to_string()))
    }

    /// 建構器模式：設置預設批量寫入策略
    pub fn with_default_method(mut self, method: PropagationMethod) -> Self {
        self.default_method = method;
        self
    }

    /// 建構器模式：設置傳播時機
    pub fn with_timing(mut self, timing: PropagationTiming) -> Self {
        self.timing = timing;
        self
    }

    /// 建構器模式：設置是否使用單一交易
    pub fn with_atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }
}
