//! 用户交互：输入名称、确认覆盖
//!
//! 查看器中的 `window.prompt` / `window.confirm` 抽象为 `UserPrompt`。
//! 命令行下从标准输入读取，也可以通过 `--label` / `--yes` / `--no` 预设答案

use std::io::{self, BufRead, Write};

use tracing::{debug, warn};

pub trait UserPrompt: Send + Sync {
    /// 请求输入，`None` 表示取消
    fn prompt(&self, message: &str, default_value: &str) -> Option<String>;

    /// 请求确认
    fn confirm(&self, message: &str) -> bool;
}

/// 终端交互
#[derive(Debug, Clone, Default)]
pub struct TerminalPrompt {
    preset_label: Option<String>,
    preset_confirm: Option<bool>,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.preset_label = label;
        self
    }

    pub fn with_confirm(mut self, answer: Option<bool>) -> Self {
        self.preset_confirm = answer;
        self
    }

    fn read_line(message: &str) -> Option<String> {
        let mut stdout = io::stdout();
        if write!(stdout, "{} ", message).and_then(|_| stdout.flush()).is_err() {
            warn!("无法写入标准输出");
        }

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                warn!("读取标准输入失败: {}", e);
                None
            }
        }
    }
}

impl UserPrompt for TerminalPrompt {
    fn prompt(&self, message: &str, default_value: &str) -> Option<String> {
        if let Some(label) = &self.preset_label {
            debug!("使用预设名称: {}", label);
            return Some(label.clone());
        }
        Self::read_line(&format!("{}\n[{}]:", message, default_value))
    }

    fn confirm(&self, message: &str) -> bool {
        if let Some(answer) = self.preset_confirm {
            debug!("使用预设确认: {}", answer);
            return answer;
        }
        Self::read_line(&format!("{} [y/N]:", message))
            .map(|answer| matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_skip_stdin() {
        let prompt = TerminalPrompt::new()
            .with_label(Some("Liver_ROI".into()))
            .with_confirm(Some(true));

        assert_eq!(prompt.prompt("name?", "default").as_deref(), Some("Liver_ROI"));
        assert!(prompt.confirm("overwrite?"));

        let declining = TerminalPrompt::new().with_confirm(Some(false));
        assert!(!declining.confirm("overwrite?"));
    }
}
