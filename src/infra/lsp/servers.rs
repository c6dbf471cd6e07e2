//! Language Server Configurations
//!
//! Static per-language server descriptions: launch command, resource limits,
//! timeouts, and platform-aware install hints. Loaded once at startup and
//! shared read-only across sessions.

use std::collections::HashMap;
use std::process::Command;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::config::LspSettings;
use crate::models::symbol::Language;

// ============================================================================
// Memory breach behavior
// ============================================================================

/// What the memory monitor does when a server crosses its limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemoryAction {
    /// Terminate the process and fail the call
    #[default]
    Kill,
    /// Log and continue
    Warn,
    /// Take no action
    Ignore,
}

// ============================================================================
// Platform Detection
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Linux,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOS
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Linux
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstallInstructions {
    pub macos: String,
    pub linux: String,
    pub windows: String,
}

impl InstallInstructions {
    fn uniform(hint: &str) -> Self {
        Self {
            macos: hint.to_string(),
            linux: hint.to_string(),
            windows: hint.to_string(),
        }
    }

    pub fn current(&self) -> &str {
        match Platform::current() {
            Platform::MacOS => &self.macos,
            Platform::Linux => &self.linux,
            Platform::Windows => &self.windows,
        }
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct LspServerConfig {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub languages: Vec<Language>,
    pub memory_limit_mb: u64,
    pub on_memory_breach: MemoryAction,
    pub timeout_secs: u64,
    pub init_timeout_secs: u64,
    pub install: InstallInstructions,
    pub initialization_options: Option<serde_json::Value>,
}

impl LspServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_secs)
    }

    /// Install hint for the current platform
    pub fn install_hint(&self) -> &str {
        self.install.current()
    }

    pub fn is_installed(&self) -> bool {
        #[cfg(unix)]
        if let Ok(output) = Command::new("which").arg(&self.command).output()
            && output.status.success()
        {
            return true;
        }

        #[cfg(windows)]
        if let Ok(output) = Command::new("where").arg(&self.command).output()
            && output.status.success()
        {
            return true;
        }

        false
    }

    /// Installed version, first non-empty output line of `--version`
    pub fn version(&self) -> Option<String> {
        let output = Command::new(&self.command).arg("--version").output().ok()?;
        if !output.status.success() {
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let text = if stdout.trim().is_empty() {
            stderr.to_string()
        } else {
            stdout.to_string()
        };

        text.lines()
            .find(|line| !line.trim().is_empty())
            .map(|s| s.trim().to_string())
    }
}

/// Default server configurations for all supported languages, with the
/// project-level overrides from `[lsp]` applied.
pub fn defaults(settings: &LspSettings) -> HashMap<Language, LspServerConfig> {
    let mut configs = HashMap::new();

    configs.insert(
        Language::Rust,
        LspServerConfig {
            name: "rust-analyzer".to_string(),
            command: "rust-analyzer".to_string(),
            args: Vec::new(),
            languages: vec![Language::Rust],
            memory_limit_mb: settings.memory_limit_mb,
            on_memory_breach: MemoryAction::Kill,
            timeout_secs: settings.timeout_secs,
            init_timeout_secs: 15,
            install: InstallInstructions::uniform("rustup component add rust-analyzer"),
            initialization_options: None,
        },
    );

    configs.insert(
        Language::Go,
        LspServerConfig {
            name: "gopls".to_string(),
            command: "gopls".to_string(),
            args: Vec::new(),
            languages: vec![Language::Go],
            memory_limit_mb: settings.memory_limit_mb,
            on_memory_breach: MemoryAction::Kill,
            timeout_secs: settings.timeout_secs,
            init_timeout_secs: 15,
            install: InstallInstructions::uniform(
                "go install golang.org/x/tools/gopls@latest",
            ),
            initialization_options: None,
        },
    );

    configs.insert(
        Language::Python,
        LspServerConfig {
            name: "pyright".to_string(),
            command: "pyright-langserver".to_string(),
            args: vec!["--stdio".to_string()],
            languages: vec![Language::Python],
            // Pyright indexes eagerly and leaks on large monorepos
            memory_limit_mb: settings.memory_limit_mb,
            on_memory_breach: MemoryAction::Kill,
            timeout_secs: settings.timeout_secs,
            init_timeout_secs: 60,
            install: InstallInstructions {
                macos: "npm install -g pyright".to_string(),
                linux: "npm install -g pyright".to_string(),
                windows: "npm install -g pyright".to_string(),
            },
            initialization_options: None,
        },
    );

    let ts_config = LspServerConfig {
        name: "typescript-language-server".to_string(),
        command: "typescript-language-server".to_string(),
        args: vec!["--stdio".to_string()],
        languages: vec![Language::TypeScript, Language::JavaScript],
        memory_limit_mb: settings.memory_limit_mb,
        on_memory_breach: MemoryAction::Kill,
        timeout_secs: settings.timeout_secs,
        init_timeout_secs: 60,
        install: InstallInstructions::uniform(
            "npm install -g typescript-language-server typescript",
        ),
        initialization_options: None,
    };
    configs.insert(Language::TypeScript, ts_config.clone());
    configs.insert(Language::JavaScript, ts_config);

    configs.insert(
        Language::Java,
        LspServerConfig {
            name: "jdtls".to_string(),
            command: "jdtls".to_string(),
            args: Vec::new(),
            languages: vec![Language::Java],
            memory_limit_mb: settings.memory_limit_mb,
            on_memory_breach: MemoryAction::Kill,
            timeout_secs: settings.timeout_secs,
            init_timeout_secs: 120,
            install: InstallInstructions {
                macos: "brew install jdtls".to_string(),
                linux: "Download from https://download.eclipse.org/jdtls/snapshots/".to_string(),
                windows: "Download from https://download.eclipse.org/jdtls/snapshots/".to_string(),
            },
            initialization_options: None,
        },
    );

    // Command overrides replace the launch binary, nothing else
    for (lang_key, command) in &settings.commands {
        if let Ok(language) = lang_key.parse::<Language>()
            && let Some(config) = configs.get_mut(&language)
        {
            config.command = command.clone();
        }
    }

    configs
}
