//! # Tool Path Resolver
//!
//! Finds the external optimizer binary:
//! - An explicit path from the configuration
//! - A tools directory given by `WAO_TOOLS_DIR`
//! - The system `PATH`

use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Tool path resolver for the external command-line tools
pub struct ToolPathResolver {
    /// Directory searched before `PATH`
    tools_dir: Option<PathBuf>,
}

impl ToolPathResolver {
    /// Create a new path resolver
    pub fn new() -> Self {
        let tools_dir = env::var_os("WAO_TOOLS_DIR")
            .map(PathBuf::from)
            .filter(|dir| dir.is_dir());

        if let Some(ref dir) = tools_dir {
            debug!("Using tools directory: {:?}", dir);
        }

        Self { tools_dir }
    }

    pub fn with_tools_dir(tools_dir: impl Into<PathBuf>) -> Self {
        Self {
            tools_dir: Some(tools_dir.into()),
        }
    }

    fn executable_name(tool_name: &str) -> String {
        if cfg!(windows) && Path::new(tool_name).extension().is_none() {
            format!("{}.exe", tool_name)
        } else {
            tool_name.to_string()
        }
    }

    /// Resolve the path to a specific tool
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        let as_path = Path::new(tool_name);
        if as_path.components().count() > 1 || as_path.is_absolute() {
            return as_path.is_file().then(|| as_path.to_path_buf());
        }

        let executable = Self::executable_name(tool_name);

        if let Some(ref tools_dir) = self.tools_dir {
            let bundled = tools_dir.join(&executable);
            if bundled.is_file() {
                debug!("Using bundled tool: {} -> {:?}", tool_name, bundled);
                return Some(bundled);
            }
        }

        let found = env::var_os("PATH").and_then(|paths| {
            env::split_paths(&paths)
                .map(|dir| dir.join(&executable))
                .find(|path| path.is_file())
        });

        match found {
            Some(path) => {
                debug!("Using system tool: {} -> {:?}", tool_name, path);
                Some(path)
            }
            None => {
                warn!("Tool not found: {}", tool_name);
                None
            }
        }
    }

    /// Check if a specific tool is available
    pub fn is_tool_available(&self, tool_name: &str) -> bool {
        self.resolve_tool(tool_name).is_some()
    }

    /// Installation hint for a tool
    fn install_instructions(tool_name: &str) -> String {
        match tool_name {
            "optimize-images" => "pip install optimize-images".to_string(),
            _ => format!("install '{}' and make sure it is on PATH", tool_name),
        }
    }

    /// Check if a tool is available and provide installation instructions if not
    pub fn check_tool_with_instructions(&self, tool_name: &str) -> Result<PathBuf, String> {
        self.resolve_tool(tool_name).ok_or_else(|| {
            format!(
                "Tool '{}' not found.\nTo install it, run:\n  {}",
                tool_name,
                Self::install_instructions(tool_name)
            )
        })
    }

    /// Get a report of tool availability
    pub fn get_tools_report(&self, tools: &[&str]) -> String {
        let mut report = String::from("Tool Availability:\n");
        if let Some(ref dir) = self.tools_dir {
            report.push_str(&format!("Tools dir: {:?}\n", dir));
        }

        for tool in tools {
            match self.resolve_tool(tool) {
                Some(path) => report.push_str(&format!("  ✅ {} -> {:?}\n", tool, path)),
                None => report.push_str(&format!(
                    "  ❌ {} (install with: {})\n",
                    tool,
                    Self::install_instructions(tool)
                )),
            }
        }

        report
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_path() {
        let temp = TempDir::new().unwrap();
        let tool = temp.path().join("my-optimizer");
        std::fs::write(&tool, b"").unwrap();

        let resolver = ToolPathResolver { tools_dir: None };
        assert_eq!(resolver.resolve_tool(tool.to_str().unwrap()), Some(tool.clone()));
        assert!(resolver.resolve_tool(temp.path().join("absent").to_str().unwrap()).is_none());
    }

    #[test]
    fn test_tools_dir_wins() {
        let temp = TempDir::new().unwrap();
        let name = ToolPathResolver::executable_name("optimize-images");
        std::fs::write(temp.path().join(&name), b"").unwrap();

        let resolver = ToolPathResolver::with_tools_dir(temp.path());
        assert_eq!(resolver.resolve_tool("optimize-images"), Some(temp.path().join(name)));
    }

    #[test]
    fn test_missing_tool_instructions() {
        let resolver = ToolPathResolver { tools_dir: None };
        let err = resolver
            .check_tool_with_instructions("definitely-not-a-real-tool-4821")
            .unwrap_err();
        assert!(err.contains("definitely-not-a-real-tool-4821"));

        let report = resolver.get_tools_report(&["definitely-not-a-real-tool-4821"]);
        assert!(report.contains("❌"));
    }

    #[cfg(unix)]
    #[test]
    fn test_finds_tool_on_path() {
        let resolver = ToolPathResolver { tools_dir: None };
        assert!(resolver.is_tool_available("sh"));
    }
}
