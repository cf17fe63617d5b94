//! 查询编译
//!
//! SearchRequest -> 引擎参数列表。纯函数，不做 IO，也不会失败：
//! 无法使用的过滤条件直接丢弃（等同于没有过滤）。
//!
//! 参数顺序固定：输出格式/线程数 -> 大小写 -> multiline/literal -> glob -> pattern -> extra args。

use crate::kernel::services::ports::{EngineSettings, SearchRequest};
use std::collections::BTreeSet;
use std::path::Path;
use std::process::{Command, Stdio};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub program: String,
    pub args: Vec<String>,
}

impl CompiledQuery {
    /// 仅用于日志的 shell 风格命令行。进程始终直接以 `args` 启动，不经过 shell。
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn to_command(&self, working_dir: Option<&Path>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }
        cmd
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    engine: EngineSettings,
}

impl QueryCompiler {
    pub fn new(engine: EngineSettings) -> Self {
        Self { engine }
    }

    pub fn compile(&self, request: &SearchRequest) -> CompiledQuery {
        let engine = &self.engine;
        let mut args = Vec::new();

        args.push(engine.json.clone());
        if request.concurrency > 1 {
            args.push(engine.threads.clone());
            args.push(request.concurrency.to_string());
        }

        if request.ignore_case {
            args.push(engine.ignore_case.clone());
        } else {
            args.push(engine.smart_case.clone());
        }

        if request.multiline {
            args.push(engine.multiline.clone());
        }
        if request.literal {
            args.push(engine.fixed_strings.clone());
        }

        let include = extension_alternates(&request.include_globs);
        let exclude = extension_alternates(&request.exclude_globs);
        let roots: Vec<String> = request
            .search_roots
            .iter()
            .filter_map(|root| root_glob_prefix(root))
            .collect();

        let mut push_glob = |glob: String| {
            args.push(engine.glob.clone());
            args.push(glob);
        };

        if roots.is_empty() {
            if let Some(include) = &include {
                push_glob(format!("*.{{{}}}", include));
            }
            if let Some(exclude) = &exclude {
                push_glob(format!("!*.{{{}}}", exclude));
            }
        } else {
            let include = include.as_deref().unwrap_or("*");
            for root in &roots {
                push_glob(format!("{}/**/*.{{{}}}", root, include));
            }
            if let Some(exclude) = &exclude {
                for root in &roots {
                    push_glob(format!("!{}/**/*.{{{}}}", root, exclude));
                }
            }
        }

        for pattern in request.patterns() {
            args.push(engine.pattern.clone());
            args.push(pattern.to_string());
        }

        args.extend(request.extra_args.iter().cloned());

        CompiledQuery {
            program: engine.program.clone(),
            args,
        }
    }
}

/// 把可用的扩展名拼成花括号候选列表（`cs,meta`）。
fn extension_alternates(exts: &BTreeSet<String>) -> Option<String> {
    let cleaned: BTreeSet<&str> = exts.iter().filter_map(|ext| clean_extension(ext)).collect();
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned.into_iter().collect::<Vec<_>>().join(","))
}

fn clean_extension(ext: &str) -> Option<&str> {
    let ext = ext.trim();
    let ext = ext
        .strip_prefix("*.")
        .or_else(|| ext.strip_prefix('.'))
        .unwrap_or(ext);
    let malformed = ext.is_empty()
        || ext.chars().any(|c| {
            c.is_whitespace() || matches!(c, ',' | '{' | '}' | '[' | ']' | '*' | '?' | '/' | '\\' | '!')
        });
    if malformed {
        None
    } else {
        Some(ext)
    }
}

/// 把根目录转成字面量 glob 前缀：分隔符统一为 `/`，元字符包进字符类。
/// 开头的 `!` 在 Windows 上无法转义（globset 在 Windows 上不支持反斜杠转义），
/// 这样的根目录直接丢弃。
fn root_glob_prefix(root: &str) -> Option<String> {
    let normalized = root.trim().replace('\\', "/");
    let normalized = normalized.trim_end_matches('/');
    if normalized.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(normalized.len() + 4);
    for (i, c) in normalized.chars().enumerate() {
        match c {
            '!' if i == 0 => {
                if cfg!(windows) {
                    tracing::debug!(root, "root starting with '!' cannot be escaped, dropped");
                    return None;
                }
                out.push_str("\\!");
            }
            '*' | '?' | '[' | ']' | '{' | '}' => {
                out.push('[');
                out.push(c);
                out.push(']');
            }
            _ => out.push(c),
        }
    }
    Some(out)
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '=' | ':' | ',' | '+' | '@' | '%'));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/query.rs"]
mod tests;
