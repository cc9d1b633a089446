//! Positional path and version templates.
//!
//! Templates use `{n}` placeholders, optionally with an alignment
//! (`{n,8}` / `{n,-8}`) and a format (`{n:D4}`, `{n:X}`, `{n:000}`).
//! Literal braces are written `{{` and `}}`.
//!
//! Resolution never fails loudly: any malformed template, out-of-range
//! placeholder or unsupported format yields [`INVALID_PATH`], which callers
//! must treat as "do not use".

use std::sync::LazyLock;

use regex::Regex;

use crate::preset::BuildPreset;

/// Sentinel returned for any template that cannot be resolved.
pub const INVALID_PATH: &str = "invalid path";

/// A value substituted into a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateArg {
    Text(String),
    Number(u64),
}

impl From<&str> for TemplateArg {
    fn from(v: &str) -> Self {
        TemplateArg::Text(v.to_string())
    }
}

impl From<String> for TemplateArg {
    fn from(v: String) -> Self {
        TemplateArg::Text(v)
    }
}

impl From<u64> for TemplateArg {
    fn from(v: u64) -> Self {
        TemplateArg::Number(v)
    }
}

/// Substitutes positional placeholders in `template`.
///
/// Returns [`INVALID_PATH`] on any formatting failure.
pub fn resolve(template: &str, args: &[TemplateArg]) -> String {
    try_resolve(template, args).unwrap_or_else(|| INVALID_PATH.to_string())
}

/// Output path for `preset` given the current version and build number.
pub fn build_path(preset: &BuildPreset, version: &str, build_number: u64) -> String {
    resolve(
        &preset.build_path_template,
        &[
            version.into(),
            preset.platform.file_extension().into(),
            build_number.into(),
        ],
    )
}

/// Archive path for `preset` given the current version and build number.
pub fn compressed_path(preset: &BuildPreset, version: &str, build_number: u64) -> String {
    resolve(
        &preset.compress_file_path_template,
        &[
            version.into(),
            preset.platform.file_extension().into(),
            build_number.into(),
            preset.platform.archive_extension().into(),
        ],
    )
}

/// Version string for `preset` derived from the project's base version.
pub fn version_string(preset: &BuildPreset, base_version: &str, build_number: u64) -> String {
    resolve(
        &preset.version_number_template,
        &[base_version.into(), build_number.into()],
    )
}

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("digit pattern is valid"));

/// Adds `by` to the last run of decimal digits in `s`.
///
/// `"1.2.9"` incremented by one becomes `"1.2.10"`. Strings without
/// digits, or whose last run does not fit a `u64`, are returned unchanged.
pub fn increment_last_integer(s: &str, by: i64) -> String {
    let Some(m) = DIGITS.find_iter(s).last() else {
        return s.to_string();
    };
    let Ok(value) = m.as_str().parse::<u64>() else {
        return s.to_string();
    };
    let Some(next) = value.checked_add_signed(by) else {
        return s.to_string();
    };
    format!("{}{}{}", &s[..m.start()], next, &s[m.end()..])
}

fn try_resolve(template: &str, args: &[TemplateArg]) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut item = String::new();
                loop {
                    match chars.next()? {
                        '}' => break,
                        '{' => return None,
                        other => item.push(other),
                    }
                }
                out.push_str(&format_item(&item, args)?);
            }
            '}' => {
                if chars.next() != Some('}') {
                    return None;
                }
                out.push('}');
            }
            other => out.push(other),
        }
    }

    Some(out)
}

/// Formats one `index[,alignment][:format]` item.
fn format_item(item: &str, args: &[TemplateArg]) -> Option<String> {
    let (head, format) = match item.split_once(':') {
        Some((head, format)) => (head, Some(format)),
        None => (item, None),
    };
    let (index, alignment) = match head.split_once(',') {
        Some((index, alignment)) => (index, Some(alignment.trim().parse::<i32>().ok()?)),
        None => (head, None),
    };

    let index = index.trim();
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let arg = args.get(index.parse::<usize>().ok()?)?;

    let text = match arg {
        TemplateArg::Text(s) => s.clone(),
        TemplateArg::Number(n) => format_number(*n, format.unwrap_or(""))?,
    };

    Some(match alignment {
        Some(width) if width >= 0 => format!("{text:>w$}", w = width as usize),
        Some(width) => format!("{text:<w$}", w = width.unsigned_abs() as usize),
        None => text,
    })
}

fn format_number(n: u64, format: &str) -> Option<String> {
    if format.is_empty() {
        return Some(n.to_string());
    }
    if format.bytes().all(|b| b == b'0') {
        return Some(format!("{n:0w$}", w = format.len()));
    }

    let (kind, width) = format.split_at(1);
    let width = if width.is_empty() {
        0
    } else {
        width.parse::<usize>().ok()?
    };
    match kind {
        "D" | "d" => Some(format!("{n:0width$}")),
        "X" => Some(format!("{n:0width$X}")),
        "x" => Some(format!("{n:0width$x}")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::BuildingPlatform;

    fn args(values: &[&str]) -> Vec<TemplateArg> {
        values.iter().map(|v| TemplateArg::from(*v)).collect()
    }

    #[test]
    fn substitutes_every_placeholder() {
        let out = resolve("Builds/{0}/{1}-{0}", &args(&["1.2", "game"]));
        assert_eq!(out, "Builds/1.2/game-1.2");
        assert!(!out.contains('{'));
    }

    #[test]
    fn placeholder_beyond_args_is_invalid() {
        assert_eq!(resolve("Builds/{3}", &args(&["a", "b"])), INVALID_PATH);
    }

    #[test]
    fn unused_args_are_fine() {
        assert_eq!(resolve("static", &args(&["a", "b"])), "static");
    }

    #[test]
    fn malformed_templates_are_invalid() {
        for t in ["{0", "0}", "{}", "{a}", "{0{1}}", "{-1}", "{0,x}"] {
            assert_eq!(resolve(t, &args(&["v", "w"])), INVALID_PATH, "template {t}");
        }
    }

    #[test]
    fn escaped_braces() {
        assert_eq!(resolve("{{{0}}}", &args(&["v"])), "{v}");
    }

    #[test]
    fn number_formats() {
        let n = [TemplateArg::Number(42)];
        assert_eq!(resolve("{0:D5}", &n), "00042");
        assert_eq!(resolve("{0:000}", &n), "042");
        assert_eq!(resolve("{0:X}", &n), "2A");
        assert_eq!(resolve("{0,4}", &n), "  42");
        assert_eq!(resolve("{0,-4}|", &n), "42  |");
        assert_eq!(resolve("{0:Q}", &n), INVALID_PATH);
    }

    #[test]
    fn build_path_uses_platform_extension() {
        let mut preset = BuildPreset::new("p", BuildingPlatform::Windows);
        preset.build_path_template = "Builds/{0}/app{1}".into();
        assert_eq!(build_path(&preset, "1.2", 7), "Builds/1.2/app.exe");

        preset.platform = BuildingPlatform::Linux;
        assert_eq!(build_path(&preset, "1.2", 7), "Builds/1.2/app");

        preset.platform = BuildingPlatform::Android;
        preset.build_path_template = "out/{2}/game{1}".into();
        assert_eq!(build_path(&preset, "1.2", 7), "out/7/game.apk");
    }

    #[test]
    fn compressed_path_and_version() {
        let mut preset = BuildPreset::new("p", BuildingPlatform::WindowsServer);
        preset.compress_file_path_template = "Zips/server-{0}-b{2}{3}".into();
        assert_eq!(compressed_path(&preset, "2.0", 12), "Zips/server-2.0-b12.zip");

        preset.version_number_template = "{0}.{1}".into();
        assert_eq!(version_string(&preset, "2.0", 12), "2.0.12");

        preset.version_number_template = "{0}.{2}".into();
        assert_eq!(version_string(&preset, "2.0", 12), INVALID_PATH);
    }

    #[test]
    fn increments_last_integer() {
        assert_eq!(increment_last_integer("1.2.9", 1), "1.2.10");
        assert_eq!(increment_last_integer("v10-beta3", 2), "v10-beta5");
        assert_eq!(increment_last_integer("1.0", -1), "1.0");
        assert_eq!(increment_last_integer("1.5", -2), "1.3");
        assert_eq!(increment_last_integer("release", 1), "release");
    }
}
