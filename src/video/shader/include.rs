//! `#include` expansion of shader sources.
//!
//! Includes are resolved relative to the directory of the including file first,
//! then relative to a shared directory. The expansion is recursive, a path that
//! is already part of the active include chain is a circular include. A path
//! included twice along different chains is expanded twice.
//!
//! Every line of the flattened source is tracked in a `SourceMap`, so the line
//! numbers reported by native compilers can be mapped back to the files they
//! came from.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::utils::hash::FastHashMap;

use super::super::errors::*;

/// Where the contents of include files come from.
pub trait IncludeSource {
    /// Returns the content of the file at `path`, or `None` if there is no such file.
    fn read(&self, path: &Path) -> Option<String>;
}

/// Reads includes from the file system.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    root: PathBuf,
}

impl FileSystemSource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        FileSystemSource { root: root.into() }
    }
}

impl IncludeSource for FileSystemSource {
    fn read(&self, path: &Path) -> Option<String> {
        fs::read_to_string(self.root.join(path)).ok()
    }
}

/// Serves includes from memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    files: FastHashMap<PathBuf, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        MemorySource::default()
    }

    pub fn insert<P: AsRef<Path>, T: Into<String>>(&mut self, path: P, source: T) {
        self.files.insert(normalize(path.as_ref()), source.into());
    }

    pub fn with<P: AsRef<Path>, T: Into<String>>(mut self, path: P, source: T) -> Self {
        self.insert(path, source);
        self
    }
}

impl IncludeSource for MemorySource {
    fn read(&self, path: &Path) -> Option<String> {
        self.files.get(&normalize(path)).cloned()
    }
}

/// Lexically resolves `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut v = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !v.pop() {
                    v.push("..");
                }
            }
            other => v.push(other.as_os_str()),
        }
    }

    v
}

/// Maps the lines of a flattened source to the files and lines they came from.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SourceMap {
    files: Vec<String>,
    // (file index, 1-based line) per flattened line.
    lines: Vec<(usize, u32)>,
}

impl SourceMap {
    pub fn new() -> Self {
        SourceMap::default()
    }

    fn file(&mut self, name: &str) -> usize {
        match self.files.iter().position(|v| v == name) {
            Some(i) => i,
            None => {
                self.files.push(name.to_owned());
                self.files.len() - 1
            }
        }
    }

    fn push(&mut self, file: usize, line: u32) {
        self.lines.push((file, line));
    }

    /// Declares `count` generated lines starting at the 1-based flattened `line`.
    pub fn insert_generated(&mut self, line: u32, count: u32, name: &str) {
        let file = self.file(name);
        let at = (line.max(1) as usize - 1).min(self.lines.len());
        for i in 0..count {
            self.lines.insert(at + i as usize, (file, i + 1));
        }
    }

    /// The number of flattened lines.
    #[inline]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the file and the 1-based line of a 1-based flattened line.
    pub fn lookup(&self, line: u32) -> Option<(&str, u32)> {
        if line == 0 {
            return None;
        }

        self.lines
            .get(line as usize - 1)
            .map(|&(file, line)| (self.files[file].as_str(), line))
    }

    /// Rewrites the `0:LINE` and `0(LINE)` markers of a native compiler log
    /// into `file:line` and `file(line)`. Unknown lines are left as they are.
    pub fn remap_log(&self, log: &str) -> String {
        let bytes = log.as_bytes();
        let mut out = String::with_capacity(log.len());
        let mut last = 0;
        let mut i = 0;

        while i + 2 < bytes.len() {
            let boundary = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
            let open = bytes[i + 1];

            if bytes[i] == b'0' && boundary && (open == b':' || open == b'(') {
                let start = i + 2;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }

                let closed = open == b':' || (end < bytes.len() && bytes[end] == b')');
                if end > start && closed {
                    let found = log[start..end]
                        .parse::<u32>()
                        .ok()
                        .and_then(|v| self.lookup(v));

                    if let Some((file, line)) = found {
                        out.push_str(&log[last..i]);
                        out.push_str(file);
                        out.push(open as char);
                        out.push_str(&line.to_string());
                        last = end;
                        i = end;
                        continue;
                    }
                }
            }

            i += 1;
        }

        out.push_str(&log[last..]);
        out
    }
}

/// Expands `#include "path"` directives.
pub struct IncludeResolver {
    source: Box<dyn IncludeSource>,
    shared: PathBuf,
}

impl IncludeResolver {
    /// Creates a resolver falling back to the `shared` directory of `source`.
    pub fn new<S, P>(source: S, shared: P) -> Self
    where
        S: IncludeSource + 'static,
        P: Into<PathBuf>,
    {
        IncludeResolver {
            source: Box::new(source),
            shared: shared.into(),
        }
    }

    /// Loads and expands the file at `path`.
    pub fn resolve_file<P: AsRef<Path>>(&self, path: P) -> Result<(String, SourceMap)> {
        let path = normalize(path.as_ref());
        let source = self
            .source
            .read(&path)
            .ok_or_else(|| Error::IncludeNotFound(path.display().to_string()))?;

        self.resolve(&path, &source)
    }

    /// Expands `source`, whose includes are resolved as if it was the file at `path`.
    pub fn resolve<P: AsRef<Path>>(&self, path: P, source: &str) -> Result<(String, SourceMap)> {
        let path = normalize(path.as_ref());
        let mut out = String::with_capacity(source.len());
        let mut map = SourceMap::new();
        let mut chain = Vec::new();

        self.expand(&path, source, &mut chain, &mut out, &mut map)?;
        Ok((out, map))
    }

    fn expand(
        &self,
        path: &Path,
        source: &str,
        chain: &mut Vec<PathBuf>,
        out: &mut String,
        map: &mut SourceMap,
    ) -> Result<()> {
        chain.push(path.to_owned());
        let file = map.file(&path.display().to_string());

        for (i, line) in source.lines().enumerate() {
            let include = match parse_include(line) {
                Some(v) => v,
                None => {
                    out.push_str(line);
                    out.push('\n');
                    map.push(file, i as u32 + 1);
                    continue;
                }
            };

            let (next, content) = self.locate(path, include)?;
            if chain.contains(&next) {
                let mut names: Vec<_> = chain.iter().map(|v| v.display().to_string()).collect();
                names.push(next.display().to_string());
                return Err(Error::CircularInclude(names.join(" -> ")));
            }

            self.expand(&next, &content, chain, out, map)?;
        }

        chain.pop();
        Ok(())
    }

    fn locate(&self, includer: &Path, include: &str) -> Result<(PathBuf, String)> {
        let dir = includer.parent().unwrap_or_else(|| Path::new(""));

        for base in &[dir, self.shared.as_path()] {
            let path = normalize(&base.join(include));
            if let Some(content) = self.source.read(&path) {
                return Ok((path, content));
            }
        }

        Err(Error::IncludeNotFound(format!(
            "{} (included by {})",
            include,
            includer.display()
        )))
    }
}

/// Parses `#include "path"` or `#include <path>`.
fn parse_include(line: &str) -> Option<&str> {
    let line = line.trim();
    if !line.starts_with('#') {
        return None;
    }

    let rest = line[1..].trim_start();
    if !rest.starts_with("include") {
        return None;
    }

    let rest = rest["include".len()..].trim();
    let (open, close) = match rest.chars().next() {
        Some('"') => ('"', '"'),
        Some('<') => ('<', '>'),
        _ => return None,
    };

    let inner = &rest[open.len_utf8()..];
    inner.find(close).map(|end| &inner[..end])
}

/// Inserts a `#define` per keyword after a leading `#version` line, or at the
/// top if there is none. The map is shifted by the generated lines.
pub fn inject_defines<'a, I>(source: &str, keywords: I, map: &mut SourceMap) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let defines: Vec<String> = keywords
        .into_iter()
        .map(|v| format!("#define {}", v))
        .collect();

    if defines.is_empty() {
        return source.to_owned();
    }

    let mut lines: Vec<&str> = source.lines().collect();
    let at = lines
        .iter()
        .position(|v| !v.trim().is_empty())
        .filter(|&i| lines[i].trim_start().starts_with("#version"))
        .map_or(0, |i| i + 1);

    map.insert_generated(at as u32 + 1, defines.len() as u32, "<keywords>");

    let tail = lines.split_off(at);
    let mut out = String::with_capacity(source.len() + defines.len() * 16);
    for v in lines.iter().map(|v| *v).chain(defines.iter().map(|v| v.as_str())).chain(tail) {
        out.push_str(v);
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn include_directive() {
        assert_eq!(parse_include("#include \"a.glsl\""), Some("a.glsl"));
        assert_eq!(parse_include("  # include <lib/b.glsl> "), Some("lib/b.glsl"));
        assert_eq!(parse_include("#includes \"a\""), None);
        assert_eq!(parse_include("// #include \"a\""), None);
    }

    #[test]
    fn normalize_paths() {
        assert_eq!(normalize(Path::new("a/./b/../c.glsl")), PathBuf::from("a/c.glsl"));
        assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
    }

    #[test]
    fn relative_then_shared() {
        let source = MemorySource::new()
            .with("shaders/lit.glsl", "#include \"common.glsl\"\nvoid main() {}")
            .with("shaders/common.glsl", "#include \"math.glsl\"\nfloat common;")
            .with("shared/math.glsl", "float pi;");

        let resolver = IncludeResolver::new(source, "shared");
        let (out, map) = resolver.resolve_file("shaders/lit.glsl").unwrap();

        assert_eq!(out, "float pi;\nfloat common;\nvoid main() {}\n");
        assert_eq!(map.lookup(1), Some(("shared/math.glsl", 1)));
        assert_eq!(map.lookup(2), Some(("shaders/common.glsl", 2)));
        assert_eq!(map.lookup(3), Some(("shaders/lit.glsl", 2)));
        assert_eq!(map.lookup(4), None);
    }

    #[test]
    fn defines_after_version() {
        let mut map = SourceMap::new();
        let file = map.file("a.glsl");
        map.push(file, 1);
        map.push(file, 2);

        let out = inject_defines("#version 330\nvoid main() {}", vec!["FOG", "SHADOWS"], &mut map);
        assert_eq!(out, "#version 330\n#define FOG\n#define SHADOWS\nvoid main() {}\n");
        assert_eq!(map.lookup(1), Some(("a.glsl", 1)));
        assert_eq!(map.lookup(3), Some(("<keywords>", 2)));
        assert_eq!(map.lookup(4), Some(("a.glsl", 2)));

        let out = inject_defines("void main() {}", vec!["FOG"], &mut SourceMap::new());
        assert_eq!(out, "#define FOG\nvoid main() {}\n");
    }

    #[test]
    fn remap() {
        let mut map = SourceMap::new();
        let a = map.file("a.glsl");
        let b = map.file("b.glsl");
        map.push(a, 1);
        map.push(b, 7);

        assert_eq!(
            map.remap_log("ERROR: 0:2: 'x' : undeclared\n0(1) : error C0000"),
            "ERROR: b.glsl:7: 'x' : undeclared\na.glsl(1) : error C0000"
        );

        assert_eq!(map.remap_log("ERROR: 0:9: oops 10:1"), "ERROR: 0:9: oops 10:1");
    }
}
