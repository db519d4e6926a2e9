use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// Only the crate's own sources are policed; everything else in the tree is foreign.
const SOURCE_ROOTS: [&str; 3] = ["score", "src", "tests"];

// Collects every matching line of one file so the report can list them all at once.
struct ViolationCollector {
    violations: Vec<String>,
    file_path: PathBuf,
    skip_comments: bool,
}

impl ViolationCollector {
    fn new(file_path: &Path, skip_comments: bool) -> Self {
        Self {
            violations: Vec::new(),
            file_path: file_path.to_path_buf(),
            skip_comments,
        }
    }

    fn check_and_get_error_message(&self, what: &str, advice: &str) -> Option<String> {
        if self.violations.is_empty() {
            return None;
        }

        let file_name = self.file_path.to_str().unwrap_or("?");
        let mut error_msg = format!(
            "\n❌ ERROR: Found {} {} in {}:\n",
            self.violations.len(),
            what,
            file_name
        );
        for violation in &self.violations {
            error_msg.push_str(&format!("   {violation}\n"));
        }
        error_msg.push_str(&format!("\n⚠️ {what} are STRICTLY FORBIDDEN in this project.\n"));
        error_msg.push_str(&format!("   {advice}\n"));
        Some(error_msg)
    }
}

impl Sink for ViolationCollector {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();

        if self.skip_comments && line_text.trim_start().starts_with("//") {
            return Ok(true);
        }

        self.violations.push(format!("{line_number}:{line_text}"));
        Ok(true)
    }
}

fn rust_sources() -> impl Iterator<Item = PathBuf> {
    SOURCE_ROOTS.into_iter().flat_map(|root| {
        WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
            .map(|e| e.into_path())
    })
}

fn scan(
    pattern: &str,
    skip_comments: bool,
    what: &str,
    advice: &str,
) -> Result<(), Box<dyn Error>> {
    let matcher = RegexMatcher::new_line_matcher(pattern)?;
    let mut searcher = Searcher::new();

    for path in rust_sources() {
        let mut collector = ViolationCollector::new(&path, skip_comments);
        searcher.search_path(&matcher, &path, &mut collector)?;

        if let Some(error_message) = collector.check_and_get_error_message(what, advice) {
            return Err(error_message.into());
        }
    }
    Ok(())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for root in SOURCE_ROOTS {
        println!("cargo:rerun-if-changed={root}");
    }

    let checks = [
        (
            r"(\blet\s+(mut\s+)?|[(,|]\s*)_[a-zA-Z][a-zA-Z0-9_]*\s*[:=,)|]",
            true,
            "underscore-prefixed bindings",
            "Either use the variable or remove it completely. Underscore prefixes are NOT allowed.",
        ),
        (
            r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]",
            false,
            "#[allow(dead_code)] attributes",
            "Either use the code (removing the attribute) or remove it completely.",
        ),
    ];

    for (pattern, skip_comments, what, advice) in checks {
        if let Err(e) = scan(pattern, skip_comments, what, advice) {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
