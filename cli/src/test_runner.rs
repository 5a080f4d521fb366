use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use cardmark::query::collect_diagnostics;
use codespan_reporting::term::termcolor::{
    Color, ColorChoice, ColorSpec, NoColor, StandardStream, WriteColor,
};
use navigator::{Event, Navigator, NavigatorConfig, RenderModel};
use serde::Deserialize;

use crate::terminal;

/// Width used when painting cards for `expect_text`.
const TEXT_WIDTH: usize = 80;

#[derive(Debug, Deserialize)]
pub struct ExpectedDiagnostic {
    /// Substring that must appear in the diagnostic message.
    pub contains: String,

    /// If set, the diagnostic must be on this 1-based source line.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Label selected on load. Defaults to "The beginning".
    #[serde(default)]
    pub entry: Option<String>,

    /// Links to follow in order. Each must be a link target on the card
    /// shown at that point.
    #[serde(default)]
    pub follow: Vec<String>,

    /// Expected heading of the final card.
    #[serde(default)]
    pub expect_section: Option<String>,

    /// If true, the final card must be the "no section" placeholder.
    #[serde(default)]
    pub expect_placeholder: bool,

    /// Expected link targets of the final card, in order.
    #[serde(default)]
    pub expect_links: Option<Vec<String>>,

    /// Substrings that must appear in the painted final card.
    #[serde(default)]
    pub expect_text: Vec<String>,

    /// Expected parse diagnostics for the whole document. If present (even
    /// empty), count and content are checked.
    #[serde(default)]
    pub expect_diagnostics: Option<Vec<ExpectedDiagnostic>>,
}

/// Split a `.test.md` file into its frontmatter and body.
fn split_frontmatter(content: &str) -> Result<(&str, &str), String> {
    let content = content.trim_start_matches('\u{feff}');
    let rest = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let close = rest
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;
    let frontmatter = rest[..close].trim_end_matches('\r');
    let body = &rest[close + "\n---".len()..];
    let body = body
        .strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(body);
    Ok((frontmatter, body))
}

fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let (frontmatter, body) = split_frontmatter(content)?;
    let config: TestConfig =
        toml::from_str(frontmatter).map_err(|e| format!("TOML parse error: {}", e))?;
    Ok((config, body))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    /// The description, or the file stem when there is none.
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("cannot read file: {}", e)),
            };
        }
    };

    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("frontmatter error: {}", e)),
            };
        }
    };

    let description = config.description.clone();
    let outcome = match check_scenario(&config, source) {
        Some(reason) => TestOutcome::Fail(reason),
        None => TestOutcome::Pass,
    };

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome,
    }
}

/// Load, follow and check one scenario. Returns `Some(reason)` on mismatch.
fn check_scenario(config: &TestConfig, source: &str) -> Option<String> {
    let mut nav_config = NavigatorConfig::default();
    if let Some(entry) = &config.entry {
        nav_config.default_label = entry.clone();
    }
    let mut navigator = Navigator::from_source(source, nav_config);

    if let Some(expected) = &config.expect_diagnostics {
        if let Some(reason) = check_diagnostics(&navigator, expected) {
            return Some(reason);
        }
    }

    for (step, target) in config.follow.iter().enumerate() {
        let model = navigator.render();
        let Some(link) = model.links().into_iter().find(|link| &link.target == target) else {
            return Some(format!(
                "follow[{}]: no link to \"{}\" on card {}\n  links: {:?}",
                step,
                target,
                card_title(&model),
                link_targets(&model)
            ));
        };
        navigator.dispatch(link.activate());
    }

    let model = navigator.render();

    if config.expect_placeholder && !model.is_placeholder() {
        return Some(format!(
            "expected the placeholder, got card {}",
            card_title(&model)
        ));
    }

    if let Some(expected) = &config.expect_section {
        let actual = model.heading.as_ref().map(|heading| heading.text.as_str());
        if actual != Some(expected.as_str()) {
            return Some(format!(
                "section mismatch\n  expected: {}\n  actual:   {}",
                expected,
                card_title(&model)
            ));
        }
    }

    if let Some(expected) = &config.expect_links {
        let actual = link_targets(&model);
        if &actual != expected {
            return Some(format!(
                "links mismatch\n  expected: {:?}\n  actual:   {:?}",
                expected, actual
            ));
        }
    }

    if !config.expect_text.is_empty() {
        let text = match painted(&model) {
            Ok(text) => text,
            Err(e) => return Some(format!("cannot paint card: {}", e)),
        };
        for wanted in &config.expect_text {
            if !text.contains(wanted.as_str()) {
                return Some(format!(
                    "expected text containing \"{}\", got:\n{}",
                    wanted,
                    text.trim_end()
                ));
            }
        }
    }

    None
}

fn card_title(model: &RenderModel) -> String {
    match &model.heading {
        Some(heading) => format!("\"{}\"", heading.text),
        None => "(no section)".to_string(),
    }
}

fn link_targets(model: &RenderModel) -> Vec<String> {
    model
        .links()
        .into_iter()
        .map(|link| link.target.clone())
        .collect()
}

fn painted(model: &RenderModel) -> io::Result<String> {
    let mut out = NoColor::new(Vec::new());
    terminal::paint(&mut out, model, TEXT_WIDTH)?;
    Ok(String::from_utf8_lossy(&out.into_inner()).into_owned())
}

/// Check that the document's diagnostics match expectations.
fn check_diagnostics(navigator: &Navigator, expected: &[ExpectedDiagnostic]) -> Option<String> {
    let actual = collect_diagnostics(navigator.document());

    if actual.len() != expected.len() {
        let actual_msgs: Vec<String> = actual
            .iter()
            .map(|d| format!("  - line {}: {}", d.location.line, d.message))
            .collect();
        return Some(format!(
            "expected {} diagnostic(s), got {}\n  actual diagnostics:\n{}",
            expected.len(),
            actual.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in actual.iter().zip(expected.iter()).enumerate() {
        if !actual.message.contains(&expected.contains) {
            return Some(format!(
                "diagnostic[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, actual.message
            ));
        }

        if let Some(expected_line) = expected.line {
            if actual.location.line != expected_line {
                return Some(format!(
                    "diagnostic[{}]: expected on line {}, but it is on line {}",
                    i, expected_line, actual.location.line
                ));
            }
        }
    }

    None
}

/// Discover `.test.md` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
/// Returns a BTreeMap so categories are sorted alphabetically.
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    // Sort files within each category
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(".test.md") {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(cat), files.len());
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// Keep the categories named in `requested`, including their subfolders.
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a [PathBuf]> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
    }

    let mut selected = BTreeMap::new();
    for requested in requested {
        let req = requested.trim_matches('/');
        let before = selected.len();
        for (cat, files) in all {
            if cat == req || cat.starts_with(&format!("{}/", req)) {
                selected.insert(cat.as_str(), files.as_slice());
            }
        }
        if selected.len() == before {
            log::warn!(
                "category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    selected
}

/// Colored status words for the run summary.
struct Report {
    out: StandardStream,
}

impl Report {
    fn new(no_color: bool) -> Self {
        let choice = if no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Report {
            out: StandardStream::stderr(choice),
        }
    }

    fn colored(&mut self, color: Option<Color>, bold: bool, text: &str) -> io::Result<()> {
        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);
        self.out.set_color(&spec)?;
        write!(self.out, "{}", text)?;
        self.out.reset()
    }

    fn header(&mut self, category: &str) -> io::Result<()> {
        writeln!(self.out)?;
        self.colored(None, true, category_label(category))?;
        writeln!(self.out)
    }

    fn result(&mut self, result: &TestResult) -> io::Result<()> {
        write!(self.out, "  ")?;
        match result.outcome {
            TestOutcome::Pass => self.colored(Some(Color::Green), false, "PASS")?,
            TestOutcome::Fail(_) => self.colored(Some(Color::Red), false, "FAIL")?,
        }
        writeln!(self.out, "  {}", result.label())
    }

    fn failures(&mut self, failures: &[TestResult]) -> io::Result<()> {
        if failures.is_empty() {
            return Ok(());
        }
        writeln!(self.out)?;
        writeln!(self.out, "failures:")?;
        for failure in failures {
            writeln!(self.out)?;
            writeln!(self.out, "  --- {} ---", failure.path.display())?;
            if let TestOutcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    writeln!(self.out, "  {}", line)?;
                }
            }
        }
        Ok(())
    }

    fn summary(&mut self, passed: usize, failed: usize) -> io::Result<()> {
        writeln!(self.out)?;
        write!(self.out, "test result: ")?;
        if failed == 0 {
            self.colored(Some(Color::Green), false, "ok")?;
            writeln!(self.out, ". {} passed, 0 failed", passed)
        } else {
            self.colored(Some(Color::Red), false, "FAILED")?;
            writeln!(
                self.out,
                ". {} passed, {} failed (of {})",
                passed,
                failed,
                passed + failed
            )
        }
    }
}

/// Run all `.test.md` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> io::Result<i32> {
    let all = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        discover_categorized(path)
    };
    if all.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return Ok(1);
    }

    let selected = select_categories(&all, categories);
    if selected.is_empty() {
        eprintln!("no matching categories found");
        return Ok(1);
    }

    let mut report = Report::new(no_color);
    let mut passed = 0usize;
    let mut failures = Vec::new();

    for (category, files) in &selected {
        if !path.is_file() {
            report.header(category)?;
        }
        for file in *files {
            let result = run_single_test(file);
            report.result(&result)?;
            if matches!(result.outcome, TestOutcome::Pass) {
                passed += 1;
            } else {
                failures.push(result);
            }
        }
    }

    report.failures(&failures)?;
    report.summary(passed, failures.len())?;
    Ok(if failures.is_empty() { 0 } else { 1 })
}
