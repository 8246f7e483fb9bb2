//! Source/test counterpart mapping.
//! 原始碼與測試檔之間的對應規則。
//!
//! The rule works on path components, never on raw strings, so a directory
//! such as `test_utils` is not mistaken for the `test` segment. Only the
//! directory part of a path is searched for segments; the file name is only
//! ever rewritten for its suffix.
//!
//! The mapping is not a true involution. Applying it twice returns the
//! original path only when that path holds exactly one marker segment and its
//! file stem carries the suffix marker nowhere else. A path holding both
//! markers (`src/pkg/test/foo.clj`) always maps through the test segment.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use crate::config::CounterpartRules;

/// Which way a counterpart mapping goes.
/// 對應方向：測試檔轉原始碼，或原始碼轉測試檔。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CounterpartDirection {
    TestToSource,
    SourceToTest,
}

/// Reports which direction `to_counterpart` would take for `path`.
/// 判斷 `to_counterpart` 會採用的對應方向。
pub fn classify(path: &Path, rules: &CounterpartRules) -> Option<CounterpartDirection> {
    plan(path, rules).map(|(direction, _)| direction)
}

/// Maps a source file to its test file or a test file to its source file.
/// 將原始碼檔對應到測試檔，或反之。
///
/// Returns `None` when no directory segment matches either marker, when the
/// path has no file name, or when the file name is not valid UTF-8.
pub fn to_counterpart(path: &Path, rules: &CounterpartRules) -> Option<PathBuf> {
    let (direction, index) = plan(path, rules)?;
    let file_name = path.file_name()?.to_str()?;
    let parent = path.parent()?;

    let (segment, new_name) = match direction {
        CounterpartDirection::TestToSource => (
            rules.src_segment.as_str(),
            strip_suffix(file_name, &rules.test_suffix),
        ),
        CounterpartDirection::SourceToTest => (
            rules.test_segment.as_str(),
            insert_suffix(file_name, &rules.test_suffix),
        ),
    };

    let mut rebuilt: PathBuf = parent
        .components()
        .enumerate()
        .map(|(position, component)| {
            if position == index {
                OsStr::new(segment)
            } else {
                component.as_os_str()
            }
        })
        .collect();
    rebuilt.push(new_name);
    Some(rebuilt)
}

fn plan(path: &Path, rules: &CounterpartRules) -> Option<(CounterpartDirection, usize)> {
    path.file_name()?;
    let parent = path.parent()?;
    if let Some(index) = find_segment(parent, &rules.test_segment) {
        return Some((CounterpartDirection::TestToSource, index));
    }
    find_segment(parent, &rules.src_segment)
        .map(|index| (CounterpartDirection::SourceToTest, index))
}

fn find_segment(dir: &Path, segment: &str) -> Option<usize> {
    dir.components().position(|component| match component {
        Component::Normal(name) => name == OsStr::new(segment),
        _ => false,
    })
}

fn split_extension(file_name: &str) -> (&str, Option<&str>) {
    // Leading dots belong to the stem (".env" has no extension).
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => (&file_name[..dot], Some(&file_name[dot + 1..])),
        _ => (file_name, None),
    }
}

fn join_extension(stem: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}

fn strip_suffix(file_name: &str, suffix: &str) -> String {
    let (stem, extension) = split_extension(file_name);
    match stem.strip_suffix(suffix) {
        Some(base) if !base.is_empty() => join_extension(base, extension),
        _ => file_name.to_string(),
    }
}

fn insert_suffix(file_name: &str, suffix: &str) -> String {
    let (stem, extension) = split_extension(file_name);
    join_extension(&format!("{stem}{suffix}"), extension)
}
