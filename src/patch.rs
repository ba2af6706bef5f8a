//! Attribute rewriting for report designs
//!
//! Copies a design line by line, replacing the value of every
//! `attribute="..."` occurrence on lines that mention the attribute.
//! Lines are handled as raw bytes, so designs in any ASCII-compatible
//! encoding pass through unchanged apart from the rewritten values.
//! Output lines are always terminated with `\n`.

use crate::error::{Error, Result};
use regex::bytes::{NoExpand, Regex};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::trace;

/// Substitution rule: attribute name and its new value
#[derive(Debug, Clone)]
pub struct AttributeRule {
    attribute: String,
    pattern: Regex,
    replacement: String,
}

/// Line counts of one patched file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    pub lines: usize,
    pub rewritten: usize,
}

impl AttributeRule {
    pub fn new(attribute: &str, value: &str) -> Result<Self> {
        if attribute.is_empty() {
            return Err(Error::Config("attribute name must not be empty".into()));
        }
        // Any byte may appear in the old value, not only valid UTF-8
        let pattern = Regex::new(&format!(r#"{}="(?-u:[^"])*""#, regex::escape(attribute)))?;
        Ok(Self {
            attribute: attribute.to_string(),
            pattern,
            replacement: format!(r#"{}="{}""#, attribute, value),
        })
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Rewrite one line (without its terminator)
    pub fn patch_line<'a>(&self, line: &'a [u8]) -> Cow<'a, [u8]> {
        self.pattern.replace_all(line, NoExpand(self.replacement.as_bytes()))
    }

    /// Copy `source` to `dest`, rewriting attribute values
    ///
    /// Errors carry the path that failed: the source for read failures,
    /// the destination for write failures.
    pub fn patch_file(&self, source: &Path, dest: &Path) -> Result<PatchStats> {
        let patch_err = |path: &Path| {
            let path = path.to_path_buf();
            move |e: std::io::Error| Error::Patch { path, source: e }
        };

        let mut reader = BufReader::new(File::open(source).map_err(patch_err(source))?);
        let mut writer = BufWriter::new(File::create(dest).map_err(patch_err(dest))?);

        let mut stats = PatchStats::default();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).map_err(patch_err(source))? == 0 {
                break;
            }
            let line = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
            let line = line.strip_suffix(b"\r").unwrap_or(line);

            let patched = self.patch_line(line);
            if let Cow::Owned(_) = patched {
                stats.rewritten += 1;
            }
            writer
                .write_all(&patched)
                .and_then(|_| writer.write_all(b"\n"))
                .map_err(patch_err(dest))?;
            stats.lines += 1;
        }
        writer.flush().map_err(patch_err(dest))?;

        trace!(
            source = %source.display(),
            dest = %dest.display(),
            lines = stats.lines,
            rewritten = stats.rewritten,
            "Patched design"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn patch(rule: &AttributeRule, line: &str) -> String {
        String::from_utf8(rule.patch_line(line.as_bytes()).into_owned()).unwrap()
    }

    #[test]
    fn test_patch_line_rewrites_value() {
        let rule = AttributeRule::new("fontName", "mbc").unwrap();
        assert_eq!(patch(&rule, r#"fontName="Arial""#), r#"fontName="mbc""#);
        assert_eq!(
            patch(&rule, r#"<font fontName="Arial" size="10"/>"#),
            r#"<font fontName="mbc" size="10"/>"#
        );
    }

    #[test]
    fn test_patch_line_all_occurrences() {
        let rule = AttributeRule::new("fontName", "mbc").unwrap();
        assert_eq!(
            patch(&rule, r#"<a fontName="A"/><b fontName=""/>"#),
            r#"<a fontName="mbc"/><b fontName="mbc"/>"#
        );
    }

    #[test]
    fn test_patch_line_untouched_without_attribute() {
        let rule = AttributeRule::new("fontName", "mbc").unwrap();
        let line = r#"<textField isBlankWhenNull="true">"#;
        assert!(matches!(rule.patch_line(line.as_bytes()), Cow::Borrowed(_)));
        // Mentions the name but has no quoted value
        assert_eq!(patch(&rule, "<!-- fontName -->"), "<!-- fontName -->");
    }

    #[test]
    fn test_replacement_is_literal() {
        let rule = AttributeRule::new("fontName", "$1 Sans").unwrap();
        assert_eq!(patch(&rule, r#"fontName="x""#), r#"fontName="$1 Sans""#);
    }

    #[test]
    fn test_attribute_name_is_escaped() {
        let rule = AttributeRule::new("pdf.fontName", "mbc").unwrap();
        assert_eq!(patch(&rule, r#"pdfXfontName="x""#), r#"pdfXfontName="x""#);
        assert_eq!(patch(&rule, r#"pdf.fontName="x""#), r#"pdf.fontName="mbc""#);
    }

    #[test]
    fn test_empty_attribute_rejected() {
        assert!(AttributeRule::new("", "mbc").is_err());
    }

    #[test]
    fn test_patch_file_normalizes_line_endings() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("report.jrxml");
        let dest = dir.path().join("report_temp_changed.jrxml");
        fs::write(
            &source,
            "<jasperReport>\r\n<font fontName=\"Arial\"/>\r\n</jasperReport>",
        )
        .unwrap();

        let rule = AttributeRule::new("fontName", "mbc").unwrap();
        let stats = rule.patch_file(&source, &dest).unwrap();

        assert_eq!(stats, PatchStats { lines: 3, rewritten: 1 });
        assert_eq!(
            fs::read_to_string(&dest).unwrap(),
            "<jasperReport>\n<font fontName=\"mbc\"/>\n</jasperReport>\n"
        );
        // Source is never modified
        assert!(fs::read_to_string(&source).unwrap().contains("Arial"));
    }

    #[test]
    fn test_patch_file_keeps_non_utf8_bytes() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("latin1.jrxml");
        let dest = dir.path().join("latin1_temp_changed.jrxml");
        fs::write(&source, b"<text>Caf\xE9</text>\r\n<font fontName=\"Ar\xEFal\"/>\n").unwrap();

        let rule = AttributeRule::new("fontName", "mbc").unwrap();
        let stats = rule.patch_file(&source, &dest).unwrap();

        assert_eq!(stats, PatchStats { lines: 2, rewritten: 1 });
        assert_eq!(
            fs::read(&dest).unwrap(),
            b"<text>Caf\xE9</text>\n<font fontName=\"mbc\"/>\n"
        );
    }

    #[test]
    fn test_patch_file_idempotent() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.jrxml");
        let dest = dir.path().join("b.jrxml");
        let content = "<jasperReport>\n  <font fontName=\"mbc\"/>\n</jasperReport>\n";
        fs::write(&source, content).unwrap();

        AttributeRule::new("fontName", "mbc")
            .unwrap()
            .patch_file(&source, &dest)
            .unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), content);
    }

    #[test]
    fn test_patch_file_missing_source() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("missing.jrxml");
        let dest = dir.path().join("out.jrxml");

        let err = AttributeRule::new("fontName", "mbc")
            .unwrap()
            .patch_file(&source, &dest)
            .unwrap_err();
        match err {
            Error::Patch { path, .. } => assert_eq!(path, source),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_patch_file_unwritable_dest() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.jrxml");
        fs::write(&source, "x\n").unwrap();
        let dest = dir.path().join("no_such_dir").join("a.jrxml");

        let err = AttributeRule::new("fontName", "mbc")
            .unwrap()
            .patch_file(&source, &dest)
            .unwrap_err();
        match err {
            Error::Patch { path, .. } => assert_eq!(path, dest),
            other => panic!("unexpected error: {other}"),
        }
    }
}
