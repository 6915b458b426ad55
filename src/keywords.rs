use anyhow::{bail, Context, Result};
use serde::de::Deserializer;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::path::Path;
use tracing::warn;

use crate::models::KeywordTarget;
use crate::table::OrderedMapVisitor;

/// The keywords and variant lists tracked when no file is given.
pub fn default_targets() -> Vec<KeywordTarget> {
    vec![
        KeywordTarget::new("Pdf", &["PDF", "pdf", "Pdf"]),
        KeywordTarget::new("ar", &["ar", "AR", "Ar", "aR"]),
        KeywordTarget::new("WiFi", &["WiFi", "wifi", "WIFI", "Wifi", "WIfi"]),
        KeywordTarget::new("sI", &["SI", "si", "Si"]),
        KeywordTarget::new("DOOM", &["doom", "Doom", "DOOM"]),
        KeywordTarget::new("Acc线", &["acc线", "ACC线", "Acc线"]),
        KeywordTarget::new("CIPA", &["CIPA", "cipa", "CiPA"]),
        KeywordTarget::new("SP", &["SP", "sp", "Sp"]),
        KeywordTarget::new(
            "hellokittyT恤",
            &["hellokittyt恤", "HELLOKITTYT恤", "HellokittyT恤", "hellokittyT恤"],
        ),
        KeywordTarget::new("pnc", &["PNC", "PnC", "pnc"]),
    ]
}

/// Keywords from a tab-separated file: header skipped, blank lines skipped,
/// first column kept. Every keyword runs in discovery mode.
pub fn parse_keyword_tsv(contents: &str) -> Vec<KeywordTarget> {
    contents
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| line.split('\t').next())
        .map(|kw| kw.trim_end_matches('\r'))
        .filter(|kw| !kw.is_empty())
        .map(KeywordTarget::discovery)
        .collect()
}

/// Drops repeated keywords, keeping the first declaration of each.
///
/// The table holds one row per keyword, so a second run of the same keyword
/// would only find its URLs already processed and overwrite the first counts.
pub fn dedup_targets(targets: Vec<KeywordTarget>) -> Vec<KeywordTarget> {
    let mut seen = HashSet::new();
    targets
        .into_iter()
        .filter(|t| {
            let first = seen.insert(t.keyword.clone());
            if !first {
                warn!("Ignoring repeated keyword - keyword={}", t.keyword);
            }
            first
        })
        .collect()
}

pub fn load_keyword_tsv(path: &Path) -> Result<Vec<KeywordTarget>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading keyword file {}", path.display()))?;
    let targets = dedup_targets(parse_keyword_tsv(&raw));
    if targets.is_empty() {
        bail!("keyword file {} has no keywords below its header", path.display());
    }
    Ok(targets)
}

/// `{"keyword": ["Variant", ...], ...}` in file order.
pub fn parse_targets_json(contents: &str) -> Result<Vec<KeywordTarget>> {
    let mut de = serde_json::Deserializer::from_str(contents);
    let pairs: Vec<(String, Vec<String>)> =
        (&mut de).deserialize_map(OrderedMapVisitor(PhantomData))?;
    de.end()?;
    Ok(pairs
        .into_iter()
        .map(|(keyword, variants)| KeywordTarget { keyword, variants })
        .collect())
}

pub fn load_targets_json(path: &Path) -> Result<Vec<KeywordTarget>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading targets file {}", path.display()))?;
    let targets = parse_targets_json(&raw)
        .map(dedup_targets)
        .with_context(|| format!("decoding targets file {}", path.display()))?;
    if targets.is_empty() {
        bail!("targets file {} declares no keywords", path.display());
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsv_takes_first_column_after_header() {
        let tsv = "keyword\tvolume\nPdf\t120\n\nWiFi\t88\r\nAcc线\n";
        let got = parse_keyword_tsv(tsv);
        let names: Vec<&str> = got.iter().map(|t| t.keyword.as_str()).collect();
        assert_eq!(names, vec!["Pdf", "WiFi", "Acc线"]);
        assert!(got.iter().all(KeywordTarget::is_discovery));
    }

    #[test]
    fn header_only_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kw.tsv");
        std::fs::write(&path, "keyword\tvolume\n").unwrap();
        assert!(load_keyword_tsv(&path).is_err());
    }

    #[test]
    fn unreadable_keyword_file_is_an_error() {
        assert!(load_keyword_tsv(Path::new("/definitely/not/here.tsv")).is_err());
    }

    #[test]
    fn targets_json_keeps_file_order() {
        let json = r#"{"pnc": ["PNC", "pnc"], "DOOM": ["doom"], "ar": []}"#;
        let got = parse_targets_json(json).unwrap();
        assert_eq!(
            got,
            vec![
                KeywordTarget::new("pnc", &["PNC", "pnc"]),
                KeywordTarget::new("DOOM", &["doom"]),
                KeywordTarget::discovery("ar"),
            ]
        );
    }

    #[test]
    fn defaults_cover_all_ten_keywords() {
        let d = default_targets();
        assert_eq!(d.len(), 10);
        assert!(d.iter().all(|t| !t.variants.is_empty()));
    }

    #[test]
    fn repeated_tsv_keyword_is_loaded_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kw.tsv");
        std::fs::write(&path, "keyword\tvol\nDOOM\t1\nDOOM\t2\n").unwrap();
        let got = load_keyword_tsv(&path).unwrap();
        assert_eq!(got, vec![KeywordTarget::discovery("DOOM")]);
    }

    #[test]
    fn repeated_json_keyword_keeps_first_variants() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.json");
        std::fs::write(&path, r#"{"DOOM": ["DOOM", "doom"], "pnc": ["PNC"], "DOOM": ["Doom"]}"#)
            .unwrap();
        let got = load_targets_json(&path).unwrap();
        assert_eq!(
            got,
            vec![
                KeywordTarget::new("DOOM", &["DOOM", "doom"]),
                KeywordTarget::new("pnc", &["PNC"]),
            ]
        );
    }
}
