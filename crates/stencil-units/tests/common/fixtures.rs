//! Tarball fixtures

#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha512};

/// Gzip tarball with every file under a `package/` wrapper directory
pub fn package_tarball(files: &[(&str, &str)]) -> Vec<u8> {
    let prefixed: Vec<(String, &str)> = files
        .iter()
        .map(|(path, content)| (format!("package/{}", path), *content))
        .collect();
    raw_tarball(
        &prefixed
            .iter()
            .map(|(p, c)| (p.as_str(), *c))
            .collect::<Vec<_>>(),
    )
}

/// Gzip tarball with entries at the given paths
pub fn raw_tarball(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// `sha512-<base64>` integrity string for `bytes`
pub fn sri_sha512(bytes: &[u8]) -> String {
    format!("sha512-{}", STANDARD.encode(Sha512::digest(bytes)))
}

/// npm-style package document
pub fn package_document(
    name: &str,
    registry_url: &str,
    tags: &[(&str, &str)],
) -> serde_json::Value {
    let dist_tags: serde_json::Map<String, serde_json::Value> = tags
        .iter()
        .map(|(tag, version)| (tag.to_string(), serde_json::json!(version)))
        .collect();
    let versions: serde_json::Map<String, serde_json::Value> = tags
        .iter()
        .map(|(_, version)| {
            (
                version.to_string(),
                serde_json::json!({
                    "description": format!("{} {}", name, version),
                    "dist": {
                        "tarball": format!("{}/{}/-/{}-{}.tgz", registry_url, name, name, version)
                    }
                }),
            )
        })
        .collect();

    serde_json::json!({
        "name": name,
        "dist-tags": dist_tags,
        "repository": { "type": "git", "url": format!("git+https://github.com/acme/{}.git", name) },
        "versions": versions,
    })
}
