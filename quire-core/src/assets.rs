//! CSS and JS bundles.
//!
//! Contributors add raw chunks while the site is assembled; the combined
//! bundle is served from a content-hashed URL so browsers never see a stale
//! copy.

use std::path::Path;

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::static_files::StaticBytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Css,
    Js,
}

impl AssetKind {
    pub fn extension(&self) -> &'static str {
        match self {
            AssetKind::Css => "css",
            AssetKind::Js => "js",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssetBundle {
    kind: AssetKind,
    chunks: Vec<Vec<u8>>,
}

impl AssetBundle {
    pub fn new(kind: AssetKind) -> Self {
        Self {
            kind,
            chunks: Vec::new(),
        }
    }

    pub fn add(&mut self, chunk: impl Into<Vec<u8>>) {
        self.chunks.push(chunk.into());
    }

    /// Add every file under `dir` with this bundle's extension, ordered by
    /// file name.
    pub fn add_dir<P: AsRef<Path>>(&mut self, dir: P) -> std::io::Result<usize> {
        let ext = self.kind.extension();
        let mut files = Vec::new();

        for entry in WalkDir::new(dir) {
            let entry = entry?;
            if entry.file_type().is_file() && entry.path().extension().is_some_and(|e| e == ext) {
                files.push(entry.into_path());
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        for path in &files {
            self.add(std::fs::read(path)?);
        }

        Ok(files.len())
    }

    pub fn combined(&self) -> Vec<u8> {
        self.chunks.join(&b'\n')
    }

    pub fn versioned_url(&self) -> String {
        let hash = hex::encode(Sha256::digest(self.combined()));
        let ext = self.kind.extension();
        format!("/static/{ext}/bundle-{}.{ext}", &hash[..12])
    }

    /// The combined bundle as a registry entry.
    pub fn to_static(&self) -> StaticBytes {
        StaticBytes(self.combined())
    }
}
