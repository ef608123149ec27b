//! Music sheet storage
//!
//! Sheets live as plain notation files under `<home>/.beep/sheets/<dir>/`.
//! A name whose first `-`-separated part is a number refers to a built-in
//! sheet; id 1 is the demo.

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

pub const DEMO_ID: u32 = 1;

/// Mozart K33b, Klavierstück in F
pub const DEMO: &str = "VP SA8 SR9
A9HRDE cc DScszs|DEc DQzDE[|cc DScszs|DEc DQz DE[|vv DSvcsc|DEvs ]v|cc DScszs|VN
A3HLDE [n z,    |cHRq HLz, |[n z,    |cHRq HLz,  |sl z,    |]m   pb|z, ]m    |

A9HRDE cz [c|ss DSsz]z|DEs] ps|DSsz][ z][p|DEpDQ[ [ || DERE] DS][p[ |VN
A3HLDE [n ov|]m [n    |  pb ic|  n,   lHRq|HLnc DQ[ || DEcHRq HLvHRw|

A9HRDS ][p[ ][p[|DE] DQp DEi|REc DScszs|cszs |cszs|DEcDQzDE[|REv DSvcsc|DEvs ]v|VN
A3HLDE bHRe HLvw|cHRq   HLic|[n  ]m    |z,   |]m  |zn   z,  |sl  [,    |z. DQp |

A9HRDE REc DScszs|DEcz [c|REs DSsz]z|DEs] ps|DSsz][ z][p|DE[DSitDQrRE|VN
A3HLDE z,  ]m    |[n   ov|]m  [n    |pb   ic|nz     sc  |DQn      [RE|
";

/// A sheet shipped with the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinSheet {
    pub id: u32,
    pub name: &'static str,
    pub dir: &'static str,
    pub notation: &'static str,
}

impl BuiltinSheet {
    /// Path relative to the sheet root
    pub fn path(&self) -> String {
        format!("{}/{}-{}", self.dir, self.id, self.name)
    }
}

pub const BUILTIN: [BuiltinSheet; 1] = [BuiltinSheet {
    id: DEMO_ID,
    name: "mozart-k33b-klavierstuck-in-f.txt",
    dir: "beep",
    notation: DEMO,
}];

pub fn builtin(id: u32) -> Option<&'static BuiltinSheet> {
    BUILTIN.iter().find(|sheet| sheet.id == id)
}

/// Built-in id a sheet name refers to, e.g. `1` or `beep/1-mozart.txt`
fn builtin_id(name: &str) -> Option<u32> {
    let file = name.rsplit('/').next()?;
    file.split('-').next()?.parse().ok()
}

/// Sheet files under one root directory
#[derive(Debug, Clone)]
pub struct SheetStore {
    root: PathBuf,
}

impl SheetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store at the configured sheet root, if one can be resolved
    pub fn from_config(config: &EngineConfig) -> Option<Self> {
        config.sheet_root().map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a sheet, refusing names that leave the root
    pub fn path(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let inside = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || !inside {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid sheet name: {}", name),
            )));
        }
        Ok(self.root.join(relative))
    }

    /// Notation of a built-in sheet or a stored file
    pub fn load(&self, name: &str) -> Result<String> {
        if let Some(sheet) = builtin_id(name).and_then(builtin) {
            return Ok(sheet.notation.to_string());
        }
        let path = self.path(name)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::SheetNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write a sheet, creating its directory; returns the file path
    pub fn save(&self, name: &str, notation: &str) -> Result<PathBuf> {
        let path = self.path(name)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, notation)?;
        log::debug!("saved sheet {}", path.display());
        Ok(path)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).map(|path| path.is_file()).unwrap_or(false)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path(name)?;
        match fs::remove_file(&path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::SheetNotFound(name.to_string()))
            }
            other => Ok(other?),
        }
    }

    /// Names of built-in and stored sheets containing `keyword`, ignoring case
    ///
    /// An empty keyword lists everything.
    pub fn search(&self, keyword: &str) -> Result<Vec<String>> {
        let keyword = keyword.to_lowercase();
        let mut names: Vec<String> = BUILTIN.iter().map(|sheet| sheet.path()).collect();
        if self.root.is_dir() {
            collect_files(&self.root, &self.root, &mut names)?;
        }
        names.retain(|name| name.to_lowercase().contains(&keyword));
        names.sort();
        names.dedup();
        Ok(names)
    }
}

fn collect_files(root: &Path, dir: &Path, names: &mut Vec<String>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(root, &path, names)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let parts: Vec<_> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect();
            names.push(parts.join("/"));
        }
    }
    Ok(())
}
