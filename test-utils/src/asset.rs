// Copyright 2023 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{
    env::var_os,
    io::{Error, ErrorKind, Result},
    path::{Path, PathBuf},
};

const ASSETS_DIR: &str = "assets/";

/// Resolves the workspace directory from the manifest of the calling crate.
pub fn workspace() -> Result<PathBuf> {
    let manifest = var_os("CARGO_MANIFEST_DIR")
        .ok_or_else(|| Error::new(ErrorKind::NotFound, "missing CARGO_MANIFEST_DIR"))?;

    PathBuf::from(manifest)
        .ancestors()
        .find(|path| path.join("Cargo.lock").exists())
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::new(ErrorKind::NotFound, "missing cargo workspace dir"))
}

/// Resolves the path to the requested data relative to the workspace directory.
fn resolve_path(path: &[impl AsRef<Path>]) -> Result<PathBuf> {
    path.iter()
        .fold(workspace()?, |path, component| path.join(component))
        .canonicalize()
}

/// Resolves the path to the xlm-roberta base model with all hidden states exported.
pub fn xlm_roberta() -> Result<PathBuf> {
    resolve_path(&[ASSETS_DIR, "xlm_roberta_base_v0000"])
}

/// Resolves the path to the python workspace of the dependency parser.
pub fn python_workspace() -> Result<PathBuf> {
    resolve_path(&["relation"])
}
