use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use super::lua::LuaScript;
use super::ScriptError;
use crate::quest::ZoneQuestInterface;

/// Loads a zone's Lua scripts into its quest interface
pub struct ScriptLoader {
    scripts_dir: PathBuf,
}

impl ScriptLoader {
    pub fn new(scripts_dir: &Path) -> Self {
        Self {
            scripts_dir: scripts_dir.to_path_buf(),
        }
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Script id for a file: its stem, for `.lua` files only
    pub fn script_id(path: &Path) -> Option<String> {
        if path.extension().map_or(true, |ext| ext != "lua") {
            return None;
        }
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
    }

    /// Load every script under the directory. A script that fails to load is
    /// skipped; the rest still load.
    pub fn load_all(&self, quests: &ZoneQuestInterface) -> Result<usize, ScriptError> {
        info!("Loading quest scripts from {:?}", self.scripts_dir);

        if !self.scripts_dir.exists() {
            warn!("Script directory does not exist: {:?}", self.scripts_dir);
            return Ok(0);
        }

        let mut paths = Vec::new();
        collect_scripts(&self.scripts_dir, &mut paths)?;
        paths.sort();

        let mut count = 0;
        for path in paths {
            match self.load_file(quests, &path) {
                Ok(_) => count += 1,
                Err(e) => warn!("Failed to load script {:?}: {}", path, e),
            }
        }

        info!("Loaded {} quest scripts", count);
        Ok(count)
    }

    /// Compile one script and swap in its handlers. If compilation fails the
    /// script's previous handlers stay in place.
    pub fn load_file(&self, quests: &ZoneQuestInterface, path: &Path) -> Result<String, ScriptError> {
        let script_id =
            Self::script_id(path).ok_or_else(|| ScriptError::NotAScript(path.to_path_buf()))?;

        let source = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let script = LuaScript::compile(&script_id, &source).map_err(|source| ScriptError::Lua {
            script: script_id.clone(),
            source,
        })?;
        let script = Arc::new(script);

        quests.replace_script(&script_id, script.handlers())?;
        info!(
            "Loaded script: {} ({} handlers)",
            script_id,
            script.kinds().len()
        );

        Ok(script_id)
    }

    /// Drop a script's handlers, e.g. after its file was deleted
    pub fn unload_file(&self, quests: &ZoneQuestInterface, path: &Path) -> Option<String> {
        let script_id = Self::script_id(path)?;
        quests.unregister(&script_id, &[]);
        info!("Unloaded script: {}", script_id);
        Some(script_id)
    }
}

/// Recursively collect `.lua` files
fn collect_scripts(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), ScriptError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ScriptError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| ScriptError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        if path.is_dir() {
            collect_scripts(&path, paths)?;
        } else if ScriptLoader::script_id(&path).is_some() {
            paths.push(path);
        }
    }

    Ok(())
}
