//! Module loading
//!
//! A [`CodeLoader`] is everything validation and generation need to know
//! about the program: the system modules and the user modules around the
//! one being compiled.

use crate::builtins;
use crate::dsl::ast::{Module, NodeId};
use crate::dsl::codegen::{self, CodegenOptions};
use crate::dsl::{lexer, parser, validator};
use crate::dsl::lexer::Token;
use crate::error::{ErrorCode, Result, ScriptError};
use blockcode_core::{BlockError, ModuleId};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Source file extension
pub const SOURCE_EXTENSION: &str = "bc";

/// Every `*.bc` file directly inside `folder`, sorted by path
pub fn script_paths(folder: &Path) -> blockcode_core::Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(BlockError::NotFound(format!("Script folder {:?}", folder)));
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(folder)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some(SOURCE_EXTENSION))
        .collect();
    paths.sort();
    Ok(paths)
}

/// First top-level name declared twice across `modules`, with the name of
/// the module that declared it first
pub fn find_duplicate_name<'a>(modules: impl IntoIterator<Item = &'a Module>) -> Option<(&'a Token, &'a str)> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for module in modules {
        for name in module.declared_names() {
            if let Some(owner) = seen.insert(&name.value, &module.name) {
                return Some((name, owner));
            }
        }
    }
    None
}

/// A declaration together with the module that owns it
#[derive(Debug, Clone, Copy)]
pub struct ModuleItem<'a> {
    pub module: &'a Module,
    pub node: NodeId,
}

/// Read access to the loaded program
pub trait CodeLoader {
    fn system_modules(&self) -> Box<dyn Iterator<Item = &Module> + '_>;

    fn user_modules(&self) -> Box<dyn Iterator<Item = &Module> + '_>;

    /// Any module, system or user, by id
    fn module(&self, id: ModuleId) -> Option<&Module>;

    /// Functions of every user module, in load order
    fn functions(&self) -> Vec<ModuleItem<'_>> {
        self.user_modules()
            .flat_map(|module| module.func_defs.iter().map(move |&node| ModuleItem { module, node }))
            .collect()
    }

    /// Module-level variables of every user module
    fn vars(&self) -> Vec<ModuleItem<'_>> {
        self.user_modules()
            .flat_map(|module| module.var_defs.iter().map(move |&node| ModuleItem { module, node }))
            .collect()
    }

    /// Event handlers of every user module
    fn user_ons(&self) -> Vec<ModuleItem<'_>> {
        self.user_modules()
            .flat_map(|module| module.on_defs.iter().map(move |&node| ModuleItem { module, node }))
            .collect()
    }
}

/// In-memory module registry
///
/// # Purpose
/// Holds the system modules a program may call and the user modules
/// compiled so far. User modules are keyed by name: loading a module
/// again replaces the previous version.
#[derive(Debug, Default)]
pub struct ModuleLoader {
    system: Vec<Module>,
    user: Vec<Module>,
}

impl ModuleLoader {
    /// Create a loader with no modules at all
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_modules(system: Vec<Module>) -> Self {
        Self { system, user: Vec::new() }
    }

    /// Create a loader with the named built-in system modules
    ///
    /// # Arguments
    /// * `names` - System module names; unknown names are logged and skipped
    pub fn with_selected<S: AsRef<str>>(names: &[S]) -> Self {
        let mut loader = Self::new();
        for name in names {
            match builtins::system_module(name.as_ref()) {
                Some(module) => loader.add_system_module(module),
                None => warn!("Unknown system module '{}', skipping", name.as_ref()),
            }
        }
        loader
    }

    pub fn add_system_module(&mut self, module: Module) {
        debug!("Registered system module: {}", module);
        self.system.retain(|m| m.name != module.name);
        self.system.push(module);
    }

    /// Compile and register a user module
    ///
    /// # Arguments
    /// * `name` - Module name, used for qualified calls (`name.func`)
    /// * `source` - Script text
    ///
    /// # Behavior
    /// 1. Lexes and parses the text
    /// 2. Validates it against the registered system modules
    /// 3. Rejects variables and functions already declared by another
    ///    user module
    /// 4. Replaces any user module with the same name
    pub fn load_source(&mut self, name: &str, source: &str) -> Result<ModuleId> {
        debug!("Loading module: {}", name);

        let tokens = lexer::load(source)?;
        let mut module = parser::parse(name, &tokens)?;
        validator::validate(&mut module, Some(&*self))?;

        let others = self.user.iter().filter(|m| m.name != module.name);
        if let Some((duplicate, owner)) = find_duplicate_name(others.chain(std::iter::once(&module))) {
            return Err(ScriptError::semantic(
                ErrorCode::InvalidArgument,
                Some(duplicate),
                format!("'{}' is already declared in module '{}'", duplicate.value, owner),
            ));
        }

        Ok(self.insert_user_module(module))
    }

    /// Register a user module as is, without validating it
    pub fn insert_user_module(&mut self, module: Module) -> ModuleId {
        let id = module.id;
        if self.user.iter().any(|m| m.name == module.name) {
            debug!("Replacing user module '{}'", module.name);
            self.user.retain(|m| m.name != module.name);
        }
        debug!("Registered {}", module);
        self.user.push(module);
        id
    }

    /// Compile one source file; the module is named after the file stem
    pub fn load_file(&mut self, path: &Path) -> blockcode_core::Result<ModuleId> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| BlockError::InvalidData(format!("Invalid script file name: {:?}", path)))?;
        let source = fs::read_to_string(path)?;

        Ok(self.load_source(name, &source)?)
    }

    /// Compile every `*.bc` file in a folder, sorted by file name
    pub fn load_folder(&mut self, folder: &Path) -> blockcode_core::Result<Vec<ModuleId>> {
        let paths = script_paths(folder)?;

        let mut ids = Vec::with_capacity(paths.len());
        for path in &paths {
            ids.push(self.load_file(path)?);
        }

        info!("Loaded {} script(s) from {:?}", ids.len(), folder);
        Ok(ids)
    }

    pub fn user_module(&self, name: &str) -> Option<&Module> {
        self.user.iter().find(|m| m.name == name)
    }

    /// Generate program text for everything loaded
    pub fn generate(&self, options: &CodegenOptions) -> Result<String> {
        codegen::generate(self, options)
    }
}

impl CodeLoader for ModuleLoader {
    fn system_modules(&self) -> Box<dyn Iterator<Item = &Module> + '_> {
        Box::new(self.system.iter())
    }

    fn user_modules(&self) -> Box<dyn Iterator<Item = &Module> + '_> {
        Box::new(self.user.iter())
    }

    fn module(&self, id: ModuleId) -> Option<&Module> {
        self.system.iter().chain(&self.user).find(|m| m.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_source_registers_module() {
        let mut loader = ModuleLoader::with_system_modules(builtins::system_modules());
        let id = loader.load_source("main", "function f() begin Sprite.wait 1 end").unwrap();

        let module = loader.module(id).unwrap();
        assert_eq!(module.name, "main");
        assert!(module.is_async(module.func_defs[0]));
        assert_eq!(loader.functions().len(), 1);
        assert!(loader.user_module("main").is_some());
    }

    #[test]
    fn test_reloading_replaces_module() {
        let mut loader = ModuleLoader::new();
        let first = loader.load_source("main", "function a() begin end").unwrap();
        let second = loader.load_source("main", "function b() begin end\nvar x").unwrap();

        assert_ne!(first, second);
        assert!(loader.module(first).is_none());
        assert_eq!(loader.user_modules().count(), 1);
        assert_eq!(loader.vars().len(), 1);
    }

    #[test]
    fn test_failed_load_keeps_previous_module() {
        let mut loader = ModuleLoader::new();
        loader.load_source("main", "function a() begin end").unwrap();

        let err = loader.load_source("main", "function a() begin nope() end").unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownFunctionName);
        assert!(loader.user_module("main").unwrap().find_function("a").is_some());
    }

    #[test]
    fn test_names_are_unique_across_modules() {
        let mut loader = ModuleLoader::new();
        loader.load_source("a", "var score := 0\nfunction helper() begin end").unwrap();

        let err = loader.load_source("b", "var score := 1").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        let err = loader.load_source("b", "function helper() begin forever end end").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        let err = loader.load_source("b", "var lives := 3\nvar lives := 4").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert!(loader.user_module("b").is_none());

        loader.load_source("b", "var lives := 3\nfunction spawn() begin end").unwrap();
        loader.load_source("a", "var score := 5\nfunction helper() begin end").unwrap();
        assert_eq!(loader.user_modules().count(), 2);

        let js = loader.generate(&CodegenOptions::default()).unwrap();
        assert!(js.contains("let score = 5;"), "{js}");
        assert!(js.contains("let lives = 3;"), "{js}");
    }

    #[test]
    fn test_script_paths() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.bc"), "").unwrap();
        fs::write(dir.path().join("a.bc"), "").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();

        let paths = script_paths(dir.path()).unwrap();
        assert_eq!(paths, vec![dir.path().join("a.bc"), dir.path().join("b.bc")]);
    }

    #[test]
    fn test_with_selected() {
        let loader = ModuleLoader::with_selected(&["Math", "Nope", "Game"]);
        let names: Vec<&str> = loader.system_modules().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Math", "Game"]);
    }

    #[test]
    fn test_load_folder() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.bc"), "on start begin Game.log \"b\" end").unwrap();
        fs::write(dir.path().join("a.bc"), "function helper() begin end").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a script").unwrap();

        let mut loader = ModuleLoader::with_system_modules(builtins::system_modules());
        let ids = loader.load_folder(dir.path()).unwrap();

        assert_eq!(ids.len(), 2);
        let names: Vec<&str> = loader.user_modules().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(loader.user_ons().len(), 1);
    }

    #[test]
    fn test_load_folder_errors() {
        let dir = TempDir::new().unwrap();
        let mut loader = ModuleLoader::new();

        let missing = loader.load_folder(&dir.path().join("missing"));
        assert!(matches!(missing, Err(BlockError::NotFound(_))));

        fs::write(dir.path().join("bad.bc"), "function f( begin end").unwrap();
        let bad = loader.load_folder(dir.path());
        assert!(matches!(bad, Err(BlockError::Script(_))));
    }
}
