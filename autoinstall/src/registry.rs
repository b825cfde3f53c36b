//! Named install recipes looked up by module name.
//!
//! A [`Recipe`] bundles the installs one module needs, possibly spread over
//! several install roots with their own search-path registration. The
//! registry picks a recipe by looking for its fragment in a module name:
//! `autoinstalled.mechanize._form` matches the `.mechanize` recipe.

use std::path::Path;

use tracing::info;

use crate::config::InstallerConfig;
use crate::download::Transport;
use crate::error::RegistryError;
use crate::fsutil;
use crate::installer::{AutoInstaller, InstallOutcome, PackageSpec};
use crate::target::{SearchPath, SearchPathMode};

/// One install within a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeStep {
    /// Sub-directory of the base install root; `None` installs into the root.
    pub target_subdir: Option<String>,
    /// How that install root is registered on the search path.
    pub search_path: SearchPathMode,
    pub spec: PackageSpec,
}

impl RecipeStep {
    /// A step installing into the base root without search-path changes.
    pub fn new(spec: PackageSpec) -> Self {
        Self {
            target_subdir: None,
            search_path: SearchPathMode::None,
            spec,
        }
    }

    pub fn in_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.target_subdir = Some(subdir.into());
        self
    }

    pub fn with_search_path(mut self, mode: SearchPathMode) -> Self {
        self.search_path = mode;
        self
    }

    /// Installer configuration for this step of `recipe`, derived from `base`.
    ///
    /// The sub-directory must name a directory below the base root.
    fn config(&self, recipe: &str, base: &InstallerConfig) -> Result<InstallerConfig, RegistryError> {
        let target_dir = match &self.target_subdir {
            Some(subdir) => {
                let normalized = fsutil::normalize(Path::new(subdir));
                if !fsutil::is_contained_relative(&normalized) {
                    return Err(RegistryError::InvalidSubdir {
                        recipe: recipe.to_string(),
                        subdir: subdir.clone(),
                    });
                }
                base.target_dir.join(normalized)
            }
            None => base.target_dir.clone(),
        };

        Ok(base
            .clone()
            .with_target_dir(target_dir)
            .with_append_to_search_path(self.search_path == SearchPathMode::Append)
            .with_prepend_to_search_path(self.search_path == SearchPathMode::Prepend))
    }
}

/// An ordered list of installs triggered by one module-name fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub name: String,
    pub fragment: String,
    pub steps: Vec<RecipeStep>,
}

impl Recipe {
    pub fn new(name: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fragment: fragment.into(),
            steps: Vec::new(),
        }
    }

    /// Add a step.
    pub fn with_step(mut self, step: RecipeStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Add a plain step installing `spec` into the base root.
    pub fn with_spec(self, spec: PackageSpec) -> Self {
        self.with_step(RecipeStep::new(spec))
    }

    /// Whether this recipe handles `module_name`.
    pub fn matches(&self, module_name: &str) -> bool {
        module_name.contains(&self.fragment)
    }

    /// Run every step in order, stopping at the first failure.
    pub fn install<T: Transport + Clone>(
        &self,
        base: &InstallerConfig,
        transport: &T,
        search_path: &mut SearchPath,
    ) -> Result<Vec<InstallOutcome>, RegistryError> {
        info!(recipe = %self.name, steps = self.steps.len(), "Running install recipe");

        let mut outcomes = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let config = step.config(&self.name, base)?;
            let target_dir = config.target_dir.clone();
            let installer = AutoInstaller::with_transport(config, transport.clone()).map_err(|e| {
                RegistryError::Setup {
                    recipe: self.name.clone(),
                    target_dir,
                    source: e,
                }
            })?;

            installer.register_search_path(search_path);
            let outcome = installer.install(&step.spec).map_err(|e| RegistryError::Install {
                recipe: self.name.clone(),
                source: e,
            })?;
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

/// Recipes in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallRegistry {
    recipes: Vec<Recipe>,
}

impl InstallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a recipe; earlier recipes take precedence in [`find`](Self::find).
    pub fn register(&mut self, recipe: Recipe) -> &mut Self {
        self.recipes.push(recipe);
        self
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    /// First recipe whose fragment appears in `module_name`.
    pub fn find(&self, module_name: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|recipe| recipe.matches(module_name))
    }

    /// Run the recipe for `module_name`, if there is one.
    ///
    /// Returns `Ok(None)` when no recipe matches.
    pub fn install_for<T: Transport + Clone>(
        &self,
        module_name: &str,
        base: &InstallerConfig,
        transport: &T,
        search_path: &mut SearchPath,
    ) -> Result<Option<Vec<InstallOutcome>>, RegistryError> {
        match self.find(module_name) {
            Some(recipe) => recipe.install(base, transport, search_path).map(Some),
            None => Ok(None),
        }
    }

    /// Run every recipe in registration order.
    pub fn install_all<T: Transport + Clone>(
        &self,
        base: &InstallerConfig,
        transport: &T,
        search_path: &mut SearchPath,
    ) -> Result<Vec<InstallOutcome>, RegistryError> {
        let mut outcomes = Vec::new();
        for recipe in &self.recipes {
            outcomes.extend(recipe.install(base, transport, search_path)?);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::{Reply, ScriptedTransport};
    use crate::target::Placement;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn registry() -> InstallRegistry {
        let mut registry = InstallRegistry::new();
        registry
            .register(
                Recipe::new("pep8", ".pep8")
                    .with_spec(PackageSpec::new("http://example.org/pep8.py").with_target_name("pep8.py")),
            )
            .register(
                Recipe::new("jinja", ".jinja2").with_step(
                    RecipeStep::new(PackageSpec::new("http://example.org/jinja2.py").with_target_name("jinja2.py"))
                        .in_subdir("jinja2")
                        .with_search_path(SearchPathMode::Append),
                ),
            );
        registry
    }

    #[test]
    fn test_find_by_fragment() {
        let registry = registry();

        assert_eq!(registry.find("autoinstalled.pep8").unwrap().name, "pep8");
        assert_eq!(registry.find("autoinstalled.jinja2.ext").unwrap().name, "jinja");
        assert!(registry.find("autoinstalled.unknown").is_none());
    }

    #[test]
    fn test_install_for_unknown_module() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(ScriptedTransport::new([]));
        let mut search_path = SearchPath::new();

        let result = registry()
            .install_for("os.path", &InstallerConfig::new(temp.path()), &transport, &mut search_path)
            .unwrap();

        assert!(result.is_none());
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_install_for_subdir_step() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(ScriptedTransport::new([Reply::Ok(200, b"# jinja".to_vec())]));
        let mut search_path = SearchPath::new();
        let base = InstallerConfig::new(temp.path().join("autoinstalled"));

        let outcomes = registry()
            .install_for("autoinstalled.jinja2", &base, &transport, &mut search_path)
            .unwrap()
            .unwrap();

        let jinja_dir = temp.path().join("autoinstalled/jinja2");
        assert_eq!(outcomes.len(), 1);
        assert!(jinja_dir.join("jinja2.py").is_file());
        assert!(jinja_dir.join(".jinja2.py.url").is_file());
        assert_eq!(search_path.entries(), &[jinja_dir]);
    }

    #[test]
    fn test_install_all_in_order() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(ScriptedTransport::new([
            Reply::Ok(200, b"# pep8".to_vec()),
            Reply::Ok(200, b"# jinja".to_vec()),
        ]));
        let mut search_path = SearchPath::new();
        let base = InstallerConfig::new(temp.path());

        let outcomes = registry()
            .install_all(&base, &transport, &mut search_path)
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            transport.requests(),
            vec!["http://example.org/pep8.py", "http://example.org/jinja2.py"]
        );
        assert_eq!(fs::read_to_string(temp.path().join("pep8.py")).unwrap(), "# pep8");
    }

    #[test]
    fn test_failure_names_recipe() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(ScriptedTransport::new([]));
        let mut search_path = SearchPath::new();
        let base = InstallerConfig::new(temp.path()).with_max_retries(0);

        let err = registry()
            .install_for("autoinstalled.pep8", &base, &transport, &mut search_path)
            .unwrap_err();

        assert_eq!(err.recipe(), "pep8");
        assert!(matches!(err, RegistryError::Install { .. }));
    }

    #[test]
    fn test_step_config() {
        let base = InstallerConfig::new("/base").with_append_to_search_path(true);
        let step = RecipeStep::new(PackageSpec::new("http://example.org/t.tar.bz2"))
            .in_subdir("twisted")
            .with_search_path(SearchPathMode::Prepend);

        let config = step.config("twisted", &base).unwrap();

        assert_eq!(config.target_dir, PathBuf::from("/base/twisted"));
        let mut search_path = SearchPath::new();
        let entry = config.search_path_mode().register(&mut search_path, &config.target_dir);
        assert_eq!(entry.unwrap().placement, Placement::Prepended);
    }

    #[test]
    fn test_subdir_must_stay_below_base() {
        let temp = TempDir::new().unwrap();
        let base = InstallerConfig::new(temp.path().join("autoinstalled"));

        for subdir in ["../x", "/etc", ".", ""] {
            let transport = Arc::new(ScriptedTransport::new([Reply::Ok(200, b"# x".to_vec())]));
            let recipe = Recipe::new("escape", ".escape").with_step(
                RecipeStep::new(PackageSpec::new("http://example.org/x.py").with_target_name("x.py"))
                    .in_subdir(subdir),
            );

            let err = recipe
                .install(&base, &transport, &mut SearchPath::new())
                .unwrap_err();

            assert!(
                matches!(&err, RegistryError::InvalidSubdir { subdir: s, .. } if s == subdir),
                "{:?}",
                err
            );
            assert_eq!(err.recipe(), "escape");
            assert!(transport.requests().is_empty());
        }
        assert!(!temp.path().join("x").exists());
        assert!(!temp.path().join("autoinstalled").exists());
    }
}
